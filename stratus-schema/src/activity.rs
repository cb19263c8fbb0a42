use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Activity state key reported once the backend finished the operation.
pub const ACTIVITY_STATE_COMPLETED: &str = "completed";
/// Activity state key reported when the backend gave up on the operation.
pub const ACTIVITY_STATE_FAILED: &str = "failed";

/// Status record of an asynchronous operation, as returned by `GET .../activities/{id}`.
///
/// `state` is keyed by the status name and is expected to hold exactly one entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concerned_items: Vec<ConcernedItem>,

    #[serde(default)]
    pub state: BTreeMap<String, ActivityState>,
}

/// One entry of [`Activity::state`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Completion percentage while the activity runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Resource touched by an activity (typically the one it created).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConcernedItem {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,
}

impl Activity {
    /// Returns the only state entry, or `None` when the map is empty or ambiguous.
    pub fn single_state(&self) -> Option<(&str, &ActivityState)> {
        let mut entries = self.state.iter();
        let (name, state) = entries.next()?;
        entries.next().is_none().then_some((name.as_str(), state))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.single_state(), Some((ACTIVITY_STATE_COMPLETED, _)))
    }

    /// Id of the first concerned item of the given type, e.g. the VM a creation produced.
    pub fn concerned_item_id(&self, kind: &str) -> Option<&str> {
        self.concerned_items
            .iter()
            .find(|item| item.kind == kind)
            .map(|item| item.id.as_str())
    }
}

impl ActivityState {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.start_date.as_deref()?)
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.stop_date.as_deref()?)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
