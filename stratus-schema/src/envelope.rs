use serde::{Deserialize, Serialize};

/// Structured body of a mutating call that wraps the operation handle.
///
/// Resource kinds disagree on the field name, so every known spelling is accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl HandleEnvelope {
    pub fn into_handle(self) -> Option<String> {
        self.activity_id.or(self.job_id).or(self.id)
    }
}
