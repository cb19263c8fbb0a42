use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Virtual disk attached to a VM.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDisk {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine_id: Option<String>,

    /// Capacity in bytes.
    #[serde(default)]
    pub capacity: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_unit_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_mode: Option<String>,

    #[serde(default)]
    pub editable: bool,
}

/// Virtual machine, reduced to what guest-tools detection needs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,

    #[serde(default, rename = "PVDrivers")]
    pub pv_drivers: PvDrivers,

    #[serde(default)]
    pub management_agent: ManagementAgent,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvDrivers {
    #[serde(default)]
    pub detected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub are_up_to_date: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ManagementAgent {
    #[serde(default)]
    pub detected: bool,
}

impl VirtualMachine {
    /// Both the paravirtual drivers and the management agent report in.
    pub fn tools_detected(&self) -> bool {
        self.pv_drivers.detected && self.management_agent.detected
    }
}
