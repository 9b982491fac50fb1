//! The `MaintenanceWindow` custom resource and its request translator.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{insert_value, Payload, ReconcileStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceWindowType {
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl MaintenanceWindowType {
    pub fn code(self) -> i64 {
        match self {
            MaintenanceWindowType::Once => 1,
            MaintenanceWindowType::Daily => 2,
            MaintenanceWindowType::Weekly => 3,
            MaintenanceWindowType::Monthly => 4,
        }
    }
}

/// Desired state of an UptimeRobot maintenance window.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "uptimerobot.twinhats.com",
    version = "v1beta1",
    kind = "MaintenanceWindow",
    plural = "maintenancewindows",
    singular = "maintenancewindow",
    shortname = "mw",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"Friendly Name", "type":"string", "jsonPath":".spec.friendlyName"}"#,
    printcolumn = r#"{"name":"Window Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Start Time", "type":"string", "jsonPath":".spec.startTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindowSpec {
    /// The type of maintenance window.
    #[serde(rename = "type")]
    pub window_type: MaintenanceWindowType,
    /// Start time: seconds since epoch for ONCE, `HH:mm` for other types.
    pub start_time: String,
    /// How long the window stays active, in seconds.
    pub duration: i64,
    /// Friendly name, defaults to the name of the MaintenanceWindow object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Window selection for WEEKLY and MONTHLY windows, e.g. `2-4-5` for
    /// Tuesday-Thursday-Friday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Translates a maintenance window spec into the flat remote request. The
/// remote API requires a `value` parameter even for window types that have
/// no selection, so an absent value becomes the empty string.
pub fn to_request(name: &str, spec: &MaintenanceWindowSpec) -> Payload {
    let mut payload = Payload::new();
    insert_value(
        &mut payload,
        "friendly_name",
        spec.friendly_name.clone().unwrap_or_else(|| name.to_string()),
    );
    insert_value(&mut payload, "type", spec.window_type.code());
    insert_value(&mut payload, "start_time", spec.start_time.clone());
    insert_value(&mut payload, "duration", spec.duration);
    insert_value(&mut payload, "value", spec.value.clone().unwrap_or_default());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weekly() -> MaintenanceWindowSpec {
        MaintenanceWindowSpec {
            window_type: MaintenanceWindowType::Weekly,
            start_time: "02:00".into(),
            duration: 3600,
            friendly_name: None,
            value: Some("2-4-5".into()),
        }
    }

    #[test]
    fn request_maps_type_and_keeps_selection() {
        let payload = to_request("patch-window", &weekly());
        assert_eq!(payload.get("type"), Some(&json!(3)));
        assert_eq!(payload.get("start_time"), Some(&json!("02:00")));
        assert_eq!(payload.get("duration"), Some(&json!(3600)));
        assert_eq!(payload.get("value"), Some(&json!("2-4-5")));
        assert_eq!(payload.get("friendly_name"), Some(&json!("patch-window")));
    }

    #[test]
    fn absent_value_defaults_to_empty_string() {
        let mut spec = weekly();
        spec.window_type = MaintenanceWindowType::Once;
        spec.value = None;
        let payload = to_request("mw", &spec);
        assert_eq!(payload.get("value"), Some(&json!("")));
    }
}
