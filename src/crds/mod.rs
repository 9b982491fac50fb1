//! The custom resources managed by this operator, together with the pure
//! translators that turn a declared spec into the flat key/value request the
//! UptimeRobot API expects.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::StatusWrite;

pub mod alert_contact;
pub mod maintenance_window;
pub mod monitor;
pub mod status_page;

pub use alert_contact::{AlertContact, AlertContactSpec, AlertContactType};
pub use maintenance_window::{MaintenanceWindow, MaintenanceWindowSpec, MaintenanceWindowType};
pub use monitor::{MonitorSpec, MonitorType, UptimeRobotMonitor};
pub use status_page::{PublicStatusPage, PublicStatusPageSpec};

/// API group shared by all custom resources.
pub const GROUP: &str = "uptimerobot.twinhats.com";

/// A translated request: flat remote-API field names mapped to resolved
/// values. No entry may hold an unmapped enum token or a camel-cased key.
pub type Payload = BTreeMap<String, Value>;

/// Engine-owned status of a custom resource: the outcome of the lifecycle
/// event that last wrote it, keyed by the literal event name (`create` or
/// `update`). The remote identifier always travels here, which is what makes
/// updates and deletes resume correctly across operator restarts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileStatus {
    #[serde(flatten)]
    pub events: BTreeMap<String, StatusWrite>,
}

impl ReconcileStatus {
    pub fn event(&self, name: &str) -> Option<&StatusWrite> {
        self.events.get(name)
    }
}

/// Extracts a remote resource id. Ids arrive as numbers for most kinds but
/// as zero-padded strings for alert contacts, and the status may carry
/// either form.
pub(crate) fn parse_remote_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn insert_value(payload: &mut Payload, key: &str, value: impl Into<Value>) {
    payload.insert(key.to_string(), value.into());
}

pub(crate) fn insert_opt(payload: &mut Payload, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        insert_value(payload, key, value);
    }
}

pub(crate) fn insert_code(payload: &mut Payload, key: &str, code: Option<i64>) {
    if let Some(code) = code {
        insert_value(payload, key, code);
    }
}
