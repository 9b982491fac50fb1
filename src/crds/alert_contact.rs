//! The `AlertContact` custom resource and its request translator.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{insert_value, Payload, ReconcileStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertContactType {
    Sms,
    Email,
    TwitterDm,
    Boxcar,
    WebHook,
    Pushbullet,
    Zapier,
    Pushover,
    Hipchat,
    Slack,
}

impl AlertContactType {
    pub fn code(self) -> i64 {
        match self {
            AlertContactType::Sms => 1,
            AlertContactType::Email => 2,
            AlertContactType::TwitterDm => 3,
            AlertContactType::Boxcar => 4,
            AlertContactType::WebHook => 5,
            AlertContactType::Pushbullet => 6,
            AlertContactType::Zapier => 7,
            AlertContactType::Pushover => 9,
            AlertContactType::Hipchat => 10,
            AlertContactType::Slack => 11,
        }
    }
}

/// Desired state of an UptimeRobot alert contact.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "uptimerobot.twinhats.com",
    version = "v1beta1",
    kind = "AlertContact",
    plural = "alertcontacts",
    singular = "alertcontact",
    shortname = "ac",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"Friendly Name", "type":"string", "jsonPath":".spec.friendlyName"}"#,
    printcolumn = r#"{"name":"Contact Type", "type":"string", "jsonPath":".spec.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AlertContactSpec {
    /// The type of alert contact. The remote API only supports in-place
    /// edits for WEB_HOOK contacts; everything else is recreated on update.
    #[serde(rename = "type")]
    pub contact_type: AlertContactType,
    /// The contact's mail address, phone number, URL or connection string.
    pub value: String,
    /// Friendly name, defaults to the name of the AlertContact object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
}

/// Translates an alert contact spec into the flat remote request.
pub fn to_request(name: &str, spec: &AlertContactSpec) -> Payload {
    let mut payload = Payload::new();
    insert_value(
        &mut payload,
        "friendly_name",
        spec.friendly_name.clone().unwrap_or_else(|| name.to_string()),
    );
    insert_value(&mut payload, "type", spec.contact_type.code());
    insert_value(&mut payload, "value", spec.value.clone());
    payload
}
