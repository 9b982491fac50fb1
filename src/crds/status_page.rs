//! The `PublicStatusPage` custom resource and its request translator.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{insert_code, insert_opt, insert_value, Payload, ReconcileStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PspSort {
    #[serde(rename = "FRIENDLY_NAME_A_Z")]
    FriendlyNameAZ,
    #[serde(rename = "FRIENDLY_NAME_Z_A")]
    FriendlyNameZA,
    #[serde(rename = "STATUS_UP_DOWN_PAUSED")]
    StatusUpDownPaused,
    #[serde(rename = "STATUS_DOWN_UP_PAUSED")]
    StatusDownUpPaused,
}

impl PspSort {
    pub fn code(self) -> i64 {
        match self {
            PspSort::FriendlyNameAZ => 1,
            PspSort::FriendlyNameZA => 2,
            PspSort::StatusUpDownPaused => 3,
            PspSort::StatusDownUpPaused => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PspStatus {
    Paused,
    Active,
}

impl PspStatus {
    pub fn code(self) -> i64 {
        match self {
            PspStatus::Paused => 0,
            PspStatus::Active => 1,
        }
    }
}

/// Desired state of an UptimeRobot public status page.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "uptimerobot.twinhats.com",
    version = "v1beta1",
    kind = "PublicStatusPage",
    plural = "publicstatuspages",
    singular = "publicstatuspage",
    shortname = "psp",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"Friendly Name", "type":"string", "jsonPath":".spec.friendlyName"}"#,
    printcolumn = r#"{"name":"Monitors", "type":"string", "jsonPath":".spec.monitors"}"#,
    printcolumn = r#"{"name":"Custom Domain", "type":"string", "jsonPath":".spec.customDomain"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatusPageSpec {
    /// Monitor IDs shown on the page, separated with `-`, or `0` for all.
    pub monitors: String,
    /// Friendly name, defaults to the name of the PublicStatusPage object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Domain or subdomain the status page will run on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    /// Plain-text page password. Deprecated: use `passwordSecret`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Secret in the same namespace holding the page `password`. Never
    /// forwarded to the remote API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<PspSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PspStatus>,
    /// Remove the UptimeRobot link from the page (pro plan feature).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_url_links: Option<bool>,
}

/// Translates a status page spec into the flat remote request. The
/// `passwordSecret` reference is resolved by the handler and never appears
/// in the payload.
pub fn to_request(name: &str, spec: &PublicStatusPageSpec) -> Payload {
    let mut payload = Payload::new();
    insert_value(
        &mut payload,
        "friendly_name",
        spec.friendly_name.clone().unwrap_or_else(|| name.to_string()),
    );
    insert_value(&mut payload, "monitors", spec.monitors.clone());
    insert_opt(&mut payload, "custom_domain", spec.custom_domain.clone());
    insert_opt(&mut payload, "password", spec.password.clone());
    insert_code(&mut payload, "sort", spec.sort.map(PspSort::code));
    insert_code(&mut payload, "status", spec.status.map(PspStatus::code));
    insert_opt(&mut payload, "hide_url_links", spec.hide_url_links);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_tokens_resolve_to_codes() {
        let parsed: PspSort = serde_json::from_value(json!("FRIENDLY_NAME_A_Z")).unwrap();
        assert_eq!(parsed, PspSort::FriendlyNameAZ);
        assert_eq!(parsed.code(), 1);
        assert_eq!(PspSort::StatusDownUpPaused.code(), 4);
    }

    #[test]
    fn secret_reference_is_never_forwarded() {
        let spec = PublicStatusPageSpec {
            monitors: "0".into(),
            friendly_name: None,
            custom_domain: None,
            password: None,
            password_secret: Some("psp-password".into()),
            sort: None,
            status: Some(PspStatus::Active),
            hide_url_links: None,
        };
        let payload = to_request("page", &spec);
        assert!(!payload.contains_key("password_secret"));
        assert_eq!(payload.get("status"), Some(&json!(1)));
        assert_eq!(payload.get("monitors"), Some(&json!("0")));
    }
}
