//! The `UptimeRobotMonitor` custom resource and its request translator.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{insert_code, insert_opt, insert_value, Payload, ReconcileStatus};
use crate::error::Error;

/// Monitor type. HTTP and HTTPS deliberately share the remote code 1; the
/// scheme only matters for URL formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorType {
    Http,
    Https,
    Keyword,
    Ping,
    Port,
    Heartbeat,
}

impl MonitorType {
    pub fn code(self) -> i64 {
        match self {
            MonitorType::Http | MonitorType::Https => 1,
            MonitorType::Keyword => 2,
            MonitorType::Ping => 3,
            MonitorType::Port => 4,
            MonitorType::Heartbeat => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorSubType {
    Http,
    Https,
    Ftp,
    Smtp,
    Pop3,
    Imap,
    Custom,
}

impl MonitorSubType {
    pub fn code(self) -> i64 {
        match self {
            MonitorSubType::Http => 1,
            MonitorSubType::Https => 2,
            MonitorSubType::Ftp => 3,
            MonitorSubType::Smtp => 4,
            MonitorSubType::Pop3 => 5,
            MonitorSubType::Imap => 6,
            MonitorSubType::Custom => 99,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorHttpMethod {
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl MonitorHttpMethod {
    pub fn code(self) -> i64 {
        match self {
            MonitorHttpMethod::Head => 1,
            MonitorHttpMethod::Get => 2,
            MonitorHttpMethod::Post => 3,
            MonitorHttpMethod::Put => 4,
            MonitorHttpMethod::Patch => 5,
            MonitorHttpMethod::Delete => 6,
            MonitorHttpMethod::Options => 7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorKeywordType {
    Exists,
    NotExists,
}

impl MonitorKeywordType {
    pub fn code(self) -> i64 {
        match self {
            MonitorKeywordType::Exists => 1,
            MonitorKeywordType::NotExists => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorHttpAuthType {
    BasicAuth,
    Digest,
}

impl MonitorHttpAuthType {
    pub fn code(self) -> i64 {
        match self {
            MonitorHttpAuthType::BasicAuth => 1,
            MonitorHttpAuthType::Digest => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorPostType {
    KeyValue,
    Raw,
}

impl MonitorPostType {
    pub fn code(self) -> i64 {
        match self {
            MonitorPostType::KeyValue => 1,
            MonitorPostType::Raw => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorPostContentType {
    TextHtml,
    ApplicationJson,
}

impl MonitorPostContentType {
    pub fn code(self) -> i64 {
        match self {
            MonitorPostContentType::TextHtml => 0,
            MonitorPostContentType::ApplicationJson => 1,
        }
    }
}

/// Desired state of a single UptimeRobot monitor.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "uptimerobot.twinhats.com",
    version = "v1beta1",
    kind = "UptimeRobotMonitor",
    plural = "uptimerobotmonitors",
    singular = "uptimerobotmonitor",
    shortname = "urm",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"Friendly Name", "type":"string", "jsonPath":".spec.friendlyName"}"#,
    printcolumn = r#"{"name":"Ingress", "type":"string", "jsonPath":".metadata.ownerReferences[0].name"}"#,
    printcolumn = r#"{"name":"Monitor Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Monitored URL", "type":"string", "jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Monitored Path", "type":"string", "jsonPath":".spec.path"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSpec {
    /// URL that will be monitored.
    pub url: String,
    /// Path appended to the URL for HTTP, HTTPS and KEYWORD monitors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Type of monitor; falls back to the operator default when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<MonitorType>,
    /// Friendly name of the monitor, defaults to the object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<MonitorSubType>,
    /// Port to monitor for PORT monitors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Keyword matching mode for KEYWORD monitors; NOT_EXISTS when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_type: Option<MonitorKeywordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_value: Option<String>,
    /// Monitoring check interval in seconds (remote default is 300).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    /// Secret in the same namespace holding `username`/`password` for
    /// password protected pages. Never forwarded to the remote API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_auth_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_auth_type: Option<MonitorHttpAuthType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<MonitorHttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<MonitorPostType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_content_type: Option<MonitorPostContentType>,
    /// Data sent with POST, PUT, PATCH, DELETE and OPTIONS requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_value: Option<BTreeMap<String, Value>>,
    /// Custom HTTP headers sent along the monitor request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_http_headers: Option<BTreeMap<String, String>>,
    /// HTTP status codes handled as up or down, e.g. `404:0_200:1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_http_statuses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ssl_errors: Option<bool>,
    /// Alert contacts notified when the monitor goes up or down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_contacts: Option<String>,
    /// Maintenance window IDs for this monitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mwindows: Option<String>,
}

impl MonitorSpec {
    /// Builds a partial monitor spec from the monitor annotations of an
    /// Ingress. Annotation values are strings; integer, object and boolean
    /// fields are coerced before deserializing. An unknown enum token or a
    /// malformed value is a configuration error.
    pub fn from_annotations(values: &BTreeMap<String, String>) -> Result<Self, Error> {
        let mut map = serde_json::Map::new();
        for (key, value) in values {
            let coerced = match key.as_str() {
                "port" | "interval" => {
                    let n: i64 = value.parse().map_err(|_| Error::Annotation {
                        field: key.clone(),
                        reason: format!("{value:?} is not an integer"),
                    })?;
                    Value::from(n)
                }
                "postValue" | "customHttpHeaders" => {
                    serde_json::from_str(value).map_err(|e| Error::Annotation {
                        field: key.clone(),
                        reason: format!("not a JSON object: {e}"),
                    })?
                }
                "ignoreSslErrors" => {
                    Value::Bool(matches!(value.to_lowercase().as_str(), "true" | "1"))
                }
                _ => Value::String(value.clone()),
            };
            map.insert(key.clone(), coerced);
        }
        // The URL is filled in per Ingress rule; a placeholder keeps the
        // spec deserializable when the annotations carry none.
        map.entry("url".to_string())
            .or_insert_with(|| Value::String(String::new()));

        serde_json::from_value(Value::Object(map)).map_err(|e| Error::Annotation {
            field: "monitor".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Translates a monitor spec into the flat request the remote API expects.
///
/// Pure: key conversion to snake case, friendly-name defaulting, enum tokens
/// to remote codes, URL/path concatenation, keyword-type defaulting and
/// dropping of every unset field. The `httpAuthSecret` reference is resolved
/// by the handler and never appears in the payload.
pub fn to_request(name: &str, spec: &MonitorSpec) -> Payload {
    let mut payload = Payload::new();

    insert_value(
        &mut payload,
        "friendly_name",
        spec.friendly_name.clone().unwrap_or_else(|| name.to_string()),
    );
    insert_code(&mut payload, "type", spec.monitor_type.map(MonitorType::code));

    let mut url = spec.url.clone();
    if let (Some(path), Some(MonitorType::Http | MonitorType::Https | MonitorType::Keyword)) =
        (&spec.path, spec.monitor_type)
    {
        url.push_str(path);
    }
    insert_value(&mut payload, "url", url);

    let keyword_type = match (spec.monitor_type, spec.keyword_type) {
        (Some(MonitorType::Keyword), None) => Some(MonitorKeywordType::NotExists),
        (_, declared) => declared,
    };

    insert_code(&mut payload, "sub_type", spec.sub_type.map(MonitorSubType::code));
    insert_opt(&mut payload, "port", spec.port);
    insert_code(&mut payload, "keyword_type", keyword_type.map(MonitorKeywordType::code));
    insert_opt(&mut payload, "keyword_value", spec.keyword_value.clone());
    insert_opt(&mut payload, "interval", spec.interval);
    insert_code(
        &mut payload,
        "http_auth_type",
        spec.http_auth_type.map(MonitorHttpAuthType::code),
    );
    insert_code(&mut payload, "http_method", spec.http_method.map(MonitorHttpMethod::code));
    insert_code(&mut payload, "post_type", spec.post_type.map(MonitorPostType::code));
    insert_code(
        &mut payload,
        "post_content_type",
        spec.post_content_type.map(MonitorPostContentType::code),
    );
    if let Some(post_value) = &spec.post_value {
        insert_value(&mut payload, "post_value", Value::from(serde_json::Map::from_iter(
            post_value.iter().map(|(k, v)| (k.clone(), v.clone())),
        )));
    }
    if let Some(headers) = &spec.custom_http_headers {
        insert_value(&mut payload, "custom_http_headers", Value::from(serde_json::Map::from_iter(
            headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))),
        )));
    }
    insert_opt(&mut payload, "custom_http_statuses", spec.custom_http_statuses.clone());
    insert_opt(&mut payload, "ignore_ssl_errors", spec.ignore_ssl_errors);
    insert_opt(&mut payload, "alert_contacts", spec.alert_contacts.clone());
    insert_opt(&mut payload, "mwindows", spec.mwindows.clone());

    payload
}
