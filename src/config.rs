use std::collections::BTreeMap;
use std::env;

use crate::crds::monitor::MonitorType;
use crate::error::Error;

/// Operator configuration, read once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Skip projecting Ingress objects onto monitors entirely.
    pub disable_ingress_handling: bool,
    /// Domain suffixes whose Ingress rules are never projected.
    pub excluded_domains: Vec<String>,
    /// Custom HTTP headers applied to every monitor that declares none.
    pub default_headers: BTreeMap<String, String>,
    /// Monitor type used when a monitor or annotation set declares none.
    pub default_monitor_type: MonitorType,
    /// UptimeRobot account API key.
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let api_key = env::var("UPTIMEROBOT_API_KEY").map_err(|_| {
            Error::Config("required environment variable UPTIMEROBOT_API_KEY has not been provided".into())
        })?;

        let disable_ingress_handling = env::var("URO_DISABLE_INGRESS_HANDLING")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let excluded_domains = env::var("URO_EXCLUDED_DOMAINS")
            .unwrap_or_else(|_| "default.local".to_string())
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        let default_headers: BTreeMap<String, String> =
            serde_json::from_str(&env::var("URO_DEFAULT_HEADERS").unwrap_or_else(|_| "{}".to_string()))
                .map_err(|e| Error::Config(format!("URO_DEFAULT_HEADERS is not a JSON object: {e}")))?;

        let default_type_token =
            env::var("URO_DEFAULT_MONITOR_TYPE").unwrap_or_else(|_| "HTTPS".to_string());
        let default_monitor_type: MonitorType =
            serde_json::from_value(serde_json::Value::String(default_type_token.clone())).map_err(
                |_| Error::Config(format!("unknown URO_DEFAULT_MONITOR_TYPE {default_type_token:?}")),
            )?;

        Ok(Self {
            disable_ingress_handling,
            excluded_domains,
            default_headers,
            default_monitor_type,
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_parse() {
        let headers: BTreeMap<String, String> =
            serde_json::from_str(r#"{"X-Env":"prod"}"#).unwrap();
        assert_eq!(headers.get("X-Env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn default_monitor_type_token_resolves() {
        let parsed: MonitorType =
            serde_json::from_value(serde_json::Value::String("HTTPS".into())).unwrap();
        assert_eq!(parsed, MonitorType::Https);
    }
}
