//! Thin, typed client for the UptimeRobot v2 REST API.
//!
//! Every call is a form-encoded POST whose JSON answer carries a `stat`
//! flag. Classification of that answer is a pure function so the mapping
//! (ok, `not_found`, everything else) can be tested without a transport.

use std::sync::Arc;

use serde_json::Value;
use tracing::{event, Level};

use crate::crds::{parse_remote_id, Payload};
use crate::error::Error;

const BASE_URL: &str = "https://api.uptimerobot.com/v2";

/// Create/update/delete surface for one remote resource kind. The handlers
/// only ever talk to this trait, which keeps the remote API injectable.
#[async_trait::async_trait]
pub trait RemoteEndpoint: Send + Sync {
    async fn create(&self, payload: &Payload) -> Result<i64, Error>;
    async fn update(&self, id: i64, payload: &Payload) -> Result<i64, Error>;
    async fn delete(&self, id: i64) -> Result<(), Error>;
}

pub struct UptimeRobot {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl UptimeRobot {
    /// Builds a client and verifies the API key against the account details
    /// endpoint, so a bad key fails the process at startup instead of on the
    /// first reconciliation.
    pub async fn connect(api_key: &str) -> Result<Self, Error> {
        let client = Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        };
        client.call("getAccountDetails", &Payload::new(), None).await?;
        event!(Level::INFO, "authenticated against the UptimeRobot API");
        Ok(client)
    }

    async fn call(
        &self,
        method: &str,
        params: &Payload,
        body_key: Option<&str>,
    ) -> Result<Option<i64>, Error> {
        let mut form: Vec<(String, String)> = vec![
            ("api_key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
        ];
        for (key, value) in params {
            form.push((key.clone(), form_value(value)));
        }
        let body: Value = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .form(&form)
            .send()
            .await?
            .json()
            .await?;
        classify(&body, body_key)
    }

    async fn create(&self, method: &str, body_key: &str, payload: &Payload) -> Result<i64, Error> {
        let id = self.call(method, payload, Some(body_key)).await?.ok_or_else(|| {
            Error::MalformedResponse(format!("{method} answered ok without a resource id"))
        })?;
        event!(Level::INFO, id, method, "created remote resource");
        Ok(id)
    }

    async fn update(
        &self,
        method: &str,
        body_key: &str,
        id: i64,
        payload: &Payload,
    ) -> Result<i64, Error> {
        let mut params = payload.clone();
        params.insert("id".to_string(), Value::from(id));
        let id = self.call(method, &params, Some(body_key)).await?.unwrap_or(id);
        event!(Level::INFO, id, method, "updated remote resource");
        Ok(id)
    }

    async fn delete(&self, method: &str, id: i64) -> Result<(), Error> {
        let mut params = Payload::new();
        params.insert("id".to_string(), Value::from(id));
        self.call(method, &params, None).await?;
        event!(Level::INFO, id, method, "deleted remote resource");
        Ok(())
    }

    pub async fn new_monitor(&self, payload: &Payload) -> Result<i64, Error> {
        self.create("newMonitor", "monitor", payload).await
    }

    pub async fn edit_monitor(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
        self.update("editMonitor", "monitor", id, payload).await
    }

    pub async fn delete_monitor(&self, id: i64) -> Result<(), Error> {
        self.delete("deleteMonitor", id).await
    }

    pub async fn new_alert_contact(&self, payload: &Payload) -> Result<i64, Error> {
        self.create("newAlertContact", "alertcontact", payload).await
    }

    pub async fn edit_alert_contact(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
        self.update("editAlertContact", "alert_contact", id, payload).await
    }

    pub async fn delete_alert_contact(&self, id: i64) -> Result<(), Error> {
        self.delete("deleteAlertContact", id).await
    }

    pub async fn new_m_window(&self, payload: &Payload) -> Result<i64, Error> {
        self.create("newMWindow", "mwindow", payload).await
    }

    pub async fn edit_m_window(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
        self.update("editMWindow", "mwindow", id, payload).await
    }

    pub async fn delete_m_window(&self, id: i64) -> Result<(), Error> {
        self.delete("deleteMWindow", id).await
    }

    pub async fn new_psp(&self, payload: &Payload) -> Result<i64, Error> {
        // The v2 API requires a page type and only supports type 1.
        let mut params = payload.clone();
        params.insert("type".to_string(), Value::from(1));
        self.create("newPSP", "psp", &params).await
    }

    pub async fn edit_psp(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
        self.update("editPSP", "psp", id, payload).await
    }

    pub async fn delete_psp(&self, id: i64) -> Result<(), Error> {
        self.delete("deletePSP", id).await
    }
}

/// Classifies a textual API response: `ok` yields the resource id embedded
/// under `body_key` (absent for deletes and the account probe), `not_found`
/// becomes the recoverable [`Error::RemoteNotFound`], anything else is a
/// fatal [`Error::RemoteApi`].
pub(crate) fn classify(body: &Value, body_key: Option<&str>) -> Result<Option<i64>, Error> {
    match body.get("stat").and_then(Value::as_str) {
        Some("ok") => Ok(body_key
            .and_then(|key| body.get(key))
            .and_then(|resource| resource.get("id"))
            .and_then(parse_remote_id)),
        Some("fail") => {
            let error = body.get("error").cloned().unwrap_or(Value::Null);
            let kind = error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            if kind == "not_found" {
                return Err(Error::RemoteNotFound);
            }
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Err(Error::RemoteApi { kind, message })
        }
        _ => Err(Error::MalformedResponse(format!(
            "response carries no stat flag: {body}"
        ))),
    }
}

/// Form parameters are flat strings; objects such as custom HTTP headers
/// are sent JSON-encoded.
fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

macro_rules! endpoint {
    ($name:ident, $create:ident, $edit:ident, $delete:ident) => {
        pub struct $name(Arc<UptimeRobot>);

        impl $name {
            pub fn new(client: Arc<UptimeRobot>) -> Self {
                Self(client)
            }
        }

        #[async_trait::async_trait]
        impl RemoteEndpoint for $name {
            async fn create(&self, payload: &Payload) -> Result<i64, Error> {
                self.0.$create(payload).await
            }

            async fn update(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
                self.0.$edit(id, payload).await
            }

            async fn delete(&self, id: i64) -> Result<(), Error> {
                self.0.$delete(id).await
            }
        }
    };
}

endpoint!(MonitorEndpoint, new_monitor, edit_monitor, delete_monitor);
endpoint!(
    AlertContactEndpoint,
    new_alert_contact,
    edit_alert_contact,
    delete_alert_contact
);
endpoint!(
    MaintenanceWindowEndpoint,
    new_m_window,
    edit_m_window,
    delete_m_window
);
endpoint!(StatusPageEndpoint, new_psp, edit_psp, delete_psp);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_response_yields_numeric_id() {
        let body = json!({"stat": "ok", "monitor": {"id": 777810874}});
        assert_eq!(classify(&body, Some("monitor")).unwrap(), Some(777810874));
    }

    #[test]
    fn ok_response_yields_string_id() {
        let body = json!({"stat": "ok", "alertcontact": {"id": "0993765"}});
        assert_eq!(classify(&body, Some("alertcontact")).unwrap(), Some(993765));
    }

    #[test]
    fn ok_response_without_body_key_yields_none() {
        let body = json!({"stat": "ok", "monitor": {"id": 777810874}});
        assert_eq!(classify(&body, None).unwrap(), None);
    }

    #[test]
    fn not_found_is_recoverable() {
        let body = json!({"stat": "fail", "error": {"type": "not_found"}});
        assert!(matches!(
            classify(&body, Some("monitor")),
            Err(Error::RemoteNotFound)
        ));
    }

    #[test]
    fn other_failures_carry_kind_and_message() {
        let body = json!({
            "stat": "fail",
            "error": {"type": "invalid_parameter", "message": "url is missing"}
        });
        match classify(&body, Some("monitor")) {
            Err(Error::RemoteApi { kind, message }) => {
                assert_eq!(kind, "invalid_parameter");
                assert_eq!(message, "url is missing");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn missing_stat_flag_is_malformed() {
        let body = json!({"monitor": {"id": 1}});
        assert!(matches!(
            classify(&body, Some("monitor")),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn form_values_are_flat_strings() {
        assert_eq!(form_value(&json!("plain")), "plain");
        assert_eq!(form_value(&json!(true)), "1");
        assert_eq!(form_value(&json!(300)), "300");
        assert_eq!(form_value(&json!({"X-Env": "prod"})), r#"{"X-Env":"prod"}"#);
    }
}
