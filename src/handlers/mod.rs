//! Lifecycle handlers: the generic remote-resource state machine and one
//! [`crate::controller::Context`] implementation per watched kind.

use serde_json::Value;
use tracing::{event, Level};

use crate::api::RemoteEndpoint;
use crate::controller::{StatusWrite, CREATE_EVENT, UPDATE_EVENT};
use crate::crds::monitor::MonitorType;
use crate::crds::{parse_remote_id, MonitorSpec, Payload, ReconcileStatus};
use crate::error::Error;

pub mod alert_contact;
pub mod ingress;
pub mod maintenance_window;
pub mod monitor;
pub mod status_page;

pub use alert_contact::AlertContactContext;
pub use ingress::IngressContext;
pub use maintenance_window::MaintenanceWindowContext;
pub use monitor::MonitorContext;
pub use status_page::StatusPageContext;

/// Drives the remote lifecycle of one resource kind. The remote identifier
/// lives exclusively in the object status, keyed by the event that wrote
/// it, so every operation here resolves it from there and hands the new
/// value back as a status write.
pub struct ReconcileHandler<E> {
    endpoint: E,
    kind: &'static str,
    id_key: &'static str,
}

impl<E: RemoteEndpoint> ReconcileHandler<E> {
    pub fn new(endpoint: E, kind: &'static str, id_key: &'static str) -> Self {
        Self {
            endpoint,
            kind,
            id_key,
        }
    }

    /// Resolves the remote identifier from the object status, preferring
    /// the `update` entry over the `create` entry: the most recent
    /// successful event always wins.
    pub fn get_identifier(&self, status: Option<&ReconcileStatus>) -> Result<i64, Error> {
        let status = status.ok_or(Error::IdentifierUnresolved(self.id_key))?;
        for event_name in [UPDATE_EVENT, CREATE_EVENT] {
            if let Some(value) = status.event(event_name).and_then(|write| write.get(self.id_key)) {
                return parse_remote_id(value).ok_or(Error::IdentifierUnresolved(self.id_key));
            }
        }
        Err(Error::IdentifierUnresolved(self.id_key))
    }

    pub async fn on_create(&self, payload: &Payload) -> Result<StatusWrite, Error> {
        let id = self.endpoint.create(payload).await?;
        Ok(self.outcome(id))
    }

    /// Applies a spec change to the remote resource. When `recreate` is
    /// set the old resource is deleted and a new one created (the remote
    /// API rejects edits of the `type` field); otherwise the resource is
    /// edited in place with `type` stripped from the payload.
    pub async fn on_update(
        &self,
        payload: &Payload,
        status: Option<&ReconcileStatus>,
        recreate: bool,
    ) -> Result<StatusWrite, Error> {
        let id = self.get_identifier(status)?;
        if recreate {
            event!(
                Level::INFO,
                kind = self.kind,
                id,
                "type changed or not editable in place, deleting and recreating"
            );
            self.delete_remote(id).await?;
            let new_id = self.endpoint.create(payload).await?;
            return Ok(self.outcome(new_id));
        }

        let mut edit = payload.clone();
        // the remote edit call rejects the type parameter
        edit.remove("type");
        match self.endpoint.update(id, &edit).await {
            Ok(new_id) => Ok(self.outcome(new_id)),
            Err(Error::RemoteNotFound) => {
                event!(
                    Level::WARN,
                    kind = self.kind,
                    id,
                    "remote resource vanished, treating update as a no-op"
                );
                Ok(self.outcome(id))
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes the remote resource. A remote `not_found` answer means the
    /// desired end state is already achieved and counts as success.
    pub async fn on_delete(&self, status: Option<&ReconcileStatus>) -> Result<(), Error> {
        let id = self.get_identifier(status)?;
        self.delete_remote(id).await
    }

    async fn delete_remote(&self, id: i64) -> Result<(), Error> {
        match self.endpoint.delete(id).await {
            Ok(()) => Ok(()),
            Err(Error::RemoteNotFound) => {
                event!(
                    Level::INFO,
                    kind = self.kind,
                    id,
                    "remote resource already gone"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn outcome(&self, id: i64) -> StatusWrite {
        let mut write = StatusWrite::new();
        write.insert(self.id_key.to_string(), Value::from(id));
        write
    }
}

/// Prefixes a monitor URL with a scheme matching its type, unless the URL
/// already carries one. PING and PORT monitors take the bare host.
pub fn format_url(spec: &mut MonitorSpec, host: &str) {
    if spec.url.contains("://") {
        return;
    }
    spec.url = match spec.monitor_type {
        Some(MonitorType::Http) => format!("http://{host}"),
        Some(MonitorType::Https | MonitorType::Keyword) => format!("https://{host}"),
        _ => host.to_string(),
    };
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::api::SecretSource;

    #[derive(Clone, Debug, PartialEq)]
    pub enum RemoteCall {
        Create(Payload),
        Update(i64, Payload),
        Delete(i64),
    }

    /// In-memory stand-in for one remote resource kind.
    pub struct FakeEndpoint {
        pub calls: Mutex<Vec<RemoteCall>>,
        next_id: Mutex<i64>,
        pub missing: Mutex<bool>,
    }

    impl FakeEndpoint {
        pub fn new(first_id: i64) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_id: Mutex::new(first_id),
                missing: Mutex::new(false),
            }
        }

        pub fn calls(&self) -> Vec<RemoteCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RemoteEndpoint for &FakeEndpoint {
        async fn create(&self, payload: &Payload) -> Result<i64, Error> {
            self.calls.lock().unwrap().push(RemoteCall::Create(payload.clone()));
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            Ok(id)
        }

        async fn update(&self, id: i64, payload: &Payload) -> Result<i64, Error> {
            if *self.missing.lock().unwrap() {
                return Err(Error::RemoteNotFound);
            }
            self.calls.lock().unwrap().push(RemoteCall::Update(id, payload.clone()));
            Ok(id)
        }

        async fn delete(&self, id: i64) -> Result<(), Error> {
            if *self.missing.lock().unwrap() {
                return Err(Error::RemoteNotFound);
            }
            self.calls.lock().unwrap().push(RemoteCall::Delete(id));
            Ok(())
        }
    }

    /// Secret source backed by a fixed map of secrets.
    #[derive(Default)]
    pub struct FakeSecrets {
        pub secrets: BTreeMap<String, BTreeMap<String, String>>,
    }

    impl FakeSecrets {
        pub fn with(name: &str, entries: &[(&str, &str)]) -> Self {
            let mut secrets = BTreeMap::new();
            secrets.insert(
                name.to_string(),
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            Self { secrets }
        }
    }

    #[async_trait::async_trait]
    impl SecretSource for FakeSecrets {
        async fn resolve(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<BTreeMap<String, String>, Error> {
            self.secrets
                .get(name)
                .cloned()
                .ok_or_else(|| Error::SecretUnresolved {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    reason: "not found".to_string(),
                })
        }
    }

    pub fn status_with(entries: &[(&str, &str, i64)]) -> ReconcileStatus {
        let mut status = ReconcileStatus::default();
        for (event_name, id_key, id) in entries {
            status
                .events
                .entry(event_name.to_string())
                .or_default()
                .insert(id_key.to_string(), Value::from(*id));
        }
        status
    }
}
