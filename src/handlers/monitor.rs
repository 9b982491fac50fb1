//! Lifecycle handling for `UptimeRobotMonitor` objects.

use std::sync::Arc;

use kube::{Client, ResourceExt};
use tracing::{event, Level};

use super::{format_url, ReconcileHandler};
use crate::api::{RemoteEndpoint, SecretSource};
use crate::config::Config;
use crate::controller::{Context, StatusWrite};
use crate::crds::monitor::{self, MonitorSpec};
use crate::crds::{Payload, UptimeRobotMonitor};
use crate::diff::{self, SpecDiff};
use crate::error::Error;

pub struct MonitorContext<E, S> {
    handler: ReconcileHandler<E>,
    secrets: Arc<S>,
    config: Arc<Config>,
}

impl<E: RemoteEndpoint, S: SecretSource> MonitorContext<E, S> {
    pub fn new(endpoint: E, secrets: Arc<S>, config: Arc<Config>) -> Self {
        Self {
            handler: ReconcileHandler::new(endpoint, "monitor", "monitor_id"),
            secrets,
            config,
        }
    }

    /// Fills in operator defaults and formats the URL. The declared spec in
    /// the cluster is left untouched; defaults only exist in the request.
    fn effective_spec(&self, spec: &MonitorSpec) -> MonitorSpec {
        let mut spec = spec.clone();
        if spec.monitor_type.is_none() {
            event!(
                Level::DEBUG,
                default_type = ?self.config.default_monitor_type,
                "monitor declares no type, applying the operator default"
            );
            spec.monitor_type = Some(self.config.default_monitor_type);
        }
        if spec.custom_http_headers.is_none() && !self.config.default_headers.is_empty() {
            spec.custom_http_headers = Some(self.config.default_headers.clone());
        }
        let host = spec.url.clone();
        format_url(&mut spec, &host);
        spec
    }

    /// Translates the spec and resolves the HTTP auth secret, if any, into
    /// the `http_username`/`http_password` request fields.
    async fn build_request(&self, resource: &UptimeRobotMonitor) -> Result<Payload, Error> {
        let namespace = resource
            .namespace()
            .ok_or(Error::MissingObjectMeta("namespace"))?;
        let spec = self.effective_spec(&resource.spec);
        let mut payload = monitor::to_request(&resource.name_unchecked(), &spec);

        if let Some(secret_name) = &spec.http_auth_secret {
            let credentials = self.secrets.resolve(&namespace, secret_name).await?;
            for (secret_key, request_key) in [("username", "http_username"), ("password", "http_password")] {
                let value = credentials
                    .get(secret_key)
                    .ok_or_else(|| Error::SecretUnresolved {
                        namespace: namespace.clone(),
                        name: secret_name.clone(),
                        reason: format!("missing key {secret_key:?}"),
                    })?;
                payload.insert(request_key.to_string(), value.clone().into());
            }
        }
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl<E, S> Context for MonitorContext<E, S>
where
    E: RemoteEndpoint + 'static,
    S: SecretSource + 'static,
{
    type Resource = UptimeRobotMonitor;
    type Error = Error;

    const FINALIZER_NAME: &'static str = "uptimerobot.twinhats.com/monitor";

    async fn on_create(
        &self,
        _client: Client,
        resource: &Self::Resource,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = self.build_request(resource).await?;
        self.handler.on_create(&payload).await.map(Some)
    }

    async fn on_update(
        &self,
        _client: Client,
        resource: &Self::Resource,
        diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = self.build_request(resource).await?;
        // the remote API cannot change the type of an existing monitor
        let recreate = diff::type_changed(diff);
        self.handler
            .on_update(&payload, resource.status.as_ref(), recreate)
            .await
            .map(Some)
    }

    async fn on_delete(&self, _client: Client, resource: &Self::Resource) -> Result<(), Error> {
        self.handler.on_delete(resource.status.as_ref()).await
    }
}
