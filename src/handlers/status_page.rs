//! Lifecycle handling for `PublicStatusPage` objects.

use std::sync::Arc;

use kube::{Client, ResourceExt};

use super::ReconcileHandler;
use crate::api::{RemoteEndpoint, SecretSource};
use crate::controller::{Context, StatusWrite};
use crate::crds::status_page;
use crate::crds::{Payload, PublicStatusPage};
use crate::diff::SpecDiff;
use crate::error::Error;

pub struct StatusPageContext<E, S> {
    handler: ReconcileHandler<E>,
    secrets: Arc<S>,
}

impl<E: RemoteEndpoint, S: SecretSource> StatusPageContext<E, S> {
    pub fn new(endpoint: E, secrets: Arc<S>) -> Self {
        Self {
            handler: ReconcileHandler::new(endpoint, "status page", "psp_id"),
            secrets,
        }
    }

    /// Translates the spec and resolves the page password from its secret
    /// reference. A declared `passwordSecret` wins over a plain `password`.
    async fn build_request(&self, resource: &PublicStatusPage) -> Result<Payload, Error> {
        let mut payload = status_page::to_request(&resource.name_unchecked(), &resource.spec);
        if let Some(secret_name) = &resource.spec.password_secret {
            let namespace = resource
                .namespace()
                .ok_or(Error::MissingObjectMeta("namespace"))?;
            let values = self.secrets.resolve(&namespace, secret_name).await?;
            let password = values.get("password").ok_or_else(|| Error::SecretUnresolved {
                namespace,
                name: secret_name.clone(),
                reason: "missing key \"password\"".to_string(),
            })?;
            payload.insert("password".to_string(), password.clone().into());
        }
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl<E, S> Context for StatusPageContext<E, S>
where
    E: RemoteEndpoint + 'static,
    S: SecretSource + 'static,
{
    type Resource = PublicStatusPage;
    type Error = Error;

    const FINALIZER_NAME: &'static str = "uptimerobot.twinhats.com/public-status-page";

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
        _diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = self.build_request(resource).await?;
        // status pages have no type to speak of, edits always work in place
        self.handler
            .on_update(&payload, resource.status.as_ref(), false)
            .await
            .map(Some)
    }

    async fn on_delete(&self, _client: Client, resource: &Self::Resource) -> Result<(), Error> {
        self.handler.on_delete(resource.status.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::PublicStatusPageSpec;
    use crate::handlers::testing::{FakeEndpoint, FakeSecrets};
    use serde_json::json;

    fn resource(password_secret: Option<&str>) -> PublicStatusPage {
        let mut page = PublicStatusPage::new(
            "status",
            PublicStatusPageSpec {
                monitors: "0".into(),
                friendly_name: None,
                custom_domain: Some("status.example.com".into()),
                password: None,
                password_secret: password_secret.map(str::to_string),
                sort: None,
                status: None,
                hide_url_links: None,
            },
        );
        page.metadata.namespace = Some("default".into());
        page
    }

    #[tokio::test]
    async fn password_secret_resolves_into_the_request() {
        let endpoint = FakeEndpoint::new(1);
        let secrets = FakeSecrets::with("psp-password", &[("password", "hunter2")]);
        let context = StatusPageContext::new(&endpoint, Arc::new(secrets));
        let payload = context
            .build_request(&resource(Some("psp-password")))
            .await
            .unwrap();
        assert_eq!(payload.get("password"), Some(&json!("hunter2")));
        assert!(!payload.contains_key("password_secret"));
    }

    #[tokio::test]
    async fn missing_password_key_is_an_error() {
        let endpoint = FakeEndpoint::new(1);
        let secrets = FakeSecrets::with("psp-password", &[("pass", "oops")]);
        let context = StatusPageContext::new(&endpoint, Arc::new(secrets));
        let result = context.build_request(&resource(Some("psp-password"))).await;
        assert!(matches!(result, Err(Error::SecretUnresolved { .. })));
    }

    #[tokio::test]
    async fn pages_without_secret_pass_through() {
        let endpoint = FakeEndpoint::new(1);
        let context = StatusPageContext::new(&endpoint, Arc::new(FakeSecrets::default()));
        let payload = context.build_request(&resource(None)).await.unwrap();
        assert!(!payload.contains_key("password"));
        assert_eq!(payload.get("monitors"), Some(&json!("0")));
    }
}
