//! Lifecycle handling for `AlertContact` objects.

use kube::{Client, ResourceExt};

use super::ReconcileHandler;
use crate::api::RemoteEndpoint;
use crate::controller::{Context, StatusWrite};
use crate::crds::alert_contact::{self, AlertContactType};
use crate::crds::AlertContact;
use crate::diff::{self, SpecDiff};
use crate::error::Error;

pub struct AlertContactContext<E> {
    handler: ReconcileHandler<E>,
}

impl<E: RemoteEndpoint> AlertContactContext<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            handler: ReconcileHandler::new(endpoint, "alert contact", "ac_id"),
        }
    }
}

#[async_trait::async_trait]
impl<E: RemoteEndpoint + 'static> Context for AlertContactContext<E> {
    type Resource = AlertContact;
    type Error = Error;

    const FINALIZER_NAME: &'static str = "uptimerobot.twinhats.com/alert-contact";

    async fn on_create(
        &self,
        _client: Client,
        resource: &Self::Resource,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = alert_contact::to_request(&resource.name_unchecked(), &resource.spec);
        self.handler.on_create(&payload).await.map(Some)
    }

    async fn on_update(
        &self,
        _client: Client,
        resource: &Self::Resource,
        diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = alert_contact::to_request(&resource.name_unchecked(), &resource.spec);
        // the remote edit call only works for WEB_HOOK contacts
        let recreate =
            diff::type_changed(diff) || resource.spec.contact_type != AlertContactType::WebHook;
        self.handler
            .on_update(&payload, resource.status.as_ref(), recreate)
            .await
            .map(Some)
    }

    async fn on_delete(&self, _client: Client, resource: &Self::Resource) -> Result<(), Error> {
        self.handler.on_delete(resource.status.as_ref()).await
    }
}
