//! Lifecycle handling for `MaintenanceWindow` objects.

use kube::{Client, ResourceExt};

use super::ReconcileHandler;
use crate::api::RemoteEndpoint;
use crate::controller::{Context, StatusWrite};
use crate::crds::maintenance_window;
use crate::crds::MaintenanceWindow;
use crate::diff::{self, SpecDiff};
use crate::error::Error;

pub struct MaintenanceWindowContext<E> {
    handler: ReconcileHandler<E>,
}

impl<E: RemoteEndpoint> MaintenanceWindowContext<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            handler: ReconcileHandler::new(endpoint, "maintenance window", "mw_id"),
        }
    }
}

#[async_trait::async_trait]
impl<E: RemoteEndpoint + 'static> Context for MaintenanceWindowContext<E> {
    type Resource = MaintenanceWindow;
    type Error = Error;

    const FINALIZER_NAME: &'static str = "uptimerobot.twinhats.com/maintenance-window";

    async fn on_create(
        &self,
        _client: Client,
        resource: &Self::Resource,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = maintenance_window::to_request(&resource.name_unchecked(), &resource.spec);
        self.handler.on_create(&payload).await.map(Some)
    }

    async fn on_update(
        &self,
        _client: Client,
        resource: &Self::Resource,
        diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Error> {
        let payload = maintenance_window::to_request(&resource.name_unchecked(), &resource.spec);
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
