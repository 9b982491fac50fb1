//! Kubernetes-facing collaborators: secret resolution and the Monitor
//! object store used by the Ingress projection.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;

use crate::crds::{MonitorSpec, UptimeRobotMonitor};
use crate::error::Error;

/// Decoded key/value credentials from a namespaced secret reference.
#[async_trait::async_trait]
pub trait SecretSource: Send + Sync {
    async fn resolve(&self, namespace: &str, name: &str)
        -> Result<BTreeMap<String, String>, Error>;
}

pub struct SecretResolver {
    client: Client,
}

impl SecretResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretSource for SecretResolver {
    /// A missing secret surfaces as [`Error::SecretUnresolved`], which the
    /// delivery mechanism retries: the secret may simply not exist yet.
    async fn resolve(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, Error> {
        let api = Api::<Secret>::namespaced(self.client.clone(), namespace);
        let secret = api.get(name).await.map_err(|e| Error::SecretUnresolved {
            namespace: namespace.to_string(),
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let mut values = BTreeMap::new();
        for (key, bytes) in secret.data.unwrap_or_default() {
            let value = String::from_utf8(bytes.0).map_err(|_| Error::SecretUnresolved {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: format!("value of {key:?} is not valid UTF-8"),
            })?;
            values.insert(key, value);
        }
        Ok(values)
    }
}

/// Store operations on `UptimeRobotMonitor` objects, as used by the Ingress
/// projection. Creating or updating an object here only changes desired
/// state; the monitor controller picks the change up independently.
#[async_trait::async_trait]
pub trait MonitorStore: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<UptimeRobotMonitor>, Error>;
    async fn create(
        &self,
        namespace: &str,
        name: &str,
        spec: MonitorSpec,
        owner: OwnerReference,
    ) -> Result<(), Error>;
    async fn update(&self, namespace: &str, name: &str, spec: MonitorSpec) -> Result<(), Error>;
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

pub struct KubeMonitorStore {
    client: Client,
}

impl KubeMonitorStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<UptimeRobotMonitor> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl MonitorStore for KubeMonitorStore {
    async fn list(&self, namespace: &str) -> Result<Vec<UptimeRobotMonitor>, Error> {
        Ok(self.api(namespace).list(&ListParams::default()).await?.items)
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        spec: MonitorSpec,
        owner: OwnerReference,
    ) -> Result<(), Error> {
        let mut monitor = UptimeRobotMonitor::new(name, spec);
        monitor.metadata.namespace = Some(namespace.to_string());
        monitor.metadata.owner_references = Some(vec![owner]);
        self.api(namespace)
            .create(&PostParams::default(), &monitor)
            .await?;
        Ok(())
    }

    async fn update(&self, namespace: &str, name: &str, spec: MonitorSpec) -> Result<(), Error> {
        self.api(namespace)
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(json!({ "spec": spec })),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
