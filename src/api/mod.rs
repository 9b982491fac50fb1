//! External call surfaces: the UptimeRobot REST client and the Kubernetes
//! object store wrappers consumed by the handlers.

pub mod k8s;
pub mod uptimerobot;

pub use k8s::{KubeMonitorStore, MonitorStore, SecretResolver, SecretSource};
pub use uptimerobot::{
    AlertContactEndpoint, MaintenanceWindowEndpoint, MonitorEndpoint, RemoteEndpoint,
    StatusPageEndpoint, UptimeRobot,
};
