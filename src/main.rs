use std::sync::Arc;

use anyhow::Context as _;
use kube::Client;
use kube_runtime::watcher;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

use uptimerobot_operator::api::{
    AlertContactEndpoint, KubeMonitorStore, MaintenanceWindowEndpoint, MonitorEndpoint,
    SecretResolver, StatusPageEndpoint, UptimeRobot,
};
use uptimerobot_operator::handlers::{
    AlertContactContext, IngressContext, MaintenanceWindowContext, MonitorContext,
    StatusPageContext,
};
use uptimerobot_operator::{Config, Controller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let uptimerobot = Arc::new(UptimeRobot::connect(&config.api_key).await?);
    let client = Client::try_default()
        .await
        .context("failed to build the Kubernetes client")?;
    let secrets = Arc::new(SecretResolver::new(client.clone()));

    let mut controllers = Vec::new();
    controllers.push(tokio::spawn(
        Controller::namespaced_all(
            client.clone(),
            MonitorContext::new(
                MonitorEndpoint::new(Arc::clone(&uptimerobot)),
                Arc::clone(&secrets),
                Arc::clone(&config),
            ),
            watcher::Config::default(),
        )
        .run(),
    ));
    controllers.push(tokio::spawn(
        Controller::namespaced_all(
            client.clone(),
            AlertContactContext::new(AlertContactEndpoint::new(Arc::clone(&uptimerobot))),
            watcher::Config::default(),
        )
        .run(),
    ));
    controllers.push(tokio::spawn(
        Controller::namespaced_all(
            client.clone(),
            MaintenanceWindowContext::new(MaintenanceWindowEndpoint::new(Arc::clone(&uptimerobot))),
            watcher::Config::default(),
        )
        .run(),
    ));
    controllers.push(tokio::spawn(
        Controller::namespaced_all(
            client.clone(),
            StatusPageContext::new(
                StatusPageEndpoint::new(Arc::clone(&uptimerobot)),
                Arc::clone(&secrets),
            ),
            watcher::Config::default(),
        )
        .run(),
    ));
    controllers.push(tokio::spawn(
        Controller::namespaced_all(
            client.clone(),
            IngressContext::new(KubeMonitorStore::new(client.clone()), Arc::clone(&config)),
            watcher::Config::default(),
        )
        .run(),
    ));

    event!(Level::INFO, "operator started");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    event!(Level::INFO, "shutting down");
    for controller in &controllers {
        controller.abort();
    }
    Ok(())
}
