//! Projects Ingress objects onto `UptimeRobotMonitor` objects.
//!
//! The projection never talks to the remote API itself: it only maintains
//! the set of monitor objects owned by an Ingress, and the monitor
//! controller reconciles those against UptimeRobot on its own.

use std::fmt::Write as _;
use std::sync::Arc;

use k8s_openapi::api::networking::v1::{Ingress, IngressSpec};
use kube::{Client, Resource, ResourceExt};
use sha2::{Digest, Sha256};
use tracing::{event, Level};

use super::format_url;
use crate::api::MonitorStore;
use crate::config::Config;
use crate::controller::{Context, StatusWrite};
use crate::crds::monitor::MonitorSpec;
use crate::crds::{UptimeRobotMonitor, GROUP};
use crate::diff::SpecDiff;
use crate::error::Error;

pub struct IngressContext<S> {
    store: S,
    config: Arc<Config>,
}

/// One Ingress rule that should be backed by a monitor.
struct RuleTarget {
    monitor_name: String,
    host: String,
}

impl<S: MonitorStore> IngressContext<S> {
    pub fn new(store: S, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Brings the set of owned monitor objects in line with the rules of
    /// the Ingress: obsolete monitors are deleted, surviving ones updated
    /// and missing ones created with an owner reference back to the
    /// Ingress. Safe to run repeatedly.
    async fn project(&self, ingress: &Ingress) -> Result<(), Error> {
        if self.config.disable_ingress_handling {
            event!(Level::DEBUG, "handling of Ingress objects is disabled");
            return Ok(());
        }

        let ingress_name = ingress.name_unchecked();
        let namespace = ingress
            .namespace()
            .ok_or(Error::MissingObjectMeta("namespace"))?;

        let mut base = MonitorSpec::from_annotations(&monitor_annotations(ingress))?;
        if base.monitor_type.is_none() {
            base.monitor_type = Some(self.config.default_monitor_type);
        }

        let targets = self.rule_targets(&ingress_name, ingress.spec.as_ref());

        let owned: Vec<UptimeRobotMonitor> = self
            .store
            .list(&namespace)
            .await?
            .into_iter()
            .filter(|monitor| owned_by(monitor, &ingress_name))
            .collect();

        for monitor in &owned {
            let name = monitor.name_unchecked();
            if !targets.iter().any(|target| target.monitor_name == name) {
                self.store.delete(&namespace, &name).await?;
                event!(
                    Level::INFO,
                    monitor = %name,
                    ingress = %ingress_name,
                    "deleted monitor object for a removed Ingress rule"
                );
            }
        }

        let owner = ingress
            .controller_owner_ref(&())
            .ok_or(Error::MissingObjectMeta("uid"))?;
        for target in &targets {
            // every rule gets its own spec so hosts never bleed into each other;
            // a schemed url annotation wins over the host-derived url
            let mut spec = base.clone();
            format_url(&mut spec, &target.host);

            if owned
                .iter()
                .any(|monitor| monitor.name_unchecked() == target.monitor_name)
            {
                self.store
                    .update(&namespace, &target.monitor_name, spec)
                    .await?;
                event!(
                    Level::INFO,
                    monitor = %target.monitor_name,
                    ingress = %ingress_name,
                    "updated monitor object"
                );
            } else {
                self.store
                    .create(&namespace, &target.monitor_name, spec, owner.clone())
                    .await?;
                event!(
                    Level::INFO,
                    monitor = %target.monitor_name,
                    ingress = %ingress_name,
                    "created monitor object"
                );
            }
        }
        Ok(())
    }

    /// Selects the monitorable rules of an Ingress. Wildcard hosts,
    /// unqualified hosts and hosts under an excluded domain are skipped.
    fn rule_targets(&self, ingress_name: &str, spec: Option<&IngressSpec>) -> Vec<RuleTarget> {
        let mut targets = Vec::new();
        for rule in spec.and_then(|s| s.rules.as_ref()).into_iter().flatten() {
            let Some(host) = &rule.host else { continue };
            if host.starts_with('*')
                || !host.contains('.')
                || self
                    .config
                    .excluded_domains
                    .iter()
                    .any(|domain| host.ends_with(domain))
            {
                event!(Level::INFO, host = %host, "skipping non-monitorable Ingress rule");
                continue;
            }
            let first_path = rule.http.as_ref().and_then(|http| http.paths.first());
            let path = first_path.and_then(|p| p.path.as_deref());
            let port = first_path
                .and_then(|p| p.backend.service.as_ref())
                .and_then(|service| service.port.as_ref())
                .and_then(|port| port.number);
            targets.push(RuleTarget {
                monitor_name: derived_monitor_name(ingress_name, host, path, port),
                host: host.clone(),
            });
        }
        targets
    }
}

/// Monitor annotations of an Ingress, stripped of their prefix, e.g.
/// `uptimerobot.twinhats.com/monitor.interval` becomes `interval`.
fn monitor_annotations(ingress: &Ingress) -> std::collections::BTreeMap<String, String> {
    let prefix = format!("{GROUP}/monitor.");
    ingress
        .annotations()
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(&prefix)
                .map(|field| (field.to_string(), value.clone()))
        })
        .collect()
}

/// Whether a monitor object is controlled by the named Ingress.
fn owned_by(monitor: &UptimeRobotMonitor, ingress_name: &str) -> bool {
    monitor
        .owner_references()
        .first()
        .is_some_and(|owner| owner.name == ingress_name)
}

/// Stable name for the monitor backing one Ingress rule: the lowercased
/// host plus a short digest of everything that identifies the rule, so a
/// path or port change yields a fresh object while reprojections of an
/// unchanged rule find the existing one.
pub fn derived_monitor_name(
    ingress_name: &str,
    host: &str,
    path: Option<&str>,
    port: Option<i32>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ingress_name.as_bytes());
    hasher.update(host.as_bytes());
    hasher.update(path.unwrap_or_default().as_bytes());
    if let Some(port) = port {
        hasher.update(port.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    let mut name = host.to_lowercase();
    name.push('-');
    for byte in &digest[..4] {
        let _ = write!(name, "{byte:02x}");
    }
    name
}

#[async_trait::async_trait]
impl<S: MonitorStore + 'static> Context for IngressContext<S> {
    type Resource = Ingress;
    type Error = Error;

    const FINALIZER_NAME: &'static str = "uptimerobot.twinhats.com/ingress-monitors";

    async fn on_create(
        &self,
        _client: Client,
        resource: &Self::Resource,
    ) -> Result<Option<StatusWrite>, Error> {
        self.project(resource).await?;
        Ok(None)
    }

    async fn on_update(
        &self,
        _client: Client,
        resource: &Self::Resource,
        _diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Error> {
        self.project(resource).await?;
        Ok(None)
    }

    /// Owned monitor objects carry an owner reference back to the Ingress,
    /// so garbage collection removes them without any work here.
    async fn on_delete(&self, _client: Client, _resource: &Self::Resource) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::crds::monitor::MonitorType;
    use k8s_openapi::api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressServiceBackend,
        ServiceBackendPort,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    #[derive(Default)]
    struct FakeStore {
        monitors: Mutex<BTreeMap<String, UptimeRobotMonitor>>,
    }

    impl FakeStore {
        fn names(&self) -> Vec<String> {
            self.monitors.lock().unwrap().keys().cloned().collect()
        }

        fn spec(&self, name: &str) -> MonitorSpec {
            self.monitors.lock().unwrap().get(name).unwrap().spec.clone()
        }
    }

    #[async_trait::async_trait]
    impl MonitorStore for &FakeStore {
        async fn list(&self, _namespace: &str) -> Result<Vec<UptimeRobotMonitor>, Error> {
            Ok(self.monitors.lock().unwrap().values().cloned().collect())
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
            self.monitors
                .lock()
                .unwrap()
                .insert(name.to_string(), monitor);
            Ok(())
        }

        async fn update(
            &self,
            _namespace: &str,
            name: &str,
            spec: MonitorSpec,
        ) -> Result<(), Error> {
            self.monitors.lock().unwrap().get_mut(name).unwrap().spec = spec;
            Ok(())
        }

        async fn delete(&self, _namespace: &str, name: &str) -> Result<(), Error> {
            self.monitors.lock().unwrap().remove(name);
            Ok(())
        }
    }

    fn config() -> Arc<Config> {
        Arc::new(Config {
            disable_ingress_handling: false,
            excluded_domains: vec!["default.local".into()],
            default_headers: BTreeMap::new(),
            default_monitor_type: MonitorType::Http,
            api_key: "k".into(),
        })
    }

    fn rule(host: &str) -> IngressRule {
        IngressRule {
            host: Some(host.to_string()),
            http: None,
        }
    }

    fn rule_with_path(host: &str, path: &str, port: i32) -> IngressRule {
        IngressRule {
            host: Some(host.to_string()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some(path.to_string()),
                    path_type: "Prefix".to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: "svc".to_string(),
                            port: Some(ServiceBackendPort {
                                number: Some(port),
                                ..Default::default()
                            }),
                        }),
                        ..Default::default()
                    },
                }],
            }),
        }
    }

    fn ingress(name: &str, rules: Vec<IngressRule>, annotations: &[(&str, &str)]) -> Ingress {
        let mut ingress = Ingress::default();
        ingress.metadata.name = Some(name.to_string());
        ingress.metadata.namespace = Some("default".to_string());
        ingress.metadata.uid = Some("c2c8e0a3".to_string());
        ingress.metadata.annotations = Some(
            annotations
                .iter()
                .map(|(k, v)| (format!("{GROUP}/monitor.{k}"), v.to_string()))
                .collect(),
        );
        ingress.spec = Some(IngressSpec {
            rules: Some(rules),
            ..Default::default()
        });
        ingress
    }

    #[test]
    fn derived_names_are_stable_and_rule_sensitive() {
        let a = derived_monitor_name("web", "Foo.com", None, None);
        let b = derived_monitor_name("web", "Foo.com", None, None);
        assert_eq!(a, b);
        assert!(a.starts_with("foo.com-"));
        assert_eq!(a.len(), "foo.com-".len() + 8);

        assert_ne!(a, derived_monitor_name("web", "Foo.com", Some("/health"), None));
        assert_ne!(a, derived_monitor_name("web", "Foo.com", None, Some(8080)));
        assert_ne!(a, derived_monitor_name("other", "Foo.com", None, None));
    }

    #[tokio::test]
    async fn plain_rule_projects_an_http_monitor() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress("web", vec![rule("foo.com")], &[]))
            .await
            .unwrap();

        let names = store.names();
        assert_eq!(names.len(), 1);
        let spec = store.spec(&names[0]);
        assert_eq!(spec.url, "http://foo.com");
        assert_eq!(spec.monitor_type, Some(MonitorType::Http));
        let monitors = store.monitors.lock().unwrap();
        let owner = &monitors[&names[0]].owner_references()[0];
        assert_eq!(owner.name, "web");
        assert_eq!(owner.kind, "Ingress");
    }

    #[tokio::test]
    async fn wildcard_unqualified_and_excluded_hosts_are_skipped() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress(
                "web",
                vec![
                    rule("*.foo.com"),
                    rule("intranet"),
                    rule("shop.default.local"),
                    rule("foo.com"),
                ],
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(store.names().len(), 1);
        assert!(store.names()[0].starts_with("foo.com-"));
    }

    #[tokio::test]
    async fn annotations_shape_every_projected_monitor() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress(
                "web",
                vec![rule("foo.com"), rule("bar.com")],
                &[("type", "HTTPS"), ("interval", "60")],
            ))
            .await
            .unwrap();

        let names = store.names();
        assert_eq!(names.len(), 2);
        for name in &names {
            let spec = store.spec(name);
            assert_eq!(spec.monitor_type, Some(MonitorType::Https));
            assert_eq!(spec.interval, Some(60));
        }
        // each monitor points at its own host
        let urls: Vec<String> = names.iter().map(|n| store.spec(n).url).collect();
        assert!(urls.contains(&"https://foo.com".to_string()));
        assert!(urls.contains(&"https://bar.com".to_string()));
    }

    #[tokio::test]
    async fn schemed_url_annotation_wins_over_the_rule_host() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress(
                "web",
                vec![rule("foo.com")],
                &[("type", "HTTP"), ("url", "https://custom.example/health")],
            ))
            .await
            .unwrap();
        let names = store.names();
        assert_eq!(names.len(), 1);
        assert_eq!(store.spec(&names[0]).url, "https://custom.example/health");
    }

    #[tokio::test]
    async fn unschemed_url_annotation_falls_back_to_the_rule_host() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress(
                "web",
                vec![rule("foo.com")],
                &[("url", "custom.example")],
            ))
            .await
            .unwrap();
        let names = store.names();
        assert_eq!(store.spec(&names[0]).url, "http://foo.com");
    }

    #[tokio::test]
    async fn removed_rules_delete_their_monitors() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress("web", vec![rule("foo.com"), rule("bar.com")], &[]))
            .await
            .unwrap();
        assert_eq!(store.names().len(), 2);

        context
            .project(&ingress("web", vec![rule("foo.com")], &[]))
            .await
            .unwrap();
        let names = store.names();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("foo.com-"));
    }

    #[tokio::test]
    async fn path_and_port_changes_roll_the_monitor_over() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress("web", vec![rule_with_path("foo.com", "/", 80)], &[]))
            .await
            .unwrap();
        let before = store.names();

        context
            .project(&ingress(
                "web",
                vec![rule_with_path("foo.com", "/health", 8080)],
                &[],
            ))
            .await
            .unwrap();
        let after = store.names();
        assert_eq!(after.len(), 1);
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn reprojection_is_idempotent() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        let ingress = ingress("web", vec![rule("foo.com")], &[]);
        context.project(&ingress).await.unwrap();
        let first = store.names();
        context.project(&ingress).await.unwrap();
        assert_eq!(store.names(), first);
    }

    #[tokio::test]
    async fn foreign_monitors_are_left_alone() {
        let store = FakeStore::default();
        {
            let spec: MonitorSpec =
                serde_json::from_value(serde_json::json!({"url": "https://other.com"})).unwrap();
            let mut foreign = UptimeRobotMonitor::new("hand-rolled", spec);
            foreign.metadata.namespace = Some("default".into());
            store
                .monitors
                .lock()
                .unwrap()
                .insert("hand-rolled".into(), foreign);
        }
        let context = IngressContext::new(&store, config());
        context
            .project(&ingress("web", vec![rule("foo.com")], &[]))
            .await
            .unwrap();
        assert!(store.names().contains(&"hand-rolled".to_string()));
        assert_eq!(store.names().len(), 2);
    }

    #[tokio::test]
    async fn disabled_projection_does_nothing() {
        let store = FakeStore::default();
        let mut config = (*config()).clone();
        config.disable_ingress_handling = true;
        let context = IngressContext::new(&store, Arc::new(config));
        context
            .project(&ingress("web", vec![rule("foo.com")], &[]))
            .await
            .unwrap();
        assert!(store.names().is_empty());
    }

    #[tokio::test]
    async fn bad_annotation_fails_the_projection() {
        let store = FakeStore::default();
        let context = IngressContext::new(&store, config());
        let result = context
            .project(&ingress("web", vec![rule("foo.com")], &[("type", "GOPHER")]))
            .await;
        assert!(matches!(result, Err(Error::Annotation { .. })));
        assert!(store.names().is_empty());
    }
}
