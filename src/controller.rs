use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::FutureExt;
use futures::stream::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use kube_runtime::watcher;
use rand::{thread_rng, Rng};
use serde_json::{json, Value};
use tracing::{event, Level};

use crate::diff::{self, SpecDiff};

/// Name of the lifecycle event that first reconciled an object. Status
/// written by it is stored under this key.
pub const CREATE_EVENT: &str = "create";
/// Name of the lifecycle event for subsequent spec changes.
pub const UPDATE_EVENT: &str = "update";

/// Annotation holding the spec as it looked when the object was last
/// handled successfully. Its absence marks an object as never handled
/// (a create event); a difference against the current spec yields the
/// update diff.
pub const LAST_APPLIED_ANNOTATION: &str = "uptimerobot.twinhats.com/last-applied-spec";

/// Fields a handler wants persisted under `status.<event name>` after a
/// successful reconciliation, typically the remote resource identifier.
pub type StatusWrite = BTreeMap<String, Value>;

/// The [`Controller`] watches a set of resources, classifies each change
/// into a lifecycle event (create, update or delete) and calls the matching
/// method on the provided [`Context`].
pub struct Controller<Ctx: Context>
where
    Ctx: Send + Sync + 'static,
    Ctx::Error: Send + Sync + 'static,
    Ctx::Resource: Send + Sync + 'static,
    Ctx::Resource: Clone + std::fmt::Debug + serde::Serialize,
    for<'de> Ctx::Resource: serde::Deserialize<'de>,
    <Ctx::Resource as Resource>::DynamicType:
        Eq + Clone + std::hash::Hash + std::default::Default + std::fmt::Debug + std::marker::Unpin,
{
    client: kube::Client,
    make_api: Box<dyn Fn(&Ctx::Resource) -> Api<Ctx::Resource> + Sync + Send + 'static>,
    controller: kube_runtime::controller::Controller<Ctx::Resource>,
    context: Ctx,
}

impl<Ctx: Context> Controller<Ctx>
where
    Ctx: Send + Sync + 'static,
    Ctx::Error: Send + Sync + 'static,
    Ctx::Resource: Send + Sync + 'static,
    Ctx::Resource: Clone + std::fmt::Debug + serde::Serialize,
    for<'de> Ctx::Resource: serde::Deserialize<'de>,
    <Ctx::Resource as Resource>::DynamicType:
        Eq + Clone + std::hash::Hash + std::default::Default + std::fmt::Debug + std::marker::Unpin,
{
    /// Creates a new controller for a namespaced resource using the given
    /// `client`. The `context` given determines the type of resource to
    /// watch (via the [`Context::Resource`] type provided as part of the
    /// trait implementation). The resources to be watched will not be
    /// limited by namespace. A [`watcher::Config`] can be given to limit
    /// the resources watched (for instance,
    /// `watcher::Config::default().labels("app=myapp")`).
    pub fn namespaced_all(client: Client, context: Ctx, wc: watcher::Config) -> Self
    where
        Ctx::Resource: Resource<Scope = NamespaceResourceScope>,
    {
        let make_api = {
            let client = client.clone();
            Box::new(move |resource: &Ctx::Resource| {
                Api::<Ctx::Resource>::namespaced(client.clone(), &resource.namespace().unwrap())
            })
        };
        let controller = kube_runtime::controller::Controller::new(
            Api::<Ctx::Resource>::all(client.clone()),
            wc,
        );
        Self {
            client,
            make_api,
            controller,
            context,
        }
    }

    /// Run the controller. This method will not return. The [`Context`]
    /// given to the constructor will have its [`on_create`](Context::on_create)
    /// or [`on_update`](Context::on_update) method called when a resource
    /// changes, and its [`on_delete`](Context::on_delete) method called when
    /// a resource is about to be deleted.
    pub async fn run(self) {
        let Self {
            client,
            make_api,
            controller,
            context,
        } = self;
        let backoffs = Arc::new(Mutex::new(BTreeMap::new()));
        let backoffs = &backoffs;
        controller
            .run(
                |resource, context| {
                    let uid = resource.uid().unwrap();
                    let backoffs = Arc::clone(backoffs);
                    context
                        ._reconcile(client.clone(), make_api(&resource), resource)
                        .inspect(move |result| {
                            if result.is_ok() {
                                backoffs.lock().unwrap().remove(&uid);
                            }
                        })
                },
                |resource, err, context| {
                    let consecutive_errors = {
                        let uid = resource.uid().unwrap();
                        let mut backoffs = backoffs.lock().unwrap();
                        let consecutive_errors: u32 =
                            backoffs.get(&uid).copied().unwrap_or_default();
                        backoffs.insert(uid, consecutive_errors.saturating_add(1));
                        consecutive_errors
                    };
                    context.error_action(resource, err, consecutive_errors)
                },
                Arc::new(context),
            )
            .for_each(|reconciliation_result| async move {
                let dynamic_type = Default::default();
                let kind = Ctx::Resource::kind(&dynamic_type).into_owned();
                match reconciliation_result {
                    Ok(resource) => {
                        event!(
                            Level::INFO,
                            resource_name = %resource.0.name,
                            controller = Ctx::FINALIZER_NAME,
                            "{} reconciliation successful.",
                            kind
                        );
                    }
                    Err(err) => event!(
                        Level::ERROR,
                        err = %err,
                        source = err.source(),
                        controller = Ctx::FINALIZER_NAME,
                        "{} reconciliation error.",
                        kind
                    ),
                }
            })
            .await
    }
}

/// The [`Context`] trait should be implemented in order to provide handlers
/// for the lifecycle events of resources watched by a [`Controller`].
///
/// The controller persists whatever a successful handler returns under the
/// object's status, keyed by the event name that produced it, and records
/// the handled spec in the last-applied annotation. A failing handler
/// writes nothing: either the whole operation plus status write succeeds or
/// the event is retried from scratch.
#[async_trait::async_trait]
pub trait Context {
    /// The type of Kubernetes [resource](Resource) that will be watched by
    /// the [`Controller`] this context is passed to
    type Resource: Resource;
    /// The error type which will be returned by the lifecycle handlers
    type Error: std::error::Error + From<kube::Error> + From<serde_json::Error>;

    /// The name to use for the finalizer. This must be unique across
    /// controllers - if multiple controllers with the same finalizer name
    /// run against the same resource, unexpected behavior can occur.
    const FINALIZER_NAME: &'static str;

    /// Called the first time an object is handled. Returning
    /// `Ok(Some(write))` persists `write` under `status.create`.
    async fn on_create(
        &self,
        client: Client,
        resource: &Self::Resource,
    ) -> Result<Option<StatusWrite>, Self::Error>;

    /// Called when the spec of an already-handled object changed. `diff`
    /// lists the changed fields between the last handled spec and the
    /// current one. Returning `Ok(Some(write))` persists `write` under
    /// `status.update`.
    async fn on_update(
        &self,
        client: Client,
        resource: &Self::Resource,
        diff: &SpecDiff,
    ) -> Result<Option<StatusWrite>, Self::Error>;

    /// Called when a watched resource is marked for deletion.
    async fn on_delete(
        &self,
        client: Client,
        resource: &Self::Resource,
    ) -> Result<(), Self::Error>;

    /// This method is called after an event was handled successfully. It
    /// should return the default [`Action`] to perform. The default
    /// implementation will requeue the event at a random time between 40
    /// and 60 minutes in the future.
    fn success_action(&self, resource: &Self::Resource) -> Action {
        // use a better name for the parameter name in the docs
        let _resource = resource;

        Action::requeue(Duration::from_secs(thread_rng().gen_range(2400..3600)))
    }

    /// This method is called when a lifecycle handler returns `Err`. It
    /// should return the default [`Action`] to perform. The error returned
    /// will be passed in here, as well as a count of how many consecutive
    /// errors have happened for this resource, to allow for an exponential
    /// backoff strategy. The default implementation uses exponential
    /// backoff with a max of 256 seconds and some added randomization to
    /// avoid thundering herds.
    fn error_action(
        self: Arc<Self>,
        resource: Arc<Self::Resource>,
        err: &kube_runtime::finalizer::Error<Self::Error>,
        consecutive_errors: u32,
    ) -> Action {
        // use a better name for the parameter name in the docs
        let _resource = resource;
        let _err = err;

        let seconds = 2u64.pow(consecutive_errors.min(7) + 1);
        Action::requeue(Duration::from_millis(
            thread_rng().gen_range((seconds * 500)..(seconds * 1000)),
        ))
    }

    #[doc(hidden)]
    async fn _reconcile(
        self: Arc<Self>,
        client: Client,
        api: Api<Self::Resource>,
        resource: Arc<Self::Resource>,
    ) -> Result<Action, kube_runtime::finalizer::Error<Self::Error>>
    where
        Self: Send + Sync + 'static,
        Self::Error: Send + Sync + 'static,
        Self::Resource: Send + Sync + 'static,
        Self::Resource: Clone + std::fmt::Debug + serde::Serialize,
        for<'de> Self::Resource: serde::Deserialize<'de>,
        <Self::Resource as Resource>::DynamicType: Eq
            + Clone
            + std::hash::Hash
            + std::default::Default
            + std::fmt::Debug
            + std::marker::Unpin,
    {
        let dynamic_type = Default::default();
        let kind = Self::Resource::kind(&dynamic_type).into_owned();
        let mut ran = false;
        let res = finalizer(
            &api,
            Self::FINALIZER_NAME,
            Arc::clone(&resource),
            |event| async {
                ran = true;
                match event {
                    Event::Apply(resource) => {
                        let name = resource.name_unchecked();
                        let current_spec = spec_of::<_, Self::Error>(&*resource)?;
                        let last_applied = last_applied_spec::<_, Self::Error>(&*resource)?;

                        let (event_name, outcome) = match last_applied {
                            None => {
                                event!(
                                    Level::INFO,
                                    resource_name = %name,
                                    controller = Self::FINALIZER_NAME,
                                    "Reconciling {} ({}).",
                                    kind,
                                    CREATE_EVENT
                                );
                                let outcome = self.on_create(client.clone(), &resource).await?;
                                (CREATE_EVENT, outcome)
                            }
                            Some(last_applied) => {
                                let diff = diff::diff(&last_applied, &current_spec);
                                if diff.is_empty() {
                                    return Ok(self.success_action(&resource));
                                }
                                event!(
                                    Level::INFO,
                                    resource_name = %name,
                                    controller = Self::FINALIZER_NAME,
                                    changed_fields = diff.len(),
                                    "Reconciling {} ({}).",
                                    kind,
                                    UPDATE_EVENT
                                );
                                let outcome =
                                    self.on_update(client.clone(), &resource, &diff).await?;
                                (UPDATE_EVENT, outcome)
                            }
                        };

                        if let Some(write) = outcome {
                            api.patch_status(
                                &name,
                                &PatchParams::default(),
                                &Patch::Merge(json!({ "status": { event_name: write } })),
                            )
                            .await
                            .map_err(Self::Error::from)?;
                        }
                        let spec_string =
                            serde_json::to_string(&current_spec).map_err(Self::Error::from)?;
                        api.patch(
                            &name,
                            &PatchParams::default(),
                            &Patch::Merge(json!({
                                "metadata": {
                                    "annotations": { LAST_APPLIED_ANNOTATION: spec_string }
                                }
                            })),
                        )
                        .await
                        .map_err(Self::Error::from)?;

                        Ok(self.success_action(&resource))
                    }
                    Event::Cleanup(resource) => {
                        event!(
                            Level::INFO,
                            resource_name = %resource.name_unchecked().as_str(),
                            controller = Self::FINALIZER_NAME,
                            "Reconciling {} (delete).",
                            kind
                        );
                        self.on_delete(client.clone(), &resource).await?;
                        Ok(Action::await_change())
                    }
                }
            },
        )
        .await;
        if !ran {
            event!(
                Level::INFO,
                resource_name = %resource.name_unchecked().as_str(),
                controller = Self::FINALIZER_NAME,
                "Reconciling {} ({}).",
                kind,
                if resource.meta().deletion_timestamp.is_some() {
                    "delete"
                } else {
                    "init"
                }
            );
        }
        res
    }
}

/// The current spec of a resource as a JSON value.
fn spec_of<R, E>(resource: &R) -> Result<Value, E>
where
    R: serde::Serialize,
    E: From<serde_json::Error>,
{
    let object = serde_json::to_value(resource)?;
    Ok(object.get("spec").cloned().unwrap_or(Value::Null))
}

/// The spec recorded by the last successful reconciliation, if any.
fn last_applied_spec<R, E>(resource: &R) -> Result<Option<Value>, E>
where
    R: Resource,
    E: From<serde_json::Error>,
{
    match resource
        .meta()
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(LAST_APPLIED_ANNOTATION))
    {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}
