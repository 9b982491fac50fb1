use thiserror::Error;

/// Errors surfaced by the reconciliation handlers and their collaborators.
///
/// [`Error::SecretUnresolved`] is the only variant the surrounding delivery
/// mechanism should treat as transient (the referenced secret may simply not
/// exist yet); everything else is fatal for the event that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither the `update` nor the `create` entry of the object status holds
    /// a remote identifier.
    #[error("was not able to determine the {0} from the object status")]
    IdentifierUnresolved(&'static str),

    /// The remote API reported that the addressed resource does not exist.
    #[error("remote resource does not exist")]
    RemoteNotFound,

    /// Any remote API failure other than `not_found`.
    #[error("UptimeRobot API error ({kind}): {message}")]
    RemoteApi { kind: String, message: String },

    /// A referenced Kubernetes secret could not be resolved into credentials.
    #[error("secret {namespace}/{name} could not be resolved: {reason}")]
    SecretUnresolved {
        namespace: String,
        name: String,
        reason: String,
    },

    /// A monitor annotation on an Ingress could not be parsed into a spec.
    #[error("invalid monitor annotation {field:?}: {reason}")]
    Annotation { field: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("object metadata is missing {0}")]
    MissingObjectMeta(&'static str),

    #[error("malformed UptimeRobot API response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
