//! # Errors
//!
//! Error kinds surfaced through the `Synced` condition. Every variant carries
//! an ordered attribute bag that is emitted to structured logs alongside the
//! message.

use std::fmt;

/// Ordered key/value context attached to an error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Reconcile error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dependent resource missing, ambiguous, or without an external id yet
    #[error("{message}")]
    ReferenceUnresolvable {
        message: String,
        attributes: Attributes,
    },

    /// Spec is structurally invalid; permanent until the spec is fixed
    #[error("{message}")]
    Validation {
        message: String,
        attributes: Attributes,
    },

    /// Retryable provider failure (429, 5xx, transport)
    #[error("{message}")]
    ProviderTransient {
        message: String,
        attributes: Attributes,
    },

    /// Semantic provider failure (already exists, forbidden, bad request)
    #[error("{message}")]
    ProviderPermanent {
        message: String,
        attributes: Attributes,
    },

    /// An asynchronous operation finished in a terminal non-success state
    #[error("{message}")]
    OperationFailed {
        message: String,
        attributes: Attributes,
    },

    #[error("Kubernetes API error: {source}")]
    Kube {
        #[source]
        source: kube::Error,
        attributes: Attributes,
    },

    /// Optimistic-concurrency write rejected; the next tick reads a fresh version
    #[error("{message}")]
    Conflict {
        message: String,
        attributes: Attributes,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn reference(message: impl Into<String>) -> Self {
        Self::ReferenceUnresolvable {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::ProviderTransient {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::ProviderPermanent {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    /// Condition reason for the `Synced` condition
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ReferenceUnresolvable { .. } => "ReferenceUnresolvable",
            Self::Validation { .. } => "ValidationFailure",
            Self::ProviderTransient { .. } => "ProviderTransient",
            Self::ProviderPermanent { .. } => "ProviderPermanent",
            Self::OperationFailed { .. } => "OperationFailed",
            Self::Kube { .. } => "KubernetesApiError",
            Self::Conflict { .. } => "Conflict",
        }
    }

    /// Whether a timed retry can succeed without a spec change
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ReferenceUnresolvable { .. }
                | Self::ProviderTransient { .. }
                | Self::Kube { .. }
                | Self::Conflict { .. }
        )
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Self::ReferenceUnresolvable { attributes, .. }
            | Self::Validation { attributes, .. }
            | Self::ProviderTransient { attributes, .. }
            | Self::ProviderPermanent { attributes, .. }
            | Self::OperationFailed { attributes, .. }
            | Self::Kube { attributes, .. }
            | Self::Conflict { attributes, .. } => attributes,
        }
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Self::ReferenceUnresolvable { attributes, .. }
            | Self::Validation { attributes, .. }
            | Self::ProviderTransient { attributes, .. }
            | Self::ProviderPermanent { attributes, .. }
            | Self::OperationFailed { attributes, .. }
            | Self::Kube { attributes, .. }
            | Self::Conflict { attributes, .. } => attributes,
        }
    }

    /// Attach one more attribute
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes_mut().push(key, value);
        self
    }
}

impl From<kube::Error> for Error {
    fn from(source: kube::Error) -> Self {
        if let kube::Error::Api(response) = &source {
            if response.code == 409 {
                return Self::Conflict {
                    message: response.message.clone(),
                    attributes: Attributes::new().with("code", 409),
                };
            }
        }
        Self::Kube {
            source,
            attributes: Attributes::new(),
        }
    }
}
