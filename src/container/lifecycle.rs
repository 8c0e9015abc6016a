//! Lifecycle capabilities a component may expose.
//!
//! A component implements [`Component`] and answers two independent probes.
//! Either, both or neither may return a capability; the container never
//! assumes one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Boxed error returned by lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that must be prepared before the server accepts traffic.
#[async_trait]
pub trait Initialize: Send + Sync {
    async fn initialize(&self) -> Result<(), BoxError>;
}

/// Something that must be released when the server stops.
#[async_trait]
pub trait Terminate: Send + Sync {
    async fn terminate(&self) -> Result<(), BoxError>;
}

/// A value that can live in the container's dependency registry.
pub trait Component: Send + Sync + 'static {
    /// The initialize capability, if this component has one.
    fn initializer(&self) -> Option<&dyn Initialize> {
        None
    }

    /// The terminate capability, if this component has one.
    fn terminator(&self) -> Option<&dyn Terminate> {
        None
    }
}

impl<T: Component + ?Sized> Component for Arc<T> {
    fn initializer(&self) -> Option<&dyn Initialize> {
        (**self).initializer()
    }

    fn terminator(&self) -> Option<&dyn Terminate> {
        (**self).terminator()
    }
}

/// Which fan-out pass produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    Terminate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initialize => "initialize",
            Phase::Terminate => "terminate",
        }
    }
}

/// Failure of one component's lifecycle hook.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("{0}")]
    Failed(#[source] BoxError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Per-component failures from one fan-out pass, keyed by component name.
#[derive(Debug, Error)]
pub struct LifecycleErrors {
    phase: Phase,
    errors: BTreeMap<String, ComponentError>,
}

impl LifecycleErrors {
    pub(crate) fn new(phase: Phase, errors: BTreeMap<String, ComponentError>) -> Self {
        Self { phase, errors }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn get(&self, name: &str) -> Option<&ComponentError> {
        self.errors.get(name)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentError)> {
        self.errors.iter().map(|(name, err)| (name.as_str(), err))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }
}

impl fmt::Display for LifecycleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for ", self.phase.as_str())?;
        for (i, (name, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, err)?;
        }
        Ok(())
    }
}
