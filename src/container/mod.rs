//! Dependency container.
//!
//! # Data Flow
//! ```text
//! composition root
//!     → register / provide (named components, optional capabilities)
//!     → set_value (plain flags, never lifecycle-managed)
//!     → handlers look components up by name and type while mounting
//!     → initialize_all (fan-out, one task per Initialize component)
//!     → ... serve ...
//!     → terminate_all (fan-out, one task per Terminate component)
//! ```
//!
//! # Design Decisions
//! - Wiring faults (missing name, wrong type, duplicate name) panic: they
//!   only happen during startup and mean the composition root is wrong
//! - Lifecycle hooks run concurrently and unordered; components must not
//!   depend on each other's readiness
//! - A failing or panicking hook never affects the other components

pub mod lifecycle;

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

pub use lifecycle::{
    BoxError, Component, ComponentError, Initialize, LifecycleErrors, Phase, Terminate,
};

use crate::observability::metrics;

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    component: Arc<dyn Component>,
}

/// Named registry of components plus a separate store of plain values.
#[derive(Default)]
pub struct Container {
    deps: HashMap<String, Entry>,
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under `name`.
    ///
    /// Components are usually cheap handles (`Arc<T>` or `Arc<dyn Trait>`);
    /// [`lookup`](Self::lookup) returns a clone of exactly this value.
    ///
    /// # Panics
    /// If `name` is already registered.
    pub fn register<T: Component>(&mut self, name: &str, component: T) {
        if self.deps.contains_key(name) {
            panic!("dependency \"{}\" already exists", name);
        }
        let shared = Arc::new(component);
        self.deps.insert(
            name.to_string(),
            Entry {
                value: shared.clone(),
                component: shared,
            },
        );
    }

    /// Build a component from already-registered ones and register it.
    pub fn provide<T, F>(&mut self, name: &str, provider: F)
    where
        T: Component,
        F: FnOnce(&Container) -> T,
    {
        let component = provider(self);
        self.register(name, component);
    }

    /// Look up a component by name and type.
    ///
    /// # Panics
    /// If `name` is absent or was registered with a different type.
    pub fn lookup<T: Clone + 'static>(&self, name: &str) -> T {
        let entry = self
            .deps
            .get(name)
            .unwrap_or_else(|| panic!("dependency \"{}\" does not exist", name));
        entry.value.downcast_ref::<T>().cloned().unwrap_or_else(|| {
            panic!("dependency \"{}\" is not a {}", name, type_name::<T>())
        })
    }

    /// Whether a component is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    /// Store a plain value. Values never take part in the lifecycle.
    ///
    /// # Panics
    /// If `name` is already set.
    pub fn set_value<V: Any + Send + Sync>(&mut self, name: &str, value: V) {
        if self.values.contains_key(name) {
            panic!("value \"{}\" already exists", name);
        }
        self.values.insert(name.to_string(), Box::new(value));
    }

    /// Read a plain value.
    ///
    /// # Panics
    /// If `name` is absent or holds a different type.
    pub fn value<V: Clone + 'static>(&self, name: &str) -> V {
        let value = self
            .values
            .get(name)
            .unwrap_or_else(|| panic!("value \"{}\" does not exist", name));
        value.downcast_ref::<V>().cloned().unwrap_or_else(|| {
            panic!("value \"{}\" is not a {}", name, type_name::<V>())
        })
    }

    /// Run every `Initialize` capability concurrently and wait for all.
    pub async fn initialize_all(&self) -> Result<(), LifecycleErrors> {
        self.fan_out(Phase::Initialize).await
    }

    /// Run every `Terminate` capability concurrently and wait for all.
    pub async fn terminate_all(&self) -> Result<(), LifecycleErrors> {
        self.fan_out(Phase::Terminate).await
    }

    async fn fan_out(&self, phase: Phase) -> Result<(), LifecycleErrors> {
        let errors: Arc<Mutex<BTreeMap<String, ComponentError>>> = Arc::default();
        let mut tasks: Vec<(String, JoinHandle<()>)> = Vec::new();

        for (name, entry) in &self.deps {
            let capable = match phase {
                Phase::Initialize => entry.component.initializer().is_some(),
                Phase::Terminate => entry.component.terminator().is_some(),
            };
            if !capable {
                continue;
            }

            let component = entry.component.clone();
            let errors = errors.clone();
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                let result = match phase {
                    Phase::Initialize => match component.initializer() {
                        Some(hook) => hook.initialize().await,
                        None => Ok(()),
                    },
                    Phase::Terminate => match component.terminator() {
                        Some(hook) => hook.terminate().await,
                        None => Ok(()),
                    },
                };
                if let Err(err) = result {
                    let mut errors = errors.lock().expect("lifecycle error map poisoned");
                    errors.insert(task_name, ComponentError::Failed(err));
                }
            });
            tasks.push((name.clone(), handle));
        }

        tracing::debug!(phase = phase.as_str(), components = tasks.len(), "Lifecycle fan-out");

        for (name, handle) in tasks {
            if let Err(join_error) = handle.await {
                let mut errors = errors.lock().expect("lifecycle error map poisoned");
                errors.insert(name, ComponentError::Panicked(join_error.to_string()));
            }
        }

        let errors = std::mem::take(&mut *errors.lock().expect("lifecycle error map poisoned"));
        if errors.is_empty() {
            return Ok(());
        }
        for name in errors.keys() {
            metrics::record_lifecycle_failure(phase.as_str(), name);
        }
        Err(LifecycleErrors::new(phase, errors))
    }
}
