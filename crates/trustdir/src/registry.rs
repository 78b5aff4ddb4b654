//! Backend registry: maps backend names to constructors.
//!
//! Callers build one registry, register what they need, and pass it to
//! whatever selects a backend by name. There is no process-wide instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::{BackendContext, IpaSam, PassdbBackend};
use crate::error::{Result, StoreError};

/// Name the IPA backend is registered under.
pub const IPA_BACKEND: &str = "ipa_ldapsam";

/// Builds a backend from its context.
pub type BackendConstructor =
    Box<dyn Fn(BackendContext) -> Result<Arc<dyn PassdbBackend>> + Send + Sync>;

/// Named backend constructors.
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every backend trustdir ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.constructors.insert(
            IPA_BACKEND.to_string(),
            Box::new(|ctx: BackendContext| {
                Ok(Arc::new(IpaSam::new(ctx)?) as Arc<dyn PassdbBackend>)
            }),
        );
        registry
    }

    /// Register `constructor` under `name`. Names are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if the name is empty or taken.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(BackendContext) -> Result<Arc<dyn PassdbBackend>> + Send + Sync + 'static,
    {
        let key = name.to_ascii_lowercase();
        if key.is_empty() {
            return Err(StoreError::InvalidArgument(
                "backend name must not be empty".into(),
            ));
        }
        if self.constructors.contains_key(&key) {
            return Err(StoreError::InvalidArgument(format!(
                "backend already registered: {name}"
            )));
        }
        self.constructors.insert(key, Box::new(constructor));
        log::debug!("registered passdb backend {name}");
        Ok(())
    }

    /// Construct the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown name, or whatever the
    /// constructor fails with.
    pub fn create(&self, name: &str, ctx: BackendContext) -> Result<Arc<dyn PassdbBackend>> {
        let constructor = self
            .constructors
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| StoreError::NotFound(format!("passdb backend: {name}")))?;
        let backend = constructor(ctx)?;
        log::info!("initialized passdb backend {}", backend.name());
        Ok(backend)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
