//! Host-owned engine registry
//!
//! Engines are registered and removed explicitly by the host at startup and shutdown.

use crate::engine::{IoEngine, SpliceEngine, ENGINE_NAME};
use spliceio_config::EngineConfig;
use spliceio_types::{EngineFlags, Error, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Constructor for a boxed, uninitialised engine
pub type EngineFactory = fn(&EngineConfig) -> Box<dyn IoEngine + Send>;

/// What an engine advertises to the registry
#[derive(Clone, Copy)]
pub struct EngineDescriptor {
    /// Lookup name
    pub name: &'static str,
    /// Engine version
    pub version: &'static str,
    /// Capabilities the host scheduler must honour
    pub flags: EngineFlags,
    /// Instance constructor
    pub factory: EngineFactory,
}

impl fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Engines known to a host, by name
#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: HashMap<&'static str, EngineDescriptor>,
}

impl EngineRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an engine; fails if the name is taken
    pub fn register(&mut self, descriptor: EngineDescriptor) -> Result<()> {
        if self.engines.contains_key(descriptor.name) {
            return Err(Error::registry(format!(
                "engine '{}' is already registered",
                descriptor.name
            )));
        }
        debug!(name = descriptor.name, version = descriptor.version, "engine registered");
        self.engines.insert(descriptor.name, descriptor);
        Ok(())
    }

    /// Remove an engine; returns whether it was registered
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.engines.remove(name).is_some();
        if removed {
            debug!(name, "engine unregistered");
        }
        removed
    }

    /// Descriptor registered under `name`
    pub fn lookup(&self, name: &str) -> Option<&EngineDescriptor> {
        self.engines.get(name)
    }

    /// Construct an uninitialised instance of the engine registered under `name`
    pub fn create(&self, name: &str, config: &EngineConfig) -> Result<Box<dyn IoEngine + Send>> {
        let descriptor = self
            .lookup(name)
            .ok_or_else(|| Error::registry(format!("no engine named '{name}'")))?;
        Ok((descriptor.factory)(config))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.engines.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn create_splice(config: &EngineConfig) -> Box<dyn IoEngine + Send> {
    Box::new(SpliceEngine::new(config.clone()))
}

/// The splice engine's registry entry
pub fn descriptor() -> EngineDescriptor {
    EngineDescriptor {
        name: ENGINE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        flags: EngineFlags::SYNC_IO,
        factory: create_splice,
    }
}

/// Add the splice engine to `registry`
pub fn register(registry: &mut EngineRegistry) -> Result<()> {
    registry.register(descriptor())
}

/// Remove the splice engine from `registry`
pub fn unregister(registry: &mut EngineRegistry) -> bool {
    registry.unregister(ENGINE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spliceio_types::ErrorKind;

    #[test]
    fn test_register_lookup_unregister() {
        let mut registry = EngineRegistry::new();
        register(&mut registry).unwrap();

        let found = registry.lookup("splice").unwrap();
        assert_eq!(found.flags, EngineFlags::SYNC_IO);
        assert_eq!(registry.names(), vec!["splice"]);

        assert!(unregister(&mut registry));
        assert!(!unregister(&mut registry));
        assert!(registry.lookup("splice").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = EngineRegistry::new();
        register(&mut registry).unwrap();

        let err = register(&mut registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registry);
    }

    #[test]
    fn test_create_builds_uninitialised_engine() {
        let mut registry = EngineRegistry::new();
        register(&mut registry).unwrap();

        let mut engine = registry.create("splice", &EngineConfig::default()).unwrap();
        assert_eq!(engine.name(), "splice");
        engine.initialize().unwrap();
        engine.cleanup();

        assert!(registry.create("libaio", &EngineConfig::default()).is_err());
    }
}
