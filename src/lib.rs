pub mod config;
pub mod logging;
pub mod providers;
pub mod registry;
pub mod submit;
pub mod tasks;

pub use genstudio_mapping as mapping;

use genstudio_mapping::{FunctionRegistry, MappingEngine};
use std::sync::Arc;

use crate::config::Config;
use crate::registry::{RegistryError, SchemaRegistry};
use crate::submit::Submitter;
use crate::tasks::TaskStore;

/// Shared state built once at startup
pub struct App {
    pub config: Config,
    pub registry: Arc<SchemaRegistry>,
    pub engine: MappingEngine,
    pub tasks: Arc<TaskStore>,
}

impl App {
    /// Load schemas from the configured directory and set up the engine
    pub fn from_config(config: Config) -> Result<Self, RegistryError> {
        let functions = Arc::new(FunctionRegistry::with_builtins());
        let registry = SchemaRegistry::load_dir(config.schemas_dir(), &functions)?;
        let tasks = TaskStore::from_limits(&config.limits);

        tracing::info!("🔧 Starting genstudio '{}'", config.app.id);

        Ok(Self {
            engine: MappingEngine::new(functions),
            registry: Arc::new(registry),
            tasks: Arc::new(tasks),
            config,
        })
    }

    /// Submitter without provider clients; attach them with `with_client`
    pub fn submitter(&self) -> Submitter {
        Submitter::new(
            Arc::clone(&self.registry),
            self.engine.clone(),
            Arc::clone(&self.tasks),
            self.config.providers.default,
        )
    }
}
