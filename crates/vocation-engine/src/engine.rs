//! Service wiring for the engine binary.
//!
//! [`Engine`] owns the live configuration, the registry and the job
//! operations, built over the in-memory gateway, the in-process slot counter
//! and the log-backed collaborators from [`adapters`](crate::adapters).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use vocation_core::{
    ConfigProvider, ConfigStore, JobOperations, JobsConfig, MemoryGateway, MessageDelivery,
    MessageTemplates, PermissionEngine, PersistenceGateway, Registry, SaveReport, ServiceContext,
    SlotCounter, SlotTracker,
};

use crate::adapters::{LogDelivery, LogPermissions};
use crate::error::EngineError;

/// Every long-lived service the binary drives.
#[derive(Debug)]
pub struct Engine {
    config_path: PathBuf,
    store: Arc<ConfigStore>,
    slots: Arc<SlotCounter>,
    registry: Registry,
    ops: JobOperations,
}

impl Engine {
    /// Wire the services over `config`, remembering where it was read from.
    pub fn new(config: JobsConfig, config_path: PathBuf) -> Self {
        let store = Arc::new(ConfigStore::new(config));
        let slots = Arc::new(SlotCounter::new());
        let ctx = Arc::new(ServiceContext {
            persistence: Arc::new(MemoryGateway::new()) as Arc<dyn PersistenceGateway>,
            slots: Arc::clone(&slots) as Arc<dyn SlotTracker>,
            permissions: Arc::new(LogPermissions) as Arc<dyn PermissionEngine>,
            delivery: Arc::new(LogDelivery) as Arc<dyn MessageDelivery>,
            config: Arc::clone(&store) as Arc<dyn ConfigProvider>,
            templates: Arc::clone(&store) as Arc<dyn MessageTemplates>,
        });

        Self {
            config_path,
            store,
            slots,
            registry: Registry::new(Arc::clone(&ctx)),
            ops: JobOperations::new(ctx),
        }
    }

    /// The live configuration.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Slot usage per job.
    pub fn slots(&self) -> &SlotCounter {
        &self.slots
    }

    /// The actor registry.
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The job operations API.
    pub const fn ops(&self) -> &JobOperations {
        &self.ops
    }

    /// Save every dirty actor and evict idle ones.
    pub fn save_all(&self) -> SaveReport {
        self.registry.save_all()
    }

    /// Re-read the configuration file, install it and rebind the registry.
    ///
    /// On failure the current configuration stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the file cannot be loaded.
    pub fn reload(&self) -> Result<usize, EngineError> {
        let config = JobsConfig::from_file(&self.config_path)?;
        let jobs = config.jobs.len();
        self.store.replace(config);
        self.registry.reload();
        info!(path = %self.config_path.display(), jobs, "configuration reloaded");
        Ok(jobs)
    }
}
