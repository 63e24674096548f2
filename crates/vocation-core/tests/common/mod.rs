//! Recording collaborators shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex};

use vocation_core::{
    ConfigStore, JobOperations, JobsConfig, JobsError, MemoryGateway, MessageDelivery,
    PermissionEngine, PersistenceGateway, Registry, ServiceContext, SlotCounter, SlotTracker,
};
use vocation_types::{ActorId, ActorSnapshot, ChatColor, Job, JobId, ProgressionRecord, Title};

/// Persistence gateway that counts calls and can be told to fail saves.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    pub inner: MemoryGateway,
    pub loads: AtomicUsize,
    pub joins: AtomicUsize,
    pub quits: AtomicUsize,
    pub full_saves: AtomicUsize,
    pub fail_saves: AtomicBool,
    pub save_delay_ms: AtomicU64,
}

impl RecordingGateway {
    pub fn calls(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
            + self.quits.load(Ordering::SeqCst)
            + self.full_saves.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    /// Make every full-state save sleep for `delay` before writing.
    pub fn set_save_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap();
        self.save_delay_ms.store(millis, Ordering::SeqCst);
    }
}

impl PersistenceGateway for RecordingGateway {
    fn load_progressions(&self, actor: &ActorId) -> Result<Vec<ProgressionRecord>, JobsError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_progressions(actor)
    }

    fn persist_join(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        self.inner.persist_join(actor, job)
    }

    fn persist_quit(&self, actor: &ActorId, job: &JobId) -> Result<(), JobsError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        self.inner.persist_quit(actor, job)
    }

    fn persist_full_state(&self, snapshot: &ActorSnapshot) -> Result<(), JobsError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(JobsError::Persistence {
                actor: snapshot.actor.clone(),
                message: String::from("disk full"),
            });
        }
        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.full_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.persist_full_state(snapshot)
    }
}

/// Slot tracker that counts takes and releases on top of a real counter.
#[derive(Debug, Default)]
pub struct RecordingSlots {
    pub inner: SlotCounter,
    pub takes: AtomicUsize,
    pub releases: AtomicUsize,
}

impl SlotTracker for RecordingSlots {
    fn take_slot(&self, job: &JobId) -> Result<(), JobsError> {
        self.takes.fetch_add(1, Ordering::SeqCst);
        self.inner.take_slot(job)
    }

    fn release_slot(&self, job: &JobId) -> Result<(), JobsError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release_slot(job)
    }
}

/// Permission engine that counts recomputes and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingPermissions {
    pub recomputes: AtomicUsize,
    pub failing: AtomicBool,
}

impl PermissionEngine for RecordingPermissions {
    fn recompute(
        &self,
        actor: &ActorId,
        _progressions: &[ProgressionRecord],
    ) -> Result<(), JobsError> {
        self.recomputes.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(JobsError::Permissions {
                actor: actor.clone(),
                message: String::from("backend offline"),
            });
        }
        Ok(())
    }
}

/// A delivered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Broadcast(String),
    Private(ActorId, String),
}

/// Message delivery that records every line.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    pub lines: Mutex<Vec<Delivered>>,
}

impl RecordingDelivery {
    pub fn taken(&self) -> Vec<Delivered> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }
}

impl MessageDelivery for RecordingDelivery {
    fn broadcast(&self, line: &str) -> Result<(), JobsError> {
        self.lines
            .lock()
            .unwrap()
            .push(Delivered::Broadcast(String::from(line)));
        Ok(())
    }

    fn send_to(&self, actor: &ActorId, line: &str) -> Result<(), JobsError> {
        self.lines
            .lock()
            .unwrap()
            .push(Delivered::Private(actor.clone(), String::from(line)));
        Ok(())
    }
}

/// Miner: uncapped, titles Novice (1) and Apprentice (5).
pub fn miner() -> Job {
    let mut job = Job::new("Miner");
    job.color = ChatColor::Gray;
    job.max_slots = Some(5);
    job.titles = vec![
        Title {
            name: String::from("Novice"),
            short_name: Some(String::from("N")),
            color: ChatColor::Green,
            min_level: 1,
        },
        Title {
            name: String::from("Apprentice"),
            short_name: Some(String::from("A")),
            color: ChatColor::Gold,
            min_level: 5,
        },
    ];
    job
}

/// Farmer: capped at level 10, no titles.
pub fn farmer() -> Job {
    let mut job = Job::new("Farmer");
    job.color = ChatColor::DarkGreen;
    job.max_level = Some(10);
    job
}

pub fn config(save_on_disconnect: bool) -> JobsConfig {
    let mut config = JobsConfig::default();
    config.general.save_on_disconnect = save_on_disconnect;
    config.jobs = vec![miner(), farmer()];
    config
}

/// Registry and job operations wired to recording collaborators.
pub struct Harness {
    pub config: Arc<ConfigStore>,
    pub gateway: Arc<RecordingGateway>,
    pub slots: Arc<RecordingSlots>,
    pub permissions: Arc<RecordingPermissions>,
    pub delivery: Arc<RecordingDelivery>,
    pub registry: Registry,
    pub ops: JobOperations,
}

impl Harness {
    pub fn new(config: JobsConfig) -> Self {
        let store = Arc::new(ConfigStore::new(config));
        let gateway = Arc::new(RecordingGateway::default());
        let slots = Arc::new(RecordingSlots::default());
        let permissions = Arc::new(RecordingPermissions::default());
        let delivery = Arc::new(RecordingDelivery::default());

        let ctx = Arc::new(ServiceContext {
            persistence: Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            slots: Arc::clone(&slots) as Arc<dyn SlotTracker>,
            permissions: Arc::clone(&permissions) as Arc<dyn PermissionEngine>,
            delivery: Arc::clone(&delivery) as Arc<dyn MessageDelivery>,
            config: Arc::clone(&store) as Arc<dyn vocation_core::ConfigProvider>,
            templates: Arc::clone(&store) as Arc<dyn vocation_core::MessageTemplates>,
        });

        Self {
            config: store,
            gateway,
            slots,
            permissions,
            delivery,
            registry: Registry::new(Arc::clone(&ctx)),
            ops: JobOperations::new(ctx),
        }
    }

    pub fn job(&self, id: &str) -> Arc<Job> {
        use vocation_core::ConfigProvider;
        self.config.job(&JobId::from(id)).unwrap()
    }
}

pub fn actor(name: &str) -> ActorId {
    ActorId::from(name)
}

pub fn job_id(name: &str) -> JobId {
    JobId::from(name)
}
