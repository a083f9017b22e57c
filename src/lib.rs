//! Pocketgotchi: the life-simulation core of a virtual-pet game.
//!
//! Everything time-dependent is a pure function of `(record, now)` so hosts
//! can tick it from any scheduler and tests can replay arbitrary histories
//! with synthetic clocks. Rendering, input and the choice of storage backend
//! live in the host; this crate owns the rules, the save format and the
//! session orchestration around them.

pub mod config;
pub mod engine;
pub mod events;
pub mod migrate;
pub mod model;
pub mod session;
pub mod storage;
pub mod validate;

pub use config::Rules;
pub use engine::{ActionOutcome, TickEvents};
pub use model::{
    Action, CharacterSlot, LifeStage, PetRecord, PetRecordMap, SickReason, SleepQuality,
    SCHEMA_VERSION,
};
pub use session::Session;
pub use storage::{BlobStore, FileStore, MemStore};
pub use validate::ValidationError;
