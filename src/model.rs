use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound shared by all four needs meters.
pub const MAX_STAT: f64 = 100.0;

/// Current persisted schema version. Bump together with a new entry in
/// `migrate::MIGRATIONS`.
pub const SCHEMA_VERSION: u32 = 2;

/// One pet per character slot; the slot doubles as the storage key.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CharacterSlot {
    Lizard,
    Cat,
    Unicorn,
}

impl CharacterSlot {
    pub const ALL: [CharacterSlot; 3] =
        [CharacterSlot::Lizard, CharacterSlot::Cat, CharacterSlot::Unicorn];

    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterSlot::Lizard => "lizard",
            CharacterSlot::Cat => "cat",
            CharacterSlot::Unicorn => "unicorn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lizard" => Some(CharacterSlot::Lizard),
            "cat" => Some(CharacterSlot::Cat),
            "unicorn" => Some(CharacterSlot::Unicorn),
            _ => None,
        }
    }
}

impl fmt::Display for CharacterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived from age, cached on the record for fast reads. Never set by hand;
/// `engine::recompute_life_stage` owns the cache.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LifeStage {
    Baby,
    Child,
    Teen,
    Adult,
    Senior,
}

impl LifeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifeStage::Baby => "baby",
            LifeStage::Child => "child",
            LifeStage::Teen => "teen",
            LifeStage::Adult => "adult",
            LifeStage::Senior => "senior",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "baby" => Some(LifeStage::Baby),
            "child" => Some(LifeStage::Child),
            "teen" => Some(LifeStage::Teen),
            "adult" => Some(LifeStage::Adult),
            "senior" => Some(LifeStage::Senior),
            _ => None,
        }
    }
}

/// Why the pet is currently sick, in display priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SickReason {
    Health,
    Poop,
    Neglect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepQuality {
    Good,
    Poor,
}

/// Discrete player actions the engine knows how to apply. Sleep carries the
/// quality the caller observed at bedtime (see `engine::sleep_quality`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Feed,
    Play,
    Sleep(SleepQuality),
    Exercise,
    Pet,
    Medicine,
    Clean,
}

/// Complete persisted state for one character slot.
///
/// Timestamps are epoch-milliseconds on the wire. Every engine transition
/// takes this by value and returns a new record; nothing mutates in place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PetRecord {
    pub level: u32,
    pub experience: u32,
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub health: f64,
    /// Decay clock anchor; also the neglect-sickness trigger.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_interaction_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    /// Immutable once set; anchors age and therefore life stage.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub life_stage: LifeStage,
    pub poop_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_poop_accumulation_at: DateTime<Utc>,
    /// Anchor for the excess-waste health drain, so the penalty is a function
    /// of true elapsed time rather than tick cadence.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_waste_penalty_at: DateTime<Utc>,
    pub is_sick: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub sick_since: Option<DateTime<Utc>>,
    pub is_dead: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub death_at: Option<DateTime<Utc>>,
    pub lights_on: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_sleep_quality_check_at: DateTime<Utc>,
}

impl PetRecord {
    /// Fresh pet for a newly selected slot.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            level: 1,
            experience: 0,
            hunger: 50.0,
            happiness: 50.0,
            energy: 50.0,
            health: 100.0,
            last_interaction_at: now,
            custom_name: None,
            created_at: now,
            life_stage: LifeStage::Baby,
            poop_count: 0,
            last_poop_accumulation_at: now,
            last_waste_penalty_at: now,
            is_sick: false,
            sick_since: None,
            is_dead: false,
            death_at: None,
            lights_on: true,
            last_sleep_quality_check_at: now,
        }
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        hours_between(self.created_at, now)
    }

    pub fn hours_since_interaction(&self, now: DateTime<Utc>) -> f64 {
        hours_between(self.last_interaction_at, now)
    }
}

pub type PetRecordMap = BTreeMap<CharacterSlot, PetRecord>;

/// Elapsed hours from `from` to `to`, floored at zero so clock skew never
/// produces negative decay.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let ms = (to - from).num_milliseconds().max(0);
    ms as f64 / Duration::hours(1).num_milliseconds() as f64
}

/// Clamp a needs meter into `[0, MAX_STAT]`.
pub fn clamp_stat(v: f64) -> f64 {
    v.clamp(0.0, MAX_STAT)
}
