//! Structural validation and best-effort sanitization of decoded save blobs.
//!
//! `validate` is strict and reports the first offending field; `sanitize` is
//! total and always yields a usable record. The session layer tries the
//! former and falls back to the latter, so malformed-but-parseable data never
//! reaches the player as an error.

use crate::config::Rules;
use crate::model::{clamp_stat, LifeStage, PetRecord, MAX_STAT};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("record must be a JSON object")]
    NotAnObject,
    #[error("field `{0}` must be a number")]
    NotANumber(&'static str),
    #[error("field `{0}` must be a boolean")]
    NotABoolean(&'static str),
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),
    #[error("field `{field}` must be between 0 and {max}")]
    StatOutOfRange { field: &'static str, max: f64 },
    #[error("level must be at least 1")]
    LevelTooLow,
    #[error("experience cannot be negative")]
    NegativeExperience,
    #[error("field `{0}` is not a plausible timestamp")]
    ImplausibleTimestamp(&'static str),
    #[error("poop count must be between 0 and {0}")]
    PoopOutOfRange(u32),
    #[error("unknown life stage `{0}`")]
    UnknownLifeStage(String),
    #[error("`{flag}` and `{stamp}` must be set together")]
    MismatchedPair {
        flag: &'static str,
        stamp: &'static str,
    },
}

const REQUIRED_NUMBERS: [&str; 6] = [
    "level",
    "experience",
    "hunger",
    "happiness",
    "energy",
    "health",
];

const TIMESTAMPS: [&str; 5] = [
    "lastInteractionAt",
    "createdAt",
    "lastPoopAccumulationAt",
    "lastWastePenaltyAt",
    "lastSleepQualityCheckAt",
];

fn require_number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    obj.get(field)
        .and_then(Value::as_f64)
        .ok_or(ValidationError::NotANumber(field))
}

fn require_bool(obj: &Map<String, Value>, field: &'static str) -> Result<bool, ValidationError> {
    obj.get(field)
        .and_then(Value::as_bool)
        .ok_or(ValidationError::NotABoolean(field))
}

fn require_timestamp(
    obj: &Map<String, Value>,
    field: &'static str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    let ms = obj
        .get(field)
        .and_then(Value::as_i64)
        .ok_or(ValidationError::NotANumber(field))?;
    to_plausible_timestamp(ms, now).ok_or(ValidationError::ImplausibleTimestamp(field))
}

/// A plausible timestamp is non-negative and at most one second in the
/// future (tolerates minor clock drift between writer and reader).
fn to_plausible_timestamp(ms: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if ms < 0 {
        return None;
    }
    let ts = DateTime::from_timestamp_millis(ms)?;
    if ts > now + Duration::seconds(1) {
        return None;
    }
    Some(ts)
}

/// Strict structural check of one decoded record. Returns the first failing
/// field as a typed error; never panics on malformed input.
pub fn validate(
    value: &Value,
    rules: &Rules,
    now: DateTime<Utc>,
) -> Result<PetRecord, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    for field in REQUIRED_NUMBERS {
        require_number(obj, field)?;
    }

    for field in ["hunger", "happiness", "energy", "health"] {
        let v = require_number(obj, field)?;
        if !(0.0..=MAX_STAT).contains(&v) {
            return Err(ValidationError::StatOutOfRange {
                field,
                max: MAX_STAT,
            });
        }
    }

    let level = require_number(obj, "level")?;
    if level < 1.0 {
        return Err(ValidationError::LevelTooLow);
    }
    let experience = require_number(obj, "experience")?;
    if experience < 0.0 {
        return Err(ValidationError::NegativeExperience);
    }

    let mut stamps = [now; 5];
    for (i, field) in TIMESTAMPS.into_iter().enumerate() {
        stamps[i] = require_timestamp(obj, field, now)?;
    }
    let [last_interaction_at, created_at, last_poop_accumulation_at, last_waste_penalty_at, last_sleep_quality_check_at] =
        stamps;

    let poop_count = require_number(obj, "poopCount")?;
    if poop_count < 0.0 || poop_count > rules.poop.max_poop as f64 {
        return Err(ValidationError::PoopOutOfRange(rules.poop.max_poop));
    }

    let is_sick = require_bool(obj, "isSick")?;
    let is_dead = require_bool(obj, "isDead")?;
    let lights_on = require_bool(obj, "lightsOn")?;

    let stage_str = obj
        .get("lifeStage")
        .and_then(Value::as_str)
        .ok_or(ValidationError::NotAString("lifeStage"))?;
    let life_stage = LifeStage::parse(stage_str)
        .ok_or_else(|| ValidationError::UnknownLifeStage(stage_str.to_string()))?;

    let custom_name = match obj.get("customName") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ValidationError::NotAString("customName")),
    };

    let sick_since = optional_timestamp(obj, "sickSince", now)?;
    if is_sick != sick_since.is_some() {
        return Err(ValidationError::MismatchedPair {
            flag: "isSick",
            stamp: "sickSince",
        });
    }
    let death_at = optional_timestamp(obj, "deathAt", now)?;
    if is_dead != death_at.is_some() {
        return Err(ValidationError::MismatchedPair {
            flag: "isDead",
            stamp: "deathAt",
        });
    }

    Ok(PetRecord {
        level: level.floor() as u32,
        experience: experience.floor() as u32,
        hunger: obj["hunger"].as_f64().unwrap_or(0.0),
        happiness: obj["happiness"].as_f64().unwrap_or(0.0),
        energy: obj["energy"].as_f64().unwrap_or(0.0),
        health: obj["health"].as_f64().unwrap_or(0.0),
        last_interaction_at,
        custom_name,
        created_at,
        life_stage,
        poop_count: poop_count.floor() as u32,
        last_poop_accumulation_at,
        last_waste_penalty_at,
        is_sick,
        sick_since,
        is_dead,
        death_at,
        lights_on,
        last_sleep_quality_check_at,
    })
}

fn optional_timestamp(
    obj: &Map<String, Value>,
    field: &'static str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let ms = v.as_i64().ok_or(ValidationError::NotANumber(field))?;
            to_plausible_timestamp(ms, now)
                .map(Some)
                .ok_or(ValidationError::ImplausibleTimestamp(field))
        }
    }
}

/// Total repair of an arbitrary decoded value into a valid record: clamps
/// bounded fields, floors integers, defaults anything missing and restores
/// the paired sick/dead invariants. Also used on freshly migrated records.
pub fn sanitize(value: &Value, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let get_num = |field: &str| obj.get(field).and_then(Value::as_f64);
    let get_ts = |field: &str| {
        obj.get(field)
            .and_then(Value::as_i64)
            .filter(|ms| *ms >= 0)
            .and_then(DateTime::from_timestamp_millis)
            .map(|ts| ts.min(now))
    };

    let last_interaction_at = get_ts("lastInteractionAt").unwrap_or(now);
    let created_at = get_ts("createdAt").unwrap_or(last_interaction_at - Duration::hours(24));

    let is_sick = obj.get("isSick").and_then(Value::as_bool).unwrap_or(false);
    let is_dead = obj.get("isDead").and_then(Value::as_bool).unwrap_or(false);

    PetRecord {
        level: (get_num("level").unwrap_or(1.0).floor() as i64).max(1) as u32,
        experience: (get_num("experience").unwrap_or(0.0).floor() as i64).max(0) as u32,
        hunger: clamp_stat(get_num("hunger").unwrap_or(50.0)),
        happiness: clamp_stat(get_num("happiness").unwrap_or(50.0)),
        energy: clamp_stat(get_num("energy").unwrap_or(50.0)),
        health: clamp_stat(get_num("health").unwrap_or(100.0)),
        last_interaction_at,
        custom_name: obj
            .get("customName")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at,
        // Default only; the engine recomputes the cache on its next tick.
        life_stage: obj
            .get("lifeStage")
            .and_then(Value::as_str)
            .and_then(LifeStage::parse)
            .unwrap_or(LifeStage::Baby),
        poop_count: get_num("poopCount")
            .unwrap_or(0.0)
            .max(0.0)
            .floor()
            .min(rules.poop.max_poop as f64) as u32,
        last_poop_accumulation_at: get_ts("lastPoopAccumulationAt").unwrap_or(now),
        last_waste_penalty_at: get_ts("lastWastePenaltyAt").unwrap_or(now),
        is_sick,
        sick_since: if is_sick {
            get_ts("sickSince").or(Some(now))
        } else {
            None
        },
        is_dead,
        death_at: if is_dead {
            get_ts("deathAt").or(Some(now))
        } else {
            None
        },
        lights_on: obj.get("lightsOn").and_then(Value::as_bool).unwrap_or(true),
        last_sleep_quality_check_at: get_ts("lastSleepQualityCheckAt").unwrap_or(now),
    }
}
