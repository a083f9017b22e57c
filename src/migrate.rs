//! Versioned upgrades of persisted save data.
//!
//! Each step migrates one schema version forward by rewriting the raw JSON
//! shape of a single record; the chain runs in order so future versions stack
//! instead of needing one-off inference per jump. Whether migration runs at
//! all is decided by the stored schema-version marker, never by sniffing
//! field shapes, which is what makes re-migrating current data a no-op.

use crate::config::Rules;
use crate::model::{CharacterSlot, LifeStage, PetRecordMap, SCHEMA_VERSION};
use crate::validate::sanitize;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

type MigrationStep = fn(&mut Map<String, Value>);

/// `(from_version, step)`: the step rewrites a record of `from_version` into
/// `from_version + 1` shape.
const MIGRATIONS: &[(u32, MigrationStep)] = &[(1, migrate_v1_to_v2)];

/// Upgrade a decoded slot map from `from_version` to the current schema.
/// Entries that cannot be reconstructed are dropped; returns `None` when
/// nothing survives so the caller can fall back to defaults.
pub fn migrate(
    raw: &Value,
    from_version: u32,
    rules: &Rules,
    now: DateTime<Utc>,
) -> Option<PetRecordMap> {
    let entries = raw.as_object()?;
    let mut out = PetRecordMap::new();

    for (key, entry) in entries {
        let Some(slot) = CharacterSlot::parse(key) else {
            debug!(slot = %key, "dropping unknown character slot during migration");
            continue;
        };
        let Some(obj) = entry.as_object() else {
            debug!(slot = %key, "dropping non-object record during migration");
            continue;
        };

        let mut record = obj.clone();
        for (version, step) in MIGRATIONS {
            if *version >= from_version && *version < SCHEMA_VERSION {
                step(&mut record);
            }
        }
        out.insert(slot, sanitize(&Value::Object(record), rules, now));
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// v1 predates the life-sim fields: records carried level, experience, the
/// four meters, `lastInteraction` and an optional custom name. New fields are
/// inferred where something sensible exists and defaulted otherwise.
fn migrate_v1_to_v2(record: &mut Map<String, Value>) {
    rename(record, "lastInteraction", "lastInteractionAt");
    rename(record, "lastPoopTime", "lastPoopAccumulationAt");
    rename(record, "lastSleepQualityCheck", "lastSleepQualityCheckAt");
    rename(record, "deathTime", "deathAt");

    if !record.contains_key("createdAt") {
        if let Some(last) = record.get("lastInteractionAt").and_then(Value::as_i64) {
            record.insert("createdAt".into(), Value::from(last - 24 * 3_600_000));
        }
    }

    if !record.contains_key("lifeStage") {
        let level = record.get("level").and_then(Value::as_i64).unwrap_or(1);
        record.insert(
            "lifeStage".into(),
            Value::from(stage_for_legacy_level(level).as_str()),
        );
    }

    if !record.contains_key("isSick") {
        let health = record.get("health").and_then(Value::as_f64).unwrap_or(100.0);
        record.insert("isSick".into(), Value::from(health < 20.0));
    }
}

/// Coarse mapping from a v1 level to a starting life stage.
fn stage_for_legacy_level(level: i64) -> LifeStage {
    match level {
        i64::MIN..=1 => LifeStage::Baby,
        2..=3 => LifeStage::Child,
        4..=6 => LifeStage::Teen,
        7..=14 => LifeStage::Adult,
        _ => LifeStage::Senior,
    }
}

fn rename(record: &mut Map<String, Value>, old: &str, new: &str) {
    if let Some(v) = record.remove(old) {
        record.entry(new.to_string()).or_insert(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn v1_blob() -> Value {
        let last = (now() - chrono::Duration::hours(2)).timestamp_millis();
        json!({
            "cat": {
                "level": 5,
                "experience": 420,
                "hunger": 80.0,
                "happiness": 60.0,
                "energy": 70.0,
                "health": 15.0,
                "lastInteraction": last,
                "customName": "Smilla"
            },
            "lizard": {
                "level": 1,
                "experience": 0,
                "hunger": 50.0,
                "happiness": 50.0,
                "energy": 50.0,
                "health": 90.0,
                "lastInteraction": last
            }
        })
    }

    #[test]
    fn v1_records_gain_inferred_life_sim_fields() {
        let rules = Rules::default();
        let map = migrate(&v1_blob(), 1, &rules, now()).unwrap();

        let cat = &map[&CharacterSlot::Cat];
        assert_eq!(cat.level, 5);
        assert_eq!(cat.custom_name.as_deref(), Some("Smilla"));
        // health 15 < 20 infers sickness, with a repaired stamp
        assert!(cat.is_sick);
        assert!(cat.sick_since.is_some());
        // createdAt backdates 24h from the old interaction stamp
        assert_eq!(
            cat.created_at,
            cat.last_interaction_at - chrono::Duration::hours(24)
        );
        // stage inferred from the old level until the engine recomputes it
        assert_eq!(cat.life_stage, LifeStage::Teen);
        assert_eq!(cat.poop_count, 0);
        assert!(cat.lights_on);
        assert!(!cat.is_dead);

        let lizard = &map[&CharacterSlot::Lizard];
        assert!(!lizard.is_sick);
    }

    #[test]
    fn unknown_slots_and_garbage_entries_are_dropped() {
        let rules = Rules::default();
        let blob = json!({
            "dragon": {"level": 3},
            "cat": "not an object",
            "unicorn": {"level": 2, "experience": 120, "hunger": 40.0,
                        "happiness": 40.0, "energy": 40.0, "health": 80.0,
                        "lastInteraction": now().timestamp_millis()}
        });
        let map = migrate(&blob, 1, &rules, now()).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&CharacterSlot::Unicorn));
    }

    #[test]
    fn nothing_recoverable_yields_none() {
        let rules = Rules::default();
        assert!(migrate(&json!({"dragon": {}}), 1, &rules, now()).is_none());
        assert!(migrate(&json!(42), 1, &rules, now()).is_none());
        assert!(migrate(&json!({}), 1, &rules, now()).is_none());
    }

    #[test]
    fn migration_is_idempotent_on_current_data() {
        let rules = Rules::default();
        let once = migrate(&v1_blob(), 1, &rules, now()).unwrap();
        let serialized = serde_json::to_value(&once).unwrap();
        let twice = migrate(&serialized, SCHEMA_VERSION, &rules, now()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn legacy_level_maps_to_a_coarse_stage() {
        assert_eq!(stage_for_legacy_level(1), LifeStage::Baby);
        assert_eq!(stage_for_legacy_level(3), LifeStage::Child);
        assert_eq!(stage_for_legacy_level(5), LifeStage::Teen);
        assert_eq!(stage_for_legacy_level(10), LifeStage::Adult);
        assert_eq!(stage_for_legacy_level(20), LifeStage::Senior);
    }
}
