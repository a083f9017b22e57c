//! Session controller: owns the in-memory records, feeds the engine, and
//! talks to the persistence gateway.
//!
//! The host drives everything: a timer calls `tick` (once a minute is
//! plenty), input handlers call the action methods, and `flush` runs the
//! debounced save. Storage failures are logged and swallowed — the in-memory
//! record stays authoritative and at worst the newest unsaved mutation window
//! is lost on a crash.

use crate::config::Rules;
use crate::engine::{self, ActionOutcome, TickEvents};
use crate::migrate::migrate;
use crate::model::{Action, CharacterSlot, PetRecord, PetRecordMap, SCHEMA_VERSION};
use crate::storage::BlobStore;
use crate::validate::{sanitize, validate};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};

pub const PETS_KEY: &str = "pets";
pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const LAST_SLOT_KEY: &str = "last_slot";

/// Quiet period after a mutation before the save fires; further mutations
/// push the deadline out instead of stacking writes.
pub const SAVE_DEBOUNCE_MS: i64 = 500;

pub struct Session<S: BlobStore> {
    store: S,
    rules: Rules,
    records: PetRecordMap,
    loaded: bool,
    slot: Option<CharacterSlot>,
    save_due: Option<DateTime<Utc>>,
}

impl<S: BlobStore> Session<S> {
    pub fn new(store: S, rules: Rules) -> Self {
        Self {
            store,
            rules,
            records: PetRecordMap::new(),
            loaded: false,
            slot: None,
            save_due: None,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn slot(&self) -> Option<CharacterSlot> {
        self.slot
    }

    pub fn record(&self) -> Option<&PetRecord> {
        self.slot.and_then(|slot| self.records.get(&slot))
    }

    /// Restore the last-active slot, if one was stored.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Option<CharacterSlot> {
        let stored = match self.store.get(LAST_SLOT_KEY) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "could not read last-active slot");
                None
            }
        };
        let slot = stored.as_deref().and_then(CharacterSlot::parse)?;
        self.select_slot(slot, now);
        Some(slot)
    }

    /// Switch to a character slot, creating a fresh pet if the slot has none.
    pub fn select_slot(&mut self, slot: CharacterSlot, now: DateTime<Utc>) {
        self.ensure_loaded(now);
        self.records
            .entry(slot)
            .or_insert_with(|| PetRecord::new(now));
        self.slot = Some(slot);
        if let Err(e) = self.store.set(LAST_SLOT_KEY, slot.as_str()) {
            warn!(error = %e, "could not persist last-active slot");
        }
    }

    /// Leave the current slot (back to character selection). Forgets the
    /// last-active marker so the next launch starts unselected.
    pub fn deselect(&mut self) {
        self.slot = None;
        if let Err(e) = self.store.remove(LAST_SLOT_KEY) {
            warn!(error = %e, "could not clear last-active slot");
        }
    }

    /// One passive simulation step for the active pet.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TickEvents> {
        let slot = self.slot?;
        let rec = self.records.get(&slot)?.clone();
        let before = rec.clone();
        let (next, events) = engine::tick(rec, &self.rules, now);
        if next != before {
            self.records.insert(slot, next);
            self.schedule_save(now);
        }
        Some(events)
    }

    /// Apply a discrete player action to the active pet.
    pub fn perform(&mut self, action: Action, now: DateTime<Utc>) -> Option<ActionOutcome> {
        let slot = self.slot?;
        let rec = self.records.get(&slot)?.clone();
        let before = rec.clone();
        let (next, outcome) = engine::apply_action(rec, &self.rules, action, now);
        if next != before {
            self.records.insert(slot, next);
            self.schedule_save(now);
        }
        Some(outcome)
    }

    /// Put the pet to bed at whatever quality the current hour and lights
    /// give it.
    pub fn sleep(&mut self, now: DateTime<Utc>) -> Option<ActionOutcome> {
        let quality = engine::sleep_quality(self.record()?, &self.rules, now);
        self.perform(Action::Sleep(quality), now)
    }

    pub fn toggle_lights(&mut self, now: DateTime<Utc>) {
        let Some(slot) = self.slot else { return };
        if let Some(rec) = self.records.get(&slot) {
            let next = engine::toggle_lights(rec.clone(), now);
            if next != self.records[&slot] {
                self.records.insert(slot, next);
                self.schedule_save(now);
            }
        }
    }

    /// Attempt revival; returns whether the pet came back.
    pub fn revive(&mut self, now: DateTime<Utc>) -> bool {
        let Some(slot) = self.slot else { return false };
        let Some(rec) = self.records.get(&slot) else {
            return false;
        };
        if !engine::can_revive(rec, &self.rules, now) {
            return false;
        }
        let next = engine::revive(rec.clone(), &self.rules, now);
        self.records.insert(slot, next);
        self.schedule_save(now);
        true
    }

    /// Reset the active slot to a brand-new pet (explicit "new pet" after
    /// death, or a deliberate restart).
    pub fn new_pet(&mut self, now: DateTime<Utc>) {
        let Some(slot) = self.slot else { return };
        self.records.insert(slot, PetRecord::new(now));
        self.schedule_save(now);
    }

    /// Cosmetic only; the engine never reads the name.
    pub fn set_custom_name(&mut self, name: Option<String>, now: DateTime<Utc>) {
        let Some(slot) = self.slot else { return };
        if let Some(rec) = self.records.get_mut(&slot) {
            if rec.custom_name != name {
                rec.custom_name = name;
                self.schedule_save(now);
            }
        }
    }

    /// Run the debounced save if its quiet period has elapsed.
    pub fn flush(&mut self, now: DateTime<Utc>) {
        if matches!(self.save_due, Some(due) if now >= due) {
            self.save_due = None;
            self.save_now();
        }
    }

    /// Immediate save, for teardown and slot switches. Failures are logged
    /// and swallowed; gameplay continues on the in-memory state.
    pub fn save_now(&mut self) {
        let blob = match serde_json::to_string(&self.records) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not serialize pet records");
                return;
            }
        };
        if let Err(e) = self.store.set(PETS_KEY, &blob) {
            warn!(error = %e, "background save failed; keeping in-memory state");
            return;
        }
        if let Err(e) = self.store.set(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_string()) {
            warn!(error = %e, "could not persist schema version marker");
        }
        debug!(records = self.records.len(), "saved pet records");
    }

    /// Wipe all persisted and in-memory state.
    pub fn clear_all(&mut self) {
        for key in [PETS_KEY, SCHEMA_VERSION_KEY, LAST_SLOT_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "could not clear blob");
            }
        }
        self.records.clear();
        self.slot = None;
        self.save_due = None;
        self.loaded = true;
    }

    fn schedule_save(&mut self, now: DateTime<Utc>) {
        self.save_due = Some(now + Duration::milliseconds(SAVE_DEBOUNCE_MS));
    }

    fn ensure_loaded(&mut self, now: DateTime<Utc>) {
        if self.loaded {
            return;
        }
        self.records = self.load_records(now);
        self.loaded = true;
    }

    /// Load, migrate and repair the persisted slot map. Every failure mode
    /// degrades to "less data", never to an error the player sees.
    fn load_records(&mut self, now: DateTime<Utc>) -> PetRecordMap {
        let raw = match self.store.get(PETS_KEY) {
            Ok(Some(s)) => s,
            Ok(None) => return PetRecordMap::new(),
            Err(e) => {
                warn!(error = %e, "could not read pet records; starting fresh");
                return PetRecordMap::new();
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "corrupt pet records blob; starting fresh");
                return PetRecordMap::new();
            }
        };

        let version = self.stored_schema_version();
        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "migrating pet records");
            return migrate(&value, version, &self.rules, now).unwrap_or_default();
        }

        let Some(entries) = value.as_object() else {
            warn!("pet records blob is not an object; starting fresh");
            return PetRecordMap::new();
        };
        let mut out = PetRecordMap::new();
        for (key, entry) in entries {
            let Some(slot) = CharacterSlot::parse(key) else {
                warn!(slot = %key, "ignoring unknown character slot");
                continue;
            };
            let rec = match validate(entry, &self.rules, now) {
                Ok(rec) => rec,
                Err(e) => {
                    warn!(slot = %key, error = %e, "invalid record; using sanitized fallback");
                    sanitize(entry, &self.rules, now)
                }
            };
            out.insert(slot, rec);
        }
        out
    }

    /// Missing marker plus existing data means the save predates the marker
    /// itself, which is the v1 era.
    fn stored_schema_version(&self) -> u32 {
        match self.store.get(SCHEMA_VERSION_KEY) {
            Ok(Some(s)) => s.trim().parse().unwrap_or(1),
            Ok(None) => 1,
            Err(e) => {
                warn!(error = %e, "could not read schema version; assuming current");
                SCHEMA_VERSION
            }
        }
    }
}
