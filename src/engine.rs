//! Pure transition rules: every function takes the current record by value
//! and returns the successor. No I/O, no hidden state; `now` is always
//! injected so time-dependent behavior stays deterministic under test.

use crate::config::Rules;
use crate::model::{
    clamp_stat, hours_between, Action, PetRecord, SickReason, SleepQuality,
};
use chrono::{DateTime, Duration, Utc};

/// What a composed passive tick did, for the host to surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub stage_changed: Option<crate::model::LifeStage>,
    pub became_sick: bool,
    pub recovered: bool,
    pub died: bool,
}

impl TickEvents {
    pub fn any(&self) -> bool {
        self.stage_changed.is_some() || self.became_sick || self.recovered || self.died
    }
}

/// Result of a discrete action, for the host to surface (level-up fanfare).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub xp_gained: u32,
    pub leveled_up_to: Option<u32>,
}

/// Passive meter decay over elapsed wall time since the last interaction.
///
/// Skips entirely under `min_decay_hours` elapsed so sub-minute ticks do not
/// churn the record, and re-anchors `last_interaction_at` once applied.
pub fn apply_passive_decay(mut rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    if rec.is_dead {
        return rec;
    }
    let hours = rec.hours_since_interaction(now);
    if hours < rules.min_decay_hours {
        return rec;
    }

    let mut multiplier = rules.stage_decay_multiplier(rec.life_stage);
    if rec.is_sick {
        multiplier *= rules.sickness.sick_decay_multiplier;
    }

    rec.hunger = clamp_stat(rec.hunger - rules.decay.hunger * multiplier * hours);
    rec.happiness = clamp_stat(rec.happiness - rules.decay.happiness * multiplier * hours);
    rec.energy = clamp_stat(rec.energy - rules.decay.energy * multiplier * hours);
    rec.last_interaction_at = now;
    rec
}

/// Refresh the cached life stage from `now - created_at`. Runs even for dead
/// pets: the stage is a derived cache, not a passive system.
pub fn recompute_life_stage(mut rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    let stage = rules.stage_for_age(rec.age_hours(now));
    if stage != rec.life_stage {
        rec.life_stage = stage;
    }
    rec
}

/// Accumulate waste units and bleed health while the pile exceeds the healthy
/// threshold. The health drain is a rate over true elapsed time since it was
/// last applied, so tick cadence never changes the effective penalty.
pub fn accumulate_waste(mut rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    if rec.is_dead {
        return rec;
    }

    let hours_since_poop = hours_between(rec.last_poop_accumulation_at, now);
    let units = (hours_since_poop / rules.poop.interval_hours).floor() as u32;
    if units > 0 {
        rec.poop_count = (rec.poop_count + units).min(rules.poop.max_poop);
        rec.last_poop_accumulation_at = now;
    }

    let penalty_hours = hours_between(rec.last_waste_penalty_at, now);
    if rec.poop_count > rules.poop.healthy_threshold {
        let excess = (rec.poop_count - rules.poop.healthy_threshold) as f64;
        let hourly = excess * rules.poop.health_penalty_per_unit;
        rec.health = clamp_stat(rec.health - hourly * penalty_hours);
    }
    rec.last_waste_penalty_at = now;
    rec
}

/// Happiness drain while the lights stay on during the night window, again as
/// a rate over elapsed time since the last check, clamped to the current
/// night segment so daylight hours in the gap do not count.
pub fn apply_night_penalty(mut rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    if rec.is_dead {
        return rec;
    }
    if rules.sleep.is_night(now) && rec.lights_on {
        let elapsed = hours_between(rec.last_sleep_quality_check_at, now);
        let hours = elapsed.min(rules.sleep.hours_into_night(now));
        rec.happiness =
            clamp_stat(rec.happiness - rules.sleep.lights_on_happiness_per_hour * hours);
    }
    rec.last_sleep_quality_check_at = now;
    rec
}

/// Sickness onset and recovery use different thresholds (hysteresis), with at
/// most one transition per call. The death monitor runs last so a health
/// collapse in the same tick is caught immediately.
pub fn update_sickness_and_death(
    mut rec: PetRecord,
    rules: &Rules,
    now: DateTime<Utc>,
) -> PetRecord {
    if rec.is_dead {
        return rec;
    }

    let t = &rules.sickness;
    let neglect = rec.hours_since_interaction(now);

    let should_be_sick = rec.health < t.health_threshold
        || rec.poop_count >= t.poop_threshold
        || neglect >= t.neglect_hours;
    let can_recover = rec.health >= t.recovery_health_threshold
        && rec.poop_count < t.poop_threshold
        && neglect < t.neglect_hours;

    if should_be_sick && !rec.is_sick {
        rec.is_sick = true;
        rec.sick_since = Some(now);
    } else if can_recover && rec.is_sick {
        rec.is_sick = false;
        rec.sick_since = None;
    }

    if rec.health <= 0.0 {
        rec.is_dead = true;
        rec.death_at = Some(now);
    }
    rec
}

/// Why the pet is sick right now, reported in priority order: health breach,
/// then waste, then neglect. Pure query; derived, never stored.
pub fn sick_reason(rec: &PetRecord, rules: &Rules, now: DateTime<Utc>) -> Option<SickReason> {
    if !rec.is_sick {
        return None;
    }
    let t = &rules.sickness;
    if rec.health < t.health_threshold {
        return Some(SickReason::Health);
    }
    if rec.poop_count >= t.poop_threshold {
        return Some(SickReason::Poop);
    }
    if rec.hours_since_interaction(now) >= t.neglect_hours {
        return Some(SickReason::Neglect);
    }
    None
}

/// Current sleep quality: always good during the day, poor at night with the
/// lights on.
pub fn sleep_quality(rec: &PetRecord, rules: &Rules, now: DateTime<Utc>) -> SleepQuality {
    if rules.sleep.is_night(now) && rec.lights_on {
        SleepQuality::Poor
    } else {
        SleepQuality::Good
    }
}

/// Apply one discrete action. Dead pets ignore everything except `revive`;
/// cleaning an already-clean pet is a no-op. Every effective action grants
/// experience, re-anchors the interaction clock and clamps what it touched.
pub fn apply_action(
    mut rec: PetRecord,
    rules: &Rules,
    action: Action,
    now: DateTime<Utc>,
) -> (PetRecord, ActionOutcome) {
    if rec.is_dead {
        return (rec, ActionOutcome::default());
    }

    let xp = match action {
        Action::Feed => {
            apply_effects(&mut rec, &rules.actions.feed);
            rules.actions.feed.xp
        }
        Action::Play => {
            apply_effects(&mut rec, &rules.actions.play);
            rules.actions.play.xp
        }
        Action::Sleep(quality) => {
            let fx = rules.actions.sleep;
            let scale = match quality {
                SleepQuality::Good => rules.sleep.good_sleep_multiplier,
                SleepQuality::Poor => rules.sleep.poor_sleep_multiplier,
            };
            rec.energy = clamp_stat(rec.energy + fx.energy * scale);
            rec.hunger = clamp_stat(rec.hunger + fx.hunger);
            rec.happiness = clamp_stat(rec.happiness + fx.happiness);
            fx.xp
        }
        Action::Exercise => {
            // Callers gate this on `actions.exercise_min_energy`; the engine
            // stays permissive and just clamps.
            apply_effects(&mut rec, &rules.actions.exercise);
            rules.actions.exercise.xp
        }
        Action::Pet => {
            apply_effects(&mut rec, &rules.actions.pet);
            rules.actions.pet.xp
        }
        Action::Medicine => {
            apply_effects(&mut rec, &rules.actions.medicine);
            rules.actions.medicine.xp
        }
        Action::Clean => {
            if rec.poop_count == 0 {
                return (rec, ActionOutcome::default());
            }
            rec.poop_count = 0;
            rules.poop.clean_xp
        }
    };

    rec.last_interaction_at = now;
    let outcome = grant_experience(&mut rec, rules, xp);
    (rec, outcome)
}

fn apply_effects(rec: &mut PetRecord, fx: &crate::config::ActionEffects) {
    rec.hunger = clamp_stat(rec.hunger + fx.hunger);
    rec.happiness = clamp_stat(rec.happiness + fx.happiness);
    rec.energy = clamp_stat(rec.energy + fx.energy);
    rec.health = clamp_stat(rec.health + fx.health);
}

/// Grant experience and keep `level == experience / xp_per_level + 1`.
pub fn grant_experience(rec: &mut PetRecord, rules: &Rules, xp: u32) -> ActionOutcome {
    rec.experience = rec.experience.saturating_add(xp);
    let new_level = rec.experience / rules.xp_per_level.max(1) + 1;
    let leveled_up_to = if new_level > rec.level {
        rec.level = new_level;
        Some(new_level)
    } else {
        None
    };
    ActionOutcome {
        xp_gained: xp,
        leveled_up_to,
    }
}

/// Toggling the lights counts as an interaction.
pub fn toggle_lights(mut rec: PetRecord, now: DateTime<Utc>) -> PetRecord {
    if rec.is_dead {
        return rec;
    }
    rec.lights_on = !rec.lights_on;
    rec.last_interaction_at = now;
    rec
}

pub fn can_revive(rec: &PetRecord, rules: &Rules, now: DateTime<Utc>) -> bool {
    if !rec.is_dead {
        return false;
    }
    match rec.death_at {
        Some(at) => now - at >= Duration::milliseconds(rules.revival.cooldown_ms),
        None => true,
    }
}

/// Bring a dead pet back: clears death and sickness, restores the configured
/// mid-level stats, empties the waste pile and re-anchors every clock.
pub fn revive(mut rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> PetRecord {
    if !can_revive(&rec, rules, now) {
        return rec;
    }
    rec.is_dead = false;
    rec.death_at = None;
    rec.is_sick = false;
    rec.sick_since = None;
    rec.health = rules.revival.health;
    rec.hunger = rules.revival.hunger;
    rec.energy = rules.revival.energy;
    rec.happiness = rules.revival.happiness;
    rec.poop_count = 0;
    rec.last_interaction_at = now;
    rec.last_poop_accumulation_at = now;
    rec.last_waste_penalty_at = now;
    rec.last_sleep_quality_check_at = now;
    rec
}

/// One composed passive step, in a fixed order: stage refresh, waste, night
/// penalty, sickness/death, then decay. Sickness must see the pre-decay
/// interaction anchor (decay re-anchors it), and the death monitor must see
/// health already drained by waste.
pub fn tick(rec: PetRecord, rules: &Rules, now: DateTime<Utc>) -> (PetRecord, TickEvents) {
    let before_stage = rec.life_stage;
    let before_sick = rec.is_sick;
    let before_dead = rec.is_dead;

    let rec = recompute_life_stage(rec, rules, now);
    let rec = accumulate_waste(rec, rules, now);
    let rec = apply_night_penalty(rec, rules, now);
    let rec = update_sickness_and_death(rec, rules, now);
    let rec = apply_passive_decay(rec, rules, now);

    let events = TickEvents {
        stage_changed: (rec.life_stage != before_stage).then_some(rec.life_stage),
        became_sick: rec.is_sick && !before_sick,
        recovered: !rec.is_sick && before_sick,
        died: rec.is_dead && !before_dead,
    };
    (rec, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifeStage;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// A teen-aged record so the stage decay multiplier is exactly 1.0.
    fn teen_record(now: DateTime<Utc>) -> PetRecord {
        let mut rec = PetRecord::new(now - Duration::hours(200));
        rec.life_stage = LifeStage::Teen;
        rec.last_interaction_at = now;
        rec.last_poop_accumulation_at = now;
        rec.last_waste_penalty_at = now;
        rec.last_sleep_quality_check_at = now;
        rec
    }

    #[test]
    fn decay_two_hours_at_unit_multiplier() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.hunger = 100.0;
        rec.happiness = 100.0;
        rec.energy = 100.0;
        rec.last_interaction_at = now - Duration::hours(2);

        let out = apply_passive_decay(rec, &rules, now);
        assert_eq!(out.hunger, 80.0);
        assert_eq!(out.happiness, 84.0);
        assert_eq!(out.energy, 76.0);
        assert_eq!(out.last_interaction_at, now);
    }

    #[test]
    fn decay_skips_under_six_minutes() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_interaction_at = now - Duration::minutes(5);
        let before = rec.clone();
        assert_eq!(apply_passive_decay(rec, &rules, now), before);
    }

    #[test]
    fn decay_clamps_after_a_year_away() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_interaction_at = now - Duration::days(365);
        let out = apply_passive_decay(rec, &rules, now);
        assert_eq!(out.hunger, 0.0);
        assert_eq!(out.happiness, 0.0);
        assert_eq!(out.energy, 0.0);
    }

    #[test]
    fn sick_pets_decay_faster() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.hunger = 100.0;
        rec.is_sick = true;
        rec.sick_since = Some(now);
        rec.last_interaction_at = now - Duration::hours(1);
        let out = apply_passive_decay(rec, &rules, now);
        // 10/hr * 1.0 stage * 1.5 sick
        assert_eq!(out.hunger, 85.0);
    }

    #[test]
    fn decay_is_monotonic_until_zero() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_interaction_at = now - Duration::hours(1);
        let mut prev = (rec.hunger, rec.happiness, rec.energy);
        let mut t = now;
        for _ in 0..40 {
            rec = apply_passive_decay(rec, &rules, t);
            assert!(rec.hunger <= prev.0);
            assert!(rec.happiness <= prev.1);
            assert!(rec.energy <= prev.2);
            prev = (rec.hunger, rec.happiness, rec.energy);
            t += Duration::hours(1);
        }
        assert_eq!(rec.hunger, 0.0);
    }

    #[test]
    fn life_stage_boundaries_are_exact() {
        let rules = Rules::default();
        let created = at(1_700_000_000_000);
        let rec = PetRecord::new(created);

        let almost = created + Duration::milliseconds((47.99 * 3_600_000.0) as i64);
        assert_eq!(
            recompute_life_stage(rec.clone(), &rules, almost).life_stage,
            LifeStage::Baby
        );
        let boundary = created + Duration::hours(48);
        assert_eq!(
            recompute_life_stage(rec.clone(), &rules, boundary).life_stage,
            LifeStage::Child
        );
        let teen = created + Duration::hours(144);
        assert_eq!(
            recompute_life_stage(rec, &rules, teen).life_stage,
            LifeStage::Teen
        );
    }

    #[test]
    fn waste_accumulates_floor_of_elapsed_over_interval() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_poop_accumulation_at = now - Duration::hours(9);
        rec.last_waste_penalty_at = now - Duration::hours(9);
        let out = accumulate_waste(rec, &rules, now);
        assert_eq!(out.poop_count, 2);
        assert_eq!(out.last_poop_accumulation_at, now);
    }

    #[test]
    fn waste_count_caps_at_max() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_poop_accumulation_at = now - Duration::days(30);
        let out = accumulate_waste(rec, &rules, now);
        assert_eq!(out.poop_count, rules.poop.max_poop);
    }

    #[test]
    fn excess_waste_drains_health_by_elapsed_time() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.poop_count = 8;
        rec.health = 50.0;
        rec.last_waste_penalty_at = now - Duration::minutes(30);
        let out = accumulate_waste(rec, &rules, now);
        // (8 - 5) * 2.0/hr over half an hour
        assert_eq!(out.health, 47.0);
        assert_eq!(out.last_waste_penalty_at, now);
    }

    #[test]
    fn healthy_pile_costs_nothing() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.poop_count = 5;
        rec.health = 50.0;
        rec.last_waste_penalty_at = now - Duration::hours(2);
        assert_eq!(accumulate_waste(rec, &rules, now).health, 50.0);
    }

    #[test]
    fn no_sickness_without_a_trigger() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 16.0;
        rec.poop_count = 3;
        rec.last_interaction_at = now - Duration::hours(1);
        let out = update_sickness_and_death(rec, &rules, now);
        assert!(!out.is_sick);
        assert!(out.sick_since.is_none());
    }

    #[test]
    fn low_health_triggers_sickness() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 14.0;
        rec.poop_count = 3;
        rec.last_interaction_at = now - Duration::hours(1);
        let out = update_sickness_and_death(rec, &rules, now);
        assert!(out.is_sick);
        assert_eq!(out.sick_since, Some(now));
        assert_eq!(sick_reason(&out, &rules, now), Some(SickReason::Health));
    }

    #[test]
    fn recovery_uses_the_higher_threshold() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 10.0;
        rec.last_interaction_at = now;
        rec = update_sickness_and_death(rec, &rules, now);
        assert!(rec.is_sick);

        // Above onset (15) but below recovery (50): still sick.
        rec.health = 30.0;
        rec = update_sickness_and_death(rec, &rules, now);
        assert!(rec.is_sick);

        rec.health = 55.0;
        rec = update_sickness_and_death(rec, &rules, now);
        assert!(!rec.is_sick);
        assert!(rec.sick_since.is_none());
    }

    #[test]
    fn sick_reason_priority_health_then_poop_then_neglect() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.is_sick = true;
        rec.sick_since = Some(now);
        rec.health = 10.0;
        rec.poop_count = 8;
        rec.last_interaction_at = now - Duration::hours(60);
        assert_eq!(sick_reason(&rec, &rules, now), Some(SickReason::Health));
        rec.health = 40.0;
        assert_eq!(sick_reason(&rec, &rules, now), Some(SickReason::Poop));
        rec.poop_count = 2;
        assert_eq!(sick_reason(&rec, &rules, now), Some(SickReason::Neglect));
    }

    #[test]
    fn neglect_alone_makes_a_pet_sick() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_interaction_at = now - Duration::hours(48);
        let out = update_sickness_and_death(rec, &rules, now);
        assert!(out.is_sick);
        assert_eq!(sick_reason(&out, &rules, now), Some(SickReason::Neglect));
    }

    #[test]
    fn zero_health_kills() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 0.0;
        let out = update_sickness_and_death(rec, &rules, now);
        assert!(out.is_dead);
        assert_eq!(out.death_at, Some(now));
    }

    #[test]
    fn dead_pets_are_frozen() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.is_dead = true;
        rec.death_at = Some(now - Duration::hours(5));
        rec.last_interaction_at = now - Duration::days(10);
        rec.last_poop_accumulation_at = now - Duration::days(10);
        rec.last_waste_penalty_at = now - Duration::days(10);
        rec.last_sleep_quality_check_at = now - Duration::days(10);
        let before = rec.clone();

        let rec = apply_passive_decay(rec, &rules, now);
        let rec = accumulate_waste(rec, &rules, now);
        let rec = apply_night_penalty(rec, &rules, now);
        let rec = update_sickness_and_death(rec, &rules, now);
        assert_eq!(rec, before);

        let (rec, _) = apply_action(rec, &rules, Action::Feed, now);
        assert_eq!(rec, before);
    }

    #[test]
    fn night_lights_on_drains_happiness() {
        let rules = Rules::default();
        // 23:00, one hour into the night window.
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let mut rec = teen_record(now);
        rec.happiness = 50.0;
        rec.lights_on = true;
        // Anchor two hours back; only the one night hour counts.
        rec.last_sleep_quality_check_at = now - Duration::hours(2);
        let out = apply_night_penalty(rec, &rules, now);
        assert_eq!(out.happiness, 45.0);
        assert_eq!(out.last_sleep_quality_check_at, now);
    }

    #[test]
    fn night_lights_off_costs_nothing() {
        let rules = Rules::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let mut rec = teen_record(now);
        rec.happiness = 50.0;
        rec.lights_on = false;
        rec.last_sleep_quality_check_at = now - Duration::hours(2);
        let out = apply_night_penalty(rec, &rules, now);
        assert_eq!(out.happiness, 50.0);
    }

    #[test]
    fn daytime_is_always_penalty_free() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.happiness = 50.0;
        rec.last_sleep_quality_check_at = now - Duration::hours(3);
        assert_eq!(apply_night_penalty(rec, &rules, now).happiness, 50.0);
    }

    #[test]
    fn sleep_quality_depends_on_lights_and_hour() {
        let rules = Rules::default();
        let night = Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let day = noon();
        let mut rec = teen_record(day);
        rec.lights_on = true;
        assert_eq!(sleep_quality(&rec, &rules, day), SleepQuality::Good);
        assert_eq!(sleep_quality(&rec, &rules, night), SleepQuality::Poor);
        rec.lights_on = false;
        assert_eq!(sleep_quality(&rec, &rules, night), SleepQuality::Good);
    }

    #[test]
    fn medicine_adds_then_clamps() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 5.0;
        let (out, _) = apply_action(rec, &rules, Action::Medicine, now);
        assert_eq!(out.health, 35.0);
        assert!(!out.is_dead);
    }

    #[test]
    fn feed_raises_hunger_and_costs_energy() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now - Duration::hours(1));
        rec.hunger = 95.0;
        rec.energy = 3.0;
        let (out, outcome) = apply_action(rec, &rules, Action::Feed, now);
        assert_eq!(out.hunger, 100.0);
        assert_eq!(out.energy, 0.0);
        assert_eq!(out.experience, 10);
        assert_eq!(out.last_interaction_at, now);
        assert_eq!(outcome.xp_gained, 10);
    }

    #[test]
    fn good_and_poor_sleep_scale_the_energy_gain() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.energy = 20.0;
        let (good, _) = apply_action(rec.clone(), &rules, Action::Sleep(SleepQuality::Good), now);
        assert_eq!(good.energy, 80.0); // 20 + 40 * 1.5
        let (poor, _) = apply_action(rec, &rules, Action::Sleep(SleepQuality::Poor), now);
        assert_eq!(poor.energy, 40.0); // 20 + 40 * 0.5
    }

    #[test]
    fn clean_resets_the_pile_and_is_a_noop_when_clean() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.poop_count = 4;
        let (out, outcome) = apply_action(rec, &rules, Action::Clean, now);
        assert_eq!(out.poop_count, 0);
        assert_eq!(outcome.xp_gained, 10);

        let before = out.clone();
        let (again, outcome) = apply_action(out, &rules, Action::Clean, now);
        assert_eq!(again, before);
        assert_eq!(outcome, ActionOutcome::default());
    }

    #[test]
    fn level_stays_consistent_across_action_sequences() {
        let rules = Rules::default();
        let mut now = noon();
        let mut rec = teen_record(now);
        let sequence = [
            Action::Feed,
            Action::Play,
            Action::Exercise,
            Action::Pet,
            Action::Play,
            Action::Feed,
            Action::Exercise,
            Action::Medicine,
            Action::Play,
            Action::Exercise,
        ];
        for action in sequence.iter().cycle().take(40) {
            let (next, _) = apply_action(rec, &rules, *action, now);
            rec = next;
            assert_eq!(rec.level, rec.experience / rules.xp_per_level + 1);
            now += Duration::minutes(1);
        }
        assert!(rec.level > 1);
    }

    #[test]
    fn level_up_is_reported_once() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.experience = 95;
        let (rec, outcome) = apply_action(rec, &rules, Action::Feed, now);
        assert_eq!(rec.level, 2);
        assert_eq!(outcome.leveled_up_to, Some(2));
        let (rec, outcome) = apply_action(rec, &rules, Action::Pet, now);
        assert_eq!(rec.level, 2);
        assert_eq!(outcome.leveled_up_to, None);
    }

    #[test]
    fn revive_restores_mid_stats_and_clears_death() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.is_dead = true;
        rec.death_at = Some(now - Duration::hours(1));
        rec.is_sick = true;
        rec.sick_since = Some(now - Duration::hours(2));
        rec.health = 0.0;
        rec.poop_count = 9;

        let out = revive(rec, &rules, now);
        assert!(!out.is_dead);
        assert!(out.death_at.is_none());
        assert!(!out.is_sick);
        assert!(out.sick_since.is_none());
        assert_eq!(out.health, 50.0);
        assert_eq!(out.hunger, 50.0);
        assert_eq!(out.energy, 50.0);
        assert_eq!(out.happiness, 50.0);
        assert_eq!(out.poop_count, 0);
        assert_eq!(out.last_interaction_at, now);
    }

    #[test]
    fn revive_ignores_the_living() {
        let rules = Rules::default();
        let now = noon();
        let rec = teen_record(now);
        let before = rec.clone();
        assert_eq!(revive(rec, &rules, now), before);
    }

    #[test]
    fn revival_cooldown_is_honored_when_configured() {
        let mut rules = Rules::default();
        rules.revival.cooldown_ms = 60_000;
        let now = noon();
        let mut rec = teen_record(now);
        rec.is_dead = true;
        rec.death_at = Some(now - Duration::seconds(30));
        assert!(!can_revive(&rec, &rules, now));
        let still_dead = revive(rec.clone(), &rules, now);
        assert!(still_dead.is_dead);
        rec.death_at = Some(now - Duration::seconds(90));
        assert!(can_revive(&rec, &rules, now));
    }

    #[test]
    fn tick_reports_death_from_waste_drain() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.health = 1.0;
        rec.poop_count = 10;
        rec.last_waste_penalty_at = now - Duration::hours(2);
        let (out, events) = tick(rec, &rules, now);
        assert!(out.is_dead);
        assert!(events.died);
    }

    #[test]
    fn tick_keeps_stage_cache_fresh() {
        let rules = Rules::default();
        let created = noon() - Duration::hours(49);
        let mut rec = PetRecord::new(created);
        rec.last_interaction_at = noon();
        rec.last_poop_accumulation_at = noon();
        rec.last_waste_penalty_at = noon();
        rec.last_sleep_quality_check_at = noon();
        let (out, events) = tick(rec, &rules, noon());
        assert_eq!(out.life_stage, LifeStage::Child);
        assert_eq!(events.stage_changed, Some(LifeStage::Child));
    }

    #[test]
    fn tick_sees_neglect_before_decay_reanchors() {
        let rules = Rules::default();
        let now = noon();
        let mut rec = teen_record(now);
        rec.last_interaction_at = now - Duration::hours(50);
        rec.last_poop_accumulation_at = now;
        rec.last_waste_penalty_at = now;
        rec.last_sleep_quality_check_at = now;
        let (out, events) = tick(rec, &rules, now);
        assert!(out.is_sick);
        assert!(events.became_sick);
        // Decay ran afterwards and re-anchored the clock.
        assert_eq!(out.last_interaction_at, now);
    }
}
