//! Random flavor events: small stat perturbations the host may surface every
//! few minutes. Deliberately thin; the interesting rules live in `engine`.

use crate::config::Rules;
use crate::engine::{grant_experience, ActionOutcome};
use crate::model::{clamp_stat, PetRecord};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EventEffects {
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub health: f64,
    pub experience: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomEvent {
    pub title: &'static str,
    pub message: &'static str,
    pub effects: EventEffects,
}

pub const EVENTS: &[RandomEvent] = &[
    RandomEvent {
        title: "Found a treat!",
        message: "Your pet found a little snack on the ground!",
        effects: EventEffects {
            hunger: 10.0,
            happiness: 15.0,
            experience: 5,
            ..zero()
        },
    },
    RandomEvent {
        title: "Met a friend",
        message: "Your pet ran into an old friend and had a great time!",
        effects: EventEffects {
            happiness: 20.0,
            experience: 10,
            ..zero()
        },
    },
    RandomEvent {
        title: "Slept badly",
        message: "Your pet slept poorly last night and feels tired.",
        effects: EventEffects {
            energy: -15.0,
            happiness: -5.0,
            ..zero()
        },
    },
    RandomEvent {
        title: "Stomach ache",
        message: "Your pet has a bit of a stomach ache after eating too much.",
        effects: EventEffects {
            health: -10.0,
            hunger: -10.0,
            happiness: -10.0,
            ..zero()
        },
    },
    RandomEvent {
        title: "Perfect weather!",
        message: "It is a beautiful day outside and your pet feels fantastic!",
        effects: EventEffects {
            happiness: 15.0,
            energy: 10.0,
            experience: 5,
            ..zero()
        },
    },
    RandomEvent {
        title: "Found an energy drink",
        message: "Your pet found an energy drink!",
        effects: EventEffects {
            energy: 20.0,
            experience: 5,
            ..zero()
        },
    },
    RandomEvent {
        title: "Got a scrape",
        message: "Your pet scraped itself a little while playing.",
        effects: EventEffects {
            health: -5.0,
            happiness: -5.0,
            ..zero()
        },
    },
    RandomEvent {
        title: "Surprise present!",
        message: "Your pet received a surprise present!",
        effects: EventEffects {
            happiness: 25.0,
            experience: 15,
            ..zero()
        },
    },
    RandomEvent {
        title: "Extra workout",
        message: "Your pet felt motivated and got some extra exercise!",
        effects: EventEffects {
            health: 10.0,
            energy: -10.0,
            experience: 15,
            ..zero()
        },
    },
    RandomEvent {
        title: "Rainy day",
        message: "It is raining and your pet feels a little down.",
        effects: EventEffects {
            happiness: -10.0,
            energy: -5.0,
            ..zero()
        },
    },
];

const fn zero() -> EventEffects {
    EventEffects {
        hunger: 0.0,
        happiness: 0.0,
        energy: 0.0,
        health: 0.0,
        experience: 0,
    }
}

/// Counter-based SplitMix64: deterministic, replayable, no state beyond a
/// seed and a call counter.
#[derive(Clone, Copy, Debug)]
pub struct EventRng {
    seed: u64,
    counter: u64,
}

impl EventRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }

    fn next_u64(&mut self) -> u64 {
        let mut z = self
            .seed
            .wrapping_add(self.counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.counter = self.counter.wrapping_add(1);
        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    pub fn pick(&mut self) -> &'static RandomEvent {
        let idx = (self.next_u64() % EVENTS.len() as u64) as usize;
        &EVENTS[idx]
    }
}

/// Apply an event's perturbations. Dead pets are untouched; stats clamp and
/// experience keeps the level consistent, same as any action.
pub fn apply_event(
    mut rec: PetRecord,
    rules: &Rules,
    event: &RandomEvent,
) -> (PetRecord, ActionOutcome) {
    if rec.is_dead {
        return (rec, ActionOutcome::default());
    }
    let fx = event.effects;
    rec.hunger = clamp_stat(rec.hunger + fx.hunger);
    rec.happiness = clamp_stat(rec.happiness + fx.happiness);
    rec.energy = clamp_stat(rec.energy + fx.energy);
    rec.health = clamp_stat(rec.health + fx.health);
    let outcome = grant_experience(&mut rec, rules, fx.experience);
    (rec, outcome)
}
