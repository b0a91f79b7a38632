//! Parameter types for encoding and quality search.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the [`search`](crate::search) engine (which decides which encodings to try)
//! and the [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100). Clamped on construction.
//! - [`SearchTuning`] — Smart-optimize step-down schedule (attempts, step, floor).

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Step-down schedule used by smart optimize.
///
/// Each retry lowers quality by `max(min_step, step_fraction * initial)`,
/// never going below `quality_floor`. At most `max_attempts` retries run per
/// candidate format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchTuning {
    pub max_attempts: u32,
    pub step_fraction: f32,
    pub min_step: u32,
    pub quality_floor: u32,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            step_fraction: 0.35,
            min_step: 5,
            quality_floor: 15,
        }
    }
}

impl SearchTuning {
    /// Quality decrement applied on each retry, for a given initial quality.
    pub fn step_for(&self, initial: Quality) -> u32 {
        let proportional = (initial.value() as f32 * self.step_fraction).round() as u32;
        proportional.max(self.min_step).max(1)
    }

    /// The next quality to try after `current`, or `None` once the floor is hit.
    pub fn next_quality(&self, initial: Quality, current: Quality) -> Option<Quality> {
        let next = current
            .value()
            .saturating_sub(self.step_for(initial))
            .max(self.quality_floor);
        (next < current.value()).then(|| Quality::new(next))
    }

    /// Every quality a full step-down would visit after `initial`, in order.
    pub fn schedule(&self, initial: Quality) -> Vec<Quality> {
        let mut out = Vec::new();
        let mut current = initial;
        while out.len() < self.max_attempts as usize {
            match self.next_quality(initial, current) {
                Some(next) => {
                    out.push(next);
                    current = next;
                }
                None => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn step_is_proportional_above_minimum() {
        let tuning = SearchTuning::default();
        assert_eq!(tuning.step_for(Quality::new(80)), 28);
        assert_eq!(tuning.step_for(Quality::new(100)), 35);
    }

    #[test]
    fn step_never_below_minimum() {
        let tuning = SearchTuning::default();
        assert_eq!(tuning.step_for(Quality::new(10)), 5);
    }

    #[test]
    fn schedule_stops_at_floor() {
        let tuning = SearchTuning::default();
        let qualities: Vec<u32> = tuning
            .schedule(Quality::new(80))
            .into_iter()
            .map(Quality::value)
            .collect();
        assert_eq!(qualities, vec![52, 24, 15]);
    }

    #[test]
    fn schedule_capped_by_max_attempts() {
        let tuning = SearchTuning {
            step_fraction: 0.0,
            ..SearchTuning::default()
        };
        let qualities: Vec<u32> = tuning
            .schedule(Quality::new(100))
            .into_iter()
            .map(Quality::value)
            .collect();
        assert_eq!(qualities, vec![95, 90, 85, 80, 75, 70]);
    }

    #[test]
    fn schedule_empty_when_starting_below_floor() {
        let tuning = SearchTuning::default();
        assert!(tuning.schedule(Quality::new(10)).is_empty());
    }
}
