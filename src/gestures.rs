use serde::Serialize;

use crate::config::{GestureTuning, MotionThresholds};
use crate::machine::CookingState;
use crate::motion::MotionSample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    None,
    /// A discrete, cooldown-gated burst of motion.
    Knead,
    /// Sustained motion; carries the magnitude it accumulates.
    Roll(f64),
}

/// Seconds since session start of the last recognised gestures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GestureTimers {
    pub last_knead: f64,
    pub last_rolling_motion: f64,
}

pub fn classify_knead(
    sample: &MotionSample,
    now: f64,
    timers: &GestureTimers,
    cooldown_secs: f64,
) -> bool {
    sample.detected && (now - timers.last_knead) > cooldown_secs
}

pub fn classify_rolling(sample: &MotionSample, rolling_threshold: f64) -> bool {
    sample.magnitude > rolling_threshold
}

#[derive(Debug)]
pub struct GestureClassifier {
    tuning: GestureTuning,
    rolling_threshold: f64,
    timers: GestureTimers,
}

impl GestureClassifier {
    pub fn new(tuning: GestureTuning, motion: &MotionThresholds) -> Self {
        Self {
            tuning,
            rolling_threshold: motion.rolling_motion_threshold,
            timers: GestureTimers::default(),
        }
    }

    pub fn timers(&self) -> &GestureTimers {
        &self.timers
    }

    /// Restart the cooldown clock, e.g. when the machine is reset at `now`.
    pub fn reset(&mut self, now: f64) {
        self.timers = GestureTimers {
            last_knead: now,
            last_rolling_motion: now,
        };
    }

    /// Pick the gesture relevant to `state` and stamp the matching timer.
    /// In `Initial` the wake-up is reported as `Knead` without a cooldown check.
    pub fn classify(&mut self, state: CookingState, sample: &MotionSample, now: f64) -> GestureEvent {
        match state {
            // Any detected motion wakes the dough; the knead clock is left alone.
            CookingState::Initial if sample.detected => GestureEvent::Knead,
            CookingState::Initial => GestureEvent::None,
            CookingState::Kneading => {
                if classify_knead(sample, now, &self.timers, self.tuning.knead_cooldown_secs) {
                    self.timers.last_knead = now;
                    GestureEvent::Knead
                } else {
                    GestureEvent::None
                }
            }
            CookingState::Rolling => {
                if classify_rolling(sample, self.rolling_threshold) {
                    self.timers.last_rolling_motion = now;
                    GestureEvent::Roll(sample.magnitude)
                } else {
                    GestureEvent::None
                }
            }
            CookingState::Cooking | CookingState::Done => GestureEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(m: f64) -> MotionSample {
        MotionSample::from_magnitude(m, 5000.0)
    }

    fn classifier() -> GestureClassifier {
        GestureClassifier::new(GestureTuning::default(), &MotionThresholds::default())
    }

    #[test]
    fn knead_needs_detection_and_elapsed_cooldown() {
        let timers = GestureTimers::default();
        assert!(!classify_knead(&sample(4000.0), 2.0, &timers, 1.0));
        assert!(!classify_knead(&sample(6000.0), 1.0, &timers, 1.0));
        assert!(classify_knead(&sample(6000.0), 1.01, &timers, 1.0));
    }

    #[test]
    fn rolling_ignores_cooldown_but_needs_higher_threshold() {
        assert!(!classify_rolling(&sample(6000.0), 10000.0));
        assert!(!classify_rolling(&sample(10000.0), 10000.0));
        assert!(classify_rolling(&sample(10000.5), 10000.0));
    }

    #[test]
    fn burst_within_cooldown_counts_once() {
        let mut c = classifier();
        let s = sample(6000.0);
        assert_eq!(c.classify(CookingState::Kneading, &s, 1.5), GestureEvent::Knead);
        assert_eq!(c.classify(CookingState::Kneading, &s, 1.6), GestureEvent::None);
        assert_eq!(c.classify(CookingState::Kneading, &s, 2.4), GestureEvent::None);
        assert_eq!(c.timers().last_knead, 1.5);
        assert_eq!(c.classify(CookingState::Kneading, &s, 2.6), GestureEvent::Knead);
    }

    #[test]
    fn every_sustained_frame_rolls() {
        let mut c = classifier();
        let s = sample(12000.0);
        for i in 0..3 {
            let now = 0.01 * i as f64;
            assert_eq!(c.classify(CookingState::Rolling, &s, now), GestureEvent::Roll(12000.0));
            assert_eq!(c.timers().last_rolling_motion, now);
        }
    }

    #[test]
    fn cooking_and_done_ignore_motion() {
        let mut c = classifier();
        let s = sample(50000.0);
        assert_eq!(c.classify(CookingState::Cooking, &s, 10.0), GestureEvent::None);
        assert_eq!(c.classify(CookingState::Done, &s, 10.0), GestureEvent::None);
    }

    #[test]
    fn wake_up_skips_cooldown_and_keeps_knead_clock() {
        let mut c = classifier();
        assert_eq!(c.classify(CookingState::Initial, &sample(4000.0), 0.1), GestureEvent::None);
        assert_eq!(c.classify(CookingState::Initial, &sample(6000.0), 0.2), GestureEvent::Knead);
        assert_eq!(c.timers().last_knead, 0.0);
        // the first real knead only waits out the cooldown from session start
        assert_eq!(c.classify(CookingState::Kneading, &sample(6000.0), 1.05), GestureEvent::Knead);
    }

    #[test]
    fn reset_restarts_cooldown() {
        let mut c = classifier();
        c.reset(20.0);
        assert_eq!(c.classify(CookingState::Kneading, &sample(6000.0), 20.5), GestureEvent::None);
        assert_eq!(c.classify(CookingState::Kneading, &sample(6000.0), 21.5), GestureEvent::Knead);
    }
}
