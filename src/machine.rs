//! The cooking lifecycle: Initial → Kneading → Rolling → Cooking → Done.
//!
//! [`step`] is a pure transition over `(state, progress, event, now)`.
//! [`Machine`] owns the current pair and is the only writer of it.

use log::info;
use serde::Serialize;

use crate::config::{DoughSettings, GestureTuning};
use crate::gestures::GestureEvent;
use crate::render::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookingState {
    Initial,
    Kneading,
    Rolling,
    Cooking,
    Done,
}

impl CookingState {
    pub fn name(self) -> &'static str {
        match self {
            CookingState::Initial => "initial",
            CookingState::Kneading => "kneading",
            CookingState::Rolling => "rolling",
            CookingState::Cooking => "cooking",
            CookingState::Done => "done",
        }
    }

    fn entry_message(self) -> &'static str {
        match self {
            CookingState::Initial => "Fresh dough, wave your hands to start.",
            CookingState::Kneading => "Starting to knead the dough!",
            CookingState::Rolling => "Dough is ready to be rolled!",
            CookingState::Cooking => "Chappathi is rolled! Cooking...",
            CookingState::Done => "Chappathi is ready!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressState {
    pub knead_count: u32,
    /// 0..=100
    pub rolling_progress: f64,
    pub dough_radius: f64,
    /// Seconds since session start; set once, on the frame cooking begins.
    pub cooking_start_time: Option<f64>,
    pub cooking_elapsed_time: f64,
    /// 0..=100
    pub cooking_percentage: f64,
}

impl ProgressState {
    pub fn new(dough: &DoughSettings) -> Self {
        Self {
            knead_count: 0,
            rolling_progress: 0.0,
            dough_radius: dough.base_radius,
            cooking_start_time: None,
            cooking_elapsed_time: 0.0,
            cooking_percentage: 0.0,
        }
    }
}

/// Per-channel blend from raw to cooked dough at `percentage` (clamped to 0..=100).
pub fn cooking_color(dough: &DoughSettings, percentage: f64) -> Rgb {
    dough.raw_color.lerp(dough.cooked_color, percentage / 100.0)
}

pub fn step(
    state: CookingState,
    mut p: ProgressState,
    event: GestureEvent,
    now: f64,
    tuning: &GestureTuning,
    dough: &DoughSettings,
) -> (CookingState, ProgressState) {
    match state {
        CookingState::Initial => match event {
            GestureEvent::Knead => (CookingState::Kneading, p),
            _ => (state, p),
        },

        CookingState::Kneading => {
            if event != GestureEvent::Knead {
                return (state, p);
            }
            p.knead_count += 1;
            p.dough_radius = (p.dough_radius - dough.knead_shrink_step).max(dough.min_radius);
            if p.knead_count >= tuning.kneads_required {
                (CookingState::Rolling, p)
            } else {
                (state, p)
            }
        }

        CookingState::Rolling => {
            let GestureEvent::Roll(magnitude) = event else {
                return (state, p);
            };
            let delta = tuning.rolling_speed_factor * magnitude;
            p.rolling_progress += delta;
            p.dough_radius = (p.dough_radius + delta).min(dough.max_radius);
            if p.rolling_progress >= 100.0 {
                p.rolling_progress = 100.0;
                p.dough_radius = dough.max_radius;
                p.cooking_start_time = Some(now);
                p.cooking_elapsed_time = 0.0;
                p.cooking_percentage = 0.0;
                (CookingState::Cooking, p)
            } else {
                (state, p)
            }
        }

        CookingState::Cooking => {
            let start = *p.cooking_start_time.get_or_insert(now);
            p.cooking_elapsed_time = (now - start).max(0.0);
            p.cooking_percentage =
                (p.cooking_elapsed_time / dough.cook_duration_secs).min(1.0) * 100.0;
            if p.cooking_percentage >= 100.0 {
                (CookingState::Done, p)
            } else {
                (state, p)
            }
        }

        CookingState::Done => (state, p),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CookingState,
    pub to: CookingState,
}

#[derive(Debug)]
pub struct Machine {
    tuning: GestureTuning,
    dough: DoughSettings,
    state: CookingState,
    progress: ProgressState,
}

impl Machine {
    pub fn new(tuning: GestureTuning, dough: DoughSettings) -> Self {
        let progress = ProgressState::new(&dough);
        Self {
            tuning,
            dough,
            state: CookingState::Initial,
            progress,
        }
    }

    pub fn state(&self) -> CookingState {
        self.state
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn dough(&self) -> &DoughSettings {
        &self.dough
    }

    pub fn tuning(&self) -> &GestureTuning {
        &self.tuning
    }

    /// Back to Initial with fresh dough.
    pub fn reset(&mut self) {
        self.state = CookingState::Initial;
        self.progress = ProgressState::new(&self.dough);
        info!("{}", self.state.entry_message());
    }

    pub fn update(&mut self, event: GestureEvent, now: f64) -> Option<Transition> {
        let before = self.progress.knead_count;
        let (next, progress) = step(self.state, self.progress, event, now, &self.tuning, &self.dough);
        self.progress = progress;

        if progress.knead_count != before {
            info!("Kneaded {} times!", progress.knead_count);
        }
        if next == self.state {
            return None;
        }
        let t = Transition {
            from: self.state,
            to: next,
        };
        self.state = next;
        info!("{}", next.entry_message());
        Some(t)
    }
}
