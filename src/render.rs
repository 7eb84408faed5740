//! What to draw for the current state. Drawing itself happens elsewhere.

use serde::{Deserialize, Serialize};

use crate::config::DoughSettings;
use crate::gestures::GestureTimers;
use crate::machine::{CookingState, ProgressState, cooking_color};

pub const STROKE_COLOR: Rgb = Rgb([180, 180, 180]);
pub const STROKE_WIDTH: u32 = 5;
pub const PUFF_COLOR: Rgb = Rgb([255, 255, 255]);
pub const PUFF_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Linear blend toward `to`; `t` is clamped to [0, 1].
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 3];
        for (i, c) in out.iter_mut().enumerate() {
            let a = self.0[i] as f64;
            let b = to.0[i] as f64;
            *c = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnchor {
    TopLeft,
    TopCenter,
    BottomCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayText {
    pub text: String,
    pub anchor: TextAnchor,
    /// Line index from the anchor edge.
    pub line: u32,
    pub emphasis: bool,
}

impl OverlayText {
    fn new(text: impl Into<String>, anchor: TextAnchor, line: u32, emphasis: bool) -> Self {
        Self {
            text: text.into(),
            anchor,
            line,
            emphasis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDescriptor {
    pub state: CookingState,
    pub radius: f64,
    pub fill_color: Rgb,
    pub stroke_color: Rgb,
    pub stroke_width: u32,
    pub inner_puff_radius: Option<f64>,
    pub inner_puff_color: Option<Rgb>,
    pub overlay: Vec<OverlayText>,
}

pub fn build(
    state: CookingState,
    progress: &ProgressState,
    dough: &DoughSettings,
    kneads_required: u32,
) -> RenderDescriptor {
    let fill_color = match state {
        CookingState::Initial | CookingState::Kneading | CookingState::Rolling => dough.raw_color,
        CookingState::Cooking => cooking_color(dough, progress.cooking_percentage),
        CookingState::Done => dough.cooked_color,
    };
    let done = state == CookingState::Done;

    RenderDescriptor {
        state,
        radius: progress.dough_radius,
        fill_color,
        stroke_color: STROKE_COLOR,
        stroke_width: STROKE_WIDTH,
        inner_puff_radius: done.then(|| progress.dough_radius * PUFF_RATIO),
        inner_puff_color: done.then_some(PUFF_COLOR),
        overlay: overlay_text(state, progress, kneads_required),
    }
}

pub fn overlay_text(
    state: CookingState,
    progress: &ProgressState,
    kneads_required: u32,
) -> Vec<OverlayText> {
    use TextAnchor::*;
    match state {
        CookingState::Initial => vec![OverlayText::new("Wave your hands to start!", TopLeft, 0, true)],
        CookingState::Kneading => vec![
            OverlayText::new(
                format!("Knead count: {}/{}", progress.knead_count, kneads_required),
                TopLeft,
                0,
                true,
            ),
            OverlayText::new("Make quick motions to knead!", TopLeft, 1, false),
        ],
        CookingState::Rolling => vec![
            OverlayText::new(
                format!("Rolling Progress: {}%", progress.rolling_progress as u32),
                TopLeft,
                0,
                true,
            ),
            OverlayText::new("Make continuous motions to roll!", TopLeft, 1, false),
        ],
        CookingState::Cooking => vec![OverlayText::new("Cooking...", TopCenter, 0, true)],
        CookingState::Done => vec![
            OverlayText::new("Voila! Your chappathi is ready!", TopCenter, 0, true),
            OverlayText::new("Press Ctrl-C to exit.", BottomCenter, 0, false),
        ],
    }
}

/// One-line status for logs.
pub fn status_line(state: CookingState, progress: &ProgressState, timers: &GestureTimers) -> String {
    format!(
        "state={} kneads={} rolled={:.1}% radius={:.1} cooked={:.0}% last_knead={:.2}s last_roll={:.2}s",
        state.name(),
        progress.knead_count,
        progress.rolling_progress,
        progress.dough_radius,
        progress.cooking_percentage,
        timers.last_knead,
        timers.last_rolling_motion,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dough() -> DoughSettings {
        DoughSettings::default()
    }

    #[test]
    fn raw_dough_until_cooking() {
        let d = dough();
        let p = ProgressState::new(&d);
        for s in [CookingState::Initial, CookingState::Kneading, CookingState::Rolling] {
            let r = build(s, &p, &d, 5);
            assert_eq!(r.fill_color, d.raw_color);
            assert_eq!(r.radius, 50.0);
            assert_eq!(r.inner_puff_radius, None);
        }
    }

    #[test]
    fn cooking_fill_follows_percentage() {
        let d = dough();
        let mut p = ProgressState::new(&d);
        p.cooking_percentage = 0.0;
        assert_eq!(build(CookingState::Cooking, &p, &d, 5).fill_color, d.raw_color);
        p.cooking_percentage = 100.0;
        assert_eq!(build(CookingState::Cooking, &p, &d, 5).fill_color, d.cooked_color);
    }

    #[test]
    fn done_requests_puffed_center() {
        let d = dough();
        let mut p = ProgressState::new(&d);
        p.dough_radius = 120.0;
        let r = build(CookingState::Done, &p, &d, 5);
        assert_eq!(r.fill_color, d.cooked_color);
        assert_eq!(r.inner_puff_radius, Some(84.0));
        assert_eq!(r.inner_puff_color, Some(PUFF_COLOR));
        assert_eq!(r.stroke_color, STROKE_COLOR);
    }

    #[test]
    fn overlay_reports_counters() {
        let d = dough();
        let mut p = ProgressState::new(&d);
        p.knead_count = 3;
        p.rolling_progress = 42.9;
        let k = overlay_text(CookingState::Kneading, &p, 5);
        assert_eq!(k[0].text, "Knead count: 3/5");
        let r = overlay_text(CookingState::Rolling, &p, 5);
        assert_eq!(r[0].text, "Rolling Progress: 42%");
    }

    #[test]
    fn descriptor_serializes_for_external_renderer() {
        let d = dough();
        let p = ProgressState::new(&d);
        let v = serde_json::to_value(build(CookingState::Initial, &p, &d, 5)).unwrap();
        assert_eq!(v["state"], "initial");
        assert_eq!(v["fill_color"], serde_json::json!([254, 235, 195]));
        assert!(v["inner_puff_radius"].is_null());
    }
}
