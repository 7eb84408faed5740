//! Frame differencing: two consecutive frames in, one motion magnitude out.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::map::map_colors2;
use imageproc::point::Point;
use serde::Serialize;

use crate::config::MotionThresholds;
use crate::error::SessionError;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionSample {
    /// Summed area enclosed by the outer border of every moving region.
    pub magnitude: f64,
    /// `magnitude > motion_threshold`
    pub detected: bool,
}

impl MotionSample {
    /// Sample with a known magnitude, classified against `motion_threshold`.
    pub fn from_magnitude(magnitude: f64, motion_threshold: f64) -> Self {
        Self {
            magnitude,
            detected: magnitude > motion_threshold,
        }
    }
}

pub fn compute(
    prev: &Frame,
    curr: &Frame,
    th: &MotionThresholds,
) -> Result<MotionSample, SessionError> {
    if prev.dimensions() != curr.dimensions() {
        return Err(SessionError::DimensionMismatch {
            expected: prev.dimensions(),
            actual: curr.dimensions(),
        });
    }

    let mask = foreground_mask(prev.as_gray(), curr.as_gray(), th.diff_threshold);
    let area: f64 = outer_contours(&mask)
        .iter()
        .map(|c| enclosed_area(&c.points))
        .sum();

    Ok(MotionSample::from_magnitude(area, th.motion_threshold))
}

/// Binarized absolute difference: 255 where |a - b| > threshold, else 0.
fn foreground_mask(prev: &GrayImage, curr: &GrayImage, threshold: u8) -> GrayImage {
    map_colors2(prev, curr, |a: Luma<u8>, b: Luma<u8>| {
        Luma([if a[0].abs_diff(b[0]) > threshold { 255 } else { 0 }])
    })
}

/// Outermost borders only; holes and anything nested inside them are dropped.
fn outer_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .collect()
}

/// Shoelace area of the polygon traced by a closed border.
fn enclosed_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn th() -> MotionThresholds {
        MotionThresholds::default()
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let a = Frame::filled(64, 48, 90).with_rect(10, 10, 20, 20, 200);
        let s = compute(&a, &a.clone(), &th()).unwrap();
        assert_eq!(s.magnitude, 0.0);
        assert!(!s.detected);
    }

    #[test]
    fn small_differences_stay_below_pixel_threshold() {
        let a = Frame::filled(32, 32, 100);
        let b = Frame::filled(32, 32, 125);
        let s = compute(&a, &b, &th()).unwrap();
        assert_eq!(s.magnitude, 0.0);

        let c = Frame::filled(32, 32, 126);
        let s = compute(&a, &c, &th()).unwrap();
        assert_eq!(s.magnitude, 31.0 * 31.0);
    }

    #[test]
    fn separate_regions_are_summed() {
        let a = Frame::filled(40, 40, 0);
        let b = a
            .clone()
            .with_rect(2, 2, 5, 4, 255)
            .with_rect(20, 20, 10, 3, 255);
        let mask = foreground_mask(a.as_gray(), b.as_gray(), 25);
        let mut areas: Vec<f64> = outer_contours(&mask)
            .iter()
            .map(|c| enclosed_area(&c.points))
            .collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas, vec![12.0, 18.0]);
        assert_eq!(compute(&a, &b, &th()).unwrap().magnitude, 30.0);
    }

    #[test]
    fn diagonal_neighbours_join_one_region() {
        let a = Frame::filled(4, 4, 0);
        let b = a
            .clone()
            .with_rect(0, 0, 1, 1, 255)
            .with_rect(1, 1, 1, 1, 255)
            .with_rect(2, 2, 1, 1, 255);
        let mask = foreground_mask(a.as_gray(), b.as_gray(), 25);
        assert_eq!(outer_contours(&mask).len(), 1);
    }

    #[test]
    fn hollow_outline_counts_enclosed_area() {
        let a = Frame::filled(200, 200, 0);
        let square = a.clone().with_rect(50, 50, 100, 100, 255).with_rect(51, 51, 98, 98, 0);
        let s = compute(&a, &square, &th()).unwrap();
        assert_eq!(s.magnitude, 99.0 * 99.0);
        assert!(s.detected);

        // a blob inside the hole is not counted again
        let nested = square.with_rect(90, 90, 20, 20, 255);
        assert_eq!(compute(&a, &nested, &th()).unwrap().magnitude, 99.0 * 99.0);
    }

    #[test]
    fn large_motion_is_detected() {
        let a = Frame::filled(160, 120, 10);
        let b = a.clone().with_rect(0, 0, 100, 60, 240);
        let s = compute(&a, &b, &th()).unwrap();
        assert_eq!(s.magnitude, 99.0 * 59.0);
        assert!(s.detected);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let a = Frame::filled(10, 10, 0);
        let b = Frame::filled(10, 11, 0);
        match compute(&a, &b, &th()) {
            Err(SessionError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, (10, 10));
                assert_eq!(actual, (10, 11));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }
}
