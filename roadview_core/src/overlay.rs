//! HUD overlay geometry.
//!
//! Layout is computed here as plain draw operations; executing them on an
//! actual image is left to the display backend. Keeping the arithmetic
//! backend-free is what makes the compass projection and the boxed-text
//! layout testable without a window system.

use crate::telemetry::{GeoFix, ImuFrame};

/// Font scale handed to the backend, shared with the layout arithmetic.
pub const FONT_SCALE: f64 = 0.5;

/// Stroke width for text.
pub const FONT_THICKNESS: i32 = 1;

/// Compass dial center in pixels.
pub const COMPASS_CENTER: (i32, i32) = (700, 100);

/// Compass needle length in pixels.
pub const COMPASS_SIZE: i32 = 50;

/// Cardinal labels and their unit offsets from the dial center.
/// Screen y grows downward, so north points at (0, -1).
pub const CARDINAL_DIRECTIONS: [(&str, (i32, i32)); 4] =
    [("N", (0, -1)), ("E", (1, 0)), ("S", (0, 1)), ("W", (-1, 0))];

/// A BGR color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

pub const WHITE: Color = Color {
    b: 255,
    g: 255,
    r: 255,
};

pub const BLACK: Color = Color { b: 0, g: 0, r: 0 };

/// One primitive for the display backend to execute, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Solid rectangle from (x0, y0) to (x1, y1)
    FilledRect {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
    },
    /// Text with its baseline origin at (x, y)
    Text {
        text: String,
        x: i32,
        y: i32,
        color: Color,
    },
    /// Straight segment
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
        thickness: i32,
    },
}

/// Measures rendered text in pixels. The opencv backend answers with
/// `get_text_size`; tests use a fixed per-character metric.
pub trait TextMeasure {
    /// Returns (width, height) of `text` at [`FONT_SCALE`].
    fn measure(&self, text: &str) -> (i32, i32);
}

/// Text over a solid black box sized to the text extent.
///
/// The box spans the measured extent from `origin`; the text baseline sits
/// `FONT_SCALE - 1` below the box bottom, one pixel up after truncation.
pub fn boxed_text(text: &str, origin: (i32, i32), measure: &impl TextMeasure) -> [DrawOp; 2] {
    let (w, h) = measure.measure(text);
    let (x, y) = origin;
    [
        DrawOp::FilledRect {
            x0: x,
            y0: y,
            x1: x + w,
            y1: y + h,
            color: BLACK,
        },
        DrawOp::Text {
            text: text.to_string(),
            x,
            y: (y as f64 + h as f64 + FONT_SCALE - 1.0) as i32,
            color: WHITE,
        },
    ]
}

/// The four cardinal labels plus a needle for `heading` radians
/// (0 = north, increasing clockwise).
pub fn compass(heading: f32) -> Vec<DrawOp> {
    let (cx, cy) = COMPASS_CENTER;
    let mut ops = Vec::with_capacity(CARDINAL_DIRECTIONS.len() + 1);

    for (label, (dx, dy)) in CARDINAL_DIRECTIONS {
        ops.push(DrawOp::Text {
            text: label.to_string(),
            x: (cx as f64 + 1.2 * COMPASS_SIZE as f64 * dx as f64) as i32,
            y: (cy as f64 + 1.2 * COMPASS_SIZE as f64 * dy as f64) as i32,
            color: WHITE,
        });
    }

    // Screen y grows downward while the heading is measured from north, so
    // the needle projects with sin on x and cos on y.
    ops.push(DrawOp::Line {
        x0: cx,
        y0: cy,
        x1: (cx as f64 + COMPASS_SIZE as f64 * f64::sin(heading as f64)) as i32,
        y1: (cy as f64 + COMPASS_SIZE as f64 * f64::cos(heading as f64)) as i32,
        color: WHITE,
        thickness: 2,
    });

    ops
}

/// The full HUD: five boxed readouts down the left edge, then the compass.
///
/// Sensors that have not reported yet are simply skipped; the HUD only ever
/// shows the latest complete value.
pub fn hud(geo: Option<&GeoFix>, imu: Option<&ImuFrame>, measure: &impl TextMeasure) -> Vec<DrawOp> {
    let mut ops = Vec::new();

    if let Some(geo) = geo {
        ops.extend(boxed_text(
            &format!("Altitude: {:.6}", geo.altitude),
            (20, 20),
            measure,
        ));
        ops.extend(boxed_text(
            &format!("Latitude: {:.6}", geo.latitude),
            (20, 40),
            measure,
        ));
        ops.extend(boxed_text(
            &format!("Longitude: {:.6}", geo.longitude),
            (20, 60),
            measure,
        ));
    }

    if let Some(imu) = imu {
        ops.extend(boxed_text(
            &format!("Acceleration: {:.6}", imu.linear_acceleration()),
            (20, 80),
            measure,
        ));
        ops.extend(boxed_text(
            &format!("Gyroscope: {:.6}", imu.rotation_rate()),
            (20, 100),
            measure,
        ));
        ops.extend(compass(imu.compass));
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    /// 8x12 px per character, height independent of content.
    struct CharGrid;

    impl TextMeasure for CharGrid {
        fn measure(&self, text: &str) -> (i32, i32) {
            (8 * text.len() as i32, 12)
        }
    }

    /// Measures everything as empty.
    struct ZeroMeasure;

    impl TextMeasure for ZeroMeasure {
        fn measure(&self, _text: &str) -> (i32, i32) {
            (0, 0)
        }
    }

    fn needle_endpoint(heading: f32) -> (i32, i32) {
        let ops = compass(heading);
        match ops.last().unwrap() {
            DrawOp::Line { x1, y1, .. } => (*x1, *y1),
            other => panic!("last op should be the needle, got {:?}", other),
        }
    }

    #[test]
    fn test_boxed_text_rect_matches_extent() {
        let [rect, text] = boxed_text("Altitude: 3.5", (20, 40), &CharGrid);
        assert_eq!(
            rect,
            DrawOp::FilledRect {
                x0: 20,
                y0: 40,
                x1: 20 + 8 * 13,
                y1: 52,
                color: BLACK,
            }
        );
        // Baseline lands one row above the rect bottom.
        match text {
            DrawOp::Text { x, y, color, .. } => {
                assert_eq!((x, y), (20, 51));
                assert_eq!(color, WHITE);
            }
            other => panic!("expected text op, got {:?}", other),
        }
    }

    #[test]
    fn test_boxed_text_degenerate_for_empty_string() {
        let [rect, _] = boxed_text("", (5, 5), &ZeroMeasure);
        assert_eq!(
            rect,
            DrawOp::FilledRect {
                x0: 5,
                y0: 5,
                x1: 5,
                y1: 5,
                color: BLACK,
            }
        );
    }

    #[test]
    fn test_needle_points_south_at_zero_heading() {
        // heading 0 = north; on screen the needle drops below the center
        // because cos(0) = 1 and y grows downward.
        let (cx, cy) = COMPASS_CENTER;
        assert_eq!(needle_endpoint(0.0), (cx, cy + COMPASS_SIZE));
    }

    #[test]
    fn test_needle_cardinal_projections() {
        let (cx, cy) = COMPASS_CENTER;
        // f32 headings land the projection within a pixel of the axis.
        let east = needle_endpoint(FRAC_PI_2);
        assert!((east.0 - (cx + COMPASS_SIZE)).abs() <= 1);
        assert!((east.1 - cy).abs() <= 1);

        let south = needle_endpoint(PI);
        assert!((south.0 - cx).abs() <= 1);
        assert!((south.1 - (cy - COMPASS_SIZE)).abs() <= 1);
    }

    #[test]
    fn test_cardinal_labels_ring_the_dial() {
        let ops = compass(0.3);
        let (cx, cy) = COMPASS_CENTER;
        let ring = (1.2 * COMPASS_SIZE as f64) as i32;

        let labels: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, x, y, .. } => Some((text.as_str(), *x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                ("N", cx, cy - ring),
                ("E", cx + ring, cy),
                ("S", cx, cy + ring),
                ("W", cx - ring, cy),
            ]
        );
    }

    #[test]
    fn test_hud_skips_sensors_without_data() {
        assert!(hud(None, None, &CharGrid).is_empty());

        let geo = GeoFix::default();
        let ops = hud(Some(&geo), None, &CharGrid);
        // Three boxed readouts, no compass.
        assert_eq!(ops.len(), 6);
        assert!(!ops.iter().any(|op| matches!(op, DrawOp::Line { .. })));
    }

    #[test]
    fn test_hud_full_readout() {
        let geo = GeoFix::default();
        let imu = ImuFrame::default();
        let ops = hud(Some(&geo), Some(&imu), &CharGrid);
        // 5 boxed readouts (2 ops each) + 4 labels + needle.
        assert_eq!(ops.len(), 15);
        let text_of = |op: &DrawOp| match op {
            DrawOp::Text { text, .. } => text.clone(),
            _ => String::new(),
        };
        assert!(ops.iter().map(text_of).any(|t| t.starts_with("Altitude: ")));
        assert!(ops
            .iter()
            .map(text_of)
            .any(|t| t.starts_with("Acceleration: 0.000000")));
    }
}
