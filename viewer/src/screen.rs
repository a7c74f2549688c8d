//! Presentation backends.
//!
//! With the `display` feature the camera frame and HUD go to an OpenCV
//! window; without it the readouts are logged once per second so the viewer
//! still runs on headless machines.

use anyhow::Result;
use roadview_core::telemetry::{CameraFrame, GeoFix, ImuFrame};

#[cfg(feature = "display")]
pub use self::window::Screen;

#[cfg(not(feature = "display"))]
pub use self::headless::Screen;

#[cfg(feature = "display")]
mod window {
    use super::*;

    use opencv::core::{Mat, MatTraitConst, Point, Rect, Scalar, Size};
    use opencv::{highgui, imgproc};

    use roadview_core::overlay::{self, Color, DrawOp, TextMeasure};

    const QUIT_KEYS: [i32; 3] = [b'q' as i32, b'Q' as i32, 27];

    fn scalar(color: Color) -> Scalar {
        Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
    }

    /// Text metrics from the same font the backend draws with.
    struct HersheyMeasure;

    impl TextMeasure for HersheyMeasure {
        fn measure(&self, text: &str) -> (i32, i32) {
            let mut baseline = 0;
            let size: Size = imgproc::get_text_size(
                text,
                imgproc::FONT_HERSHEY_COMPLEX,
                overlay::FONT_SCALE,
                overlay::FONT_THICKNESS,
                &mut baseline,
            )
            .unwrap_or_default();
            (size.width, size.height)
        }
    }

    /// An OpenCV preview window.
    pub struct Screen {
        title: String,
    }

    impl Screen {
        pub fn new(title: &str, _fps: u32) -> Result<Self> {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
            Ok(Self {
                title: title.to_string(),
            })
        }

        /// Draws the HUD over the frame and shows it. Returns `false` once
        /// the user presses `q`, `Q`, or Escape.
        pub fn present(
            &mut self,
            camera: &CameraFrame,
            geo: Option<&GeoFix>,
            imu: Option<&ImuFrame>,
        ) -> Result<bool> {
            let flat = Mat::from_slice(camera.as_bgra())?;
            let shaped = flat.reshape(4, camera.height() as i32)?;
            let mut canvas = shaped.try_clone()?;

            for op in overlay::hud(geo, imu, &HersheyMeasure) {
                match op {
                    DrawOp::FilledRect {
                        x0,
                        y0,
                        x1,
                        y1,
                        color,
                    } => {
                        imgproc::rectangle(
                            &mut canvas,
                            Rect::new(x0, y0, x1 - x0, y1 - y0),
                            scalar(color),
                            imgproc::FILLED,
                            imgproc::LINE_8,
                            0,
                        )?;
                    }
                    DrawOp::Text { text, x, y, color } => {
                        imgproc::put_text(
                            &mut canvas,
                            &text,
                            Point::new(x, y),
                            imgproc::FONT_HERSHEY_COMPLEX,
                            overlay::FONT_SCALE,
                            scalar(color),
                            overlay::FONT_THICKNESS,
                            imgproc::LINE_8,
                            false,
                        )?;
                    }
                    DrawOp::Line {
                        x0,
                        y0,
                        x1,
                        y1,
                        color,
                        thickness,
                    } => {
                        imgproc::line(
                            &mut canvas,
                            Point::new(x0, y0),
                            Point::new(x1, y1),
                            scalar(color),
                            thickness,
                            imgproc::LINE_8,
                            0,
                        )?;
                    }
                }
            }

            highgui::imshow(&self.title, &canvas)?;
            let key = highgui::wait_key(1)?;
            Ok(!QUIT_KEYS.contains(&key))
        }
    }

    impl Drop for Screen {
        fn drop(&mut self) {
            let _ = highgui::destroy_window(&self.title);
        }
    }
}

#[cfg(not(feature = "display"))]
mod headless {
    use super::*;
    use tracing::info;

    /// Logs the HUD readouts once per second instead of drawing them.
    pub struct Screen {
        log_every: u64,
        frame: u64,
    }

    impl Screen {
        pub fn new(title: &str, fps: u32) -> Result<Self> {
            info!(
                title,
                "built without the 'display' feature; logging telemetry instead"
            );
            Ok(Self {
                log_every: fps.max(1) as u64,
                frame: 0,
            })
        }

        pub fn present(
            &mut self,
            camera: &CameraFrame,
            geo: Option<&GeoFix>,
            imu: Option<&ImuFrame>,
        ) -> Result<bool> {
            self.frame += 1;
            if self.frame % self.log_every == 0 {
                match (geo, imu) {
                    (Some(geo), Some(imu)) => info!(
                        width = camera.width(),
                        height = camera.height(),
                        altitude = format!("{:.6}", geo.altitude),
                        latitude = format!("{:.6}", geo.latitude),
                        longitude = format!("{:.6}", geo.longitude),
                        acceleration = format!("{:.6}", imu.linear_acceleration()),
                        gyroscope = format!("{:.6}", imu.rotation_rate()),
                        "telemetry"
                    ),
                    _ => info!("waiting for sensor callbacks"),
                }
            }
            Ok(true)
        }
    }
}
