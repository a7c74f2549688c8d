//! Mock sensor sources.
//!
//! Each mock emits synthetic payloads from a background thread at a fixed
//! period, deterministically derived from a seed and the tick index. The
//! viewer's `--mock` mode and the tests both run against these, so nothing
//! here depends on a simulator being up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use roadview_core::telemetry::{CameraFrame, GeoFix, ImuFrame, GRAVITY};

use crate::source::{SensorCallback, SensorKind, SensorPayload, SensorSource};

/// Payload generator: tick index to measurement. Pure, so a stopped source
/// can be listened to again and replays the same stream.
type Generator = Arc<dyn Fn(u64) -> SensorPayload + Send + Sync>;

/// A background-thread sensor source driven by a [`Generator`].
pub struct MockSource {
    kind: SensorKind,
    period: Duration,
    generator: Generator,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockSource {
    fn new(kind: SensorKind, period: Duration, generator: Generator) -> Self {
        Self {
            kind,
            period,
            generator,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// An IMU that reads gravity plus seeded jitter, with a slowly turning
    /// compass heading.
    pub fn imu(seed: u64, period: Duration) -> Self {
        Self::new(
            SensorKind::Imu,
            period,
            Arc::new(move |tick| {
                let mut rng = tick_rng(seed, tick);
                SensorPayload::Imu(ImuFrame {
                    accelerometer: GRAVITY + jitter3(&mut rng),
                    gyroscope: jitter3(&mut rng) * 0.1,
                    compass: (tick as f32 * 0.01) % std::f32::consts::TAU,
                })
            }),
        )
    }

    /// A GNSS fix drifting north-east from a fixed origin.
    pub fn gnss(seed: u64, period: Duration) -> Self {
        Self::new(
            SensorKind::Gnss,
            period,
            Arc::new(move |tick| {
                let mut rng = tick_rng(seed, tick);
                let noise = 1e-7;
                SensorPayload::Gnss(GeoFix {
                    latitude: 48.137 + tick as f64 * 1e-6 + rng.gen_range(-noise..noise),
                    longitude: 11.575 + tick as f64 * 1e-6 + rng.gen_range(-noise..noise),
                    altitude: 520.0 + rng.gen_range(-0.05..0.05),
                })
            }),
        )
    }

    /// A camera producing a scrolling gradient, so motion is visible in the
    /// preview window without a simulator.
    pub fn camera(width: u32, height: u32, period: Duration) -> Self {
        Self::new(
            SensorKind::Camera,
            period,
            Arc::new(move |tick| {
                let mut bgra = Vec::with_capacity((width * height * 4) as usize);
                for y in 0..height {
                    for x in 0..width {
                        let shade = ((x as u64 + tick * 4) % 256) as u8;
                        bgra.extend_from_slice(&[shade, shade / 2, (y % 256) as u8, 255]);
                    }
                }
                let frame = CameraFrame::new(width, height, bgra)
                    .expect("generator sized the buffer to width*height*4");
                SensorPayload::Camera(frame)
            }),
        )
    }
}

impl SensorSource for MockSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = Arc::clone(&self.running);
        let generator = Arc::clone(&self.generator);
        let period = self.period;
        let kind = self.kind;

        let handle = thread::spawn(move || {
            debug!(%kind, "mock source started");
            let mut tick = 0u64;
            while running.load(Ordering::SeqCst) {
                callback(generator(tick));
                tick += 1;
                thread::sleep(period);
            }
            debug!(%kind, ticks = tick, "mock source stopped");
        });

        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        *worker = Some(handle);
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let handle = {
            let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            worker.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick_rng(seed: u64, tick: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ tick.wrapping_mul(0x9e3779b97f4a7c15))
}

fn jitter3(rng: &mut ChaCha8Rng) -> Vector3<f32> {
    Vector3::new(
        rng.gen_range(-0.2..0.2),
        rng.gen_range(-0.2..0.2),
        rng.gen_range(-0.2..0.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback() -> (SensorCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        let callback: SensorCallback = Arc::new(move |_payload| {
            cb_count.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn test_listen_delivers_payloads() {
        let source = MockSource::imu(1, Duration::from_millis(1));
        let (callback, count) = counting_callback();

        source.listen(callback);
        assert!(source.is_listening());

        while count.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        source.stop();
        assert!(!source.is_listening());
    }

    #[test]
    fn test_stop_halts_delivery() {
        let source = MockSource::gnss(1, Duration::from_millis(1));
        let (callback, count) = counting_callback();

        source.listen(callback);
        while count.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        source.stop();

        let after_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_listen_is_idempotent() {
        let source = MockSource::imu(1, Duration::from_millis(1));
        let (callback, count) = counting_callback();

        source.listen(Arc::clone(&callback));
        source.listen(callback);
        assert!(source.is_listening());

        while count.load(Ordering::SeqCst) < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        source.stop();

        // One worker only: a second one would leave the flag racing.
        assert!(!source.is_listening());
    }

    #[test]
    fn test_payload_matches_kind() {
        let source = MockSource::camera(8, 4, Duration::from_millis(1));
        let seen = Arc::new(Mutex::new(None));
        let cb_seen = Arc::clone(&seen);

        source.listen(Arc::new(move |payload| {
            *cb_seen.lock().unwrap() = Some(payload);
        }));
        loop {
            if let Some(payload) = seen.lock().unwrap().clone() {
                assert_eq!(payload.kind(), SensorKind::Camera);
                match payload {
                    SensorPayload::Camera(frame) => {
                        assert_eq!(frame.width(), 8);
                        assert_eq!(frame.height(), 4);
                        assert_eq!(frame.as_bgra().len(), 8 * 4 * 4);
                    }
                    other => panic!("expected a camera payload, got {:?}", other),
                }
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        source.stop();
    }

    #[test]
    fn test_generator_is_deterministic_per_seed() {
        let gen_fix = |seed, tick| {
            let source = MockSource::gnss(seed, Duration::from_millis(1));
            match (source.generator)(tick) {
                SensorPayload::Gnss(fix) => fix,
                other => panic!("expected a gnss payload, got {:?}", other),
            }
        };
        assert_eq!(gen_fix(9, 3), gen_fix(9, 3));
        assert_ne!(gen_fix(9, 3), gen_fix(10, 3));
    }
}
