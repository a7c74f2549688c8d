//! The viewer run loop: wire sensor sources into the telemetry hub, then
//! poll ticks, snapshot the latest values, and present them.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use roadview_core::export::TelemetryLog;
use roadview_core::hub::TelemetryHub;
use roadview_core::telemetry::{CameraFrame, TelemetryRecord};
use roadview_client::{SensorCallback, SensorPayload, SensorSource};

use crate::screen::Screen;
use crate::Args;

/// Builds the callback that files each payload into its hub cell.
fn route(hub: Arc<TelemetryHub>) -> SensorCallback {
    Arc::new(move |payload| match payload {
        SensorPayload::Camera(frame) => hub.camera.store(frame),
        SensorPayload::Gnss(fix) => hub.gnss.store(fix),
        SensorPayload::Imu(frame) => hub.imu.store(frame),
    })
}

/// Shared render loop. `tick` blocks until the next frame boundary;
/// the sources keep pushing into the hub from their own threads meanwhile.
struct Runner {
    hub: Arc<TelemetryHub>,
    screen: Screen,
    log: Option<TelemetryLog>,
    max_frames: u64,
}

impl Runner {
    fn new(args: &Args, hub: Arc<TelemetryHub>) -> Result<Self> {
        let log = match &args.record {
            Some(path) => Some(
                TelemetryLog::create(path)
                    .with_context(|| format!("creating telemetry log {}", path))?,
            ),
            None => None,
        };
        Ok(Self {
            hub,
            screen: Screen::new("Roadview", args.fps)?,
            log,
            max_frames: args.max_frames,
        })
    }

    fn run(mut self, mut tick: impl FnMut()) -> Result<()> {
        let start = Instant::now();
        let mut frame = 0u64;

        loop {
            tick();
            frame += 1;

            let camera = self
                .hub
                .camera
                .load()
                .unwrap_or_else(CameraFrame::placeholder);
            let geo = self.hub.gnss.load();
            let imu = self.hub.imu.load();

            if let Some(log) = &mut self.log {
                log.append(&TelemetryRecord {
                    frame,
                    elapsed_sec: start.elapsed().as_secs_f64(),
                    geo,
                    imu: imu.as_ref().map(Into::into),
                })
                .context("writing telemetry record")?;
            }

            if !self.screen.present(&camera, geo.as_ref(), imu.as_ref())? {
                info!("quit requested");
                break;
            }

            if self.max_frames != 0 && frame >= self.max_frames {
                info!(frames = frame, "frame limit reached");
                break;
            }
        }

        if let Some(log) = self.log.take() {
            log.finish().context("closing telemetry log")?;
        }
        Ok(())
    }
}

/// Runs against the built-in mock sensors, no simulator required.
pub fn run_mock(args: &Args) -> Result<()> {
    use roadview_client::MockSource;

    let seed = args.resolved_seed();
    let period = args.frame_period();
    info!(seed, "running against mock sensors");

    let sources: Vec<Arc<dyn SensorSource>> = vec![
        Arc::new(MockSource::camera(800, 600, period)),
        Arc::new(MockSource::gnss(seed, period)),
        Arc::new(MockSource::imu(seed.wrapping_add(1), period)),
    ];

    let hub = TelemetryHub::shared();
    for source in &sources {
        source.listen(route(Arc::clone(&hub)));
    }

    let runner = Runner::new(args, Arc::clone(&hub))?;
    let result = runner.run(|| std::thread::sleep(period));

    for source in &sources {
        source.stop();
    }
    result
}

/// Runs against a live CARLA server.
#[cfg(feature = "carla")]
pub fn run_carla(args: &Args) -> Result<()> {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use roadview_client::{Session, SessionConfig};

    let config = SessionConfig {
        host: args.host.clone(),
        port: args.port,
        timeout: std::time::Duration::from_secs(args.timeout_secs),
        fps: args.fps,
        vehicle: args.vehicle.clone(),
        traffic: args.traffic,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(args.resolved_seed());
    let mut session =
        Session::connect(&config, &mut rng).context("connecting to the simulator")?;

    let sources = session.sources();
    let hub = TelemetryHub::shared();
    for source in &sources {
        source.listen(route(Arc::clone(&hub)));
    }

    let runner = Runner::new(args, Arc::clone(&hub))?;
    let result = runner.run(|| session.wait_for_tick());

    // Explicit teardown so a render error still restores the world.
    session.shutdown();
    result
}
