//! CARLA session layer.
//!
//! Owns the connection and every actor this client spawns: one ego vehicle
//! with autopilot, optional background traffic, and the camera/GNSS/IMU
//! sensors attached to the ego. Teardown runs in `shutdown` (and again from
//! `Drop` as a backstop): sensors stop and are destroyed first, then the
//! vehicles, then the original world settings are restored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::rpc::AttachmentType;
use carla::sensor::data::{GnssMeasurement, Image, ImuMeasurement};
use carla::sensor::SensorData;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand::Rng;
use tracing::{info, warn};

use roadview_core::choice::random_choice;
use roadview_core::telemetry::{CameraFrame, GeoFix, ImuFrame};

use crate::error::ClientError;
use crate::source::{SensorCallback, SensorKind, SensorPayload, SensorSource};

/// Connection and spawn parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,

    /// Fixed simulation step rate applied for the run
    pub fps: u32,

    /// Ego vehicle blueprint id
    pub vehicle: String,

    /// Background traffic vehicles to try-spawn
    pub traffic: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2000,
            timeout: Duration::from_secs(30),
            fps: 30,
            vehicle: "vehicle.tesla.model3".to_string(),
            traffic: 10,
        }
    }
}

/// A connected session with its spawned actors.
pub struct Session {
    // Kept alive for the duration of the episode.
    _client: Client,
    world: World,
    original_settings: carla::rpc::EpisodeSettings,
    timeout: Duration,
    ego: Option<Vehicle>,
    traffic: Vec<Vehicle>,
    sensors: Vec<Arc<CarlaSource>>,
    torn_down: bool,
}

impl Session {
    /// Connects, checks versions, applies the fixed step rate, and spawns
    /// the ego vehicle plus traffic.
    pub fn connect(config: &SessionConfig, rng: &mut impl Rng) -> Result<Self, ClientError> {
        info!(host = %config.host, port = config.port, "connecting");

        // The third argument is the binding's worker-thread count; the RPC
        // timeout is set separately and governs every blocking call from
        // here on. The version query is the first RPC, so an unreachable
        // server surfaces here; the binding reports that by panicking
        // across its FFI boundary, which we catch and type.
        let (client, client_version, server_version) =
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let client = Client::connect(&config.host, config.port, None);
                client.set_timeout(config.timeout);
                let client_version = client.client_version();
                let server_version = client.server_version();
                (client, client_version, server_version)
            })) {
                Ok(connected) => connected,
                Err(_) => {
                    return Err(ClientError::Timeout {
                        host: config.host.clone(),
                        port: config.port,
                        secs: config.timeout.as_secs(),
                    })
                }
            };

        if client_version != server_version {
            return Err(ClientError::VersionMismatch {
                client: client_version,
                server: server_version,
            });
        }

        let mut world = client.world();
        let original_settings = world.settings();

        let mut settings = original_settings.clone();
        settings.fixed_delta_seconds = Some(1.0 / config.fps as f64);
        world.apply_settings(&settings, config.timeout);

        let mut session = Self {
            _client: client,
            world,
            original_settings,
            timeout: config.timeout,
            ego: None,
            traffic: Vec::new(),
            sensors: Vec::new(),
            torn_down: false,
        };

        let spawn_points = session.world.map().recommended_spawn_points();
        let spawn_points: Vec<Isometry3<f32>> = spawn_points.iter().collect();

        session.spawn_ego(&config.vehicle, &spawn_points, rng)?;
        session.spawn_traffic(config.traffic, &spawn_points, rng)?;
        session.attach_sensors()?;

        Ok(session)
    }

    fn find_blueprint(
        &self,
        id: &str,
    ) -> Result<carla::client::ActorBlueprint, ClientError> {
        self.world
            .blueprint_library()
            .find(id)
            .ok_or_else(|| ClientError::MissingBlueprint { id: id.to_string() })
    }

    fn spawn_ego(
        &mut self,
        blueprint_id: &str,
        spawn_points: &[Isometry3<f32>],
        rng: &mut impl Rng,
    ) -> Result<(), ClientError> {
        let blueprint = self.find_blueprint(blueprint_id)?;
        let spawn_point = random_choice(spawn_points, "spawn points", rng)?;

        let actor = self
            .world
            .spawn_actor(&blueprint, spawn_point)
            .map_err(|e| ClientError::spawn("ego vehicle", e))?;
        let vehicle: Vehicle = actor
            .try_into()
            .map_err(|_| ClientError::spawn("ego vehicle", "actor is not a vehicle"))?;

        info!(id = vehicle.id(), blueprint = blueprint_id, "spawned ego vehicle");
        vehicle.set_autopilot(true);
        self.ego = Some(vehicle);
        Ok(())
    }

    /// Try-spawns `count` random vehicles at random spawn points. Collisions
    /// with occupied spawn points are expected and only logged.
    fn spawn_traffic(
        &mut self,
        count: usize,
        spawn_points: &[Isometry3<f32>],
        rng: &mut impl Rng,
    ) -> Result<(), ClientError> {
        if count == 0 {
            return Ok(());
        }

        let blueprints: Vec<_> = self
            .world
            .blueprint_library()
            .filter("vehicle")
            .iter()
            .collect();

        for _ in 0..count {
            let blueprint = random_choice(&blueprints, "vehicle blueprints", rng)?;
            let spawn_point = random_choice(spawn_points, "spawn points", rng)?;

            match self.world.spawn_actor(blueprint, spawn_point) {
                Ok(actor) => {
                    if let Ok(vehicle) = Vehicle::try_from(actor) {
                        vehicle.set_autopilot(true);
                        self.traffic.push(vehicle);
                    }
                }
                Err(e) => warn!("traffic spawn skipped: {}", e),
            }
        }

        info!(spawned = self.traffic.len(), requested = count, "traffic ready");
        Ok(())
    }

    fn attach_sensors(&mut self) -> Result<(), ClientError> {
        let ego = self
            .ego
            .as_ref()
            .expect("sensors attach after the ego vehicle spawns");

        // Camera above the rear of the roof, pitched slightly down.
        let camera_transform = Isometry3::from_parts(
            Translation3::new(-1.5, 0.0, 2.5),
            UnitQuaternion::from_axis_angle(
                &Vector3::y_axis(),
                (-5.0f32).to_radians(),
            ),
        );

        for (kind, transform) in [
            (SensorKind::Camera, camera_transform),
            (SensorKind::Gnss, Isometry3::identity()),
            (SensorKind::Imu, Isometry3::identity()),
        ] {
            let blueprint = self.find_blueprint(kind.blueprint_id())?;
            let actor = self
                .world
                .spawn_actor_opt(&blueprint, &transform, Some(ego), AttachmentType::Rigid)
                .map_err(|e| ClientError::spawn("sensor", e))?;
            let sensor: Sensor = actor
                .try_into()
                .map_err(|_| ClientError::spawn("sensor", "actor is not a sensor"))?;

            info!(id = sensor.id(), %kind, "attached sensor");
            self.sensors.push(Arc::new(CarlaSource::new(kind, sensor)));
        }

        Ok(())
    }

    /// The attached sensor sources, in camera/GNSS/IMU order.
    pub fn sources(&self) -> Vec<Arc<dyn SensorSource>> {
        self.sensors
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn SensorSource>)
            .collect()
    }

    /// Blocks until the next simulation tick.
    pub fn wait_for_tick(&mut self) {
        self.world.wait_for_tick();
    }

    /// Destroys everything this session spawned and restores the original
    /// world settings. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for sensor in self.sensors.drain(..) {
            sensor.stop();
            sensor.destroy();
        }
        if let Some(ego) = self.ego.take() {
            ego.destroy();
        }
        for vehicle in self.traffic.drain(..) {
            vehicle.destroy();
        }

        self.world.apply_settings(&self.original_settings, self.timeout);
        info!("session torn down, world settings restored");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A real CARLA sensor behind the [`SensorSource`] trait.
pub struct CarlaSource {
    kind: SensorKind,
    sensor: Mutex<Sensor>,
    listening: AtomicBool,
}

impl CarlaSource {
    fn new(kind: SensorKind, sensor: Sensor) -> Self {
        Self {
            kind,
            sensor: Mutex::new(sensor),
            listening: AtomicBool::new(false),
        }
    }

    fn destroy(&self) {
        let sensor = self.sensor.lock().unwrap_or_else(|e| e.into_inner());
        sensor.destroy();
    }
}

impl SensorSource for CarlaSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        let kind = self.kind;
        let sensor = self.sensor.lock().unwrap_or_else(|e| e.into_inner());
        sensor.listen(move |data| {
            if let Some(payload) = convert(kind, data) {
                callback(payload);
            }
        });
    }

    fn stop(&self) {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return;
        }
        let sensor = self.sensor.lock().unwrap_or_else(|e| e.into_inner());
        sensor.stop();
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}


/// Maps a raw CARLA measurement into the payload for `kind`. Measurements
/// of an unexpected type are dropped with a warning rather than crashing
/// the delivery thread.
fn convert(kind: SensorKind, data: SensorData) -> Option<SensorPayload> {
    match kind {
        SensorKind::Camera => {
            let image: Image = data.try_into().ok().or_else(|| {
                warn!("camera callback received a non-image measurement");
                None
            })?;
            let mut bgra = Vec::with_capacity(image.as_slice().len() * 4);
            for color in image.as_slice() {
                bgra.extend_from_slice(&[color.b, color.g, color.r, color.a]);
            }
            match CameraFrame::new(image.width() as u32, image.height() as u32, bgra) {
                Ok(frame) => Some(SensorPayload::Camera(frame)),
                Err(e) => {
                    warn!("camera frame dropped: {}", e);
                    None
                }
            }
        }
        SensorKind::Gnss => {
            let gnss: GnssMeasurement = data.try_into().ok()?;
            Some(SensorPayload::Gnss(GeoFix {
                latitude: gnss.latitude(),
                longitude: gnss.longitude(),
                altitude: gnss.altitude(),
            }))
        }
        SensorKind::Imu => {
            let imu: ImuMeasurement = data.try_into().ok()?;
            Some(SensorPayload::Imu(ImuFrame {
                accelerometer: imu.accelerometer(),
                gyroscope: imu.gyroscope(),
                compass: imu.compass(),
            }))
        }
    }
}
