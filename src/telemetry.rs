//! The telemetry snapshot type shared by every stage of the pipeline, and
//! the trait that telemetry sources implement.

/// Kilometers per hour.
pub type Kmh = f32;
/// Degrees Celsius.
pub type Celsius = f32;
/// Lap time in milliseconds, as reported by the simulator.
pub type LapMillis = i32;

/// One value per wheel, in the simulator's front-left, front-right,
/// rear-left, rear-right order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Wheels {
    pub front_left: f32,
    pub front_right: f32,
    pub rear_left: f32,
    pub rear_right: f32,
}

impl Wheels {
    /// The largest of the four corner values. Used for wheel slip, where
    /// only the worst corner matters musically.
    pub fn max(&self) -> f32 {
        self.front_left
            .max(self.front_right)
            .max(self.rear_left)
            .max(self.rear_right)
    }
}

/// What the simulator is currently doing. Only `Live` sessions produce
/// meaningful physics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Off,
    Replay,
    Live,
    Pause,
}

impl SessionStatus {
    /// Decode the raw status word from the graphics page. Unknown values
    /// are treated as `Off` rather than rejected, since a garbage read
    /// should degrade to silence.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => SessionStatus::Replay,
            2 => SessionStatus::Live,
            3 => SessionStatus::Pause,
            _ => SessionStatus::Off,
        }
    }
}

/// One snapshot of vehicle state, refreshed continuously by the simulator.
/// All fields are copied out of shared memory in a single read so that a
/// sample is internally consistent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySample {
    pub status: SessionStatus,

    pub speed_kmh: Kmh,
    pub rpm: i32,
    pub gear: i32,
    pub fuel: f32,

    /// Pedal positions, each 0.0 to 1.0.
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,

    /// Steering input, -1.0 (full left) to 1.0 (full right).
    pub steer_angle: f32,

    /// G forces: x is lateral, y is longitudinal, z is vertical.
    pub g_lateral: f32,
    pub g_longitudinal: f32,
    pub g_vertical: f32,

    pub wheel_slip: Wheels,
    pub tire_pressure: Wheels,
    pub tire_temp: Wheels,

    pub water_temp: Celsius,
    pub turbo_boost: f32,

    /// Nonzero while traction control is intervening.
    pub tc_active: f32,
    /// Nonzero while ABS is intervening.
    pub abs_active: f32,

    pub current_lap: LapMillis,
    pub last_lap: LapMillis,
    pub best_lap: LapMillis,
}

impl TelemetrySample {
    /// True when the sample comes from a running, unpaused session.
    pub fn is_live(&self) -> bool {
        self.status == SessionStatus::Live
    }
}

/// `TelemetrySource`
///
/// A typed iterator that yields [`TelemetrySample`]s when polled. `next()`
/// returns `None` when no fresh sample is available, which callers must
/// treat as a transient condition, not the end of the stream.
pub trait TelemetrySource: Iterator<Item = TelemetrySample> {
    /// Whether the source currently has a live producer behind it.
    fn connected(&self) -> bool;
}
