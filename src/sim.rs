//! A synthetic [`TelemetrySource`] for driving the pipeline without the
//! game. A background thread plays an endless lap: straights under full
//! throttle with gear shifts, braking zones, and corners with correlated
//! steering and lateral G. Useful for demos and for exercising the mapper
//! against plausible, continuously-varying input.

use crate::telemetry::{SessionStatus, TelemetrySample, TelemetrySource, Wheels};

use rand::prelude::*;
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Samples are produced at the game's physics publish rate.
const PRODUCE_HZ: f32 = 60.0;

/// Cap on the internal queue so a slow consumer sees recent samples, not
/// a growing backlog.
const QUEUE_LIMIT: usize = 256;

const IDLE_RPM: f32 = 1000.0;
const MAX_RPM: f32 = 8000.0;
const TOP_SPEED_KMH: f32 = 275.0;

pub struct SimTelemetry {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    msgs: Arc<Mutex<VecDeque<TelemetrySample>>>,
}

enum Signal {
    Noise(f32),
    LapPeriod(f32),
    Stop,
}

/// Configures and launches a [`SimTelemetry`].
pub struct SimTelemetryBuilder {
    lap_period: f32,
    noise: f32,
}

impl Default for SimTelemetryBuilder {
    fn default() -> Self {
        Self {
            lap_period: 90.0,
            noise: 0.01,
        }
    }
}

impl SimTelemetryBuilder {
    /// Seconds per synthetic lap.
    pub fn lap_period(mut self, seconds: f32) -> Self {
        self.lap_period = seconds.max(1.0);
        self
    }

    /// Relative jitter applied to the continuous channels.
    pub fn noise(mut self, noise: f32) -> Self {
        self.noise = noise.max(0.0);
        self
    }

    pub fn build(self) -> SimTelemetry {
        SimTelemetry::launch(self.lap_period, self.noise)
    }
}

impl SimTelemetry {
    pub fn builder() -> SimTelemetryBuilder {
        SimTelemetryBuilder::default()
    }

    fn launch(lap_period: f32, noise: f32) -> Self {
        let (tx, rx) = mpsc::channel::<Signal>();
        let msgs = Arc::new(Mutex::new(VecDeque::new()));
        let th_msgs = Arc::clone(&msgs);

        let handle = thread::spawn(move || {
            let mut running = true;
            let mut lap_period = lap_period;
            let mut noise = noise;
            let mut rng = thread_rng();
            let mut lap_time = 0.0_f32;
            let mut best_lap: i32 = 0;
            let dt = 1.0 / PRODUCE_HZ;

            while running {
                if let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::Noise(new_noise) => noise = new_noise,
                        Signal::LapPeriod(new_period) => lap_period = new_period.max(1.0),
                        Signal::Stop => running = false,
                    }
                }

                lap_time += dt;
                if lap_time >= lap_period {
                    lap_time -= lap_period;
                    // Each completed lap shaves a little off the best, so
                    // downstream best-lap triggers have something to see.
                    let lap_ms = (lap_period * 1000.0) as i32;
                    best_lap = if best_lap == 0 {
                        lap_ms
                    } else {
                        (best_lap - 120).max(1)
                    };
                }

                let sample =
                    synth_sample(lap_time / lap_period, lap_time, best_lap, noise, &mut rng);

                let mut queue = th_msgs.lock().unwrap();
                queue.push_back(sample);
                while queue.len() > QUEUE_LIMIT {
                    queue.pop_front();
                }
                drop(queue);

                thread::sleep(Duration::from_secs_f32(dt));
            }
        });

        SimTelemetry {
            handle: Some(handle),
            tx,
            msgs,
        }
    }

    pub fn set_noise(&self, noise: f32) {
        self.tx.send(Signal::Noise(noise)).unwrap();
    }

    pub fn set_lap_period(&self, seconds: f32) {
        self.tx.send(Signal::LapPeriod(seconds)).unwrap();
    }

    pub fn stop(&mut self) {
        self.tx.send(Signal::Stop).unwrap();
        if let Some(thread) = self.handle.take() {
            thread.join().unwrap();
        }
    }
}

impl Iterator for SimTelemetry {
    type Item = TelemetrySample;
    fn next(&mut self) -> Option<Self::Item> {
        self.msgs.lock().unwrap().pop_front()
    }
}

impl TelemetrySource for SimTelemetry {
    fn connected(&self) -> bool {
        self.handle.is_some()
    }
}

/// One tick of the synthetic lap. `phase` runs 0..1 over the lap.
fn synth_sample(
    phase: f32,
    lap_time: f32,
    best_lap: i32,
    noise: f32,
    rng: &mut ThreadRng,
) -> TelemetrySample {
    let jitter = |rng: &mut ThreadRng| -> f32 {
        if noise > 0.0 {
            rng.gen_range(-noise..noise)
        } else {
            0.0
        }
    };

    // Three corners per lap. Near a corner the driver brakes, turns, and
    // the speed dips; on the straights the throttle is pinned.
    let corner = (phase * 3.0 * 2.0 * PI).sin();
    let cornering = corner.abs().powi(3);

    let speed_factor = (0.25 + 0.75 * (1.0 - cornering)).clamp(0.0, 1.0);
    let speed_kmh = (TOP_SPEED_KMH * speed_factor * (1.0 + jitter(rng))).max(0.0);

    let gear = (speed_kmh / 45.0).floor() as i32 + 1;
    let gear = gear.min(6);

    // Within a gear, rpm climbs with speed and drops at each shift point.
    let gear_progress = (speed_kmh / 45.0).fract();
    let rpm = IDLE_RPM + (MAX_RPM - IDLE_RPM) * (0.35 + 0.65 * gear_progress);
    let rpm = (rpm * (1.0 + jitter(rng))).clamp(IDLE_RPM, MAX_RPM);

    let braking = cornering > 0.55;
    let throttle = if braking {
        0.0
    } else {
        (1.0 - cornering * 0.6 + jitter(rng)).clamp(0.0, 1.0)
    };
    let brake = if braking {
        (cornering + jitter(rng)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let steer = (corner.signum() * cornering * (1.0 + jitter(rng))).clamp(-1.0, 1.0);
    let g_lat = steer * (speed_kmh / TOP_SPEED_KMH) * 2.8;
    let g_lon = throttle * 0.9 - brake * 2.2;

    let slip_base = if braking { 0.25 * cornering } else { 0.02 };
    let slip = |rng: &mut ThreadRng| (slip_base + jitter(rng).abs()).max(0.0);

    TelemetrySample {
        status: SessionStatus::Live,
        speed_kmh,
        rpm: rpm as i32,
        gear,
        fuel: 60.0 - 2.0 * phase,
        throttle,
        brake,
        clutch: 0.0,
        steer_angle: steer,
        g_lateral: g_lat,
        g_longitudinal: g_lon,
        g_vertical: 1.0,
        wheel_slip: Wheels {
            front_left: slip(rng),
            front_right: slip(rng),
            rear_left: slip(rng),
            rear_right: slip(rng),
        },
        tire_pressure: Wheels {
            front_left: 27.5,
            front_right: 27.6,
            rear_left: 27.2,
            rear_right: 27.3,
        },
        tire_temp: Wheels {
            front_left: 82.0 + 8.0 * cornering,
            front_right: 82.0 + 8.0 * cornering,
            rear_left: 80.0,
            rear_right: 80.0,
        },
        water_temp: 85.0 + 10.0 * phase,
        turbo_boost: throttle * 0.9,
        tc_active: if slip_base > 0.1 { 1.0 } else { 0.0 },
        abs_active: if braking { 1.0 } else { 0.0 },
        current_lap: (lap_time * 1000.0) as i32,
        last_lap: best_lap,
        best_lap,
    }
}
