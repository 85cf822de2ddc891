//! revtone maps live racing-simulator telemetry onto music. The simulator
//! publishes a shared-memory snapshot of the car's state; at a fixed tick
//! rate this crate samples it, derives smoothed musical control values
//! (tempo from rpm, pitch from steering, volume from throttle, stereo
//! position from lateral G, and so on), and forwards them as OSC control
//! messages to an external synthesis engine such as SuperCollider.
//!
//! The pipeline is a straight line: a [`telemetry::TelemetrySource`] feeds
//! a [`accumulator::SampleAccumulator`], whose per-tick view goes through
//! the [`mapper::Mapper`] and out the door via [`osc::OscSender`]. Each
//! processing stage runs as a [`component::Component`] on its own thread.
//! Telemetry dropout and a missing engine are both transient conditions
//! the loop rides out rather than errors it dies on.

pub mod accumulator;
pub mod args;
pub mod component;
pub mod config;
pub mod control;
pub mod mapper;
pub mod osc;
pub mod scale;
pub mod shared_memory;
pub mod sim;
pub mod telemetry;
