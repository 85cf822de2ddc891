//! Defines the Component trait, to be used by each revtone processing
//! stage. This enforces a common interface between stages, so that each
//! stage can consume data from the preceding stage, process it, and pass
//! new data to the subsequent stage in the pipeline. The two concrete
//! stages are the mapper (telemetry in, control messages out) and the
//! emitter (control messages in, datagrams out).

use crate::accumulator::Latest;
use crate::config::Config;
use crate::control;
use crate::mapper::Mapper;
use crate::osc::{OscError, OscMessage, OscSender};

use log::{info, warn};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Ticks a held sample may be reused before the pipeline gives up and
/// pulls the mix to silence. Half a second at the default rate.
const HOLD_TICKS: u32 = 30;

#[derive(Debug)]
pub enum ComponentError {
    OscError(OscError),
}

impl From<OscError> for ComponentError {
    fn from(value: OscError) -> Self {
        Self::OscError(value)
    }
}

impl std::fmt::Display for ComponentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OscError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ComponentError {}

///
/// A stage in the revtone pipeline, which performs a step of the
/// telemetry-to-music process. All structs that perform a processing step
/// must implement Component, so that they can be integrated into the
/// pipeline.
///
pub trait Component: ToString {
    type InData;
    type OutData;

    /// Converts an input of type A into an output of type B
    fn convert(&mut self, input: Self::InData) -> Self::OutData;

    /// Cleans up at termination of pipeline
    fn finalize(&mut self) -> Result<(), ComponentError>;
}

/// Runs the given Component on its own thread. On receiving data of type
/// InData on the input channel, the Component converts them to data of type
/// OutData and sends it to the output channel.
pub fn run_component<C: Component + Send + 'static>(
    mut component: Box<C>,
    input: Receiver<<C as Component>::InData>,
    output: Sender<<C as Component>::OutData>,
) -> JoinHandle<()>
where
    <C as Component>::InData: Send + 'static,
    <C as Component>::OutData: Send + 'static,
{
    thread::spawn(move || {
        while let Ok(data) = input.recv() {
            let out_data = component.convert(data);
            if let Err(error) = output.send(out_data) {
                warn!("{} : received error {}.", component.to_string(), error);
            }
        }

        if let Err(component_error) = component.finalize() {
            warn!(
                "{} : error during terminating : {component_error:?}.",
                component.to_string(),
            );
        }
        info!("{} : terminated.", component.to_string());
    })
}

/// The mapping stage: turns the accumulator's view of the current tick
/// into the batch of control messages to emit. Owns the dropout policy:
/// a sample may be held for [`HOLD_TICKS`], after which one silence
/// bundle goes out and nothing more until telemetry returns.
pub struct MapperStage {
    mapper: Mapper,
    /// The bundle sent on the tick the stage goes quiet, built once from
    /// the config's neutral state.
    silence: Vec<OscMessage>,
    silenced: bool,
}

impl MapperStage {
    pub fn new(config: Config) -> Self {
        Self {
            silence: control::silence_messages(&config),
            mapper: Mapper::new(config),
            silenced: false,
        }
    }

    /// One silence bundle on the transition, then nothing.
    fn pull_to_silence(&mut self) -> Vec<OscMessage> {
        if self.silenced {
            Vec::new()
        } else {
            self.silenced = true;
            self.silence.clone()
        }
    }
}

impl Component for MapperStage {
    type InData = Latest;
    type OutData = Vec<OscMessage>;

    fn convert(&mut self, input: Latest) -> Vec<OscMessage> {
        match input {
            Latest::Fresh(sample) | Latest::Held(sample, 0..=HOLD_TICKS) => {
                if !sample.is_live() {
                    // Menus, replays and pauses feed stale physics.
                    if !self.silenced {
                        info!("session is {:?}, going silent", sample.status);
                    }
                    return self.pull_to_silence();
                }
                if self.silenced {
                    info!("telemetry is back, resuming");
                    self.silenced = false;
                    self.mapper.reset();
                }
                let params = self.mapper.map(&sample);
                let mut msgs = control::music_messages(&params);
                msgs.extend(control::raw_messages(&sample));
                msgs
            }
            Latest::Held(_, ticks) => {
                if !self.silenced {
                    warn!("telemetry stale for {} ticks, going silent", ticks);
                }
                self.pull_to_silence()
            }
            Latest::Empty => Vec::new(),
        }
    }

    fn finalize(&mut self) -> Result<(), ComponentError> {
        self.mapper.reset();
        Ok(())
    }
}

impl ToString for MapperStage {
    fn to_string(&self) -> String {
        "MapperStage".to_string()
    }
}

/// The emitting stage: fires each batch at the engine and reports how
/// many messages went out.
pub struct EmitterStage {
    sender: OscSender,
}

impl EmitterStage {
    pub fn new(target: &str) -> Result<Self, ComponentError> {
        Ok(Self {
            sender: OscSender::connect(target)?,
        })
    }
}

impl Component for EmitterStage {
    type InData = Vec<OscMessage>;
    type OutData = usize;

    fn convert(&mut self, input: Vec<OscMessage>) -> usize {
        self.sender.send_all(&input);
        input.len()
    }

    fn finalize(&mut self) -> Result<(), ComponentError> {
        if self.sender.dropped() > 0 {
            warn!("{} messages were never delivered", self.sender.dropped());
        }
        Ok(())
    }
}

impl ToString for EmitterStage {
    fn to_string(&self) -> String {
        "EmitterStage".to_string()
    }
}
