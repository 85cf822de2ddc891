//! The revtone binary: wires a telemetry source, the sample accumulator,
//! and the mapper/emitter components together, then drives them with a
//! fixed-rate tick loop.

use clap::Parser;
use log::{error, info};
use revtone::{
    accumulator::SampleAccumulator,
    args::{CommandTask, RevtoneArgs},
    component::{run_component, EmitterStage, MapperStage},
    config::Config,
    shared_memory::SharedMemorySource,
    sim::SimTelemetry,
    telemetry::TelemetrySource,
};
use spin_sleep::SpinSleeper;
use std::{
    error::Error,
    sync::{mpsc::channel, Arc, Mutex},
    time::{Duration, Instant},
};

// Example:
// cargo run -- --addr 127.0.0.1:57120 --rate 60 demo --lap 75 --noise 0.02

fn main() {
    env_logger::init();
    let args = RevtoneArgs::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: RevtoneArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => {
            info!("no config file given, running with defaults");
            Config::default()
        }
    };
    if let Some(addr) = &args.addr {
        // host:port in one flag; split so the config keeps its shape.
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| format!("--addr must be host:port, got {:?}", addr))?;
        config.target.host = host.to_owned();
        config.target.port = port.parse()?;
    }
    if let Some(rate) = args.rate {
        config.target.update_rate = rate;
    }

    match args.command {
        CommandTask::Live(_) => {
            info!("mapping live simulator telemetry");
            run_pipeline(SharedMemorySource::new(), config)
        }
        CommandTask::Demo(demo) => {
            info!(
                "mapping a synthetic lap ({}s, noise {})",
                demo.lap_period, demo.noise
            );
            let sim = SimTelemetry::builder()
                .lap_period(demo.lap_period)
                .noise(demo.noise)
                .build();
            run_pipeline(sim, config)
        }
    }
}

/// Spin up the component threads and tick the pipeline forever.
fn run_pipeline<Src>(source: Src, config: Config) -> Result<(), Box<dyn Error>>
where
    Src: TelemetrySource + Send + 'static,
{
    let target = format!("{}:{}", config.target.host, config.target.port);
    let rate = config.target.update_rate.clamp(1.0, 240.0);
    let tick = Duration::from_secs_f32(1.0 / rate);

    let source = Arc::new(Mutex::new(source));
    let mut accumulator = SampleAccumulator::new(Arc::clone(&source));

    let mapper = MapperStage::new(config);
    let emitter = EmitterStage::new(&target)?;

    let (tick_tx, mapper_rx) = channel();
    let (mapper_tx, emitter_rx) = channel();
    let (emitter_tx, sent_rx) = channel();

    let _mapper_thread = run_component(Box::new(mapper), mapper_rx, mapper_tx);
    let _emitter_thread = run_component(Box::new(emitter), emitter_rx, emitter_tx);

    info!("sending control messages to {} at {} Hz", target, rate);

    let sleeper = SpinSleeper::default();
    let mut sent_since_report: usize = 0;
    let mut last_report = Instant::now();

    loop {
        let latest = accumulator.latest();
        if tick_tx.send(latest).is_err() {
            // The mapper thread is gone; nothing downstream can recover.
            return Err("mapper stage hung up".into());
        }

        sent_since_report += sent_rx.try_iter().sum::<usize>();
        if last_report.elapsed() >= Duration::from_secs(5) {
            info!(
                "emitted {} control messages in the last 5s",
                sent_since_report
            );
            sent_since_report = 0;
            last_report = Instant::now();
        }

        sleeper.sleep(tick);
    }
}
