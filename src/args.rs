// Commandline argument parser using clap for revtone

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct RevtoneArgs {
    #[command(subcommand, long_about)]
    /// Which telemetry source to run against
    pub command: CommandTask,

    /// Path to a RON config file; defaults apply when omitted
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// OSC target as host:port, overriding the config file
    #[arg(short = 'a', long = "addr")]
    pub addr: Option<String>,

    /// Mapping ticks per second, overriding the config file
    #[arg(short = 'r', long = "rate")]
    pub rate: Option<f32>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Map telemetry from the running simulator
    #[command(about)]
    Live(LiveCommand),

    /// Map a synthetic lap, no simulator required
    #[command(about)]
    Demo(DemoCommand),
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct LiveCommand {}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct DemoCommand {
    /// Seconds per synthetic lap
    #[arg(short = 'l', long = "lap", default_value_t = 90.0)]
    pub lap_period: f32,

    /// Relative jitter on the synthetic channels
    #[arg(short = 'n', long = "noise", default_value_t = 0.01)]
    pub noise: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_args_parse_with_defaults() {
        let args = RevtoneArgs::parse_from(["revtone", "demo"]);
        match args.command {
            CommandTask::Demo(demo) => {
                assert_eq!(demo.lap_period, 90.0);
                assert_eq!(demo.noise, 0.01);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(args.config.is_none());
    }

    #[test]
    fn global_overrides_parse_before_the_subcommand() {
        let args = RevtoneArgs::parse_from([
            "revtone",
            "--addr",
            "10.1.2.3:57120",
            "--rate",
            "30",
            "live",
        ]);
        assert_eq!(args.addr.as_deref(), Some("10.1.2.3:57120"));
        assert_eq!(args.rate, Some(30.0));
        assert!(matches!(args.command, CommandTask::Live(_)));
    }
}
