use clap::Parser;
use cycle_demo::{Program, RunOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Periodic threads sharing a cycle barrier
pub struct Cli {
    /// Which set of participants to run
    #[arg(value_enum, default_value_t = Program::Preemptive)]
    pub program: Program,

    /// Work units per participant
    ///
    /// If omitted every participant runs until the process is stopped
    #[arg(short, long)]
    pub units: Option<u64>,

    /// Divide every participant's period by this factor
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub speedup: u32,

    /// Enable more verbose output, repeat up to `-vvv` for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            units: self.units,
            speedup: self.speedup,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
