mod argument_parsing;

use clap::Parser;
use log::info;

use crate::argument_parsing::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let summary = cycle_demo::run(cli.program, cli.run_options())?;

    info!(
        "done: {} cycles, {} arrivals left over",
        summary.completed_rounds, summary.leftover_arrivals
    );
    for report in &summary.reports {
        info!(
            "[{}] {} units, completed {} cycles",
            report.name, report.units, report.rounds_completed
        );
    }

    Ok(())
}
