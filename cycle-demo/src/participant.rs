//! Periodic participants: `work; arrive; sleep` until told to stop.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use cycle_sync::CycleBarrier;
use log::{debug, info};

/// Static description of one periodic participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantSpec {
    /// Short tag used in the log, e.g. `T1`.
    pub name: &'static str,
    /// What the participant reports for each unit of work.
    pub activity: &'static str,
    /// Extra delay inside a unit of work, before the arrival.
    pub burst: Option<Duration>,
    /// Sleep between units, after the arrival.
    pub period: Duration,
}

impl ParticipantSpec {
    /// The same participant with all delays divided by `speedup`.
    pub fn scaled(self, speedup: u32) -> Self {
        let speedup = speedup.max(1);
        Self {
            burst: self.burst.map(|b| b / speedup),
            period: self.period / speedup,
            ..self
        }
    }
}

/// What a participant did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantReport {
    /// The participant's tag.
    pub name: &'static str,
    /// Number of units of work, one arrival each.
    pub units: u64,
    /// How many of those arrivals completed a round.
    pub rounds_completed: u64,
}

/// Run `spec` on the current thread.
///
/// `units` bounds the number of work units, `None` runs until `stop` is set.
/// `stop` is checked once per unit, after the period's sleep.
pub fn run_participant<F, R>(
    spec: ParticipantSpec,
    barrier: &CycleBarrier<F>,
    units: Option<u64>,
    stop: &AtomicBool,
) -> ParticipantReport
where
    F: FnMut() -> R,
{
    let mut report = ParticipantReport {
        name: spec.name,
        units: 0,
        rounds_completed: 0,
    };

    while units.map_or(true, |units| report.units < units) && !stop.load(Ordering::Acquire) {
        if let Some(burst) = spec.burst {
            thread::sleep(burst);
        }
        info!("[{}] {}", spec.name, spec.activity);

        if barrier.arrive().is_completed() {
            debug!("[{}] completed a round", spec.name);
            report.rounds_completed += 1;
        }
        report.units += 1;

        thread::sleep(spec.period);
    }

    report
}

/// Start `spec` on its own named thread.
pub fn spawn_participant<F, R>(
    spec: ParticipantSpec,
    barrier: Arc<CycleBarrier<F>>,
    units: Option<u64>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<ParticipantReport>>
where
    F: FnMut() -> R + Send + 'static,
{
    thread::Builder::new()
        .name(spec.name.to_owned())
        .spawn(move || run_participant(spec, &barrier, units, &stop))
}
