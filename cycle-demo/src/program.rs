//! The demo programs: a fixed table of participants and a round separator.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use anyhow::{anyhow, Context};
use cycle_sync::CycleBarrier;
use log::{info, warn};

use crate::participant::{run_participant, spawn_participant, ParticipantReport, ParticipantSpec};

/// Which set of periodic participants to run.
#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Program {
    /// Two worker threads plus the main thread, all with unrelated periods.
    Preemptive,
    /// Three blinker threads, one of them with a burst before its arrival.
    Leds,
}

const PREEMPTIVE: &[ParticipantSpec] = &[
    ParticipantSpec {
        name: "T1",
        activity: "low-priority thread running",
        burst: None,
        period: Duration::from_millis(700),
    },
    ParticipantSpec {
        name: "T2",
        activity: "high-priority thread working",
        burst: None,
        period: Duration::from_millis(1200),
    },
    ParticipantSpec {
        name: "MAIN",
        activity: "monitoring system",
        burst: None,
        period: Duration::from_millis(2000),
    },
];

const LEDS: &[ParticipantSpec] = &[
    ParticipantSpec {
        name: "T1",
        activity: "led0 toggled, sleep 500ms",
        burst: None,
        period: Duration::from_millis(500),
    },
    ParticipantSpec {
        name: "T2",
        activity: "led1 toggled, sleep 200ms",
        burst: None,
        period: Duration::from_millis(200),
    },
    ParticipantSpec {
        name: "T3",
        activity: "led2 burst done, sleep 800ms",
        burst: Some(Duration::from_millis(100)),
        period: Duration::from_millis(800),
    },
];

impl Program {
    /// All participants of this program, one barrier arrival each per unit.
    pub fn participants(self) -> &'static [ParticipantSpec] {
        match self {
            Program::Preemptive => PREEMPTIVE,
            Program::Leds => LEDS,
        }
    }

    /// Whether the last participant runs on the calling thread instead of
    /// getting a thread of its own.
    pub fn main_participates(self) -> bool {
        matches!(self, Program::Preemptive)
    }
}

/// Knobs shared by every program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Work units per participant, `None` runs until the process is killed.
    pub units: Option<u64>,
    /// Divide every period by this.
    pub speedup: u32,
}

/// Totals after every participant stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds the barrier completed.
    pub completed_rounds: u64,
    /// Arrivals that did not make a full round.
    pub leftover_arrivals: usize,
    /// Per participant, in table order.
    pub reports: Vec<ParticipantReport>,
}

/// Run `program` to completion.
pub fn run(program: Program, options: RunOptions) -> anyhow::Result<RunSummary> {
    let specs: Vec<ParticipantSpec> = program
        .participants()
        .iter()
        .map(|spec| spec.scaled(options.speedup))
        .collect();

    let mut separators = 0u64;
    let barrier = Arc::new(CycleBarrier::new(specs.len(), move || {
        separators += 1;
        info!("---- cycle {separators} complete ----");
    })?);

    info!(
        "starting {program:?} with {} participants, {} units each",
        specs.len(),
        options
            .units
            .map_or_else(|| "unbounded".to_owned(), |units| units.to_string())
    );

    let (threaded, on_main) = match specs.split_last() {
        Some((last, rest)) if program.main_participates() => (rest, Some(*last)),
        _ => (&specs[..], None),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handles = spawn_all(threaded, &stop, |spec| {
        spawn_participant(spec, barrier.clone(), options.units, stop.clone())
    })?;

    let main_report = on_main.map(|spec| run_participant(spec, &barrier, options.units, &stop));

    let mut reports = handles
        .into_iter()
        .map(|(name, handle)| {
            handle
                .join()
                .map_err(|_| anyhow!("participant {name} panicked"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    reports.extend(main_report);

    Ok(RunSummary {
        completed_rounds: barrier.completed_rounds(),
        leftover_arrivals: barrier.arrivals(),
        reports,
    })
}

type Spawned = Vec<(&'static str, JoinHandle<ParticipantReport>)>;

/// Spawn one thread per spec. If any spawn fails, the threads started so far
/// are stopped and joined before the error is returned.
fn spawn_all<S>(
    specs: &[ParticipantSpec],
    stop: &AtomicBool,
    mut spawn: S,
) -> anyhow::Result<Spawned>
where
    S: FnMut(ParticipantSpec) -> io::Result<JoinHandle<ParticipantReport>>,
{
    let mut spawned = Spawned::with_capacity(specs.len());

    for spec in specs {
        match spawn(*spec) {
            Ok(handle) => {
                info!("[{}] thread started", spec.name);
                spawned.push((spec.name, handle));
            }
            Err(e) => {
                warn!("[{}] could not be started, stopping the others", spec.name);
                stop.store(true, Ordering::Release);
                for (_, handle) in spawned {
                    // Their result is moot, the run failed.
                    let _ = handle.join();
                }
                return Err(e).with_context(|| format!("spawning participant {}", spec.name));
            }
        }
    }

    Ok(spawned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables() {
        assert_eq!(Program::Preemptive.participants().len(), 3);
        assert_eq!(Program::Leds.participants().len(), 3);
        assert!(Program::Preemptive.main_participates());
        assert!(!Program::Leds.main_participates());
    }

    #[test]
    fn only_the_led_burst_participant_bursts() {
        let bursting: Vec<_> = Program::Leds
            .participants()
            .iter()
            .filter(|spec| spec.burst.is_some())
            .map(|spec| spec.name)
            .collect();

        assert_eq!(bursting, ["T3"]);
    }

    #[test]
    fn failed_spawn_stops_started_participants() {
        let barrier = Arc::new(CycleBarrier::new(3, || ()).unwrap());
        let stop = Arc::new(AtomicBool::new(false));
        let specs: Vec<_> = LEDS.iter().map(|spec| spec.scaled(1000)).collect();

        // Unbounded participants: this only returns if they were stopped.
        let result = spawn_all(&specs, &stop, |spec| {
            if spec.name == "T2" {
                return Err(io::Error::other("out of threads"));
            }
            spawn_participant(spec, barrier.clone(), None, stop.clone())
        });

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "spawning participant T2");
        assert!(stop.load(Ordering::Acquire));
        assert_eq!(barrier.completed_rounds(), 0);
        assert_eq!(Arc::strong_count(&barrier), 1);
    }
}
