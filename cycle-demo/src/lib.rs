//! Periodic threads that report each unit of work to a shared
//! [`CycleBarrier`](cycle_sync::CycleBarrier) and print a separator once
//! every participant's worth of work has been seen.

#![deny(missing_docs)]

pub mod participant;
pub mod program;

pub use participant::{run_participant, spawn_participant, ParticipantReport, ParticipantSpec};
pub use program::{run, Program, RunOptions, RunSummary};
