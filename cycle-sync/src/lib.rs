//! Round-counting synchronization for independently scheduled periodic tasks.
//!
//! A [`CycleBarrier`] is shared by a fixed number of participants. Each
//! participant reports every finished unit of work with
//! [`CycleBarrier::arrive`]; once every participant's worth of arrivals has
//! been counted, exactly one of the callers runs the completion action.
//!
//! The completion action runs inside a [`critical_section`], so the crate
//! needs a critical section implementation, e.g. `critical-section/std` on
//! hosted targets or the one provided by the target's HAL.

#![no_std]
#![deny(missing_docs)]
//deny_warnings_placeholder_for_ci

#[cfg(any(test, loom))]
#[macro_use]
extern crate std;

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

pub mod barrier;
pub mod counter;

#[cfg(loom)]
mod loom_cs;

pub use barrier::{ConfigurationError, CycleBarrier, RoundStatus};
pub use counter::AtomicRoundCounter;
pub use portable_atomic;
