//! A cycle barrier: every `N` arrivals fire one completion action.
//!
//! Participants never wait on each other. Each one calls
//! [`CycleBarrier::arrive`] once per unit of work, at whatever pace it runs,
//! and the barrier makes sure that exactly one caller per round runs the
//! completion action.
//!
//! Example usage:
//!
//! ```rust
//! use cycle_sync::{CycleBarrier, RoundStatus};
//!
//! let barrier = CycleBarrier::new(3, || "round done").unwrap();
//!
//! assert_eq!(barrier.arrive(), RoundStatus::Contributed);
//! assert_eq!(barrier.arrive(), RoundStatus::Contributed);
//! assert_eq!(barrier.arrive(), RoundStatus::Completed("round done"));
//! assert_eq!(barrier.completed_rounds(), 1);
//! ```
//!
//! # Participant count
//!
//! The count given at construction must match the number of live
//! participants. The barrier cannot detect a mismatch: with too few
//! participants rounds never complete, with too many they complete early.
//! A participant that stops arriving stalls every later round.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use log::{debug, trace};

use crate::counter::AtomicRoundCounter;

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// Errors that can occur when building a [`CycleBarrier`].
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The barrier was configured without participants.
    NoParticipants,
}

impl core::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigurationError::NoParticipants => {
                write!(f, "a cycle barrier needs at least one participant")
            }
        }
    }
}

impl core::error::Error for ConfigurationError {}

/// The outcome of a single [`CycleBarrier::arrive`].
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus<R = ()> {
    /// The arrival was counted, some other arrival completes the round.
    Contributed,
    /// This arrival completed the round and ran the completion action,
    /// which returned the contained value.
    Completed(R),
}

impl<R> RoundStatus<R> {
    /// `true` if this arrival ran the completion action.
    pub fn is_completed(&self) -> bool {
        matches!(self, RoundStatus::Completed(_))
    }

    /// `true` if this arrival only contributed to the round.
    pub fn is_contributed(&self) -> bool {
        matches!(self, RoundStatus::Contributed)
    }

    /// The completion action's output, if this arrival ran it.
    pub fn into_output(self) -> Option<R> {
        match self {
            RoundStatus::Completed(output) => Some(output),
            RoundStatus::Contributed => None,
        }
    }
}

/// Counts arrivals from a fixed number of participants and runs a
/// completion action once per full round.
///
/// The action runs inside a critical section, so two invocations never
/// overlap. It must not call [`arrive`](Self::arrive) on its own barrier.
///
/// The section is the single global one from [`critical_section`], shared by
/// every barrier instance and everything else using it. On bare-metal
/// targets that usually means the action runs with interrupts disabled, so
/// keep it short.
///
/// A panicking action still consumes its round: the counter is rewound
/// before the action runs.
///
/// If the action returns a `Result`, a failed action still consumes the
/// round and the error is handed to the arrival that ran it through
/// [`RoundStatus::Completed`].
pub struct CycleBarrier<F> {
    participants: usize,
    arrivals: AtomicRoundCounter,
    /// Completed rounds. Only advanced by the arrival that wins a round.
    epoch: Mutex<Cell<u64>>,
    action: Mutex<RefCell<F>>,
}

impl<F, R> CycleBarrier<F>
where
    F: FnMut() -> R,
{
    /// Create a barrier for `participants` contributors that runs `action`
    /// once every `participants` arrivals.
    pub fn new(participants: usize, action: F) -> Result<Self, ConfigurationError> {
        if participants == 0 {
            return Err(ConfigurationError::NoParticipants);
        }

        Ok(Self {
            participants,
            arrivals: AtomicRoundCounter::new(),
            epoch: Mutex::new(Cell::new(0)),
            action: Mutex::new(RefCell::new(action)),
        })
    }

    /// Count one arrival.
    ///
    /// All but the round-completing arrival return
    /// [`RoundStatus::Contributed`] without taking any lock.
    pub fn arrive(&self) -> RoundStatus<R> {
        let n = self.arrivals.increment_and_get();

        if n < self.participants {
            return RoundStatus::Contributed;
        }

        self.complete_round()
    }

    /// Boundary path, taken by every arrival that saw the threshold.
    ///
    /// More than one arrival can get here for the same round if arrivals of
    /// the next round land before the winner takes the lock. The re-check
    /// under the lock lets exactly one of them consume the round.
    fn complete_round(&self) -> RoundStatus<R> {
        critical_section::with(|cs| {
            let epoch = self.epoch.borrow(cs);

            if self.arrivals.value() < self.participants {
                debug!(
                    "cycle barrier: round {} already completed by another arrival",
                    epoch.get()
                );
                return RoundStatus::Contributed;
            }

            // Consume the round before running the action: a failing action
            // must not leave the boundary armed.
            self.arrivals.rewind(self.participants);
            let round = epoch.get() + 1;
            epoch.set(round);

            trace!("cycle barrier: round {round} complete");

            let mut action = self.action.borrow_ref_mut(cs);
            RoundStatus::Completed((*action)())
        })
    }
}

impl<F> CycleBarrier<F> {
    /// The number of arrivals that make up a round.
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Arrivals counted towards the current round.
    pub fn arrivals(&self) -> usize {
        self.arrivals.value()
    }

    /// Number of rounds completed so far.
    pub fn completed_rounds(&self) -> u64 {
        critical_section::with(|cs| self.epoch.borrow(cs).get())
    }
}

impl<F> core::fmt::Debug for CycleBarrier<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CycleBarrier")
            .field("participants", &self.participants)
            .field("arrivals", &self.arrivals())
            .field("completed_rounds", &self.completed_rounds())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt-03")]
impl<F> defmt::Format for CycleBarrier<F> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CycleBarrier {{ participants: {}, arrivals: {}, completed_rounds: {} }}",
            self.participants,
            self.arrivals(),
            self.completed_rounds()
        )
    }
}


#[cfg(loom)]
mod loom_tests {
    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::sync::Arc;
    use loom::thread;

    use super::*;

    fn counting_barrier(
        participants: usize,
    ) -> (Arc<CycleBarrier<impl FnMut() + Send>>, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let action_fired = fired.clone();
        let barrier = CycleBarrier::new(participants, move || {
            action_fired.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        (Arc::new(barrier), fired)
    }

    #[test]
    fn overlapping_round_is_not_lost() {
        loom::model(|| {
            let (barrier, fired) = counting_barrier(2);

            let handles: std::vec::Vec<_> = (0..2)
                .map(|_| {
                    let barrier = barrier.clone();
                    thread::spawn(move || barrier.arrive().is_completed())
                })
                .collect();

            let mine = barrier.arrive().is_completed() as usize;
            let theirs: usize = handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum();

            assert_eq!(mine + theirs, 1);
            assert_eq!(fired.load(Ordering::Relaxed), 1);
            assert_eq!(barrier.arrivals(), 1);
        });
    }

    #[test]
    fn two_rounds_two_fires() {
        loom::model(|| {
            let (barrier, fired) = counting_barrier(3);

            let other = {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.arrive();
                    barrier.arrive();
                    barrier.arrive();
                })
            };

            barrier.arrive();
            barrier.arrive();
            barrier.arrive();
            other.join().unwrap();

            assert_eq!(fired.load(Ordering::Relaxed), 2);
            assert_eq!(barrier.arrivals(), 0);
            assert_eq!(barrier.completed_rounds(), 2);
        });
    }
}
