//! A loom-based implementation of CriticalSection, effectively copied from
//! the `critical_section::std` module (by way of RTIC's `rtic-sync`).
//!
//! Model tests need the barrier's exclusive section to be a loom mutex so
//! that loom explores every interleaving around the round boundary. The
//! section is re-entrant per thread, like `critical-section/std`.

use core::cell::RefCell;
use core::mem::MaybeUninit;

use loom::cell::Cell;
use loom::sync::{Mutex, MutexGuard};

loom::lazy_static! {
    static ref SECTION: Mutex<()> = Mutex::new(());
    // Initialized while some thread holds the section.
    static ref HELD: RefCell<MaybeUninit<MutexGuard<'static, ()>>> = RefCell::new(MaybeUninit::uninit());
}

loom::thread_local!(static IN_SECTION: Cell<bool> = Cell::new(false));

struct LoomCriticalSection;
critical_section::set_impl!(LoomCriticalSection);

unsafe impl critical_section::Impl for LoomCriticalSection {
    unsafe fn acquire() -> bool {
        IN_SECTION.with(|inside| {
            if inside.get() {
                return true;
            }

            // Thread local, nobody else can observe it early.
            inside.set(true);

            // A panicking completion action poisons the mutex; the section
            // itself stays usable.
            let guard = SECTION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            HELD.borrow_mut().write(guard);

            false
        })
    }

    unsafe fn release(nested: bool) {
        if nested {
            return;
        }

        // SAFETY: `release` is only called by the thread that acquired the
        // section, which initialized `HELD`. Read the guard out instead of
        // dropping in place: unlocking happens inside the guard's drop, and
        // another thread may already write `HELD` at that point.
        #[allow(let_underscore_lock)]
        let _ = unsafe { HELD.borrow_mut().assume_init_read() };

        IN_SECTION.with(|inside| inside.set(false));
    }
}
