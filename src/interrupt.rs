//! Ctrl+C handling for long extraction runs.
//!
//! The first interrupt only raises a flag, so the running command can stop
//! between chunks and save what it has. A second interrupt exits at once.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Route SIGINT to [`stop_flag`]. Elsewhere Ctrl+C keeps its default action.
pub fn install_handler() {
    #[cfg(unix)]
    {
        let handler = on_interrupt as extern "C" fn(libc::c_int);
        // SAFETY: the handler only touches an atomic and calls `_exit`, both
        // async-signal-safe.
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            log::warn!("Failed to install the interrupt handler");
        }
    }
}

/// Set once the user asked to stop
pub fn stop_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

#[cfg(unix)]
extern "C" fn on_interrupt(_: libc::c_int) {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // SAFETY: `_exit` is async-signal-safe.
        unsafe { libc::_exit(130) };
    }
}
