//! Process-wide debug switch
//!
//! When on, internal-error responses carry the underlying error text (and the
//! stack trace of a recovered panic) and response bodies are pretty-printed.
//! Set it once at startup; it is read on every call.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn debug_mode() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}
