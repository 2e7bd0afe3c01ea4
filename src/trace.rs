//! Env-gated diagnostic output for registry and reactor operations.
//!
//! Tracing is off unless `ANCHORNET_TRACE` is set to `1` or `true`, or a caller
//! flips it with [`set_enabled`]. Messages go to stderr as `[scope] message`.

use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;

static ENABLED: Lazy<AtomicBool> = Lazy::new(|| {
    let on = std::env::var("ANCHORNET_TRACE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    AtomicBool::new(on)
});

/// Whether trace output is currently emitted.
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Force tracing on or off, overriding the environment.
pub fn set_enabled(on: bool) {
    ENABLED.store(on, Ordering::Relaxed);
}

pub fn emit(scope: &str, message: &str) {
    eprintln!("[{scope}] {message}");
}

/// Emit a trace line under `scope` when tracing is enabled.
///
/// ```ignore
/// trace!("anchor"; "created parent {} for `{}`", id, address);
/// ```
#[macro_export]
macro_rules! trace {
    ($scope:expr; $($arg:tt)*) => {{
        if $crate::trace::enabled() {
            $crate::trace::emit($scope, &format!($($arg)*));
        }
    }};
}
