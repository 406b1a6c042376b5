use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable that turns on diagnostic output without `--debug`.
pub const DEBUG_ENV_VAR: &str = "GOLD_REPRICER_DEBUG";

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Enables debug output if the flag is set or the environment asks for it.
/// Any value other than empty, `0` or `false` counts as enabled.
pub fn init_from_env(flag: bool) {
    let from_env = std::env::var(DEBUG_ENV_VAR)
        .map(|v| {
            let v = v.trim().to_lowercase();
            !v.is_empty() && v != "0" && v != "false"
        })
        .unwrap_or(false);
    set_debug(flag || from_env);
}

#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            println!("[debug] {}", format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[debug] {}", format!($($arg)*));
        }
    };
}
