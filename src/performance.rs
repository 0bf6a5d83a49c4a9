//! Wall-clock timing for top-level commands.

use std::time::Instant;

use log::info;

/// Run `f` and log how long it took at info level.
pub fn log_duration<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    info!("{} took {:.2}s", name, start.elapsed().as_secs_f64());
    result
}
