//! Performance instrumentation utilities

/// Time a block inside a profiling scope and log the elapsed time at trace level.
/// Usage: timed!("operation name", { code })
///
/// `$name` must be a string literal so every profiler backend accepts it.
#[macro_export]
macro_rules! timed {
    ($name:literal, $block:expr) => {{
        ::profiling::scope!($name);
        let _t = std::time::Instant::now();
        let r = $block;
        ::log::trace!("{}: {:?}", $name, _t.elapsed());
        r
    }};
}
