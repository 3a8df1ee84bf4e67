/// Log the message at error level and terminate the process.
///
/// Intended for unrecoverable startup failures in the daemon binary;
/// library code propagates errors instead.
#[macro_export]
macro_rules! error_exit {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        std::process::exit(1)
    }};
}
