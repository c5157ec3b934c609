use env_logger::{Builder, Env};
use std::io::Write;

/// Initialises the process logger. `RUST_LOG` still wins; the config debug
/// flag only lowers the default filter.
pub fn init_logger(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}
