//! stderr diagnostics setup.

use std::io::Write;

/// Install the process logger. Diagnostic lines go to stderr as
/// `[<component>] <message>` so the supervising process can tell them apart
/// from protocol output; default filter `info`, overridable with `RUST_LOG`.
/// Call once, at startup, before the first log line.
pub fn init(component: &'static str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| writeln!(buf, "[{}] {}", component, record.args()))
        .init();
}
