//! Diagnostic logging on stderr.
//!
//! Quiet by default: only warnings and errors are shown. Each `-v` raises the
//! level one step (info, debug, trace). `RUST_LOG` takes precedence over the
//! flag when set:
//!
//! ```bash
//! RUST_LOG=projref::fixer=debug projref validate .
//! ```

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Guards subscriber installation.
static INIT: Once = Once::new();

/// Install the global subscriber. Only the first call takes effect.
pub fn init(verbosity: u8) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(level_for(verbosity))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_filter(filter);

        // A subscriber installed elsewhere (e.g. by a test harness) wins.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}

/// Default filter directive for a `-v` count.
fn level_for(verbosity: u8) -> &'static str {
    return match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
}
