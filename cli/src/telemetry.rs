//! Log output for the CLI.
//!
//! Logs go to stderr so `--json` output on stdout stays machine-readable.
//! Verbosity follows `RUST_LOG` and defaults to warnings only.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init(json_logs: bool, verbose: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "council_sdk=debug,cq=debug"
        } else {
            DEFAULT_FILTER
        })
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_logs {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}
