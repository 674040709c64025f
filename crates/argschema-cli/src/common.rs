//! Common types and utilities shared across commands

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Crates whose tracing output follows `-v`
const TRACED_CRATES: &[&str] = &[
    "args_to_schema",
    "argschema_core",
    "argschema_loader",
    "argschema_manifest",
];

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Only print warnings and errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Do not write argschema.log")]
    pub no_log_file: bool,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Default tracing directive when `RUST_LOG` is not set
    pub fn tracing_directive(&self) -> String {
        let level = match self.verbosity_level() {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        TRACED_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the stderr tracing subscriber; a second call is a no-op
pub fn init_tracing(opts: &GlobalOpts) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| opts.tracing_directive().into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
