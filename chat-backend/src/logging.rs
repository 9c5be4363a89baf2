//! Log setup.
//!
//! Everything goes to stderr through `tracing`. The level is `INFO` unless
//! `RUST_LOG` says otherwise; `RUST_LOG=debug` also shows each saved message
//! and each page request.
//!
//! ```rust
//! use chat_backend::prelude::*;
//!
//! Logger::init();
//! Logger::init(); // no-op
//! ```
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::get_config;

static LOGGER: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Install the subscriber, then report where the configuration came from.
    /// Only the first call does anything.
    pub fn init() {
        LOGGER.get_or_init(|| {
            let config = get_config();

            let filter = EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy();
            let output = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.general.tty)
                .with_target(false);

            // A test harness may have installed a subscriber already.
            if tracing_subscriber::registry()
                .with(filter)
                .with(output)
                .try_init()
                .is_ok()
            {
                config.log_info();
            }
        });
    }
}
