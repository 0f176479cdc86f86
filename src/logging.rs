//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO level by default; the verbose toggle lowers the default to
/// DEBUG so every per-node decision is shown. The `RUST_LOG` environment
/// variable overrides both:
///
/// ```bash
/// RUST_LOG=depotr=trace depotr backup ...
/// RUST_LOG=depotr::reconcile=debug depotr backup ...
/// ```
pub fn init_tracing(verbose: bool) {
	let default_filter = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
		)
		.with_writer(std::io::stderr)
		.init();
}
