//! Tracing subscriber setup for applications and examples.

use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Calling this more
/// than once, or after another subscriber was installed, is a no-op.
///
/// ```rust
/// arvos::logging::init("arvos=info");
/// arvos::logging::init("arvos=debug");
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init("arvos=debug");
        super::init("arvos=trace");
        tracing::debug!("logging initialised twice without panicking");
    }
}
