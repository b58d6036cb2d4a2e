use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub struct InitLoggingOptions<'a> {
    /// Used when RUST_LOG is not set.
    pub default_rust_log_value: Option<&'a str>,
    pub json: bool,
}

pub fn init_logging(opts: InitLoggingOptions) -> anyhow::Result<()> {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(rust_log) => EnvFilter::builder()
            .parse(&rust_log)
            .context("invalid RUST_LOG value")?,
        None => EnvFilter::builder()
            .parse(opts.default_rust_log_value.unwrap_or("info"))
            .context("can't parse provided rust_log value")?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if opts.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("can't init logging")?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("can't init logging")?;
    }
    Ok(())
}
