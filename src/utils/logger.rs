use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(level: Option<&str>, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match (level, verbose) {
        (_, true) => EnvFilter::new("time_entry_manager=debug,info"),
        (Some(level), false) => EnvFilter::new(format!("time_entry_manager={}", level)),
        (None, false) => EnvFilter::new("time_entry_manager=info"),
    })
}

/// `level` comes from the `[logging]` section of the settings file, `RUST_LOG` still wins.
pub fn init_cli_logger(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(level, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_lambda_logger() {
    tracing_subscriber::registry()
        .with(default_filter(None, false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .json(), // Lambda uses JSON format for better CloudWatch integration
        )
        .init();
}
