use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "storefront=debug,tower_http=debug";

/// Initialize tracing.
///
/// `LOG_FORMAT=json` switches the console layer to JSON lines; everything else gets the
/// compact format. Calling this twice is harmless.
pub fn init_telemetry(environment: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        tracing_subscriber::registry()
            .with(filter)
            .with(console_fmt)
            .try_init()
    };

    match result {
        Ok(()) => tracing::info!(environment, json, "Tracing initialized"),
        Err(e) => tracing::debug!(error = %e, "Tracing subscriber already set"),
    }
}
