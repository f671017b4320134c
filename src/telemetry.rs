use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn default_filter() -> &'static str {
    if cfg!(feature = "verbose_log") {
        "debug,hyper=info,reqwest=info,tower_http=debug"
    } else {
        "info,hyper=warn,reqwest=warn,tower_http=info"
    }
}

/// `RUST_LOG` overrides the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
