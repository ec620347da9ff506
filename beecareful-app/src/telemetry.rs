use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BEECAREFUL_LOG";
const DEFAULT_FILTER: &str = "beecareful_app=info,beecareful_client=info,beecareful_map=warn,beecareful_notifications=info";

/// Installs the fmt subscriber. The filter comes from `BEECAREFUL_LOG`.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }
}
