use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "ember-server", about = "Realtime chat and voice coordination core")]
pub struct Config {
    #[arg(long, env = "EMBER_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    #[arg(long, env = "EMBER_DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "EMBER_METRICS_NAMESPACE", default_value = "ember")]
    pub metrics_namespace: String,

    /// Accepts `dev:<user-uuid>` bearer tokens without a session lookup.
    /// Never set this outside local development.
    #[arg(long, env = "EMBER_DEV_MODE", default_value_t = false)]
    pub dev_mode: bool,

    #[arg(long, env = "EMBER_OUTBOX_SWEEP_MS", default_value_t = 5_000)]
    pub call_sweep_interval_ms: u64,

    #[arg(long, env = "EMBER_SESSION_SWEEP_MS", default_value_t = 300_000)]
    pub session_sweep_interval_ms: u64,
}
