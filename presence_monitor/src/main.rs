use presence_monitor::config::MonitorConfig;
use presence_monitor::presence_monitor;
use tracing_subscriber::EnvFilter;


#[tokio::main]
async fn main() {
    // construct a subscriber that prints formatted traces to stdout, honouring RUST_LOG
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    // use that subscriber to process traces emitted after this point
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber.");

    let config = MonitorConfig::from_env().expect("Invalid monitor configuration");

    presence_monitor(config)
        .await
        .expect("Presence monitor failed");
}
