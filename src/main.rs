use std::sync::Arc;

use clap::Parser;
use prommsd::checker::{AlertChecker, Registry};
use prommsd::config::{AppConfig, DEFAULT_LISTEN_ADDRESS, DEFAULT_SLACK_TEMPLATE};
use prommsd::http_client::HttpClientPool;
use prommsd::http_server::{self, ApiState};
use prommsd::metrics::AppMetrics;
use prommsd::notification::Notifier;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// A Prometheus monitoring safety device: receives heartbeat alerts routed
/// through Alertmanager and raises an alert of its own when a heartbeat
/// stops arriving.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Where to listen for HTTP requests.
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    listen: String,

    /// URL where this service is accessible to users; derived from the
    /// listen address if not given.
    #[arg(long)]
    external_url: Option<String>,

    /// Template used to format Slack notification text.
    #[arg(long, default_value = DEFAULT_SLACK_TEMPLATE)]
    slack_template: String,
}

#[tokio::main]
async fn main() {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = AppConfig::new(cli.listen, cli.external_url, cli.slack_template);

    let metrics = Arc::new(AppMetrics::new());
    let registry = Arc::new(Registry::new(Arc::clone(&metrics)));
    let notifier = Arc::new(Notifier::new(
        Arc::new(HttpClientPool::new()),
        config.slack_template.clone(),
        config.checker.slack_send_interval,
        Arc::clone(&metrics),
    ));

    let checker = Arc::new(AlertChecker::new(
        Arc::clone(&registry),
        notifier,
        config.checker.clone(),
        config.external_url.clone(),
    ));
    let handle = checker.spawn();

    tracing::info!(external_url = %config.external_url, "reconciler started");

    let state = ApiState::new(registry, handle, metrics);
    http_server::run_server(&config.bind_address(), state).await;
}
