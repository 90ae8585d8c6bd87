//! Service configuration.
//!
//! The CLI flags are the entire configuration surface; everything else that
//! varies per heartbeat source arrives as annotations on the heartbeat
//! itself (see the extractor in the checker module).

use chrono::Duration;

/// Listen address used when `--listen` is not given. A bare `:port` binds
/// all interfaces.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9799";

/// Default minijinja template for the Slack notification text: the receiver
/// and group labels on the first line, one `key: value` line per common
/// annotation.
pub const DEFAULT_SLACK_TEMPLATE: &str =
    "{{ receiver }}: {{ groupLabels }}{% for k, v in commonAnnotations|items %}\n{{ k }}: {{ v }}{% endfor %}";

/// Timing knobs for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct CheckerSettings {
    /// Activation window applied when a heartbeat carries no (or an
    /// unparseable) `msd_activation` annotation.
    pub default_activation: Duration,
    /// Minimum spacing between consecutive outbound notifications for one
    /// instance.
    pub send_interval: Duration,
    /// How long after a resolve the resolve notification keeps being
    /// re-issued.
    pub resolve_repeat: Duration,
    /// Minimum spacing between Slack notifications for one instance.
    pub slack_send_interval: Duration,
    /// How long an instance may stay overdue before it is dropped from the
    /// registry entirely.
    pub expiry_window: Duration,
    /// Reconciler tick period.
    pub tick_period: std::time::Duration,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        CheckerSettings {
            default_activation: Duration::minutes(10),
            send_interval: Duration::seconds(60),
            resolve_repeat: Duration::minutes(15),
            slack_send_interval: Duration::minutes(20),
            expiry_window: Duration::hours(2),
            tick_period: std::time::Duration::from_secs(5),
        }
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on, as given (`:port` or `host:port`).
    pub listen_address: String,
    /// URL under which this service is reachable by users; stamped on
    /// outbound alerts as their generator URL.
    pub external_url: String,
    /// Template for Slack notification text.
    pub slack_template: String,
    /// Reconciler timing.
    pub checker: CheckerSettings,
}

impl AppConfig {
    /// Builds a config from CLI inputs, deriving the external URL from the
    /// listen address when none is given.
    pub fn new(listen_address: String, external_url: Option<String>, slack_template: String) -> Self {
        let external_url =
            external_url.filter(|u| !u.is_empty()).unwrap_or_else(|| derive_external_url(&listen_address));
        AppConfig { listen_address, external_url, slack_template, checker: CheckerSettings::default() }
    }

    /// The address to actually bind, normalising a bare `:port` to all
    /// interfaces.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

fn derive_external_url(listen_address: &str) -> String {
    if listen_address.starts_with(':') {
        format!("http://localhost{listen_address}")
    } else {
        format!("http://{listen_address}")
    }
}
