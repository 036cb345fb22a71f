//! Command-line and environment configuration.

use std::{net::SocketAddr, time::Duration};

use agent_relay_session::RelayConfig;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "agent-relay")]
#[command(version, about = "Relays browser chat sessions to protocol agents")]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5001", env = "AGENT_RELAY_ADDR")]
    pub addr: SocketAddr,

    /// Agent a session talks to until it picks another
    #[arg(
        long,
        default_value = agent_relay_session::dispatcher::DEFAULT_AGENT_URL,
        env = "AGENT_RELAY_DEFAULT_AGENT_URL"
    )]
    pub default_agent_url: String,

    /// Timeout in seconds for agent discovery and RPC calls
    #[arg(long, default_value_t = 600, env = "AGENT_RELAY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Timeout in seconds for `/agent-card` lookups
    #[arg(long, default_value_t = 30, env = "AGENT_RELAY_CARD_TIMEOUT_SECS")]
    pub card_timeout_secs: u64,

    /// Delay in milliseconds before the welcome message
    #[arg(long, default_value_t = 500, env = "AGENT_RELAY_WELCOME_DELAY_MS")]
    pub welcome_delay_ms: u64,

    /// Output logs as JSON
    #[arg(long, env = "AGENT_RELAY_LOG_JSON")]
    pub log_json: bool,
}

impl Args {
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            default_agent_url: self.default_agent_url.clone(),
            welcome_delay: Duration::from_millis(self.welcome_delay_ms),
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn card_timeout(&self) -> Duration {
        Duration::from_secs(self.card_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["agent-relay"]).unwrap();
        assert_eq!(args.addr, "127.0.0.1:5001".parse().unwrap());
        assert_eq!(args.request_timeout(), Duration::from_secs(600));
        assert_eq!(args.card_timeout(), Duration::from_secs(30));
        assert_eq!(args.relay_config(), RelayConfig::default());
        assert!(!args.log_json);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "agent-relay",
            "--addr",
            "0.0.0.0:8080",
            "--default-agent-url",
            "http://agents.internal:10001/",
            "--welcome-delay-ms",
            "0",
            "--log-json",
        ])
        .unwrap();

        let config = args.relay_config();
        assert_eq!(config.default_agent_url, "http://agents.internal:10001/");
        assert_eq!(config.welcome_delay, Duration::ZERO);
        assert_eq!(args.addr.port(), 8080);
        assert!(args.log_json);
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Args::try_parse_from(["agent-relay", "--addr", "localhost"]).is_err());
    }
}
