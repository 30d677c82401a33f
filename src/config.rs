//! Configuration parsing and validation for the bridge.
//!
//! Every field is environment-sourced via clap's `env` support, matching the
//! deployment contract (Render-style platforms inject `PORT`). Values are
//! read once at startup and immutable for the process lifetime.
use anyhow::anyhow;
use bon::Builder;
use clap::Parser;
use std::time::Duration;

/// Host of the fixed upstream webhook, used for the outbound Host header.
pub const UPSTREAM_HOST: &str = "payload.vextapp.com";

/// Base of the upstream hook URL; the channel token is appended per request.
pub const UPSTREAM_HOOK_BASE: &str = "https://payload.vextapp.com/hook/AKEIS1C8PZ/catch";

#[derive(Debug, Clone, Parser, Builder)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// API key presented to the upstream webhook.
    #[arg(long, env = "VEXT_API_KEY")]
    #[builder(into)]
    pub api_key: Option<String>,

    /// Per-deployment secret identifying the webhook channel, embedded in
    /// the upstream URL.
    #[arg(long, env = "CHANNEL_TOKEN")]
    #[builder(into)]
    pub channel_token: Option<String>,

    /// Deployment environment tag, forwarded to the upstream webhook.
    #[arg(long, env = "ENVIRONMENT", default_value = "production")]
    #[builder(into, default = "production".to_string())]
    pub environment: String,

    /// The port on which the bridge will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 5000)]
    #[builder(default = 5000)]
    pub port: u16,

    /// Seconds to wait for the upstream webhook before answering 408.
    #[arg(long, default_value_t = 30)]
    #[builder(default = 30)]
    pub upstream_timeout_secs: u64,

    /// Let GET /config report which secrets are set and the upstream URL.
    /// Off by default; do not enable on shared deployments.
    #[arg(long, env = "EXPOSE_CONFIG_SECRETS", default_value_t = false)]
    #[builder(default)]
    pub expose_config_secrets: bool,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow!("upstream timeout must be at least one second"));
        }
        Ok(self)
    }

    /// The full upstream URL, or None while the channel token is unset.
    /// Contains a secret; never log the returned value.
    pub fn upstream_url(&self) -> Option<String> {
        self.channel_token
            .as_ref()
            .map(|token| format!("{UPSTREAM_HOOK_BASE}/{token}"))
    }

    pub fn secrets_configured(&self) -> bool {
        self.api_key.is_some() && self.channel_token.is_some()
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
