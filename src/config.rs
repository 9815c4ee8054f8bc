use anyhow::Result;
use serde::Deserialize;

use crate::acl::Ipv4Prefix;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub acl: AclConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed CORS origins. Defaults to localhost dev ports.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
    /// Directory served for every path the router does not know.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AclConfig {
    /// Allow-list rules loaded at startup, CIDR or bare address.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Deny-list rules loaded at startup.
    #[serde(default)]
    pub deny: Vec<String>,
    /// Take the client address from `X-Real-IP` / `X-Forwarded-For`.
    /// Only enable behind a proxy that overwrites these headers.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for the `/black` routes. Unset leaves them open.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_api_port() -> u16 { 8080 }
fn default_cors_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:8080".to_string(),
    ]
}

const MIN_ADMIN_TOKEN_LEN: usize = 16;

pub fn validate(cfg: &Config) -> Result<()> {
    for (list, rules) in [("allow", &cfg.acl.allow), ("deny", &cfg.acl.deny)] {
        for rule in rules {
            if let Err(e) = rule.parse::<Ipv4Prefix>() {
                anyhow::bail!("CONFIG ERROR: acl.{} contains an invalid rule: {}", list, e);
            }
        }
    }

    if let Some(token) = &cfg.admin.token {
        if token.len() < MIN_ADMIN_TOKEN_LEN {
            anyhow::bail!(
                "CONFIG ERROR: admin token must be at least {} characters (current: {})",
                MIN_ADMIN_TOKEN_LEN,
                token.len()
            );
        }
    }

    if cfg.admin.token.is_none() {
        tracing::warn!("No admin token configured; /black routes are open to every allowed client");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}

pub fn load() -> Result<Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("CIDR_GATE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("acl.allow")
                .with_list_parse_key("acl.deny")
                .with_list_parse_key("api.cors_allowed_origins")
                .try_parsing(true),
        )
        .set_default("api.bind", "0.0.0.0")?
        .set_default("api.port", 8080)?
        .set_default("acl.trust_forwarded_headers", false)?
        .build()?
        .try_deserialize()?;

    validate(&cfg)?;

    Ok(cfg)
}
