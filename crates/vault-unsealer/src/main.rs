//! # Vault Unsealer
//!
//! Finds sealed Vault standbys through Consul and submits one unseal key
//! share to each of them, reporting the unseal progress of every member.
//!
//! ## Flow
//! ```text
//! Consul (health/service/vault?tag=standby)
//!    ↓ sealed members
//! Resolver (identity | scaleway | static)
//!    ↓ reachable address
//! Vault (PUT /v1/sys/unseal on :8200)
//! ```
//!
//! Run it once per key holder; Vault keeps the share count between runs.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod credential;
mod discovery;
mod orchestrator;
mod report;
mod resolver;
mod vault;

use config::{AppConfig, Overrides};
use credential::TerminalPrompt;
use discovery::{ConsulClient, MemberDiscovery};
use orchestrator::UnsealOrchestrator;
use report::OutputFormat;
use resolver::{ResolverKind, build_resolver};
use unsealer_common::constants::env::{CONSUL_HTTP_ADDR, CONSUL_HTTP_TOKEN};
use vault::VaultClient;

/// Discover sealed vault members using Consul, and unseal them all using the provided unseal-key.
#[derive(Parser, Debug)]
#[command(name = "vault-unsealer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Resolve Vault addresses using the given resolver
    #[arg(short, long, value_enum)]
    resolver: Option<ResolverKind>,

    /// Configuration file path
    #[arg(short, long, default_value = "config/vault-unsealer.toml")]
    config: String,

    /// Consul HTTP address (overrides config)
    #[arg(long, env = CONSUL_HTTP_ADDR)]
    consul_addr: Option<String>,

    /// Consul ACL token (overrides config)
    #[arg(long, env = CONSUL_HTTP_TOKEN, hide_env_values = true)]
    consul_token: Option<String>,

    /// Scaleway region for the scaleway resolver (overrides config)
    #[arg(long)]
    region: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            consul_addr: self.consul_addr.clone(),
            consul_token: self.consul_token.clone(),
            region: self.region.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    tracing::info!("Starting vault-unsealer v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&args.config, &args.overrides())?;

    let resolver = build_resolver(args.resolver, &config).context("Failed to start resolver")?;
    let consul = ConsulClient::new(&config.consul, config.http.timeout())?;
    let vault = VaultClient::new(config.http.timeout())?;

    tracing::info!(consul = %config.consul.address, "Querying Consul for sealed Vault members");

    let orchestrator = UnsealOrchestrator::new(
        MemberDiscovery::new(consul, &config.vault),
        resolver,
        vault,
        config.vault.port,
    );

    let report = orchestrator
        .run(&TerminalPrompt)
        .await
        .context("Unseal run aborted")?;

    println!("{}", report.render(args.output));

    Ok(())
}

/// Initialize structured logging with tracing
///
/// Logs go to stderr so the report on stdout stays machine-readable.
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_flag_is_optional() {
        let args = Args::try_parse_from(["vault-unsealer"]).unwrap();
        assert_eq!(args.resolver, None);
        assert_eq!(args.output, OutputFormat::Text);
    }

    #[test]
    fn test_resolver_flag_selects_backend() {
        let args = Args::try_parse_from(["vault-unsealer", "-r", "scaleway", "--region", "ams1"]).unwrap();
        assert_eq!(args.resolver, Some(ResolverKind::Scaleway));
        assert_eq!(args.overrides().region.as_deref(), Some("ams1"));

        assert!(Args::try_parse_from(["vault-unsealer", "--resolver", "aws"]).is_err());
    }
}
