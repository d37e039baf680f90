//! ceph-rebalancer: gradual data rebalancing tool for Ceph.
//!
//! # Usage
//!
//! ```text
//! ceph-rebalancer --ceph-user admin reweight \
//!     --target-osd-crush-weights 1:2.5999,2:2.5999 \
//!     --weight-increment 0.02 --sleep-duration 5m --dry-run false
//! ```

#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

mod server;

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use prometheus::Registry;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rebalancer_core::cli::parse::parse_target_weights;
use rebalancer_core::infrastructure::ceph::CephCli;
use rebalancer_core::shutdown::CancelToken;
use rebalancer_core::{Rebalancer, RebalancerConfig, Settings};

/// Pause between cycles when neither a flag nor a settings file sets one.
const CLI_SLEEP_DEFAULT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Parser)]
#[command(name = "ceph-rebalancer", about = "Gradual data rebalancing tool for Ceph.")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Ceph username provided without the 'client.' prefix.
    #[arg(long, env = "REBALANCER_CEPH_USER", default_value = "", global = true)]
    ceph_user: String,

    /// Ceph config used for establishing connection to the cluster.
    #[arg(
        long,
        env = "REBALANCER_CEPH_CONF",
        default_value = "/etc/ceph/ceph.conf",
        global = true
    )]
    ceph_conf: PathBuf,

    /// Address on which metrics are exported. A bare `:port` listens on all interfaces.
    #[arg(long, env = "REBALANCER_METRICS_ADDR", default_value = "0.0.0.0:8928", global = true)]
    metrics_addr: String,

    /// Optional YAML settings file; explicit flags override its values.
    #[arg(long, env = "REBALANCER_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reweight a set of OSDs.
    Reweight(ReweightArgs),
}

#[derive(Debug, Args)]
struct ReweightArgs {
    /// Target CRUSH weights as comma-separated `osd:weight` pairs, e.g. `1:2.5999,2:2.5999`.
    #[arg(long, env = "REBALANCER_TARGET_OSD_CRUSH_WEIGHTS")]
    target_osd_crush_weights: String,

    /// Maximum PGs allowed in backfill/backfill_wait state [default: 10].
    #[arg(long, env = "REBALANCER_MAX_BACKFILL_PGS")]
    max_backfill_pgs: Option<u64>,

    /// Maximum PGs allowed in recovering/recovery_wait state [default: 10].
    #[arg(long, env = "REBALANCER_MAX_RECOVERY_PGS")]
    max_recovery_pgs: Option<u64>,

    /// CRUSH weight added to each OSD per cycle [default: 0.02].
    #[arg(long, env = "REBALANCER_WEIGHT_INCREMENT")]
    weight_increment: Option<f64>,

    /// Pause between cycles, e.g. `30s`, `5m` [default: 5m].
    #[arg(long, env = "REBALANCER_SLEEP_DURATION")]
    sleep_duration: Option<humantime::Duration>,

    /// Only log what would be done. Pass `false` to actually reweight [default: true].
    #[arg(long, env = "REBALANCER_DRY_RUN", action = clap::ArgAction::Set)]
    dry_run: Option<bool>,
}

impl ReweightArgs {
    /// Built-in defaults, then the settings file, then explicit flags.
    fn settings(&self, config: Option<&Path>) -> Result<Settings> {
        let mut settings = match config {
            Some(path) => Settings::load(path)?,
            None => Settings {
                sleep_interval_ms: CLI_SLEEP_DEFAULT.as_millis() as u64,
                ..Settings::default()
            },
        };
        if let Some(n) = self.max_backfill_pgs {
            settings.max_backfill_pgs = n;
        }
        if let Some(n) = self.max_recovery_pgs {
            settings.max_recovery_pgs = n;
        }
        if let Some(inc) = self.weight_increment {
            settings.weight_increment = inc;
        }
        if let Some(sleep) = &self.sleep_duration {
            settings.sleep_interval_ms = sleep.as_millis() as u64;
        }
        if let Some(dry_run) = self.dry_run {
            settings.dry_run = dry_run;
        }
        Ok(settings)
    }
}

/// `:8928` → `0.0.0.0:8928`, otherwise a plain socket address.
fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    full.parse()
        .with_context(|| format!("invalid metrics address {:?}", addr))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("REBALANCER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Enable ANSI colors only when stdout is a terminal and NO_COLOR is unset.
    let ansi = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Reweight(args) => reweight(cli.global, args).await,
    }
}

async fn reweight(global: GlobalArgs, args: ReweightArgs) -> Result<()> {
    let settings = args.settings(global.config.as_deref())?;
    let targets = parse_target_weights(&args.target_osd_crush_weights)
        .context("failed parsing target-weights")?;
    let metrics_addr = parse_listen_addr(&global.metrics_addr)?;

    let client = CephCli::new(&global.ceph_user, &global.ceph_conf)
        .context("cannot create new ceph-client")?;
    info!(cluster = client.cluster(), conf = %global.ceph_conf.display(), "using ceph cluster");

    let mut rebalancer = Rebalancer::new(RebalancerConfig {
        client: Some(Box::new(client)),
        targets,
        settings,
    })
    .context("initializing rebalancer failed")?;
    if rebalancer.is_dry_run() {
        info!("dry run enabled, no weights will be changed");
    }

    let collector = rebalancer
        .collector()
        .map_err(|e| anyhow!("cannot build metrics collector: {}", e))?;
    let registry = Registry::new();
    registry
        .register(Box::new(collector))
        .map_err(|e| anyhow!("cannot register metrics collector: {}", e))?;

    let listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("cannot start metrics server on {}", metrics_addr))?;
    info!(addr = %metrics_addr, "serving metrics");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, server::router(registry)).await {
            error!(error = %e, "metrics server stopped");
        }
    });

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping after the current cycle");
        signal_cancel.cancel();
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = rebalancer.run(&cancel);
        rebalancer.close();
        outcome
    })
    .await
    .context("reweight loop panicked")?;

    info!(?outcome, "rebalancer stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn reweight_args(cli: Cli) -> (GlobalArgs, ReweightArgs) {
        match cli.command {
            Command::Reweight(args) => (cli.global, args),
        }
    }

    #[test]
    fn reweight_defaults() {
        let (global, args) = reweight_args(parse(&[
            "ceph-rebalancer",
            "reweight",
            "--target-osd-crush-weights",
            "1:2.0",
        ]));
        assert_eq!(global.ceph_conf, PathBuf::from("/etc/ceph/ceph.conf"));
        let settings = args.settings(None).unwrap();
        assert!(settings.dry_run);
        assert_eq!(settings.weight_increment, 0.02);
        assert_eq!(settings.sleep_interval(), CLI_SLEEP_DEFAULT);
    }

    #[test]
    fn flags_override_defaults() {
        let (_, args) = reweight_args(parse(&[
            "ceph-rebalancer",
            "reweight",
            "--target-osd-crush-weights",
            "1:2.0",
            "--dry-run",
            "false",
            "--sleep-duration",
            "30s",
            "--weight-increment",
            "0.1",
            "--max-backfill-pgs",
            "3",
        ]));
        let settings = args.settings(None).unwrap();
        assert!(!settings.dry_run);
        assert_eq!(settings.sleep_interval(), Duration::from_secs(30));
        assert_eq!(settings.weight_increment, 0.1);
        assert_eq!(settings.max_backfill_pgs, 3);
        assert_eq!(settings.max_recovery_pgs, 10);
    }

    #[test]
    fn target_weights_are_required() {
        assert!(Cli::try_parse_from(["ceph-rebalancer", "reweight"]).is_err());
    }

    #[test]
    fn bare_port_listens_everywhere() {
        assert_eq!(
            parse_listen_addr(":8928").unwrap(),
            "0.0.0.0:8928".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_addr("not-an-addr").is_err());
    }
}
