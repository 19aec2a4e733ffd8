use std::{fs, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use smafs::{SmaApi, SmaFs};

#[derive(Parser)]
#[command(name = "smafs")]
#[command(version, about = "Mount an SMA inverter's web file store as a read-only filesystem", long_about = None)]
struct Cli {
    /// Device URL, e.g. https://192.168.0.10 (any path component is dropped)
    url: String,

    /// Directory to mount on
    mountpoint: String,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Verbose operation logging
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let base = base_url(&cli.url)?;
    let right = read_credential("SMAFS_USER").context("loading access profile")?;
    let pass = read_credential("SMAFS_PASS").context("loading password")?;

    let api = SmaApi::with_tls_config(&base, cli.insecure)?;
    let rt = Arc::new(Runtime::new().context("starting async runtime")?);

    tracing::info!(base = %base, "logging in");
    let sid = rt.block_on(api.login(&right, &pass))?;

    let fs = SmaFs::new(api.clone(), sid.clone(), rt.clone());
    tracing::info!(mountpoint = %cli.mountpoint, "mounting");
    let mounted = fs.mount(&cli.mountpoint);

    // Best-effort; an unterminated session expires on the device on its own.
    match rt.block_on(api.logout(&sid)) {
        Ok(true) => tracing::info!("session terminated"),
        Ok(false) => tracing::warn!("device did not confirm session termination"),
        Err(e) => tracing::warn!(error = %e, "logout failed"),
    }

    mounted
}

/// Reduce a device URL to `scheme://host[:port]`.
fn base_url(raw: &str) -> anyhow::Result<String> {
    let url = reqwest::Url::parse(raw).with_context(|| format!("invalid device URL {}", raw))?;
    let host = url.host_str().context("device URL has no host")?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Read a credential from the file named by the environment variable `var`,
/// with trailing whitespace trimmed.
fn read_credential(var: &str) -> anyhow::Result<String> {
    let path = std::env::var(var).with_context(|| format!("{} is not set", var))?;
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading credential file {}", path))?;
    Ok(contents.trim_end().to_string())
}
