//! NextGCore PFCP Simulator
//!
//! Drives one bounded N4 scenario against a UPF: associate, create the
//! requested sessions, optionally modify them, delete them and release the
//! association.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nextgcore_pfcpsimd::sim::{
    create_sessions, delete_sessions, modify_sessions, AppFilter, CreateSessionsParams,
    ModifySessionsParams, UeAddressPool,
};
use nextgcore_pfcpsimd::{PfcpClient, PfcpSimConfig};

/// NextGCore PFCP Simulator - N4 control-plane emulator
#[derive(Parser, Debug)]
#[command(name = "nextgcore-pfcpsimd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PFCP control-plane simulator for UPF testing", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// UPF N4 address (host or host:port)
    #[arg(long)]
    remote_peer: Option<String>,

    /// Local N4 source address
    #[arg(long)]
    local_address: Option<IpAddr>,

    /// Number of sessions to create
    #[arg(long, default_value = "1")]
    count: u32,

    /// Index of the first session
    #[arg(long, default_value = "1")]
    base_id: u32,

    /// Modify the sessions after creating them
    #[arg(long)]
    modify: bool,

    /// Buffer downlink traffic on modification instead of forwarding
    #[arg(long)]
    buffer: bool,

    /// Ask the UPF to notify the CP of buffered downlink data
    #[arg(long)]
    notify_cp: bool,

    /// Application filter, {ip|udp|tcp}:{CIDR|any}:{lo-hi|any}:{allow|deny}:{precedence}
    #[arg(long = "app-filter")]
    app_filters: Vec<String>,

    /// QoS flow identifier for the session rules
    #[arg(long)]
    qfi: Option<u8>,

    /// (g/e)NodeB address for downlink forwarding
    #[arg(long)]
    gnodeb_address: Option<Ipv4Addr>,

    /// Add a volume-threshold URR to every session
    #[arg(long)]
    with_urr: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,
}

impl Args {
    fn load_config(&self) -> Result<PfcpSimConfig> {
        let mut config = match &self.config {
            Some(path) => PfcpSimConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {path}"))?,
            None => PfcpSimConfig::default(),
        };
        if let Some(peer) = &self.remote_peer {
            config.remote_peer = peer.clone();
        }
        if let Some(addr) = self.local_address {
            config.local_address = Some(addr);
        }
        Ok(config)
    }

    fn create_params(&self) -> Result<CreateSessionsParams> {
        let app_filters = self
            .app_filters
            .iter()
            .map(|f| AppFilter::parse(f))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid application filter")?;
        Ok(CreateSessionsParams {
            count: self.count,
            base_id: self.base_id,
            qfi: self.qfi,
            app_filters,
            with_urr: self.with_urr,
        })
    }

    fn modify_params(&self) -> ModifySessionsParams {
        ModifySessionsParams {
            count: self.count,
            base_id: self.base_id,
            buffer: self.buffer,
            notify_cp: self.notify_cp,
            gnodeb_address: self.gnodeb_address,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    log::info!("NextGCore PFCP simulator v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = args.load_config()?;
    let create = args.create_params()?;
    let modify = args.modify.then(|| args.modify_params());

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let client = PfcpClient::new(config);
    client.connect().await.context("Failed to open N4 path")?;
    client
        .setup_association()
        .await
        .context("PFCP association setup failed")?;

    let result = run_scenario(&client, &create, modify.as_ref(), &shutdown).await;
    if let Err(e) = &result {
        log::error!("Scenario failed: {e:#}");
    }

    // Leave nothing behind on the UPF
    if !client.sessions().is_empty() && client.is_association_alive() {
        match client.delete_all_sessions().await {
            Ok(n) => log::info!("Deleted {n} remaining sessions"),
            Err(e) => log::warn!("Failed to delete remaining sessions: {e}"),
        }
    }
    if client.is_association_alive() {
        if let Err(e) = client.teardown_association().await {
            log::warn!("PFCP association release failed: {e}");
        }
    }
    client.disconnect();

    log::info!("NextGCore PFCP simulator stopped");
    result
}

/// Run the session phases one index at a time so a shutdown request takes
/// effect between sessions
async fn run_scenario(
    client: &PfcpClient,
    create: &CreateSessionsParams,
    modify: Option<&ModifySessionsParams>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut pool = UeAddressPool::new(&client.config().ue_pool)?;
    let indices = create.base_id..create.base_id.saturating_add(create.count);

    for index in indices.clone() {
        if stopping(shutdown) {
            return Ok(());
        }
        let params = CreateSessionsParams {
            count: 1,
            base_id: index,
            ..create.clone()
        };
        create_sessions(client, &mut pool, &params)
            .await
            .with_context(|| format!("Failed to create session {index}"))?;
    }
    log::info!("{} sessions created", client.sessions().len());

    if let Some(modify) = modify {
        for index in indices.clone() {
            if stopping(shutdown) {
                return Ok(());
            }
            let params = ModifySessionsParams {
                count: 1,
                base_id: index,
                ..modify.clone()
            };
            modify_sessions(client, &params)
                .await
                .with_context(|| format!("Failed to modify session {index}"))?;
        }
    }

    for index in indices {
        if stopping(shutdown) {
            return Ok(());
        }
        delete_sessions(client, 1, index)
            .await
            .with_context(|| format!("Failed to delete session {index}"))?;
    }

    if !client.is_association_alive() {
        anyhow::bail!("PFCP association lost during the scenario");
    }
    Ok(())
}

fn stopping(shutdown: &AtomicBool) -> bool {
    if shutdown.load(Ordering::SeqCst) {
        log::info!("Shutdown requested, stopping scenario");
        true
    } else {
        false
    }
}

/// Initialize logging
fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);
    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}
