use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mezcal_monitor::board::{ConnectionIndicator, VatBoard};
use mezcal_monitor::config::MonitorConfig;
use mezcal_monitor::connection::ConnectionManager;
use mezcal_monitor::consts::{
    ALL_VATS_UPDATE_EVENT, CONNECTION_STATUS_EVENT, DEFAULT_HISTORY_DAYS, DEFAULT_VAT_COUNT,
    default_config_path, vat_update_event,
};
use mezcal_monitor::events::{EventBus, callback};
use mezcal_monitor::feed::{DataSource, FeedSimulator, FeedSnapshot, MockFeed};
use mezcal_monitor::render::{
    BannerInfo, connection_badge, history_table, print_banner, vat_card,
};
use mezcal_monitor::transport::ws::WsTransport;

#[derive(Parser)]
#[command(
    name = "mezcal-monitor",
    version,
    about = "Live telemetry for mezcal fermentation vats."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.mezcal/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway WebSocket endpoint, overrides the config file
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Delay between reconnect attempts in milliseconds
    #[arg(long, global = true)]
    reconnect_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Print vat cards from the mock feed
    Vats {
        /// Number of vats to generate
        #[arg(short = 'n', long, default_value_t = DEFAULT_VAT_COUNT)]
        count: usize,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print a vat's hourly history from the mock feed
    History {
        /// Vat id, e.g. vat-1
        vat_id: String,

        /// Days of history to generate
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,

        /// Show every Nth hour
        #[arg(long, default_value_t = 6)]
        every: usize,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Push simulated updates through the event bus and print the board
    Simulate {
        /// Number of update rounds
        #[arg(short, long, default_value_t = 3)]
        ticks: u32,

        /// Pause between rounds in milliseconds (default: the configured
        /// update interval)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Connect to the gateway and print updates until Ctrl+C
    Watch {
        /// Connect even when autoConnect is off in the config file
        #[arg(long, default_value_t = false)]
        connect: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mezcal_monitor=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Vats { count, seed } => handle_vats(count, seed).await,
        Command::History {
            vat_id,
            days,
            every,
            seed,
        } => handle_history(&vat_id, days, every, seed).await,
        Command::Simulate {
            ticks,
            interval_ms,
            seed,
        } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(config.update_interval);
            handle_simulate(ticks, interval, seed).await
        }
        Command::Watch { connect } => {
            config.auto_connect |= connect;
            handle_watch(&config).await
        }
    }
}

/// File settings first, then flags on top.
fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut config = match &path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ms) = cli.reconnect_ms {
        config.reconnect_delay = Duration::from_millis(ms);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn seed_or_random(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random())
}

fn mock_feed(count: usize, seed: u64) -> MockFeed {
    let mut rng = StdRng::seed_from_u64(seed);
    let snapshot = FeedSnapshot::generate(&mut rng, count, count, Utc::now());
    MockFeed::from_snapshot(snapshot, seed).with_latency(Duration::ZERO)
}

async fn handle_vats(count: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let feed = mock_feed(count, seed_or_random(seed));
    let now = Utc::now();
    for vat in feed.vats().await? {
        let hours = feed.snapshot().fermentation_hours(&vat.id, now);
        println!("{}\n", vat_card(&vat, hours));
    }
    let unread = feed.snapshot().unread_alerts().len();
    println!("{unread} alertas sin leer");
    Ok(())
}

async fn handle_history(
    vat_id: &str,
    days: u32,
    every: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let feed = mock_feed(DEFAULT_VAT_COUNT, seed_or_random(seed));
    let history = feed
        .vat_history(vat_id, days)
        .await
        .with_context(|| format!("no history for {vat_id}"))?;
    print!("{}", history_table(&history, every));
    Ok(())
}

async fn handle_simulate(ticks: u32, interval: Duration, seed: Option<u64>) -> anyhow::Result<()> {
    let seed = seed_or_random(seed);
    let feed = mock_feed(DEFAULT_VAT_COUNT, seed);
    let bus = Arc::new(EventBus::new());
    let board = Arc::new(Mutex::new(VatBoard::new(feed.vats().await?)));
    let _subscriptions = VatBoard::attach(&board, &bus);

    let (round_tx, mut round_rx) = tokio::sync::mpsc::unbounded_channel();
    let _round_counter = bus.subscribe_scoped(
        ALL_VATS_UPDATE_EVENT,
        callback(move |_: &Value| {
            let _ = round_tx.send(());
        }),
    );

    let ids = feed.snapshot().vats.iter().map(|v| v.id.clone()).collect();
    let simulator = FeedSimulator::new(Arc::clone(&bus), ids, seed)
        .spawn(interval)
        .context("failed to start simulator")?;

    for round in 1..=ticks {
        if round_rx.recv().await.is_none() {
            break;
        }
        println!("── ronda {round}/{ticks} ──");
        print_board(&board);
    }
    simulator.stop().await;
    Ok(())
}

async fn handle_watch(config: &MonitorConfig) -> anyhow::Result<()> {
    if !config.auto_connect {
        anyhow::bail!("autoConnect is off in the config; pass --connect to open the link anyway");
    }

    print_banner(&BannerInfo {
        endpoint: &config.endpoint,
        reconnect_ms: config.reconnect_delay.as_millis() as u64,
        source: "websocket",
    });

    let bus = Arc::new(EventBus::new());
    let feed = mock_feed(DEFAULT_VAT_COUNT, seed_or_random(None));
    let board = Arc::new(Mutex::new(VatBoard::new(feed.vats().await?)));

    // Board subscriptions go first so the printer below sees merged values.
    let _board_subscriptions = VatBoard::attach(&board, &bus);
    let indicator = ConnectionIndicator::default();
    let _indicator_subscription = indicator.attach(&bus);

    let _status_printer = bus.subscribe_scoped(
        CONNECTION_STATUS_EVENT,
        callback(|payload: &Value| {
            let connected = payload
                .get("connected")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            println!("{}", connection_badge(connected));
        }),
    );
    let printed_board = Arc::clone(&board);
    let mut printers = vec![bus.subscribe_scoped(
        ALL_VATS_UPDATE_EVENT,
        callback(move |_: &Value| print_board(&printed_board)),
    )];
    let ids: Vec<String> = feed.snapshot().vats.iter().map(|v| v.id.clone()).collect();
    for id in ids {
        let printed_board = Arc::clone(&board);
        let event = vat_update_event(&id);
        printers.push(bus.subscribe_scoped(
            &event,
            callback(move |_: &Value| print_vat(&printed_board, &id)),
        ));
    }

    let manager = ConnectionManager::new(config, Arc::clone(&bus), Arc::new(WsTransport));
    manager.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    manager.stop();
    drop(printers);
    println!("\n{}", connection_badge(indicator.is_connected()));
    Ok(())
}

fn lock_board(board: &Mutex<VatBoard>) -> MutexGuard<'_, VatBoard> {
    match board.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn print_board(board: &Mutex<VatBoard>) {
    for vat in lock_board(board).vats() {
        println!("{}\n", vat_card(vat, None));
    }
}

fn print_vat(board: &Mutex<VatBoard>, vat_id: &str) {
    if let Some(vat) = lock_board(board).get(vat_id) {
        println!("{}\n", vat_card(vat, None));
    }
}
