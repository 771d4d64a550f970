use anyhow::{anyhow, Context};
use clap::Parser;
use paintkit::{
    list_ports, run_producer, BufferedTransport, Config, Dispatcher, DryRunPort, FileSource,
    PaintSession, RealSerialPort, SerialPort, ShutdownSignal, StrokeSource, TransportConfig,
    WebSocketSource, BUILD_DATE, VERSION,
};
use paintkit_settings::SourceKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "paintkit", version, about = "Paint strokes with a GRBL gantry")]
struct Cli {
    /// Path to a TOML or JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the controller (overrides the config)
    #[arg(short, long)]
    port: Option<String>,

    /// Run without hardware, optionally writing the G-code to a file
    #[arg(long, num_args = 0..=1, value_name = "FILE")]
    dry_run: Option<Option<PathBuf>>,

    /// Replay strokes from a JSON-lines file instead of the websocket relay
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    json: bool,

    /// List candidate controller ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    paintkit::init_logging(cli.json)?;
    tracing::info!("PaintKit v{} (built {})", VERSION, BUILD_DATE);

    if cli.list_ports {
        for port in list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.connection.port = port;
    }
    if let Some(replay) = cli.replay {
        config.connection.source = SourceKind::File;
        config.connection.replay_file = Some(replay);
    }
    config.validate()?;

    let session = PaintSession::from_config(&config).context("Failed to set up the workshop")?;

    let (port, transport_config): (Box<dyn SerialPort>, TransportConfig) = match &cli.dry_run {
        Some(output) => {
            let port = match output {
                Some(path) => DryRunPort::with_output(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
                None => DryRunPort::new(),
            };
            let immediate = TransportConfig {
                settle_ms: 0,
                status_poll_ms: 0,
                ..config.machine.clone()
            };
            (Box::new(port), immediate)
        }
        None => {
            let port = RealSerialPort::open(&config.connection.port, config.connection.baud_rate)
                .with_context(|| format!("Failed to open {}", config.connection.port))?;
            (Box::new(port), config.machine.clone())
        }
    };
    let transport = BufferedTransport::new(port, transport_config);

    let source: Box<dyn StrokeSource> = match (&config.connection.source, &config.connection.replay_file) {
        (SourceKind::File, Some(path)) => Box::new(FileSource::open(path).await?),
        (SourceKind::File, None) => return Err(anyhow!("File source needs a replay file")),
        (SourceKind::WebSocket, _) => Box::new(WebSocketSource::new(
            config.connection.websocket_url.clone(),
            Duration::from_millis(config.connection.receive_timeout_ms),
            Duration::from_millis(config.connection.reconnect_delay_ms),
        )),
    };

    let shutdown = ShutdownSignal::new();
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();

    let dispatcher =
        Dispatcher::new(session, transport).with_canvas_path(config.session.canvas_path.clone());
    let consumer_shutdown = shutdown.clone();
    let consumer = std::thread::Builder::new()
        .name("consumer".to_string())
        .spawn(move || dispatcher.run(queue_rx, consumer_shutdown))
        .context("Failed to start the consumer thread")?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_shutdown.trigger();
        }
    });

    run_producer(source, queue_tx, shutdown).await;

    let report = tokio::task::spawn_blocking(move || consumer.join())
        .await?
        .map_err(|_| anyhow!("Consumer thread panicked"))??;
    tracing::info!(?report, "PaintKit stopped");
    Ok(())
}
