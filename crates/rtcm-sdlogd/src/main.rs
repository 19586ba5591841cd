// # rtcm-sdlogd - RTCM SD Logger Daemon
//
// This is a THIN integration layer. All logging, mount and rotation logic
// lives in rtcm-sdlog-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Wiring the config store, mount adapter and event bus to the logger
// 4. Publishing serial input on the data topic until shutdown
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `SDLOG_MOUNT_POINT`: Directory holding the daily files (default `/sdcard`)
// - `SDLOG_CREATE_MOUNT_POINT`: Create the mount point if missing (default false)
// - `SDLOG_MAX_FILES`: Open-file bound for the volume, 1-16 (default 3)
// - `SDLOG_INPUT`: Serial device or file to read, `-` for stdin (default `-`)
// - `SDLOG_CHUNK_SIZE`: Read size in bytes, 1-65536 (default 1024)
// - `SDLOG_CONFIG_PATH`: Persistent settings file
//   (default `/var/lib/rtcm-sdlog/config.json`)
// - `SDLOG_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Signals
//
// - SIGUSR1 / SIGUSR2: enable / disable logging (persisted)
// - SIGHUP: log a status snapshot
// - SIGINT / SIGTERM: shut down
//
// ## Example
//
// ```bash
// export SDLOG_MOUNT_POINT=/media/sdcard
// export SDLOG_INPUT=/dev/ttyUSB0
// export SDLOG_CONFIG_PATH=/var/lib/rtcm-sdlog/config.json
//
// rtcm-sdlogd
// ```

use anyhow::{Context, Result};
use rtcm_sdlog_core::traits::{ConfigStore, EventBus};
use rtcm_sdlog_core::{
    DirectoryMount, FileConfigStore, LocalEventBus, LoggerConfig, MountConfig, SdLogger,
    SystemClock,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SdlogExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SdlogExitCode> for ExitCode {
    fn from(code: SdlogExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Chunks buffered between the input reader and the publisher
const INPUT_CHANNEL_CAPACITY: usize = 64;

/// Where serial data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    Device(PathBuf),
}

/// Application configuration
struct Config {
    mount_point: PathBuf,
    create_mount_point: bool,
    max_files: usize,
    input: InputSource,
    chunk_size: usize,
    config_path: PathBuf,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            mount_point: env::var("SDLOG_MOUNT_POINT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/sdcard")),
            create_mount_point: match env::var("SDLOG_CREATE_MOUNT_POINT") {
                Ok(value) => parse_bool("SDLOG_CREATE_MOUNT_POINT", &value)?,
                Err(_) => false,
            },
            max_files: parse_number("SDLOG_MAX_FILES", 3)?,
            input: match env::var("SDLOG_INPUT") {
                Ok(value) if value != "-" => InputSource::Device(PathBuf::from(value)),
                _ => InputSource::Stdin,
            },
            chunk_size: parse_number("SDLOG_CHUNK_SIZE", 1024)?,
            config_path: env::var("SDLOG_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/lib/rtcm-sdlog/config.json")),
            log_level: env::var("SDLOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.mount_point.as_os_str().is_empty() {
            anyhow::bail!(
                "SDLOG_MOUNT_POINT cannot be empty. \
                Set it via: export SDLOG_MOUNT_POINT=/sdcard"
            );
        }

        if !(1..=16).contains(&self.max_files) {
            anyhow::bail!(
                "SDLOG_MAX_FILES must be between 1 and 16. Got: {}",
                self.max_files
            );
        }

        if !(1..=65536).contains(&self.chunk_size) {
            anyhow::bail!(
                "SDLOG_CHUNK_SIZE must be between 1 and 65536 bytes. Got: {}",
                self.chunk_size
            );
        }

        if let InputSource::Device(path) = &self.input
            && path.as_os_str().is_empty()
        {
            anyhow::bail!("SDLOG_INPUT cannot be empty. Use '-' for stdin.");
        }

        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("SDLOG_CONFIG_PATH cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SDLOG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Logger settings derived from this configuration
    fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            mount: MountConfig {
                mount_point: self.mount_point.clone(),
                max_files: self.max_files,
                create_mount_point: self.create_mount_point,
            },
            ..LoggerConfig::default()
        }
    }
}

fn parse_number(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a positive integer. Got: {}", name, value)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false). Got: {}", name, value),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SdlogExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SdlogExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SdlogExitCode::ConfigError.into();
    }

    info!("Starting rtcm-sdlogd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SdlogExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            SdlogExitCode::RuntimeError
        } else {
            SdlogExitCode::CleanShutdown
        }
    });

    // A pending stdin read would otherwise hold the runtime open.
    rt.shutdown_background();

    result.into()
}

/// What the control signals ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    SetActive(bool),
    ReportStatus,
    Shutdown(&'static str),
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let settings = config.logger_config();
    let active_key = settings.active_key.clone();
    let topic = settings.topic.clone();

    let store = FileConfigStore::open(&config.config_path)
        .with_context(|| format!("Failed to open config store {}", config.config_path.display()))?;
    let bus = Arc::new(LocalEventBus::new());

    let (logger, subscription) = SdLogger::init(
        settings,
        &store,
        Box::new(DirectoryMount::new()),
        bus.as_ref(),
        SystemClock,
    )?;

    let status = logger.status();
    info!(
        card_mounted = status.card_mounted,
        active = status.active,
        "SD logger initialized"
    );

    let mut controls = ControlSignals::new()?;

    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_input(config.input.clone(), config.chunk_size, tx));
    let mut chunks = ReceiverStream::new(rx);

    info!(input = ?config.input, "Ready to record serial data");

    loop {
        tokio::select! {
            chunk = chunks.next() => {
                let Some(chunk) = chunk else {
                    info!("Input closed");
                    break;
                };
                let id = i32::try_from(chunk.len())?;
                // Delivery is synchronous and ends in blocking file I/O.
                tokio::task::block_in_place(|| bus.publish(&topic, id, &chunk))?;
            }

            control = controls.recv() => match control? {
                Control::SetActive(active) => {
                    if let Err(e) = store.set_bool(&active_key, active) {
                        warn!(error = %e, "Failed to persist SD logging flag");
                    }
                    logger.set_active(active);
                }
                Control::ReportStatus => {
                    let status = logger.status();
                    match serde_json::to_string(&status) {
                        Ok(json) => info!(status = %json, "SD logger status"),
                        Err(e) => warn!(error = %e, "Failed to serialize status"),
                    }
                }
                Control::Shutdown(signal) => {
                    info!("Received shutdown signal: {}", signal);
                    break;
                }
            },
        }
    }

    info!("Shutting down daemon");
    reader.abort();
    match reader.await {
        Ok(Err(e)) => warn!("Input reader stopped with error: {:#}", e),
        Ok(Ok(())) => debug!("Input reader finished"),
        Err(e) if e.is_cancelled() => debug!("Input reader cancelled"),
        Err(e) => warn!("Input reader panicked: {}", e),
    }

    if let Err(e) = bus.unsubscribe(subscription) {
        warn!(error = %e, "Failed to unsubscribe SD logger");
    }
    logger.shutdown();
    store.flush()?;

    info!("Daemon stopped");
    Ok(())
}

/// Read `input` in chunks of at most `chunk_size` bytes until EOF
async fn read_input(input: InputSource, chunk_size: usize, tx: mpsc::Sender<Vec<u8>>) -> Result<()> {
    let mut reader: Box<dyn AsyncRead + Unpin + Send> = match &input {
        InputSource::Stdin => Box::new(tokio::io::stdin()),
        InputSource::Device(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?,
        ),
    };

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf).await.context("Failed to read input")?;
        if n == 0 {
            debug!("Input reached end of stream");
            return Ok(());
        }
        if tx.send(buf[..n].to_vec()).await.is_err() {
            return Ok(());
        }
    }
}

/// Control signals (SIGUSR1/2, SIGHUP, SIGINT, SIGTERM)
#[cfg(unix)]
struct ControlSignals {
    sigterm: Signal,
    sigint: Signal,
    sighup: Signal,
    sigusr1: Signal,
    sigusr2: Signal,
}

#[cfg(unix)]
impl ControlSignals {
    fn new() -> Result<Self> {
        let install = |kind: SignalKind, name: &str| {
            signal(kind).map_err(|e| anyhow::anyhow!("Failed to setup {} handler: {}", name, e))
        };

        Ok(Self {
            sigterm: install(SignalKind::terminate(), "SIGTERM")?,
            sigint: install(SignalKind::interrupt(), "SIGINT")?,
            sighup: install(SignalKind::hangup(), "SIGHUP")?,
            sigusr1: install(SignalKind::user_defined1(), "SIGUSR1")?,
            sigusr2: install(SignalKind::user_defined2(), "SIGUSR2")?,
        })
    }

    async fn recv(&mut self) -> Result<Control> {
        Ok(tokio::select! {
            _ = self.sigterm.recv() => Control::Shutdown("SIGTERM"),
            _ = self.sigint.recv() => Control::Shutdown("SIGINT"),
            _ = self.sighup.recv() => Control::ReportStatus,
            _ = self.sigusr1.recv() => Control::SetActive(true),
            _ = self.sigusr2.recv() => Control::SetActive(false),
        })
    }
}

/// Control signals (CTRL-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ControlSignals;

#[cfg(not(unix))]
impl ControlSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Result<Control> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok(Control::Shutdown("SIGINT"))
    }
}
