// # ipbeacond - External IP Beacon Daemon
//
// Thin integration layer. All polling and reconciliation logic lives in
// ipbeacon-core; this binary only wires it up.
//
// The ipbeacond daemon is responsible for:
// 1. Reading configuration from an optional env file and the environment
// 2. Initializing logging and the runtime
// 3. Opening the Discord session
// 4. Spawning the poller and waiting for SIGINT/SIGTERM
//
// ## Configuration
//
// - `DISCORD_BOT_TOKEN`: Bot token (required)
// - `DISCORD_CHANNEL_ID`: Channel that holds the pinned status message (required)
// - `IPBEACON_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
// - `IPBEACON_ENV_FILE`: key=value file loaded first (default: .env)
//
// Variables already present in the environment win over the env file.
//
// ## Example
//
// ```bash
// export DISCORD_BOT_TOKEN=your_token
// export DISCORD_CHANNEL_ID=123456789012345678
//
// ipbeacond
// ```

use anyhow::Result;
use ipbeacon_core::traits::ChatChannel;
use ipbeacon_core::{Poller, PollerConfig};
use ipbeacon_discord::DiscordChannel;
use ipbeacon_ip_http::HttpIpSource;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Env file loaded when `IPBEACON_ENV_FILE` is not set
const DEFAULT_ENV_FILE: &str = ".env";

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration error
/// - 2: Discord session could not be opened
/// - 3: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeaconExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error
    ConfigError = 1,
    /// Connection to the chat platform failed at startup
    ConnectionError = 2,
    /// Runtime error (unexpected failure)
    RuntimeError = 3,
}

impl From<BeaconExitCode> for ExitCode {
    fn from(code: BeaconExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Result of looking for the env file
#[derive(Debug)]
enum EnvFile {
    Loaded { path: PathBuf, vars: HashMap<String, String> },
    Missing { path: PathBuf },
    /// Present but unreadable or malformed; none of its values are used
    Unreadable { path: PathBuf, error: String },
}

impl EnvFile {
    fn vars(&self) -> Option<&HashMap<String, String>> {
        match self {
            EnvFile::Loaded { vars, .. } => Some(vars),
            EnvFile::Missing { .. } | EnvFile::Unreadable { .. } => None,
        }
    }
}

/// Parse a key=value env file without touching the process environment
///
/// Never fails: the real environment can still supply everything.
fn load_env_file(path: &Path) -> EnvFile {
    if !path.exists() {
        return EnvFile::Missing {
            path: path.to_path_buf(),
        };
    }

    match read_env_file(path) {
        Ok(vars) => EnvFile::Loaded {
            path: path.to_path_buf(),
            vars,
        },
        Err(e) => EnvFile::Unreadable {
            path: path.to_path_buf(),
            error: e.to_string(),
        },
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Application configuration
struct Config {
    bot_token: String,
    channel_id: String,
    log_level: String,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<REDACTED>")
            .field("channel_id", &self.channel_id)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment, falling back to env file values
    fn from_sources(
        env_lookup: impl Fn(&str) -> Option<String>,
        file_vars: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let lookup = |key: &str| {
            env_lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_vars.and_then(|vars| vars.get(key).cloned()))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = lookup("DISCORD_BOT_TOKEN").ok_or_else(|| {
            anyhow::anyhow!(
                "DISCORD_BOT_TOKEN is required. \
                Set it via: export DISCORD_BOT_TOKEN=your_token"
            )
        })?;
        let channel_id = lookup("DISCORD_CHANNEL_ID").ok_or_else(|| {
            anyhow::anyhow!(
                "DISCORD_CHANNEL_ID is required. \
                Set it via: export DISCORD_CHANNEL_ID=123456789012345678"
            )
        })?;

        Ok(Self {
            bot_token,
            channel_id,
            log_level: lookup("IPBEACON_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.bot_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("changeme")
        {
            anyhow::bail!(
                "DISCORD_BOT_TOKEN appears to be a placeholder. \
                Use the token from the Discord developer portal."
            );
        }

        // Discord IDs are snowflakes: 64-bit integers in decimal
        if self.channel_id.parse::<u64>().is_err() {
            anyhow::bail!(
                "DISCORD_CHANNEL_ID must be a numeric Discord channel ID. Got: {}",
                self.channel_id
            );
        }

        if parse_log_level(&self.log_level).is_none() {
            anyhow::bail!(
                "IPBEACON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }
}

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    let env_file_path = env::var("IPBEACON_ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
    let env_file = load_env_file(Path::new(&env_file_path));

    let config = match Config::from_sources(|key| env::var(key).ok(), env_file.vars()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return BeaconExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return BeaconExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BeaconExitCode::ConfigError.into();
    }

    match &env_file {
        EnvFile::Loaded { path, vars } => {
            info!("Loaded {} variable(s) from {}", vars.len(), path.display())
        }
        EnvFile::Missing { path } => info!("No env file found at {}", path.display()),
        EnvFile::Unreadable { path, error } => warn!(
            "Ignoring env file {}: {}; using the environment only",
            path.display(),
            error
        ),
    }
    info!("Starting ipbeacond for channel {}", config.channel_id);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BeaconExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(run_daemon(config));

    // The poller task is never joined; in-flight requests are abandoned
    rt.shutdown_background();

    code.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> BeaconExitCode {
    let channel = match DiscordChannel::new(config.bot_token.as_str()) {
        Ok(channel) => Arc::new(channel),
        Err(e) => {
            error!("Error creating Discord client: {}", e);
            return BeaconExitCode::ConfigError;
        }
    };

    let ip_source = match HttpIpSource::ipify() {
        Ok(source) => source,
        Err(e) => {
            error!("Error creating IP source: {}", e);
            return BeaconExitCode::ConfigError;
        }
    };

    if let Err(e) = channel.open().await {
        error!("Error opening connection to Discord: {}", e);
        return BeaconExitCode::ConnectionError;
    }

    let (poller, events) = match Poller::new(
        Box::new(ip_source),
        channel.clone(),
        PollerConfig::new(config.channel_id.as_str()),
    ) {
        Ok(created) => created,
        Err(e) => {
            error!("Error creating poller: {}", e);
            close_channel(channel.as_ref()).await;
            return BeaconExitCode::ConfigError;
        }
    };
    // Events are only consumed by tests; logging already covers them here
    drop(events);

    tokio::spawn(poller.run());

    info!("Bot is now running. Press CTRL+C to exit.");

    shutdown(channel.as_ref(), wait_for_shutdown().await).await
}

/// Close the session once the signal wait has returned and pick the exit code
async fn shutdown(channel: &dyn ChatChannel, signal: Result<&'static str>) -> BeaconExitCode {
    let code = match signal {
        Ok(signal) => {
            info!("Received {}, shutting down", signal);
            BeaconExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Shutdown error: {}", e);
            BeaconExitCode::RuntimeError
        }
    };

    close_channel(channel).await;
    code
}

/// Close the chat session; failure is logged, never fatal
async fn close_channel(channel: &dyn ChatChannel) {
    if let Err(e) = channel.close().await {
        warn!("Error closing connection to {}: {}", channel.platform_name(), e);
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(received)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
