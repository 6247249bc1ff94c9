use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use arcana_pairs::auth::{AnonymousVerifier, IdentityVerifier, JwtConfig, JwtManager};
use arcana_pairs::game::GameRules;
use arcana_pairs::logging::setup_logging;
use arcana_pairs::servers::{GameSocketConfig, GameSocketServer, StatusConfig, StatusServer};
use arcana_pairs::services::{LogResultSink, SessionConfig, SessionManager};
use arcana_pairs::strategy::HeuristicRegistry;

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
enum AuthMode {
    /// Any non-empty token is accepted as the player identity
    Anonymous,
    /// HS256 tokens signed with JWT_SECRET
    Jwt,
}

#[derive(Parser, Debug)]
#[command(name = "arcana_pairs", version, about)]
struct Config {
    /// Bind address for both servers
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Websocket port for game clients
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// HTTP port for /api/status
    #[arg(long, default_value_t = 8081)]
    status_port: u16,

    /// Board rows
    #[arg(long, default_value_t = 6)]
    rows: usize,

    /// Board columns
    #[arg(long, default_value_t = 6)]
    cols: usize,

    /// Pairs that grant a power-up when matched
    #[arg(long, default_value_t = 6)]
    arcana_pairs: usize,

    /// Seconds the active player has to finish a turn
    #[arg(long, default_value_t = 30)]
    turn_timeout_secs: u64,

    /// Seconds a disconnected player has to rejoin
    #[arg(long, default_value_t = 60)]
    reconnect_grace_secs: u64,

    /// Seconds a finished match stays addressable
    #[arg(long, default_value_t = 30)]
    finished_retention_secs: u64,

    /// Deal every match from a fixed seed (reproducible boards)
    #[arg(long)]
    deal_seed: Option<u64>,

    /// How `auth` tokens are verified
    #[arg(long, value_enum, default_value = "anonymous")]
    auth: AuthMode,

    /// Refuse to queue clients that have not authenticated
    #[arg(long, default_value_t = false)]
    require_auth: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write rotating log files to this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    let _logger = setup_logging(&config.log_level, config.log_dir.as_deref())?;

    let rules = GameRules {
        rows: config.rows,
        cols: config.cols,
        arcana_pairs: config.arcana_pairs,
        ..GameRules::default()
    };
    let session_config = SessionConfig {
        turn_timeout: Duration::from_secs(config.turn_timeout_secs),
        reconnect_grace: Duration::from_secs(config.reconnect_grace_secs),
        finished_retention: Duration::from_secs(config.finished_retention_secs),
        deal_seed: config.deal_seed,
    };
    log::info!(
        "🎴 {} v{}: {}x{} board, {} arcana pairs",
        arcana_pairs::NAME,
        arcana_pairs::VERSION,
        rules.rows,
        rules.cols,
        rules.arcana_pairs
    );

    let manager = SessionManager::new(
        rules,
        session_config,
        HeuristicRegistry::standard(),
        Arc::new(LogResultSink),
    )?;

    let verifier: Arc<dyn IdentityVerifier> = match config.auth {
        AuthMode::Anonymous => {
            log::info!("ℹ️ Anonymous identities");
            Arc::new(AnonymousVerifier)
        }
        AuthMode::Jwt => {
            log::info!("🔐 JWT identities");
            Arc::new(JwtManager::new(JwtConfig::from_env()))
        }
    };

    // Status endpoint in the background
    let status = StatusServer::new(
        StatusConfig {
            port: config.status_port,
            host: config.host.clone(),
        },
        manager.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = status.start().await {
            log::error!("❌ Status server error: {}", e);
        }
    });

    let game_server = GameSocketServer::new(
        GameSocketConfig {
            port: config.port,
            host: config.host,
            require_auth: config.require_auth,
        },
        manager,
        verifier,
    );
    game_server.start().await?;
    Ok(())
}
