mod catalog;
mod console;

use anyhow::{Context, Result};
use catalog::Catalog;
use clap::{Parser, Subcommand};
use console::Session;
use jukebox_core::urls::track_url;
use jukebox_core::{format_duration, AppConfig};
use jukebox_engine::{Controller, PlaybackNotifier};
use jukebox_transport::{event_payload, ChannelNotifier, NotifierChain, Outbound, TracingNotifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const RELOAD_POLL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(
    name = "jukebox",
    about = "Shared room playlist: queue -> playback clock -> auto-advance"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read console commands from stdin and drive the room.
    Run,
    /// List the tracks that can be requested.
    Catalog,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Catalog => {
            let cfg = load_or_default(&cfg_path)?;
            print_catalog(&Catalog::from_config(&cfg));
            Ok(())
        }
        Commands::Run => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            run(cfg, cfg_path).await
        }
    }
}

fn session_from(cfg: &AppConfig) -> Arc<Session> {
    Arc::new(Session {
        catalog: Catalog::from_config(cfg),
        room: cfg.room.clone(),
    })
}

async fn run(cfg: AppConfig, cfg_path: PathBuf) -> Result<()> {
    let (channel, mut events_rx) = ChannelNotifier::new();
    let mut notifiers: Vec<Box<dyn PlaybackNotifier>> = vec![Box::new(channel)];
    if cfg.room.announce_events {
        notifiers.push(Box::new(TracingNotifier));
    }
    let controller = Controller::new(
        tokio::runtime::Handle::current(),
        Box::new(NotifierChain::new(notifiers)),
    );
    let mut session = session_from(&cfg);

    info!(
        bot_name = %cfg.room.bot_name,
        catalog = session.catalog.entries().len(),
        "jukebox started"
    );

    let (reload_tx, mut reload_rx) = mpsc::channel::<()>(4);
    spawn_reload_watchers(cfg_path.clone(), reload_tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => dispatch(&controller, &session, &line),
                    Ok(None) => {
                        info!("console closed; playback continues until ctrl-c");
                        stdin_open = false;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read console input");
                        stdin_open = false;
                    }
                }
            }
            outbound = events_rx.recv() => match outbound {
                Some(Outbound::Event(event)) => match serde_json::to_string(&event_payload(&event)) {
                    Ok(frame) => println!("{frame}"),
                    Err(err) => error!(error = %err, "failed to encode playback event"),
                },
                Some(Outbound::Notice(text)) => println!("{text}"),
                None => {}
            },
            msg = reload_rx.recv() => {
                if msg.is_some() {
                    match load_or_default(&cfg_path) {
                        Ok(new_cfg) => {
                            session = session_from(&new_cfg);
                            info!(catalog = session.catalog.entries().len(), "configuration reloaded");
                        }
                        Err(err) => {
                            error!(error = %err, "failed to reload config");
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c; shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Each command gets its own blocking thread; the controller serializes them.
fn dispatch(controller: &Controller, session: &Arc<Session>, line: &str) {
    let cmd = match console::parse(line) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return,
        Err(err) => {
            println!("{err}");
            return;
        }
    };

    let controller = controller.clone();
    let session = Arc::clone(session);
    tokio::spawn(async move {
        let task = tokio::task::spawn_blocking(move || console::execute(&controller, &session, cmd));
        match task.await {
            Ok(reply) => println!("{reply}"),
            Err(err) => error!(error = %err, "console command panicked"),
        }
    });
}

fn print_catalog(catalog: &Catalog) {
    if catalog.entries().is_empty() {
        println!("catalog is empty; add [[catalog]] entries to the config file");
        return;
    }
    for (i, entry) in catalog.entries().iter().enumerate() {
        println!(
            "{i:>3}  {}  [{}]  {}",
            entry.title,
            format_duration(entry.duration_secs),
            track_url(entry.source, &entry.id)
        );
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("jukebox").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries replies and event frames
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn spawn_reload_watchers(path: PathBuf, tx: mpsc::Sender<()>) {
    let tx_poll = tx.clone();
    tokio::spawn(async move {
        let mut known_mtime = file_mtime(&path);
        loop {
            tokio::time::sleep(RELOAD_POLL).await;
            let current = file_mtime(&path);
            if current.is_some() && current != known_mtime {
                known_mtime = current;
                let _ = tx_poll.send(()).await;
            }
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let tx_hup = tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::hangup()) {
                while sig.recv().await.is_some() {
                    let _ = tx_hup.send(()).await;
                }
            }
        });
    }
}

fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("JUKEBOX_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Ok(v) = std::env::var("JUKEBOX_BOT_NAME") {
        if !v.trim().is_empty() {
            cfg.room.bot_name = v;
        }
    }
    if let Ok(v) = std::env::var("JUKEBOX_ANNOUNCE_EVENTS") {
        if let Ok(parsed) = v.parse::<bool>() {
            cfg.room.announce_events = parsed;
        }
    }
}
