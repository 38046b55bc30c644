mod agent;
mod config;
mod control;
mod fallback;
mod lifecycle;
mod net;
mod push;
mod store;
mod strategy;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use agent::Agent;
use config::Config;
use control::{controller_channel, AgentSignal, ControlChannel, ControlMessage, ReloadGuard};
use lifecycle::LifecycleController;
use net::client::HttpClient;
use net::types::{RequestDescriptor, Target};
use store::{CacheStore, GenerationSet, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "edgecached")]
#[command(about = "Offline-first edge cache agent with versioned cache generations")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/edgecached/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the deploy version from the config file
  #[arg(long)]
  deploy_version: Option<String>,

  /// Keep the cache in memory only (no database on disk)
  #[arg(long)]
  ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // stdout carries the message protocol, so logs go to a file
  let _guard = init_tracing()?;

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(version) = args.deploy_version.or_else(Config::version_override) {
    config.version = version;
  }

  let store: Arc<dyn CacheStore> = if args.ephemeral {
    Arc::new(MemoryStore::new())
  } else {
    match &config.cache_db {
      Some(path) => Arc::new(SqliteStore::open_at(path)?),
      None => Arc::new(SqliteStore::open()?),
    }
  };
  let origin = config.origin_url()?;
  let gens = GenerationSet::new(&config.version);
  let http = HttpClient::new(origin.clone())?;

  let (controller, mut controller_events) = controller_channel();
  let mut lifecycle =
    LifecycleController::new(store.clone(), gens.clone(), origin.clone(), controller);

  info!(version = %config.version, origin = %config.origin, "installing agent");
  {
    let http = http.clone();
    lifecycle
      .install(&config.precache, move |req| {
        let http = http.clone();
        async move { http.execute(&req).await }
      })
      .await;
  }
  // A fresh process has no predecessor to wait behind
  lifecycle.promote();

  let agent = Arc::new(Agent::new(
    store,
    gens,
    origin,
    config.bundle_prefix.clone(),
    &config.app_shell,
    http,
  )?);

  // Forward the takeover signal to the hosting page. One process is one
  // version switch, so the signal is latched to fire at most once.
  tokio::spawn(async move {
    let guard = ReloadGuard::new();
    while controller_events.next().await.is_some() {
      guard.on_change(|| emit(&AgentSignal::ControllerChange));
    }
  });

  let mut control = ControlChannel::from_lines(tokio::io::stdin());
  info!("agent ready, reading control messages");

  loop {
    tokio::select! {
      msg = control.next() => {
        let Some(msg) = msg else { break };
        handle_message(msg, &agent, &mut lifecycle);
      }
      _ = tokio::signal::ctrl_c() => {
        info!("shutting down");
        break;
      }
    }
  }

  // The next deployed version takes over from here
  lifecycle.retire();

  Ok(())
}

fn handle_message(
  msg: ControlMessage,
  agent: &Arc<Agent<dyn CacheStore, HttpClient>>,
  lifecycle: &mut LifecycleController<dyn CacheStore>,
) {
  match msg {
    ControlMessage::SkipWaiting => lifecycle.promote(),

    ControlMessage::Fetch {
      method,
      url,
      target,
      accept,
    } => {
      // Each interception runs as its own flow; slow fetches must not block
      // the control channel.
      let agent = agent.clone();
      tokio::spawn(async move {
        let signal =
          run_fetch(&agent, &method, &url, target.as_deref(), accept.as_deref()).await;
        emit(&signal);
      });
    }

    ControlMessage::Push { payload } => {
      let raw = payload.to_string();
      if let Some(notification) = push::parse(raw.as_bytes()) {
        emit(&AgentSignal::Notification {
          title: notification.title,
          body: notification.body,
          actions: notification
            .actions
            .iter()
            .map(|a| a.id().to_string())
            .collect(),
          data: notification.data,
        });
      }
    }

    ControlMessage::NotificationClick { action } => {
      let mut surface = SignalSurface;
      push::handle_action(action.as_deref(), &mut surface);
    }
  }
}

async fn run_fetch(
  agent: &Agent<dyn CacheStore, HttpClient>,
  method: &str,
  url: &str,
  target: Option<&str>,
  accept: Option<&str>,
) -> AgentSignal {
  let url = match Url::parse(url) {
    Ok(url) => url,
    Err(e) => {
      return AgentSignal::Error {
        message: format!("invalid url {}: {}", url, e),
      }
    }
  };

  let target = match target {
    Some("document") => Target::Document,
    _ => Target::Asset,
  };

  let mut req = RequestDescriptor::get(url, target).with_method(method);
  if let Some(accept) = accept {
    req = req.with_accept(accept);
  }

  match agent.intercept(&req).await {
    Ok(response) => AgentSignal::Response {
      status: response.status,
      source: response.source.as_str().to_string(),
      body: hex::encode(&response.body),
    },
    Err(e) => AgentSignal::Error {
      message: e.to_string(),
    },
  }
}

/// Notification actions act against the hosting page through signals.
struct SignalSurface;

impl push::WindowSurface for SignalSurface {
  fn close_notification(&mut self) {
    emit(&AgentSignal::CloseNotification);
  }

  fn open_or_focus(&mut self, path: &str) {
    emit(&AgentSignal::OpenWindow {
      path: path.to_string(),
    });
  }
}

fn emit(signal: &AgentSignal) {
  match serde_json::to_string(signal) {
    Ok(line) => println!("{line}"),
    Err(e) => tracing::warn!("failed to serialize signal: {}", e),
  }
}

fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::state_dir()
    .or_else(dirs::data_dir)
    .ok_or_else(|| eyre!("Could not determine log directory"))?
    .join("edgecached")
    .join("logs");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "edgecached.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
