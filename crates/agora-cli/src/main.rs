//! `agora`, a command-line client for an Agora forum server.
//!
//! # Usage
//!
//! ```text
//! agora --url http://localhost:8080 login --email alice@example.com --password secret
//! agora forums
//! agora like forum 6f1c…
//! ```
//!
//! The session token from `login`/`register` is written to the token file
//! (default `~/.config/agora/token`) and sent on every later command.

mod cache;
mod client;
mod sync;

use std::path::{Path, PathBuf};

use agora_core::{
  forum::{ForumView, NewForum},
  reaction::{LikeState, LikeTarget, LikeableKind},
};
use anyhow::{Context, Result, bail};
use cache::ItemState;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use sync::{LikeSync, SyncError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "agora", about = "Command-line client for the Agora forum")]
struct Args {
  /// Path to a TOML config file (url, token_file).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the agora server (default: http://localhost:8080).
  #[arg(long, env = "AGORA_URL")]
  url: Option<String>,

  /// Bearer token; overrides the token file.
  #[arg(long, env = "AGORA_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Where the session token is kept between runs.
  #[arg(long, value_name = "FILE")]
  token_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account and sign in.
  Register {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  /// Sign in and store the session token.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
  },
  /// Revoke the stored session token.
  Logout,
  /// Show the signed-in user.
  Whoami,
  /// List forums, newest first.
  Forums,
  /// Show a forum and its comments.
  Show { id: Uuid },
  /// Start a new forum.
  Post {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    #[arg(long = "tag")]
    tags:        Vec<String>,
  },
  /// Reply to a forum.
  Comment { forum_id: Uuid, content: String },
  /// Toggle your like on a forum or comment.
  Like { kind: LikeableKind, id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:        String,
  #[serde(default)]
  token_file: Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:8080".to_string());
  let token_file = args
    .token_file
    .or(file_cfg.token_file)
    .unwrap_or_else(|| PathBuf::from("~/.config/agora/token"));
  let token_file = expand_tilde(&token_file);
  let token = match args.token {
    Some(token) => Some(token),
    None => read_token(&token_file)?,
  };

  let client = ApiClient::new(ApiConfig { base_url, token })?;
  run(args.command, client, &token_file).await
}

async fn run(command: Command, client: ApiClient, token_file: &Path) -> Result<()> {
  match command {
    Command::Register { username, email, password } => {
      let auth = client.register(&username, &email, &password).await?;
      write_token(token_file, &auth.token)?;
      println!("registered as {} <{}>", auth.user.username, auth.user.email);
    }
    Command::Login { email, password } => {
      let auth = client.login(&email, &password).await?;
      write_token(token_file, &auth.token)?;
      println!("signed in as {}", auth.user.username);
    }
    Command::Logout => {
      client.logout().await?;
      remove_token(token_file)?;
      println!("signed out");
    }
    Command::Whoami => {
      let user = client.me().await?;
      println!("{} <{}> ({})", user.username, user.email, user.user_id);
    }
    Command::Forums => {
      for view in client.list_forums().await? {
        print_forum_line(&view);
      }
    }
    Command::Show { id } => {
      let detail = client.get_forum(id).await?;
      print_forum_line(&detail.view);
      println!("  {}", detail.view.forum.description);
      for c in &detail.comments {
        println!(
          "  - [{}] {}: {} ({})",
          c.comment.comment_id,
          c.comment.author.username,
          c.comment.content,
          likes_label(c.like_state()),
        );
      }
    }
    Command::Post { title, description, tags } => {
      let view = client.create_forum(&NewForum { title, description, tags }).await?;
      println!("created {}", view.forum.forum_id);
    }
    Command::Comment { forum_id, content } => {
      let comment = client.create_comment(forum_id, &content).await?;
      println!("commented {}", comment.comment_id);
    }
    Command::Like { kind, id } => like(client, LikeTarget { kind, id }).await?,
  }
  Ok(())
}

/// Seed the cache from a fresh read, then run one toggle round trip.
async fn like(client: ApiClient, target: LikeTarget) -> Result<()> {
  let current = match target.kind {
    LikeableKind::Forum => client.get_forum(target.id).await?.view.like_state(),
    LikeableKind::Comment => client.get_comment(target.id).await?.like_state(),
  };

  let sync = LikeSync::new(client);
  sync.seed(target, current);

  let mut predicted = None;
  let result = sync
    .toggle(target, |p| {
      predicted = Some(p);
      println!("{target}: {} …", likes_label(p));
    })
    .await;
  match result {
    Ok(settled) => match predicted.and_then(|p| direction_note(p, settled)) {
      Some(note) => println!("{target}: {} ({note})", likes_label(settled)),
      None => println!("{target}: {}", likes_label(settled)),
    },
    Err(SyncError::Like { source, .. }) => {
      if let Some(ItemState::Settled(state)) = sync.state(target) {
        println!("{target}: {} (reverted)", likes_label(state));
      }
      bail!("like failed: {source}");
    }
    Err(e) => return Err(e.into()),
  }
  Ok(())
}

/// A retried toggle can land twice on the server, leaving the item in the
/// opposite state to the one requested.
fn direction_note(predicted: LikeState, settled: LikeState) -> Option<&'static str> {
  match (predicted.liked, settled.liked) {
    (true, false) => Some("the server reports this as not liked; the toggle may have applied twice"),
    (false, true) => Some("the server reports this as still liked; the toggle may have applied twice"),
    _ => None,
  }
}

fn print_forum_line(view: &ForumView) {
  let f = &view.forum;
  let tags = if f.tags.is_empty() { String::new() } else { format!(" [{}]", f.tags.join(", ")) };
  println!(
    "{}  {}  {} by {}{} ({})",
    f.forum_id,
    f.created_at.format("%Y-%m-%d"),
    f.title,
    f.author.username,
    tags,
    likes_label(view.like_state()),
  );
}

fn likes_label(state: LikeState) -> String {
  let mark = if state.liked { "♥" } else { "♡" };
  format!("{mark} {}", state.likes)
}

// ─── Token file ───────────────────────────────────────────────────────────────

fn read_token(path: &Path) -> Result<Option<String>> {
  match std::fs::read_to_string(path) {
    Ok(raw) => Ok(Some(raw.trim().to_string()).filter(|t| !t.is_empty())),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e).with_context(|| format!("reading token file {}", path.display())),
  }
}

fn write_token(path: &Path, token: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("creating {}", parent.display()))?;
  }
  std::fs::write(path, token).with_context(|| format!("writing token file {}", path.display()))
}

fn remove_token(path: &Path) -> Result<()> {
  match std::fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e).with_context(|| format!("removing token file {}", path.display())),
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
