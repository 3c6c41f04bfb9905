//! CLI for administering planx credential and session stores.

pub mod auth;
pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// planx administration CLI
#[derive(Parser, Debug)]
#[command(name = "planx", version, about = "planx credential and session administration")]
pub struct Cli {
    /// Data directory (overrides PLANX_DATA_DIR and the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Credential management
    Auth(AuthArgs),
    /// Conversation session management
    Session(SessionArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Store a credential obtained from the authorization handshake
    Grant(GrantArgs),
    /// Show a user's connection status
    Status(UserArg),
    /// Delete a user's credential
    Revoke(UserArg),
    /// Exchange the stored refresh token for a new access token
    #[cfg(feature = "oauth")]
    Refresh(UserArg),
}

/// Arguments for `planx auth grant`.
#[derive(Parser, Debug)]
pub struct GrantArgs {
    /// User identity
    pub user: String,

    /// Access token
    #[arg(long)]
    pub access_token: String,

    /// Refresh token
    #[arg(long)]
    pub refresh_token: Option<String>,

    /// Seconds until the access token expires
    #[arg(long)]
    pub expires_in: Option<i64>,

    /// Granted scope (`mail`, `calendar`, or a full scope URL); repeatable
    #[arg(long = "scope")]
    pub scopes: Vec<String>,
}

/// A single user identity argument.
#[derive(Parser, Debug)]
pub struct UserArg {
    /// User identity
    pub user: String,
}

/// Arguments for the `session` subcommand group.
#[derive(Parser, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Print a user's conversation
    Show(ShowArgs),
    /// Delete a user's conversation
    Reset(UserArg),
}

/// Arguments for `planx session show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// User identity
    pub user: String,

    /// Only print the last N messages
    #[arg(long)]
    pub last: Option<usize>,

    /// Print raw JSON lines instead of a transcript
    #[arg(long)]
    pub json: bool,
}
