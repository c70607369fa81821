//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::{login, notifications, request, whoami};

/// Command-line client for the RIM motorcycle companion API.
#[derive(Parser, Debug)]
#[command(name = "rim")]
#[command(author, version = env!("RIM_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the API lives and where credentials are kept.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// API base URL
    #[arg(long, env = "RIM_API_URL", global = true)]
    pub api_url: Option<String>,

    /// WebSocket base URL (derived from --api-url when omitted)
    #[arg(long, env = "RIM_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "RIM_HTTP_TIMEOUT_SECS", global = true)]
    pub timeout: Option<u64>,

    /// Credential file (defaults to the platform data directory)
    #[arg(long, env = "RIM_CREDENTIALS", global = true)]
    pub credentials: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session tokens
    Login(login::LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show the logged-in rider
    Whoami(whoami::WhoamiArgs),

    /// Exchange the refresh token for a new access token
    RefreshToken,

    /// Send an authenticated request to an API path
    Request(request::RequestArgs),

    /// Stream live notifications until interrupted
    Notifications(notifications::NotificationsArgs),
}
