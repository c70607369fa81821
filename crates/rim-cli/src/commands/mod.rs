//! Subcommand implementations.

pub mod login;
mod logout;
pub mod notifications;
mod refresh_token;
pub mod request;
pub mod whoami;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::session::CliSession;

pub async fn handle(cli: Cli) -> Result<()> {
    let session = CliSession::open(&cli.connection)?;

    match cli.command {
        Commands::Login(args) => login::run(&session, args).await,
        Commands::Logout => logout::run(&session).await,
        Commands::Whoami(args) => whoami::run(&session, args).await,
        Commands::RefreshToken => refresh_token::run(&session).await,
        Commands::Request(args) => request::run(&session, args).await,
        Commands::Notifications(args) => notifications::run(&session, args).await,
    }
}
