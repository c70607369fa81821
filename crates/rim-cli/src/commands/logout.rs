//! Logout command implementation.

use anyhow::{Context, Result};

use crate::output;
use crate::session::CliSession;

pub async fn run(session: &CliSession) -> Result<()> {
    session
        .client()
        .logout()
        .await
        .context("Failed to clear credentials")?;

    output::success("Logged out");
    Ok(())
}
