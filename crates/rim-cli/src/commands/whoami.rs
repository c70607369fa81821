//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use rim_client::endpoints;

use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the raw profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(session: &CliSession, args: WhoamiArgs) -> Result<()> {
    session.require_login()?;

    let profile: Value = session
        .client()
        .get(endpoints::ME)
        .await
        .context("Failed to fetch profile")?;

    if args.json {
        return output::json(&profile);
    }

    for key in ["id", "email", "name", "username"] {
        if let Some(value) = profile.get(key) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            output::field(key, &text);
        }
    }
    output::field("API", session.client().config().api_url.as_str());
    if let Some(updated) = session.store().updated_at() {
        output::field("Token stored", &updated.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }

    Ok(())
}
