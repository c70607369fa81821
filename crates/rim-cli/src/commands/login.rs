//! Login command implementation.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use rim_core::Credentials;

use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password (read from stdin when omitted)
    #[arg(long, env = "RIM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

pub async fn run(session: &CliSession, args: LoginArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => read_password()?,
    };

    eprintln!("{}", "Logging in...".dimmed());

    session
        .client()
        .login(Credentials::new(&args.email, password))
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    output::field("Email", &args.email);
    output::field("API", session.client().config().api_url.as_str());
    output::field(
        "Credentials",
        &session.credentials_path().display().to_string(),
    );

    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
