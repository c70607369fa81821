//! Notifications command implementation.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use tokio::sync::mpsc;

use rim_client::{ConnectionState, NotificationSocket};

use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    /// Output notifications as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub async fn run(session: &CliSession, args: NotificationsArgs) -> Result<()> {
    let token = session.require_login()?;
    let socket = NotificationSocket::new(session.client().config());

    let (state_tx, mut state_rx) = mpsc::unbounded_channel();
    socket.subscribe_state(move |state| {
        let _ = state_tx.send(*state);
    });

    eprintln!("{}", "Connecting to notification stream...".dimmed());
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());
    eprintln!();

    let json_output = args.json;
    socket.connect(&token, move |notification| {
        if json_output {
            if let Err(e) = output::json(notification) {
                tracing::warn!(error = %e, "Failed to print notification");
            }
        } else {
            output::notification(notification);
        }
    })?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                socket.disconnect().await;
                return Ok(());
            }
            state = state_rx.recv() => {
                let Some(state) = state else {
                    return Ok(());
                };
                if !json_output {
                    output::connection_state(&state);
                }
                if state == (ConnectionState::Closed { reconnect_scheduled: false })
                    && !socket.reconnect_enabled()
                {
                    bail!("Notification stream rejected the session. Run 'rim login' again.");
                }
            }
        }
    }
}
