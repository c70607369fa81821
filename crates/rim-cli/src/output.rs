//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use rim_client::{ApiResponse, ConnectionState, Notification};

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning.
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a response body: pretty JSON when it parses, raw text otherwise.
pub fn body(response: &ApiResponse) -> Result<()> {
    if response.is_empty() {
        return Ok(());
    }
    match response.json::<serde_json::Value>() {
        Ok(value) => json_pretty(&value),
        Err(_) => {
            println!("{}", response.text());
            Ok(())
        }
    }
}

/// Print one notification as a human-readable line.
pub fn notification(notification: &Notification) {
    let kind = notification.kind().unwrap_or("notification");
    let message = notification
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| notification.as_value().to_string());
    println!("{} {}", kind.to_uppercase().cyan(), message);
}

/// Print a socket state change.
pub fn connection_state(state: &ConnectionState) {
    let label = match state {
        ConnectionState::Idle => "idle".dimmed(),
        ConnectionState::Connecting => "connecting...".dimmed(),
        ConnectionState::Open => "connected".green(),
        ConnectionState::Closing => "closing...".dimmed(),
        ConnectionState::Closed {
            reconnect_scheduled: true,
        } => "disconnected, retrying".yellow(),
        ConnectionState::Closed {
            reconnect_scheduled: false,
        } => "disconnected".red(),
    };
    eprintln!("{} {}", "SOCKET".dimmed(), label);
}
