//! Request command implementation.

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use rim_client::{ApiRequest, Method};

use crate::output;
use crate::session::CliSession;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// API path, e.g. /bikes/7/maintenance
    pub path: String,

    /// JSON body: inline JSON, @file, or - for stdin
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q', value_parser = parse_query)]
    pub query: Vec<(String, String)>,

    /// Print the response status to stderr
    #[arg(long, short = 'i')]
    pub include_status: bool,
}

pub async fn run(session: &CliSession, args: RequestArgs) -> Result<()> {
    let method: Method = args
        .method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;

    let mut request = ApiRequest::new(method, &args.path);
    for (key, value) in &args.query {
        request = request.query(key, value);
    }
    if let Some(data) = &args.data {
        let body = read_body(data)?;
        request = request.json(&body).context("Invalid request body")?;
    }

    let response = session
        .client()
        .send(request)
        .await
        .with_context(|| format!("{} {} failed", args.method.to_ascii_uppercase(), args.path))?;

    if args.include_status {
        eprintln!("{}", response.status());
    }
    output::body(&response)
}

fn read_body(data: &str) -> Result<Value> {
    let text = if data == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else if let Some(path) = data.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
    } else {
        data.to_string()
    };

    serde_json::from_str(&text).context("Request body is not valid JSON")
}

fn parse_query(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("expected key=value, got '{}'", s),
    }
}
