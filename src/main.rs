// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carebook command-line client
//!
//! Drives the authenticated request gateway against the Carebook API using
//! the persisted credential store, for scripting and support work.

use anyhow::Context;
use carebook_client::{
    db::FileCredentialStore,
    models::{mask_token, SessionEvent},
    Config, Gateway, Slot, TokenPair,
};
use clap::{Parser, Subcommand};
use reqwest::Method;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the session expired and the user must log in again.
const EXIT_SESSION_EXPIRED: u8 = 2;

#[derive(Parser)]
#[command(name = "carebook", version, about = "Carebook API client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or seed the stored session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Clear stored credentials
    Logout,
    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Path relative to the API base URL, e.g. /bookings/
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Store tokens obtained from a login
    Set {
        #[arg(long, env = "CAREBOOK_ACCESS_TOKEN")]
        access: String,
        #[arg(long, env = "CAREBOOK_REFRESH_TOKEN")]
        refresh: String,
    },
    /// Show masked stored tokens
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging()?;

    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;

    let store = Arc::new(
        FileCredentialStore::open(&config.credentials_path)
            .context("Failed to open credential store")?,
    );
    let gateway = Gateway::new(&config, store).context("Failed to build request gateway")?;

    match cli.command {
        Command::Session { action } => {
            session(&gateway, action);
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            gateway.logout();
            println!("Logged out");
            Ok(ExitCode::SUCCESS)
        }
        Command::Request {
            method,
            path,
            data,
            query,
        } => request(&gateway, &method, &path, data, query).await,
    }
}

fn session(gateway: &Gateway, action: SessionAction) {
    match action {
        SessionAction::Set { access, refresh } => {
            gateway.login_with(&TokenPair::new(access, refresh));
            println!("Session stored");
        }
        SessionAction::Show => {
            let store = gateway.store();
            for slot in Slot::ALL {
                let value = store
                    .get(slot)
                    .map(|t| mask_token(&t))
                    .unwrap_or_else(|| "<none>".to_string());
                println!("{slot}: {value}");
            }
            println!("api: {}", gateway.base_url());
        }
    }
}

async fn request(
    gateway: &Gateway,
    method: &str,
    path: &str,
    data: Option<String>,
    query: Vec<(String, String)>,
) -> anyhow::Result<ExitCode> {
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {method}"))?;

    let mut events = gateway.subscribe();

    let mut builder = gateway.request(method, path);
    for (key, value) in &query {
        builder = builder.query(key, value);
    }
    if let Some(data) = data {
        let body: serde_json::Value =
            serde_json::from_str(&data).context("--data must be valid JSON")?;
        builder = builder.json(&body);
    }

    let result = builder.send().await;

    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Expired { login_path, .. } = event {
            eprintln!("Session expired, log in again at {login_path}");
            return Ok(ExitCode::from(EXIT_SESSION_EXPIRED));
        }
    }

    let response = result.context("Request failed")?;
    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;

    eprintln!("HTTP {status}");
    println!("{body}");

    Ok(if status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw}"))
}

/// Initialize structured JSON logging on stderr.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carebook_client=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
