//! Vouch CLI - evaluates the leave-reference page for one route.
//!
//! ```text
//! vouch check /leave-reference/hosted/5/42
//!   -> config -> ApiClient -> LeaveReferencePage::open -> settled -> render
//! ```
//!
//! Prints the eligibility outcome on the first line and the rendered page
//! below it. Exit status: 0 when the form would be shown, 1 when it would
//! not, 2 on usage or configuration errors.

mod args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vouch_config::{ResolvedConfig, VouchConfig};
use vouch_core::{LeaveReferencePage, PageCaches, PageSources};
use vouch_providers::{ApiClient, ApiConfig, retry::RetryConfig};
use vouch_types::EligibilityResult;

use crate::args::{CheckArgs, Cli, Command};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries the rendered page; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<VouchConfig> {
    match path {
        Some(path) => Ok(VouchConfig::load_from(path)?),
        None => Ok(VouchConfig::load()?.unwrap_or_default()),
    }
}

fn api_config(config: &ResolvedConfig) -> Result<ApiConfig> {
    let retry = RetryConfig {
        max_retries: config.retry.max_retries,
        initial_delay: config.retry.initial_delay,
        max_delay: config.retry.max_delay,
        ..RetryConfig::default()
    };
    let mut api = ApiConfig::new(config.base_url.clone())?
        .with_timeout(config.request_timeout)
        .with_retry(retry);
    if let Some(token) = &config.session_token {
        api = api.with_session_token(token.clone());
    }
    Ok(api)
}

async fn check(args: CheckArgs, config: &ResolvedConfig) -> Result<ExitCode> {
    let request = args.request()?;
    let client = Arc::new(ApiClient::new(api_config(config)?)?);
    let sources = PageSources {
        users: Arc::clone(&client),
        availability: client,
    };
    let caches = PageCaches::new(config.cache_stale_after);
    let mut page = LeaveReferencePage::open(request, sources, caches);

    // Decided without network data; dropping the page cancels the fetches.
    if page.eligibility() == EligibilityResult::InvalidType {
        println!("{}", EligibilityResult::InvalidType);
        println!("{}", page.view());
        return Ok(ExitCode::from(1));
    }

    if args.progress {
        let mut last = page.view();
        println!("{last}\n");
        while !page.state().is_settled() {
            page.changed().await;
            let view = page.view();
            if view != last {
                println!("{view}\n");
                last = view;
            }
        }
    } else {
        page.settled().await;
    }

    let result = page.eligibility();
    tracing::info!(%result, path = %page.request().path(), "Page settled");
    println!("{result}");
    println!("{}", page.view());

    Ok(if result.is_eligible() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let mut resolved = config.resolve().context("invalid configuration")?;
    if let Some(url) = cli.api_url {
        resolved.base_url = url;
    }
    tracing::debug!(config = ?resolved, "Configuration resolved");

    match cli.command {
        Command::Check(args) => check(args, &resolved).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("vouch: {e:#}");
            ExitCode::from(2)
        }
    }
}
