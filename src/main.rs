use anyhow::{Context, Result};
use booking_reconciler::api::{new_shared_session_state, serve_status};
use booking_reconciler::client::{ApiClient, BookingApi, TokenPair, TokenStore};
use booking_reconciler::config::{Cli, Commands, Config};
use booking_reconciler::reconcile::{
    LogNotifier, Outcome, PageState, PageUrl, ReconciliationPoller, RefreshingNotifier,
};
use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (config, command) = cli.into_config()?;
    let tokens = Arc::new(TokenStore::open(&config.token_db)?);

    match command {
        Commands::Login { access, refresh } => {
            tokens.save(&TokenPair { access, refresh })?;
            info!(token_db = %config.token_db, "Session stored");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Logout => {
            tokens.clear()?;
            info!("Session cleared");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Bookings => {
            let client = ApiClient::new(config.api.clone(), Some(tokens))?;
            let bookings = client.list_bookings().await.context("Failed to list bookings")?;

            for booking in &bookings {
                println!(
                    "#{}\t{}",
                    booking.id,
                    booking.status.as_deref().unwrap_or("-")
                );
            }
            info!(count = bookings.len(), "Bookings listed");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reconcile { page_url } => reconcile(config, tokens, &page_url).await,
    }
}

async fn reconcile(config: Config, tokens: Arc<TokenStore>, page_url: &str) -> Result<ExitCode> {
    let page = Arc::new(PageUrl::parse(page_url, config.poller.order_param.clone())?);
    let api: Arc<dyn BookingApi> = Arc::new(ApiClient::new(config.api.clone(), Some(tokens))?);
    let notifier = Arc::new(RefreshingNotifier::new(LogNotifier, api.clone()));

    let mut poller = ReconciliationPoller::new(api, notifier, page.clone(), config.poller.clone());

    if let Some(port) = config.status_port {
        let state = new_shared_session_state();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        tokio::spawn(serve_status(state.clone(), addr));
        poller = poller.with_snapshot(state);
    }

    let Some(handle) = poller.start_from_page() else {
        info!("No payment to reconcile on this page");
        return Ok(ExitCode::SUCCESS);
    };

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping reconciliation");
            handle.cancel();
            None
        }
    };

    if page.order_marker().is_none() {
        println!("{}", page.current());
    }

    Ok(match outcome {
        Some(Outcome::Confirmed) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
