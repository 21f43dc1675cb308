use dealership::app_state::AppState;
use dealership::auth::ensure_bootstrap_admin;
use dealership::configuration::get_configuration;
use dealership::create_app;
use dealership::db::Database;
use dealership::errors::{AppErrors, Error};
use dealership::mailer;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn bind_address(host: &str, port: u16) -> Result<SocketAddr, Error> {
    let host = IpAddr::from_str(host)?;
    Ok(SocketAddr::from((host, port)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}

async fn run() -> Result<(), Error> {
    let configuration = get_configuration()?;
    configuration.auth.check_if_valid()?;
    let addr = bind_address(
        &configuration.application.host,
        configuration.application.port,
    )?;

    let db = Database::try_from(&configuration.database).await?;
    ensure_bootstrap_admin(&db, &configuration.auth).await?;
    let mailer = mailer::from_settings(&configuration.mail).map_err(AppErrors::from)?;

    let state = AppState::init(db, mailer, configuration);
    let db = state.db.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await.map_err(AppErrors::from)?,
        Err(_) => error!("storage still in use at shutdown, skipping close"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    if let Err(err) = run().await {
        error!("server stopped: {err}");
        std::process::exit(1);
    }
}
