pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod scheduler;
pub mod services;
pub mod token;

use std::sync::Arc;
use tokio::signal;

pub use config::Config;
use scheduler::LifecycleDriver;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "auth" | "-a" | "--auth" => run_auth(config).await,

        "orders" | "-o" | "--orders" => run_orders(config).await,

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Mensa - Campus Food Ordering Services");
    println!();
    println!("USAGE:");
    println!("  mensa <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("  auth              Run the account & session service");
    println!("  orders            Run the dish & order service");
    println!("  help              Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml for ports, databases, and the order lifecycle.");
    println!("  The shared signing secret must be supplied via {}.", config::TOKEN_SECRET_ENV);
    println!("  Both services must be started with the same secret.");
}

async fn run_auth(config: Config) -> anyhow::Result<()> {
    info!(
        "Mensa v{} starting account service...",
        env!("CARGO_PKG_VERSION")
    );

    let state = api::create_auth_state(&config).await?;
    let app = api::auth_router(state, &config.server.cors_allowed_origins);

    let addr = format!("0.0.0.0:{}", config.auth.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Account service listening at http://{addr}");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Account service error: {}", e);
        }
    });

    wait_for_shutdown().await;

    server_handle.abort();
    info!("Account service stopped");

    Ok(())
}

async fn run_orders(config: Config) -> anyhow::Result<()> {
    info!(
        "Mensa v{} starting order service...",
        env!("CARGO_PKG_VERSION")
    );

    let state = api::create_order_state(&config).await?;

    let driver = Arc::new(LifecycleDriver::new(
        state.store.clone(),
        config.lifecycle.clone(),
    ));
    let driver_handle = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move {
            if let Err(e) = driver.start().await {
                error!("Order lifecycle driver error: {}", e);
            }
        })
    };

    let app = api::order_router(state, &config.server.cors_allowed_origins);

    let addr = format!("0.0.0.0:{}", config.orders.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Order service listening at http://{addr}");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Order service error: {}", e);
        }
    });

    wait_for_shutdown().await;

    driver.stop().await;
    driver_handle.abort();
    server_handle.abort();
    info!("Order service stopped");

    Ok(())
}

async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }
}
