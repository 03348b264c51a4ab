use std::sync::Arc;

use chess_duel_core::{Database, GameService};

mod config;
mod error;
mod routes;

use config::Config;

pub struct AppState {
    pub games: GameService<Database>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    tracing::info!(db = %config.database_path.display(), rules = ?config.rules, "starting");

    let db = Database::open(&config.database_path)?;
    let state = Arc::new(AppState {
        games: GameService::with_rules(db, config.rules),
    });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
