use std::sync::Arc;

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maestro=info,maestro_scheduler=info".into()),
        )
        .init();

    // load config: explicit MAESTRO_CONFIG env > ~/.maestro/maestro.toml
    let config_path = std::env::var("MAESTRO_CONFIG").ok();
    let config =
        maestro_core::MaestroConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            maestro_core::MaestroConfig::default()
        });

    // initialize SQLite database
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    maestro_store::db::init_db(&db)?;
    info!("database migrations complete");

    // The engine and the handle each get their own connection so manual
    // commands never contend with the tick snapshot.
    let engine_store = Arc::new(maestro_store::ScheduleStore::new(db));
    let handle_store = Arc::new(maestro_store::ScheduleStore::new(
        rusqlite::Connection::open(db_path)?,
    ));

    let assets = Arc::new(maestro_store::AnnouncementAssets::new(
        config.announcements.dir.clone(),
    )?);

    let players: Arc<dyn maestro_players::PlayerApi> = Arc::new(
        maestro_players::HttpPlayerApi::new(
            config.players.base_url.clone(),
            config.players.api_token.clone(),
        ),
    );
    info!(base_url = %config.players.base_url, "device command facade ready");

    // Manual trigger/stop channel: SchedulerHandle → SchedulerEngine.
    // The handle is the embedding point for the authoring/control layer;
    // it stays alive for the daemon's lifetime.
    let (command_tx, command_rx) = tokio::sync::mpsc::channel(64);
    let handle = maestro_scheduler::SchedulerHandle::new(
        Arc::clone(&handle_store),
        Arc::clone(&assets),
        command_tx,
    );
    info!(schedules = handle.list()?.len(), "loaded schedules from database");

    let engine =
        maestro_scheduler::SchedulerEngine::new(engine_store, players, &config.scheduler);

    // spawn scheduler engine loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(async move { engine.run(command_rx, shutdown_rx).await });

    info!("maestro daemon running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    // signal the scheduler to stop and wait for the loop to drain
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
