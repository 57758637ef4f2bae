use std::path::Path;

use fundraising_engine::{
    ElasticsearchIndex,
    FundraisingEngine,
    MemorySearchIndex,
    PrimaryStore,
    SearchIndex,
    SqliteDatabase,
};
use log::*;
use tokio::time::MissedTickBehavior;

use crate::{config::ServerConfig, errors::ServerError};

/// Connects to the primary store and the search index, starts the engine, and runs until Ctrl-C is received. The sync
/// queue is then drained within the configured grace period before the store is closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = connect_database(&config).await?;
    match &config.search {
        Some(search) => {
            let index = ElasticsearchIndex::new(search.elastic_config())
                .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
            if let Err(e) = index.ping().await {
                // Upserts fail and are logged until the cluster comes up
                warn!("🚀️ Search cluster at {} is not reachable yet. {e}", search.url);
            }
            serve(config, db, index).await
        },
        None => serve(config, db, MemorySearchIndex::new()).await,
    }
}

pub async fn connect_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    create_database_dir(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    Ok(db)
}

/// SQLite creates the database file on demand, but not the directory it lives in.
fn create_database_dir(url: &str) -> Result<(), ServerError> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("🚀️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}

async fn serve<B, I>(config: ServerConfig, db: B, index: I) -> Result<(), ServerError>
where
    B: PrimaryStore,
    I: SearchIndex,
{
    let engine = FundraisingEngine::start(db, index, config.engine_config());
    info!("🚀️ Fundraising engine is ready. Press Ctrl-C to stop.");
    let mut stats_timer = tokio::time::interval(config.stats_interval);
    stats_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    stats_timer.tick().await;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("🚀️ Could not listen for the shutdown signal. {e}");
                }
                break;
            }
            _ = stats_timer.tick() => log_stats(&engine),
        }
    }
    info!("🚀️ Shutdown requested. Draining the search sync queue.");
    log_stats(&engine);
    let report = engine.shutdown().await;
    info!("🚀️ Fundraising engine stopped. Clean shutdown: {}", report.drained());
    Ok(())
}

fn log_stats<B, I>(engine: &FundraisingEngine<B, I>)
where
    B: PrimaryStore,
    I: SearchIndex,
{
    let queue = engine.sync_queue();
    let workers = engine.workers();
    info!(
        "📬️ Sync queue: {}/{} queued, {} dropped, {} rejected. Workers: {} synced, {} failed",
        queue.len(),
        queue.capacity(),
        queue.dropped_count(),
        queue.rejected_count(),
        workers.synced_count(),
        workers.failed_count()
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let url = format!("sqlite://{}/fundraising.db?mode=rwc", dir.display());
        create_database_dir(&url).unwrap();
        assert!(dir.is_dir());
        // Nothing to do for in-memory databases or other schemes
        create_database_dir("sqlite://:memory:").unwrap();
        create_database_dir("postgres://localhost/frs").unwrap();
    }

    #[tokio::test]
    async fn connects_and_migrates() {
        let tmp = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/store/fundraising.db", tmp.path().display());
        let config = ServerConfig { database_url: url, db_max_connections: 2, ..ServerConfig::default() };
        let mut db = connect_database(&config).await.unwrap();
        let missing = db.fetch_campaign(&fundraising_engine::db_types::CampaignId::random()).await.unwrap();
        assert!(missing.is_none());
        db.close().await.unwrap();
    }
}
