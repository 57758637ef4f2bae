use std::{env, fmt::Display, str::FromStr, time::Duration};

use fr_common::{parse_boolean_flag, Secret};
use fundraising_engine::{
    config::DEFAULT_SHUTDOWN_GRACE_PERIOD,
    fe_api::DEFAULT_STORAGE_TIMEOUT,
    sync::{DEFAULT_QUEUE_CAPACITY, DEFAULT_UPSERT_TIMEOUT, DEFAULT_WORKER_COUNT},
    ElasticConfig,
    EngineConfig,
};
use log::*;

const DEFAULT_FRS_DATABASE_URL: &str = "sqlite://data/fundraising.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Run the embedded schema migrations at start-up.
    pub run_migrations: bool,
    /// The search cluster to sync campaigns to. If `None`, an in-process index is used, which is only useful for
    /// development.
    pub search: Option<SearchConfig>,
    pub sync_workers: usize,
    pub sync_queue_capacity: usize,
    pub index_timeout: Duration,
    pub storage_timeout: Duration,
    pub shutdown_grace_period: Duration,
    /// If true, every change to a campaign's collected total is pushed to the search index.
    pub resync_on_settlement: bool,
    /// How often the sync pipeline statistics are written to the log.
    pub stats_interval: Duration,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub url: String,
    pub api_key: Option<Secret<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_FRS_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_migrations: true,
            search: None,
            sync_workers: DEFAULT_WORKER_COUNT,
            sync_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            index_timeout: DEFAULT_UPSERT_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            resync_on_settlement: true,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Missing or invalid values fall back to the defaults.
    pub fn from_vars<F>(var: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let database_url = var("FRS_DATABASE_URL").filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!("🪛️ FRS_DATABASE_URL is not set. Using the default, {DEFAULT_FRS_DATABASE_URL}.");
            defaults.database_url.clone()
        });
        let db_max_connections = parse_or_default(&var, "FRS_DB_MAX_CONNECTIONS", defaults.db_max_connections);
        let run_migrations = parse_boolean_flag(var("FRS_RUN_MIGRATIONS"), defaults.run_migrations);
        let search = SearchConfig::from_vars(&var);
        let sync_workers = parse_or_default(&var, "FRS_SYNC_WORKERS", defaults.sync_workers);
        let sync_queue_capacity = parse_or_default(&var, "FRS_SYNC_QUEUE_CAPACITY", defaults.sync_queue_capacity);
        let index_timeout = parse_secs_or_default(&var, "FRS_INDEX_TIMEOUT_SECS", defaults.index_timeout);
        let storage_timeout = parse_secs_or_default(&var, "FRS_STORAGE_TIMEOUT_SECS", defaults.storage_timeout);
        let shutdown_grace_period =
            parse_secs_or_default(&var, "FRS_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_period);
        let resync_on_settlement = parse_boolean_flag(var("FRS_RESYNC_ON_SETTLEMENT"), defaults.resync_on_settlement);
        let stats_interval = parse_secs_or_default(&var, "FRS_STATS_INTERVAL_SECS", defaults.stats_interval);
        Self {
            database_url,
            db_max_connections,
            run_migrations,
            search,
            sync_workers,
            sync_queue_capacity,
            index_timeout,
            storage_timeout,
            shutdown_grace_period,
            resync_on_settlement,
            stats_interval,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sync_workers: self.sync_workers,
            queue_capacity: self.sync_queue_capacity,
            index_timeout: self.index_timeout,
            storage_timeout: self.storage_timeout,
            shutdown_grace_period: self.shutdown_grace_period,
            resync_on_settlement: self.resync_on_settlement,
        }
    }
}

impl SearchConfig {
    fn from_vars<F>(var: &F) -> Option<Self>
    where F: Fn(&str) -> Option<String> {
        let Some(url) = var("FRS_ELASTIC_URL").filter(|s| !s.trim().is_empty()) else {
            warn!(
                "🪛️ FRS_ELASTIC_URL is not set. Campaigns will be indexed in memory, and search results will not survive \
                 a restart."
            );
            return None;
        };
        let api_key = var("FRS_ELASTIC_API_KEY").filter(|s| !s.is_empty()).map(Secret::new);
        if api_key.is_none() {
            info!("🪛️ FRS_ELASTIC_API_KEY is not set. Requests to {url} will not be authenticated.");
        }
        Some(Self { url: url.trim().to_string(), api_key })
    }

    pub fn elastic_config(&self) -> ElasticConfig {
        let config = ElasticConfig::new(self.url.clone());
        match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }
}

fn parse_or_default<T, F>(var: &F, name: &str, default: T) -> T
where
    T: FromStr + Display + PartialOrd + Default,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(s) = var(name) else {
        return default;
    };
    match s.trim().parse::<T>() {
        Ok(v) if v > T::default() => v,
        Ok(v) => {
            error!("🪛️ {name} must be greater than zero, but was {v}. Using the default, {default}, instead.");
            default
        },
        Err(e) => {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        },
    }
}

fn parse_secs_or_default<F>(var: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    let secs = parse_or_default(var, name, default.as_secs());
    Duration::from_secs(secs)
}
