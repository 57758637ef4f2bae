use chrono::{Duration, Utc};
use fundraising_engine::{
    db_types::{Amount, Campaign, NewCampaign},
    PrimaryStore,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_url() -> String {
    let path = std::env::temp_dir().join(format!("fr_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

/// Creates a fresh, migrated database at a random location.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_url();
    let db = SqliteDatabase::new_with_url(&url, 25).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn teardown(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await.expect("Error closing database");
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e:?}");
    }
}

pub async fn new_campaign(db: &SqliteDatabase, owner: &str, title: &str) -> Campaign {
    let campaign = NewCampaign::new(owner.into(), title, Amount::from(10_000), Utc::now() + Duration::days(30))
        .with_username(format!("{owner}-name"))
        .with_description(format!("All about {title}"));
    db.insert_campaign(campaign).await.expect("Error inserting campaign")
}
