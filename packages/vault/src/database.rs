use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::blob_object;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("vault::entity::*").sync(&db).await?;
    ensure_indexes(&db).await;

    Ok(db)
}

/// Create indexes the entity definitions cannot express.
pub async fn ensure_indexes(db: &DatabaseConnection) {
    // Duplicate detection groups and filters on the full fingerprint:
    // SELECT ... FROM blob_object WHERE scope_id = ? AND checksum = ? AND ...
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_blob_object_fingerprint")
        .table(blob_object::Entity)
        .col(blob_object::Column::ScopeId)
        .col(blob_object::Column::Checksum)
        .col(blob_object::Column::ByteSize)
        .col(blob_object::Column::ContentType)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_blob_object_fingerprint exists"),
        Err(e) => warn!("Failed to create index idx_blob_object_fingerprint: {}", e),
    }
}
