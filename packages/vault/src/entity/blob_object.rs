use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blob_object")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque storage key shared by both tiers.
    #[sea_orm(unique)]
    pub key: String,

    /// Content checksum recorded at write time.
    pub checksum: String,

    /// Size of the blob in bytes.
    pub byte_size: i64,

    /// MIME content type.
    pub content_type: String,

    /// Owning collection.
    pub scope_id: String,

    /// Purposefully denormalized so naming never needs the owner record.
    pub scope_name: String,

    /// JSON array of labels currently linked to the blob.
    #[sea_orm(column_type = "JsonBinary")]
    pub associated_names: Json,

    /// Cached descriptive name; null until first computed.
    pub descriptive_name: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
