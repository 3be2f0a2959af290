use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, ExprTrait},
};
use uuid::Uuid;

use super::BlobCatalog;
use crate::entity::blob_object;
use crate::error::CatalogError;
use crate::models::{BlobObject, Fingerprint};

/// Catalog backed by the `blob_object` table.
#[derive(Clone)]
pub struct DbCatalog {
    db: DatabaseConnection,
}

impl DbCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_blob(model: blob_object::Model) -> Result<BlobObject, CatalogError> {
    let byte_size = u64::try_from(model.byte_size).map_err(|_| CatalogError::Corrupt {
        id: model.id.to_string(),
        reason: format!("negative byte_size {}", model.byte_size),
    })?;
    let associated_names: Vec<String> = serde_json::from_value(model.associated_names)
        .map_err(|e| CatalogError::Corrupt {
            id: model.id.to_string(),
            reason: format!("associated_names: {e}"),
        })?;

    Ok(BlobObject {
        id: model.id,
        key: model.key,
        checksum: model.checksum,
        byte_size,
        content_type: model.content_type,
        scope_id: model.scope_id,
        scope_name: model.scope_name,
        created_at: model.created_at,
        associated_names,
        descriptive_name: model.descriptive_name,
    })
}

fn to_db_size(id: Uuid, size: u64) -> Result<i64, CatalogError> {
    i64::try_from(size).map_err(|_| CatalogError::Corrupt {
        id: id.to_string(),
        reason: format!("byte_size {size} out of range"),
    })
}

#[async_trait]
impl BlobCatalog for DbCatalog {
    async fn insert(&self, blob: &BlobObject) -> Result<(), CatalogError> {
        let model = blob_object::ActiveModel {
            id: Set(blob.id),
            key: Set(blob.key.clone()),
            checksum: Set(blob.checksum.clone()),
            byte_size: Set(to_db_size(blob.id, blob.byte_size)?),
            content_type: Set(blob.content_type.clone()),
            scope_id: Set(blob.scope_id.clone()),
            scope_name: Set(blob.scope_name.clone()),
            associated_names: Set(serde_json::json!(blob.associated_names)),
            descriptive_name: Set(blob.descriptive_name.clone()),
            created_at: Set(blob.created_at),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BlobObject>, CatalogError> {
        blob_object::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(to_blob)
            .transpose()
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<BlobObject>, CatalogError> {
        blob_object::Entity::find()
            .filter(blob_object::Column::Key.eq(key))
            .one(&self.db)
            .await?
            .map(to_blob)
            .transpose()
    }

    async fn list_batch(
        &self,
        after: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<BlobObject>, CatalogError> {
        let mut query = blob_object::Entity::find();
        if let Some(cursor) = after {
            query = query.filter(blob_object::Column::Id.gt(cursor));
        }

        query
            .order_by_asc(blob_object::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_blob)
            .collect()
    }

    async fn duplicate_fingerprints(
        &self,
        scope_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<(Fingerprint, u64)>, CatalogError> {
        use blob_object::Column;

        let mut query = blob_object::Entity::find()
            .select_only()
            .column(Column::ScopeId)
            .column(Column::Checksum)
            .column(Column::ByteSize)
            .column(Column::ContentType)
            .column_as(Column::Id.count(), "members")
            .group_by(Column::ScopeId)
            .group_by(Column::Checksum)
            .group_by(Column::ByteSize)
            .group_by(Column::ContentType)
            .having(Column::Id.count().gt(1))
            .order_by_desc(Column::Id.count())
            .order_by_asc(Column::ScopeId)
            .order_by_asc(Column::Checksum)
            .order_by_asc(Column::ByteSize)
            .order_by_asc(Column::ContentType)
            .limit(limit);
        if let Some(scope) = scope_id {
            query = query.filter(Column::ScopeId.eq(scope));
        }

        let rows: Vec<(String, String, i64, String, i64)> =
            query.into_tuple().all(&self.db).await?;

        rows.into_iter()
            .map(|(scope_id, checksum, byte_size, content_type, members)| {
                let corrupt = |reason: String| CatalogError::Corrupt {
                    id: checksum.clone(),
                    reason,
                };
                let byte_size = u64::try_from(byte_size)
                    .map_err(|_| corrupt(format!("negative byte_size {byte_size}")))?;
                let members = u64::try_from(members)
                    .map_err(|_| corrupt(format!("negative member count {members}")))?;
                Ok((
                    Fingerprint {
                        scope_id,
                        checksum,
                        byte_size,
                        content_type,
                    },
                    members,
                ))
            })
            .collect()
    }

    async fn members(&self, fingerprint: &Fingerprint) -> Result<Vec<BlobObject>, CatalogError> {
        let byte_size = i64::try_from(fingerprint.byte_size).unwrap_or(i64::MAX);

        blob_object::Entity::find()
            .filter(blob_object::Column::ScopeId.eq(fingerprint.scope_id.as_str()))
            .filter(blob_object::Column::Checksum.eq(fingerprint.checksum.as_str()))
            .filter(blob_object::Column::ByteSize.eq(byte_size))
            .filter(blob_object::Column::ContentType.eq(fingerprint.content_type.as_str()))
            .order_by_asc(blob_object::Column::CreatedAt)
            .order_by_asc(blob_object::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_blob)
            .collect()
    }

    async fn update_names(
        &self,
        id: Uuid,
        associated_names: &[String],
        descriptive_name: Option<&str>,
    ) -> Result<(), CatalogError> {
        let result = blob_object::Entity::update_many()
            .col_expr(
                blob_object::Column::AssociatedNames,
                Expr::value(serde_json::json!(associated_names)),
            )
            .col_expr(
                blob_object::Column::DescriptiveName,
                Expr::value(descriptive_name.map(str::to_string)),
            )
            .filter(blob_object::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogError::Conflict(format!("blob {id} no longer exists")));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CatalogError> {
        let result = blob_object::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
