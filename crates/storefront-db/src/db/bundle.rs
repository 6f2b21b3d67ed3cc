use super::ordering::{insertion_index, validate_ordering};
use super::transaction::{lock_owner, owner_bundle_ids, write_positions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres};
use std::collections::HashMap;
use storefront_core::models::{Bundle, ImageSurface, NewBundle, OwnerRef, Variant};
use storefront_core::AppError;
use uuid::Uuid;

/// Bundle persistence and ordering
///
/// Every mutating operation is a single transaction and leaves the owner's positions
/// contiguous from 0.
#[async_trait]
pub trait BundleRepository: Send + Sync {
    /// Persist a bundle with all its variants, inserted at `bundle.position` or appended.
    async fn create(&self, bundle: NewBundle) -> Result<Bundle, AppError>;

    async fn get(&self, bundle_id: Uuid) -> Result<Option<Bundle>, AppError>;

    /// Bundles of `owner`, ascending by position.
    async fn list_by_owner(&self, owner: &OwnerRef) -> Result<Vec<Bundle>, AppError>;

    /// Assign `position = index` to every id. `ordered_ids` must be a permutation of the
    /// owner's current bundle ids, otherwise nothing is written.
    async fn reorder(&self, owner: &OwnerRef, ordered_ids: &[Uuid]) -> Result<(), AppError>;

    /// Remove a bundle and its variants, renormalize the owner's positions and return the
    /// removed bundle.
    async fn delete(&self, bundle_id: Uuid) -> Result<Bundle, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct BundleRow {
    id: Uuid,
    surface: String,
    owner_id: String,
    position: i32,
    source_filename: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    bundle_id: Uuid,
    name: String,
    storage_path: String,
    width: Option<i32>,
    height: Option<i32>,
    size_bytes: i64,
    content_type: String,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            bundle_id: row.bundle_id,
            name: row.name,
            storage_path: row.storage_path,
            width: row.width.and_then(|w| u32::try_from(w).ok()),
            height: row.height.and_then(|h| u32::try_from(h).ok()),
            size_bytes: u64::try_from(row.size_bytes).unwrap_or(0),
            content_type: row.content_type,
        }
    }
}

impl BundleRow {
    fn into_bundle(self, variants: Vec<Variant>) -> Result<Bundle, AppError> {
        let surface = self.surface.parse::<ImageSurface>().map_err(|e| {
            AppError::Internal(format!("Bundle {} has invalid surface: {}", self.id, e))
        })?;
        Ok(Bundle {
            bundle_id: self.id,
            owner: OwnerRef::new(surface, self.owner_id),
            position: self.position,
            source_filename: self.source_filename,
            variants,
            created_at: self.created_at,
        })
    }
}

const BUNDLE_COLUMNS: &str = "id, surface, owner_id, position, source_filename, created_at";
const VARIANT_COLUMNS: &str =
    "bundle_id, name, storage_path, width, height, size_bytes, content_type";

/// Postgres-backed bundle repository
#[derive(Clone)]
pub struct PgBundleRepository {
    pool: PgPool,
}

impl PgBundleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_bundle(
        conn: &mut PgConnection,
        bundle_id: Uuid,
    ) -> Result<Option<Bundle>, AppError> {
        let row = sqlx::query_as::<Postgres, BundleRow>(&format!(
            "SELECT {} FROM image_bundles WHERE id = $1",
            BUNDLE_COLUMNS
        ))
        .bind(bundle_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let variants = sqlx::query_as::<Postgres, VariantRow>(&format!(
            "SELECT {} FROM image_variants WHERE bundle_id = $1 ORDER BY ordinal ASC, name ASC",
            VARIANT_COLUMNS
        ))
        .bind(bundle_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Variant::from)
        .collect();

        row.into_bundle(variants).map(Some)
    }
}

#[async_trait]
impl BundleRepository for PgBundleRepository {
    #[tracing::instrument(
        skip(self, bundle),
        fields(
            db.table = "image_bundles",
            db.operation = "insert",
            bundle_id = %bundle.bundle_id,
            owner = %bundle.owner
        )
    )]
    async fn create(&self, bundle: NewBundle) -> Result<Bundle, AppError> {
        let mut tx = self.pool.begin().await?;

        lock_owner(&mut tx, &bundle.owner).await?;
        let mut ordered = owner_bundle_ids(&mut tx, &bundle.owner).await?;
        let index = insertion_index(bundle.position, ordered.len());

        sqlx::query(
            r#"
            INSERT INTO image_bundles (id, surface, owner_id, position, source_filename)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(bundle.bundle_id)
        .bind(bundle.owner.surface.as_str())
        .bind(&bundle.owner.owner_id)
        .bind(index as i32)
        .bind(&bundle.source_filename)
        .execute(&mut *tx)
        .await?;

        for (ordinal, variant) in bundle.variants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO image_variants
                    (bundle_id, name, ordinal, storage_path, width, height, size_bytes, content_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(bundle.bundle_id)
            .bind(&variant.name)
            .bind(ordinal as i32)
            .bind(&variant.storage_path)
            .bind(variant.width.map(|w| w as i32))
            .bind(variant.height.map(|h| h as i32))
            .bind(variant.size_bytes as i64)
            .bind(&variant.content_type)
            .execute(&mut *tx)
            .await?;
        }

        ordered.insert(index, bundle.bundle_id);
        write_positions(&mut tx, &ordered).await?;

        let created = Self::fetch_bundle(&mut tx, bundle.bundle_id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted bundle not readable".to_string()))?;

        tx.commit().await?;

        tracing::info!(
            position = created.position,
            variant_count = created.variants.len(),
            "Bundle persisted"
        );

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_bundles", db.operation = "select", db.record_id = %bundle_id))]
    async fn get(&self, bundle_id: Uuid) -> Result<Option<Bundle>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_bundle(&mut conn, bundle_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_bundles", db.operation = "select", owner = %owner))]
    async fn list_by_owner(&self, owner: &OwnerRef) -> Result<Vec<Bundle>, AppError> {
        let rows = sqlx::query_as::<Postgres, BundleRow>(&format!(
            r#"
            SELECT {} FROM image_bundles
            WHERE surface = $1 AND owner_id = $2
            ORDER BY position ASC, created_at ASC, id ASC
            "#,
            BUNDLE_COLUMNS
        ))
        .bind(owner.surface.as_str())
        .bind(&owner.owner_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let variant_rows = sqlx::query_as::<Postgres, VariantRow>(&format!(
            r#"
            SELECT {} FROM image_variants
            WHERE bundle_id = ANY($1)
            ORDER BY bundle_id, ordinal ASC, name ASC
            "#,
            VARIANT_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut variants_by_bundle: HashMap<Uuid, Vec<Variant>> = HashMap::new();
        for row in variant_rows {
            variants_by_bundle
                .entry(row.bundle_id)
                .or_default()
                .push(Variant::from(row));
        }

        rows.into_iter()
            .map(|row| {
                let variants = variants_by_bundle.remove(&row.id).unwrap_or_default();
                row.into_bundle(variants)
            })
            .collect()
    }

    #[tracing::instrument(skip(self, ordered_ids), fields(db.table = "image_bundles", db.operation = "update", owner = %owner, bundle_count = ordered_ids.len()))]
    async fn reorder(&self, owner: &OwnerRef, ordered_ids: &[Uuid]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        lock_owner(&mut tx, owner).await?;
        let current = owner_bundle_ids(&mut tx, owner).await?;
        validate_ordering(&current, ordered_ids)?;

        write_positions(&mut tx, ordered_ids).await?;
        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "image_bundles", db.operation = "delete", db.record_id = %bundle_id))]
    async fn delete(&self, bundle_id: Uuid) -> Result<Bundle, AppError> {
        let mut tx = self.pool.begin().await?;

        let owner = Self::fetch_bundle(&mut tx, bundle_id)
            .await?
            .map(|b| b.owner)
            .ok_or_else(|| AppError::NotFound(format!("Bundle {} not found", bundle_id)))?;

        lock_owner(&mut tx, &owner).await?;

        // Re-read under the lock; a concurrent delete may have won.
        let bundle = Self::fetch_bundle(&mut tx, bundle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bundle {} not found", bundle_id)))?;

        sqlx::query("DELETE FROM image_bundles WHERE id = $1")
            .bind(bundle_id)
            .execute(&mut *tx)
            .await?;

        let remaining = owner_bundle_ids(&mut tx, &owner).await?;
        write_positions(&mut tx, &remaining).await?;

        tx.commit().await?;

        Ok(bundle)
    }
}
