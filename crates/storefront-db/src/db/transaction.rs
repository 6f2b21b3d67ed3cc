//! Transaction-scoped helpers for owner list mutations
//!
//! Every mutation of an owner's bundle list runs inside one transaction that first takes
//! the owner lock, then reads the current order, then rewrites positions. Concurrent
//! mutations of the same owner are serialized by the lock; other owners are unaffected.

use super::ordering;
use sqlx::{PgConnection, Postgres};
use storefront_core::models::OwnerRef;
use storefront_core::AppError;
use uuid::Uuid;

/// Take the per-owner advisory lock, released at commit or rollback.
///
/// Row locks alone cannot guard an owner that has no bundles yet, so the lock is keyed
/// on the owner itself.
pub async fn lock_owner(conn: &mut PgConnection, owner: &OwnerRef) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("image_bundles:{}", owner))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Bundle ids of an owner in display order.
pub async fn owner_bundle_ids(
    conn: &mut PgConnection,
    owner: &OwnerRef,
) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<Postgres, Uuid>(
        r#"
        SELECT id FROM image_bundles
        WHERE surface = $1 AND owner_id = $2
        ORDER BY position ASC, created_at ASC, id ASC
        "#,
    )
    .bind(owner.surface.as_str())
    .bind(&owner.owner_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// Persist `position = index` for every id in `ordered_ids` with one statement.
pub async fn write_positions(
    conn: &mut PgConnection,
    ordered_ids: &[Uuid],
) -> Result<(), AppError> {
    if ordered_ids.is_empty() {
        return Ok(());
    }

    let (ids, positions) = ordering::positions(ordered_ids);
    sqlx::query(
        r#"
        UPDATE image_bundles AS b
        SET position = data.position
        FROM UNNEST($1::uuid[], $2::int4[]) AS data(id, position)
        WHERE b.id = data.id AND b.position IS DISTINCT FROM data.position
        "#,
    )
    .bind(ids)
    .bind(positions)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
