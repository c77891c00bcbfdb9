//! Snapshot repository trait definition.

use memora_types::error::RepositoryError;
use memora_types::snapshot::{NewSnapshot, Snapshot, SnapshotIdentity};
use uuid::Uuid;

/// Persistence port for snapshots.
///
/// The seven identity fields form a unique key. Absent optional parts
/// (operation, user id, scope id) compare equal to each other, and an empty
/// string is the same as absent.
pub trait SnapshotRepository: Send + Sync {
    /// Look up the row matching every identity field.
    fn find_by_identity(
        &self,
        identity: &SnapshotIdentity,
    ) -> impl std::future::Future<Output = Result<Option<Snapshot>, RepositoryError>> + Send;

    /// Insert a row, or update input/output/model/expiry of the row already
    /// holding this identity. Must be a single atomic statement so two
    /// concurrent writers converge on one row.
    fn upsert(
        &self,
        snapshot: &NewSnapshot,
        expires_at_ms: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Snapshot, RepositoryError>> + Send;

    /// Hard delete by id. Returns whether a row was removed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete every row whose expiry precedes `now_ms`. Returns the count.
    fn delete_expired_before(
        &self,
        now_ms: i64,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
