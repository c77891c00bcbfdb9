//! Snapshot service.
//!
//! Wraps a [`SnapshotRepository`] with the cache semantics the executor
//! relies on: force-refresh bypass, lazy expiry on read, TTL validation on
//! write and the periodic sweep.

use chrono::{TimeZone, Utc};
use memora_types::error::SnapshotError;
use memora_types::snapshot::{
    FindOptions, FindSnapshotResult, NewSnapshot, Snapshot, SnapshotIdentity,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::hash::{ContentHasher, compute_source_hash};
use super::repository::SnapshotRepository;

/// Generic over repository and hasher so core never depends on a database
/// or digest implementation.
pub struct SnapshotService<R: SnapshotRepository, H: ContentHasher> {
    repo: R,
    hasher: H,
}

impl<R: SnapshotRepository, H: ContentHasher> SnapshotService<R, H> {
    pub fn new(repo: R, hasher: H) -> Self {
        Self { repo, hasher }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Deterministic digest of `{agentId, operation, ...input}`.
    pub fn compute_hash<T: Serialize + ?Sized>(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: &T,
    ) -> Result<String, SnapshotError> {
        compute_source_hash(&self.hasher, agent_id, operation, input, None)
    }

    /// Like [`compute_hash`](Self::compute_hash), restricted to `fields` of
    /// the input when an allow-list is configured.
    pub fn compute_hash_with_fields<T: Serialize + ?Sized>(
        &self,
        agent_id: &str,
        operation: Option<&str>,
        input: &T,
        fields: Option<&[String]>,
    ) -> Result<String, SnapshotError> {
        compute_source_hash(&self.hasher, agent_id, operation, input, fields)
    }

    /// Probe the cache.
    ///
    /// Expired rows are reported as a miss but left in place for the sweep.
    /// An expiry that cannot be decoded is an error, never a hit or a miss.
    /// Empty optional identity parts match absent ones.
    pub async fn find_snapshot(
        &self,
        identity: &SnapshotIdentity,
        options: FindOptions,
    ) -> Result<FindSnapshotResult, SnapshotError> {
        if options.force_refresh {
            return Ok(FindSnapshotResult::miss());
        }

        let identity = identity.clone().normalized();
        let Some(snapshot) = self.repo.find_by_identity(&identity).await? else {
            return Ok(FindSnapshotResult::miss());
        };

        let expires_at = snapshot.expires_at().map_err(|raw| {
            SnapshotError::ExpiryInvalid(format!(
                "snapshot {} has invalid expiresAt value {raw}",
                snapshot.id
            ))
        })?;

        if let Some(expires_at) = expires_at {
            if expires_at < Utc::now() {
                debug!(snapshot_id = %snapshot.id, %expires_at, "snapshot expired");
                return Ok(FindSnapshotResult::miss());
            }
        }

        Ok(FindSnapshotResult::hit(snapshot))
    }

    /// Store a snapshot.
    ///
    /// `ttl_seconds` of `None` or `0` never expires; a negative TTL is
    /// rejected. A row that already holds the identity is updated in place.
    pub async fn create_snapshot(
        &self,
        mut data: NewSnapshot,
        ttl_seconds: Option<i64>,
    ) -> Result<Snapshot, SnapshotError> {
        data.identity = data.identity.normalized();
        let expires_at_ms = expiry_from_ttl(Utc::now().timestamp_millis(), ttl_seconds)?;
        let snapshot = self.repo.upsert(&data, expires_at_ms).await?;
        debug!(
            snapshot_id = %snapshot.id,
            agent_id = %snapshot.identity.agent_id,
            "stored snapshot"
        );
        Ok(snapshot)
    }

    /// Hard delete a snapshot. Deleting an unknown id is not an error.
    pub async fn invalidate_snapshot(&self, id: &Uuid) -> Result<bool, SnapshotError> {
        let removed = self.repo.delete(id).await?;
        debug!(snapshot_id = %id, removed, "invalidated snapshot");
        Ok(removed)
    }

    /// Delete every expired snapshot. Returns how many rows were removed.
    pub async fn cleanup_expired_snapshots(&self) -> Result<u64, SnapshotError> {
        let count = self
            .repo
            .delete_expired_before(Utc::now().timestamp_millis())
            .await?;
        info!(count, "cleaned up expired snapshots");
        Ok(count)
    }
}

/// Absolute expiry in epoch milliseconds for a TTL measured from `now_ms`.
pub fn expiry_from_ttl(now_ms: i64, ttl_seconds: Option<i64>) -> Result<Option<i64>, SnapshotError> {
    match ttl_seconds {
        None | Some(0) => Ok(None),
        Some(ttl) if ttl < 0 => Err(SnapshotError::ExpiryInvalid(format!(
            "TTL cannot be negative: {ttl}"
        ))),
        Some(ttl) => {
            let at = ttl
                .checked_mul(1000)
                .and_then(|ms| now_ms.checked_add(ms))
                .filter(|ms| Utc.timestamp_millis_opt(*ms).single().is_some())
                .ok_or_else(|| {
                    SnapshotError::ExpiryInvalid(format!("TTL {ttl}s overflows the expiry date"))
                })?;
            Ok(Some(at))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EchoHasher, MemorySnapshotRepository, identity, new_snapshot};
    use serde_json::json;

    fn service() -> SnapshotService<MemorySnapshotRepository, EchoHasher> {
        SnapshotService::new(MemorySnapshotRepository::default(), EchoHasher)
    }

    #[test]
    fn test_expiry_from_ttl() {
        assert_eq!(expiry_from_ttl(1_000, None).unwrap(), None);
        assert_eq!(expiry_from_ttl(1_000, Some(0)).unwrap(), None);
        assert_eq!(expiry_from_ttl(1_000, Some(60)).unwrap(), Some(61_000));
        assert!(matches!(
            expiry_from_ttl(1_000, Some(-1)),
            Err(SnapshotError::ExpiryInvalid(_))
        ));
        assert!(expiry_from_ttl(1_000, Some(i64::MAX)).is_err());
    }

    #[test]
    fn test_compute_hash_is_deterministic() {
        let svc = service();
        let a = svc.compute_hash("demo", None, &json!({"x": 1})).unwrap();
        let b = svc.compute_hash("demo", None, &json!({"x": 1})).unwrap();
        let c = svc.compute_hash("demo", None, &json!({"x": 2})).unwrap();
        let d = svc.compute_hash("other", None, &json!({"x": 1})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_storage() {
        let svc = service();
        svc.create_snapshot(new_snapshot("demo", json!({"ok": true})), Some(60))
            .await
            .unwrap();

        let result = svc
            .find_snapshot(&identity("demo"), FindOptions { force_refresh: true })
            .await
            .unwrap();
        assert!(!result.cached);
        assert!(result.snapshot.is_none());
        assert_eq!(svc.repository().find_calls(), 0);
    }

    #[tokio::test]
    async fn test_hit_after_create() {
        let svc = service();
        let created = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": true})), Some(60))
            .await
            .unwrap();
        assert!(created.expires_at_ms.is_some());

        let result = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap();
        assert!(result.cached);
        assert_eq!(result.snapshot.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_expired_row_is_miss_but_kept() {
        let svc = service();
        let created = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": true})), None)
            .await
            .unwrap();
        svc.repository()
            .set_expiry(&created.id, Some(Utc::now().timestamp_millis() - 1_000));

        let result = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap();
        assert!(!result.cached);
        assert_eq!(svc.repository().len(), 1);
    }

    #[tokio::test]
    async fn test_row_without_expiry_is_hit() {
        let svc = service();
        let created = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": true})), None)
            .await
            .unwrap();
        assert!(created.expires_at_ms.is_none());

        let result = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap();
        assert!(result.cached);
        let found = result.snapshot.unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.expires_at_ms.is_none());
        assert_eq!(found.output, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_empty_operation_matches_absent_operation() {
        let svc = service();
        let mut data = new_snapshot("demo", json!({"v": 1}));
        data.identity.operation = Some(String::new());
        let created = svc.create_snapshot(data, Some(60)).await.unwrap();
        assert_eq!(created.identity.operation, None);

        let result = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap();
        assert!(result.cached);

        let mut lookup = identity("demo");
        lookup.operation = Some(String::new());
        let again = svc.find_snapshot(&lookup, FindOptions::default()).await.unwrap();
        assert_eq!(again.snapshot.unwrap().id, created.id);

        let second = svc
            .create_snapshot(new_snapshot("demo", json!({"v": 2})), Some(60))
            .await
            .unwrap();
        assert_eq!(second.id, created.id);
        assert_eq!(svc.repository().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_converge() {
        let svc = service();
        let creates = (0..8).map(|i| svc.create_snapshot(new_snapshot("demo", json!({"v": i})), Some(60)));
        let results = futures_util::future::join_all(creates).await;

        let ids: std::collections::HashSet<Uuid> =
            results.into_iter().map(|r| r.unwrap().id).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(svc.repository().len(), 1);
        assert_eq!(svc.repository().upsert_calls(), 8);
    }

    #[tokio::test]
    async fn test_invalid_stored_expiry_is_error() {
        let svc = service();
        let created = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": true})), None)
            .await
            .unwrap();
        svc.repository().set_expiry(&created.id, Some(-42));

        let err = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "snapshot_expiry_invalid");
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires_and_negative_is_rejected() {
        let svc = service();
        let created = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": true})), Some(0))
            .await
            .unwrap();
        assert!(created.expires_at_ms.is_none());

        let err = svc
            .create_snapshot(new_snapshot("demo", json!({"ok": false})), Some(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::ExpiryInvalid(_)));
        assert_eq!(svc.repository().len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_create_updates_in_place() {
        let svc = service();
        let first = svc
            .create_snapshot(new_snapshot("demo", json!({"v": 1})), Some(60))
            .await
            .unwrap();
        let second = svc
            .create_snapshot(new_snapshot("demo", json!({"v": 2})), Some(60))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(svc.repository().len(), 1);
        let found = svc
            .find_snapshot(&identity("demo"), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.snapshot.unwrap().output, json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_invalidate_and_cleanup() {
        let svc = service();
        let keep = svc
            .create_snapshot(new_snapshot("keep", json!({})), Some(3600))
            .await
            .unwrap();
        let stale = svc
            .create_snapshot(new_snapshot("stale", json!({})), Some(3600))
            .await
            .unwrap();
        svc.repository()
            .set_expiry(&stale.id, Some(Utc::now().timestamp_millis() - 1));
        let forever = svc
            .create_snapshot(new_snapshot("forever", json!({})), None)
            .await
            .unwrap();

        assert_eq!(svc.cleanup_expired_snapshots().await.unwrap(), 1);
        assert_eq!(svc.repository().len(), 2);

        assert!(svc.invalidate_snapshot(&forever.id).await.unwrap());
        assert!(!svc.invalidate_snapshot(&forever.id).await.unwrap());
        assert_eq!(svc.repository().len(), 1);

        let found = svc
            .find_snapshot(&identity("keep"), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.snapshot.unwrap().id, keep.id);
    }
}
