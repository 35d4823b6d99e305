use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use super::board_models::ScanTarget;
use crate::error::Result;

#[async_trait]
pub trait TargetRepositoryTrait: Send + Sync {
    /// Insert the target if it is new; an existing row is returned unchanged.
    async fn upsert(&self, target_id: Uuid, owner_id: Uuid) -> Result<ScanTarget>;
    async fn find_by_id(&self, target_id: Uuid) -> Result<Option<ScanTarget>>;
    async fn increment_scan_count(&self, target_id: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct TargetRepository {
    pool: PgPool,
}

impl TargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetRepositoryTrait for TargetRepository {
    async fn upsert(&self, target_id: Uuid, owner_id: Uuid) -> Result<ScanTarget> {
        let target = sqlx::query_as::<_, ScanTarget>(
            "INSERT INTO scan_targets (id, owner_id) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET owner_id = scan_targets.owner_id
             RETURNING *",
        )
        .bind(target_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(target)
    }

    async fn find_by_id(&self, target_id: Uuid) -> Result<Option<ScanTarget>> {
        let target = sqlx::query_as::<_, ScanTarget>("SELECT * FROM scan_targets WHERE id = $1")
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(target)
    }

    async fn increment_scan_count(&self, target_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE scan_targets SET scan_count = scan_count + 1 WHERE id = $1")
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTargetRepository {
    targets: DashMap<Uuid, ScanTarget>,
}

impl InMemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetRepositoryTrait for InMemoryTargetRepository {
    async fn upsert(&self, target_id: Uuid, owner_id: Uuid) -> Result<ScanTarget> {
        let target = self
            .targets
            .entry(target_id)
            .or_insert_with(|| ScanTarget {
                id: target_id,
                owner_id,
                scan_count: 0,
                created_at: Utc::now(),
            })
            .clone();

        Ok(target)
    }

    async fn find_by_id(&self, target_id: Uuid) -> Result<Option<ScanTarget>> {
        Ok(self.targets.get(&target_id).map(|t| t.clone()))
    }

    async fn increment_scan_count(&self, target_id: Uuid) -> Result<()> {
        if let Some(mut target) = self.targets.get_mut(&target_id) {
            target.scan_count += 1;
        }
        Ok(())
    }
}
