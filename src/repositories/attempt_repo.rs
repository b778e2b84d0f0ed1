//! Campaign attempt repository.
//!
//! The claim operation is the engine's mutual-exclusion point: a unique
//! index on (campaign_id, recipient_key) plus a conditional status flip
//! guarantee at most one concurrent `processing` attempt per recipient.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::db::AsyncDbPool;
use crate::engine::types::{AttemptStore, ClaimOutcome, Recipient};
use crate::error::{AppError, AppResult};
use crate::models::{AttemptStatus, CampaignAttempt, NewCampaignAttempt};
use crate::schema::campaign_attempts;

/// Live queue counts surfaced on the campaign detail endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, utoipa::ToSchema)]
pub struct AttemptQueueStats {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

#[derive(Clone)]
pub struct AttemptRepository {
    pool: AsyncDbPool,
}

impl AttemptRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
    > {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }

    /// Recipient keys with any attempt recorded for this campaign. The
    /// resolver skips these when scanning the contact source.
    pub async fn attempted_keys(&self, campaign_id: i32) -> AppResult<Vec<String>> {
        let mut conn = self.conn().await?;

        campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .select(campaign_attempts::recipient_key)
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Oldest reclaimed attempt waiting to be retried, if any.
    pub async fn next_queued(&self, campaign_id: i32) -> AppResult<Option<CampaignAttempt>> {
        let mut conn = self.conn().await?;

        campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .filter(campaign_attempts::status.eq(AttemptStatus::Queued))
            .order(campaign_attempts::id.asc())
            .select(CampaignAttempt::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    pub async fn list_by_campaign(
        &self,
        campaign_id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<CampaignAttempt>> {
        let mut conn = self.conn().await?;

        campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .order(campaign_attempts::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(CampaignAttempt::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn count_by_campaign(&self, campaign_id: i32) -> AppResult<i64> {
        let mut conn = self.conn().await?;

        campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn queue_stats(&self, campaign_id: i32) -> AppResult<AttemptQueueStats> {
        let mut conn = self.conn().await?;

        let rows: Vec<(AttemptStatus, i64)> = campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .group_by(campaign_attempts::status)
            .select((campaign_attempts::status, diesel::dsl::count_star()))
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let mut stats = AttemptQueueStats::default();
        for (status, count) in rows {
            match status {
                AttemptStatus::Queued => stats.queued = count,
                AttemptStatus::Processing => stats.processing = count,
                AttemptStatus::Completed => stats.completed = count,
                AttemptStatus::Failed => stats.failed = count,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl AttemptStore for AttemptRepository {
    async fn claim(&self, campaign_id: i32, recipient: &Recipient) -> AppResult<ClaimOutcome> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();

        // Fresh recipient: insert the row already claimed. The unique index
        // makes the insert lose cleanly when any attempt exists.
        let new_attempt = NewCampaignAttempt {
            campaign_id,
            contact_id: recipient.contact_id,
            recipient_key: recipient.key.clone(),
            recipient_name: recipient.name.clone(),
            recipient_phone: recipient.phone.clone(),
            recipient_email: recipient.email.clone(),
            status: AttemptStatus::Processing,
            claimed_at: Some(now),
        };

        let inserted: Option<i64> = diesel::insert_into(campaign_attempts::table)
            .values(&new_attempt)
            .on_conflict((
                campaign_attempts::campaign_id,
                campaign_attempts::recipient_key,
            ))
            .do_nothing()
            .returning(campaign_attempts::id)
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)?;

        if let Some(id) = inserted {
            return Ok(ClaimOutcome::Claimed(id));
        }

        // Existing row: only a reclaimed `queued` attempt may be flipped to
        // processing, and only by one caller.
        let reclaimed: Option<i64> = diesel::update(
            campaign_attempts::table
                .filter(campaign_attempts::campaign_id.eq(campaign_id))
                .filter(campaign_attempts::recipient_key.eq(&recipient.key))
                .filter(campaign_attempts::status.eq(AttemptStatus::Queued)),
        )
        .set((
            campaign_attempts::status.eq(AttemptStatus::Processing),
            campaign_attempts::claimed_at.eq(Some(now)),
        ))
        .returning(campaign_attempts::id)
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)?;

        match reclaimed {
            Some(id) => Ok(ClaimOutcome::Claimed(id)),
            None => Ok(ClaimOutcome::AlreadyTaken),
        }
    }

    async fn complete(&self, attempt_id: i64, provider_ref: Option<&str>) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();

        diesel::update(campaign_attempts::table.find(attempt_id))
            .set((
                campaign_attempts::status.eq(AttemptStatus::Completed),
                campaign_attempts::provider_ref.eq(provider_ref.map(|s| s.to_string())),
                campaign_attempts::completed_at.eq(Some(now)),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn fail(&self, attempt_id: i64, error: &str) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();

        diesel::update(campaign_attempts::table.find(attempt_id))
            .set((
                campaign_attempts::status.eq(AttemptStatus::Failed),
                campaign_attempts::error_message.eq(Some(error.to_string())),
                campaign_attempts::completed_at.eq(Some(now)),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn has_processing(&self, campaign_id: i32) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        let count: i64 = campaign_attempts::table
            .filter(campaign_attempts::campaign_id.eq(campaign_id))
            .filter(campaign_attempts::status.eq(AttemptStatus::Processing))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(count > 0)
    }

    async fn release(&self, attempt_id: i64) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::update(campaign_attempts::table.find(attempt_id))
            .set((
                campaign_attempts::status.eq(AttemptStatus::Queued),
                campaign_attempts::claimed_at.eq(None::<chrono::NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn release_stuck(&self, older_than_seconds: i64) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        let cutoff = Utc::now().naive_utc() - Duration::seconds(older_than_seconds);

        diesel::update(
            campaign_attempts::table
                .filter(campaign_attempts::status.eq(AttemptStatus::Processing))
                .filter(campaign_attempts::claimed_at.lt(cutoff)),
        )
        .set((
            campaign_attempts::status.eq(AttemptStatus::Queued),
            campaign_attempts::claimed_at.eq(None::<chrono::NaiveDateTime>),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }
}
