//! Campaign repository for async database operations.
//!
//! Also implements the engine's `CampaignStore` seam; every counter update
//! is an atomic SQL increment scoped to one campaign id.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::engine::types::{CampaignStore, Engagement};
use crate::error::{AppError, AppResult};
use crate::models::{
    Campaign, CampaignStatus, ExecutionStatus, NewCampaign, UpdateCampaignConfig,
};
use crate::schema::campaigns;

#[derive(Clone)]
pub struct CampaignRepository {
    pool: AsyncDbPool,
}

impl CampaignRepository {
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

    pub async fn create(&self, campaign: NewCampaign) -> AppResult<Campaign> {
        let mut conn = self.conn().await?;

        diesel::insert_into(campaigns::table)
            .values(&campaign)
            .returning(Campaign::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Campaign>> {
        let mut conn = self.conn().await?;

        campaigns::table
            .filter(campaigns::user_id.eq(user_id))
            .order(campaigns::created_at.desc())
            .select(Campaign::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Finds a campaign scoped to its owner. `None` covers both a missing
    /// row and a row owned by someone else, which the API maps to 404.
    pub async fn find_for_user(&self, id: i32, user_id: i32) -> AppResult<Option<Campaign>> {
        let mut conn = self.conn().await?;

        campaigns::table
            .filter(campaigns::id.eq(id))
            .filter(campaigns::user_id.eq(user_id))
            .select(Campaign::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    pub async fn update_config(
        &self,
        id: i32,
        update: UpdateCampaignConfig,
    ) -> AppResult<Campaign> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(id))
            .set(&update)
            .returning(Campaign::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "Campaign".to_string(),
                    field: "id".to_string(),
                    value: id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    /// Deletes an owned campaign. Attempts cascade via the foreign key.
    pub async fn delete_for_user(&self, id: i32, user_id: i32) -> AppResult<usize> {
        let mut conn = self.conn().await?;

        diesel::delete(
            campaigns::table
                .filter(campaigns::id.eq(id))
                .filter(campaigns::user_id.eq(user_id)),
        )
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    /// Applies a user lifecycle transition (start/pause/resume) to both
    /// status fields and resets the dispatch due time.
    pub async fn set_lifecycle(
        &self,
        id: i32,
        status: CampaignStatus,
        execution_status: ExecutionStatus,
        next_dispatch_at: Option<NaiveDateTime>,
    ) -> AppResult<Campaign> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(id))
            .set((
                campaigns::status.eq(status),
                campaigns::execution_status.eq(execution_status),
                campaigns::next_dispatch_at.eq(next_dispatch_at),
                campaigns::last_error.eq(None::<String>),
            ))
            .returning(Campaign::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}

#[async_trait]
impl CampaignStore for CampaignRepository {
    async fn list_due_running(&self, now: NaiveDateTime) -> AppResult<Vec<Campaign>> {
        let mut conn = self.conn().await?;

        campaigns::table
            .filter(campaigns::execution_status.eq(ExecutionStatus::Running))
            .filter(
                campaigns::next_dispatch_at
                    .is_null()
                    .or(campaigns::next_dispatch_at.le(now)),
            )
            .order(campaigns::next_dispatch_at.asc())
            .select(Campaign::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn get(&self, campaign_id: i32) -> AppResult<Option<Campaign>> {
        let mut conn = self.conn().await?;

        campaigns::table
            .find(campaign_id)
            .select(Campaign::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn execution_status(&self, campaign_id: i32) -> AppResult<Option<ExecutionStatus>> {
        let mut conn = self.conn().await?;

        campaigns::table
            .find(campaign_id)
            .select(campaigns::execution_status)
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn reset_daily_counter(
        &self,
        campaign_id: i32,
        local_date: NaiveDate,
    ) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(campaign_id))
            .set((
                campaigns::current_daily_calls.eq(0),
                campaigns::daily_calls_date.eq(Some(local_date)),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn record_delivery(
        &self,
        campaign_id: i32,
        engagement: Option<Engagement>,
    ) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();
        let target = campaigns::table.find(campaign_id);

        match engagement {
            None => {
                diesel::update(target)
                    .set((
                        campaigns::dials.eq(campaigns::dials + 1),
                        campaigns::current_daily_calls.eq(campaigns::current_daily_calls + 1),
                        campaigns::last_dispatch_at.eq(Some(now)),
                    ))
                    .execute(&mut conn)
                    .await
            }
            Some(Engagement::Pickup) => {
                diesel::update(target)
                    .set((
                        campaigns::dials.eq(campaigns::dials + 1),
                        campaigns::current_daily_calls.eq(campaigns::current_daily_calls + 1),
                        campaigns::pickups.eq(campaigns::pickups + 1),
                        campaigns::last_dispatch_at.eq(Some(now)),
                    ))
                    .execute(&mut conn)
                    .await
            }
            Some(Engagement::Interested) => {
                diesel::update(target)
                    .set((
                        campaigns::dials.eq(campaigns::dials + 1),
                        campaigns::current_daily_calls.eq(campaigns::current_daily_calls + 1),
                        campaigns::interested.eq(campaigns::interested + 1),
                        campaigns::last_dispatch_at.eq(Some(now)),
                    ))
                    .execute(&mut conn)
                    .await
            }
        }
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn record_failure(&self, campaign_id: i32, consumed_cap: bool) -> AppResult<()> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();
        let target = campaigns::table.find(campaign_id);

        if consumed_cap {
            diesel::update(target)
                .set((
                    campaigns::failed.eq(campaigns::failed + 1),
                    campaigns::current_daily_calls.eq(campaigns::current_daily_calls + 1),
                    campaigns::last_dispatch_at.eq(Some(now)),
                ))
                .execute(&mut conn)
                .await
        } else {
            diesel::update(target)
                .set((
                    campaigns::failed.eq(campaigns::failed + 1),
                    campaigns::last_dispatch_at.eq(Some(now)),
                ))
                .execute(&mut conn)
                .await
        }
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_next_dispatch_at(
        &self,
        campaign_id: i32,
        at: Option<NaiveDateTime>,
    ) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(campaign_id))
            .set(campaigns::next_dispatch_at.eq(at))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_completed(&self, campaign_id: i32) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(campaign_id))
            .set((
                campaigns::execution_status.eq(ExecutionStatus::Completed),
                campaigns::status.eq(CampaignStatus::Completed),
                campaigns::next_dispatch_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn mark_error(&self, campaign_id: i32, summary: &str) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::update(campaigns::table.find(campaign_id))
            .set((
                campaigns::execution_status.eq(ExecutionStatus::Error),
                campaigns::last_error.eq(Some(summary.to_string())),
                campaigns::next_dispatch_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
