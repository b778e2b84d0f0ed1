//! Channel credential repository: assistants, phone numbers and SMTP
//! integrations. Missing or inactive rows surface as configuration errors
//! at the call sites.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Assistant, EmailIntegration, PhoneNumber};
use crate::schema::{assistants, email_integrations, phone_numbers};

#[derive(Clone)]
pub struct IntegrationRepository {
    pool: AsyncDbPool,
}

impl IntegrationRepository {
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

    /// Assistant scoped to its owner; used to validate campaign creation.
    pub async fn assistant_for_user(
        &self,
        assistant_id: i32,
        user_id: i32,
    ) -> AppResult<Option<Assistant>> {
        let mut conn = self.conn().await?;

        assistants::table
            .filter(assistants::id.eq(assistant_id))
            .filter(assistants::user_id.eq(user_id))
            .select(Assistant::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    /// The active outbound number linked to an assistant. Voice and SMS
    /// campaigns cannot send without one.
    pub async fn active_number_for_assistant(
        &self,
        assistant_id: i32,
    ) -> AppResult<Option<PhoneNumber>> {
        let mut conn = self.conn().await?;

        phone_numbers::table
            .filter(phone_numbers::assistant_id.eq(assistant_id))
            .filter(phone_numbers::active.eq(true))
            .order(phone_numbers::id.asc())
            .select(PhoneNumber::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    /// An active SMTP integration by id.
    pub async fn active_email_integration(
        &self,
        integration_id: i32,
    ) -> AppResult<Option<EmailIntegration>> {
        let mut conn = self.conn().await?;

        email_integrations::table
            .filter(email_integrations::id.eq(integration_id))
            .filter(email_integrations::is_active.eq(true))
            .select(EmailIntegration::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }
}
