//! Contact source repository.
//!
//! Read-only access to contact lists and imported CSV rows for the
//! recipient resolver. Eligibility filters (active, not do-not-call,
//! address present) are applied in SQL; ordering is creation order so the
//! resolver is deterministic and resumable.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Contact, ContactStatus, CsvContact};
use crate::schema::{contacts, csv_contacts};

#[derive(Clone)]
pub struct ContactRepository {
    pool: AsyncDbPool,
}

impl ContactRepository {
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

    /// Next batch of eligible list contacts with id greater than `after_id`.
    pub async fn eligible_list_batch(
        &self,
        list_id: i32,
        after_id: i32,
        limit: i64,
    ) -> AppResult<Vec<Contact>> {
        let mut conn = self.conn().await?;

        contacts::table
            .filter(contacts::list_id.eq(list_id))
            .filter(contacts::status.eq(ContactStatus::Active))
            .filter(contacts::do_not_call.eq(false))
            .filter(contacts::id.gt(after_id))
            .order(contacts::id.asc())
            .limit(limit)
            .select(Contact::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Next batch of imported CSV rows with id greater than `after_id`.
    pub async fn csv_batch(
        &self,
        csv_file_id: i32,
        after_id: i32,
        limit: i64,
    ) -> AppResult<Vec<CsvContact>> {
        let mut conn = self.conn().await?;

        csv_contacts::table
            .filter(csv_contacts::csv_file_id.eq(csv_file_id))
            .filter(csv_contacts::id.gt(after_id))
            .order(csv_contacts::id.asc())
            .limit(limit)
            .select(CsvContact::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Count of eligible list contacts carrying a phone number.
    pub async fn count_eligible_list_phone(&self, list_id: i32) -> AppResult<i64> {
        let mut conn = self.conn().await?;

        contacts::table
            .filter(contacts::list_id.eq(list_id))
            .filter(contacts::status.eq(ContactStatus::Active))
            .filter(contacts::do_not_call.eq(false))
            .filter(contacts::phone.ne(""))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Count of eligible list contacts carrying an email address.
    pub async fn count_eligible_list_email(&self, list_id: i32) -> AppResult<i64> {
        let mut conn = self.conn().await?;

        contacts::table
            .filter(contacts::list_id.eq(list_id))
            .filter(contacts::status.eq(ContactStatus::Active))
            .filter(contacts::do_not_call.eq(false))
            .filter(contacts::email.ne(""))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Count of imported CSV rows carrying a phone number.
    pub async fn count_csv_phone(&self, csv_file_id: i32) -> AppResult<i64> {
        let mut conn = self.conn().await?;

        csv_contacts::table
            .filter(csv_contacts::csv_file_id.eq(csv_file_id))
            .filter(csv_contacts::phone.ne(""))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    /// Count of imported CSV rows carrying an email address.
    pub async fn count_csv_email(&self, csv_file_id: i32) -> AppResult<i64> {
        let mut conn = self.conn().await?;

        csv_contacts::table
            .filter(csv_contacts::csv_file_id.eq(csv_file_id))
            .filter(csv_contacts::email.ne(""))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }
}
