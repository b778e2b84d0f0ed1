use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{assistants, email_integrations, phone_numbers};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = assistants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Assistant {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Outbound caller id / SMS from-number linked to an assistant.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = phone_numbers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PhoneNumber {
    pub id: i32,
    pub user_id: i32,
    pub assistant_id: Option<i32>,
    pub number: String,
    pub trunk_id: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// SMTP account used by email campaigns. Credentials live here; transport
/// defaults come from `providers.smtp` settings.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = email_integrations)]
pub struct EmailIntegration {
    pub id: i32,
    pub user_id: i32,
    pub from_email: String,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub smtp_username: String,
    pub smtp_password: String,
    pub use_starttls: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
