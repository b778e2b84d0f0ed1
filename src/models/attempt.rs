use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

use crate::schema::campaign_attempts;

/// Per-recipient delivery state within one campaign run.
///
/// `Processing` marks an exclusive claim; the unique index on
/// (campaign_id, recipient_key) guarantees at most one attempt row per
/// recipient and the conditional claim update guarantees at most one
/// concurrent `Processing` transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::AttemptStatus")]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::Queued => write!(f, "queued"),
            AttemptStatus::Processing => write!(f, "processing"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = campaign_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CampaignAttempt {
    pub id: i64,
    pub campaign_id: i32,
    pub contact_id: Option<i32>,
    pub recipient_key: String,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub status: AttemptStatus,
    pub provider_ref: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = campaign_attempts)]
pub struct NewCampaignAttempt {
    pub campaign_id: i32,
    pub contact_id: Option<i32>,
    pub recipient_key: String,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub status: AttemptStatus,
    pub claimed_at: Option<NaiveDateTime>,
}
