use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

use crate::schema::campaigns;

// ============================================================================
// Enums
// ============================================================================

/// Outbound channel a campaign sends through
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::CampaignChannel")]
#[serde(rename_all = "lowercase")]
pub enum CampaignChannel {
    Voice,
    Sms,
    Email,
}

impl std::fmt::Display for CampaignChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignChannel::Voice => write!(f, "voice"),
            CampaignChannel::Sms => write!(f, "sms"),
            CampaignChannel::Email => write!(f, "email"),
        }
    }
}

/// Where a campaign's recipients come from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::ContactSource")]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    ContactList,
    CsvFile,
}

/// User-facing campaign status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::CampaignStatus")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

/// Engine-facing execution status.
///
/// Kept separate from `CampaignStatus`: a campaign the user marked active
/// can still be throttled to idle by the engine between calling windows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::ExecutionStatus")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Idle => write!(f, "idle"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Paused => write!(f, "paused"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// Campaign Models
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = campaigns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Campaign {
    pub id: i32,
    pub user_id: i32,
    pub assistant_id: i32,
    pub name: String,
    pub channel: CampaignChannel,
    pub contact_source: ContactSource,
    pub contact_list_id: Option<i32>,
    pub csv_file_id: Option<i32>,
    pub email_integration_id: Option<i32>,
    pub prompt: Option<String>,
    pub sms_body: Option<String>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,
    pub daily_cap: i32,
    pub start_hour: i32,
    pub end_hour: i32,
    pub calling_days: Vec<String>,
    pub timezone: String,
    pub status: CampaignStatus,
    pub execution_status: ExecutionStatus,
    pub dials: i32,
    pub pickups: i32,
    pub interested: i32,
    pub failed: i32,
    pub current_daily_calls: i32,
    pub daily_calls_date: Option<NaiveDate>,
    pub last_error: Option<String>,
    pub last_dispatch_at: Option<NaiveDateTime>,
    pub next_dispatch_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Campaign {
    /// The contact source row id matching `contact_source`.
    pub fn source_id(&self) -> Option<i32> {
        match self.contact_source {
            ContactSource::ContactList => self.contact_list_id,
            ContactSource::CsvFile => self.csv_file_id,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = campaigns)]
pub struct NewCampaign {
    pub user_id: i32,
    pub assistant_id: i32,
    pub name: String,
    pub channel: CampaignChannel,
    pub contact_source: ContactSource,
    pub contact_list_id: Option<i32>,
    pub csv_file_id: Option<i32>,
    pub email_integration_id: Option<i32>,
    pub prompt: Option<String>,
    pub sms_body: Option<String>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,
    pub daily_cap: i32,
    pub start_hour: i32,
    pub end_hour: i32,
    pub calling_days: Vec<String>,
    pub timezone: String,
    pub status: CampaignStatus,
    pub execution_status: ExecutionStatus,
}

/// Configuration update applied only while a campaign is not running.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = campaigns)]
pub struct UpdateCampaignConfig {
    pub name: Option<String>,
    pub prompt: Option<String>,
    pub sms_body: Option<String>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub daily_cap: Option<i32>,
    pub start_hour: Option<i32>,
    pub end_hour: Option<i32>,
    pub calling_days: Option<Vec<String>>,
    pub timezone: Option<String>,
}

/// Fixture used across engine and service tests.
#[cfg(test)]
pub fn test_campaign() -> Campaign {
    Campaign {
        id: 1,
        user_id: 1,
        assistant_id: 1,
        name: "Test".to_string(),
        channel: CampaignChannel::Voice,
        contact_source: ContactSource::ContactList,
        contact_list_id: Some(1),
        csv_file_id: None,
        email_integration_id: None,
        prompt: None,
        sms_body: None,
        email_subject: None,
        email_body: None,
        attachment_path: None,
        attachment_name: None,
        daily_cap: 100,
        start_hour: 9,
        end_hour: 17,
        calling_days: vec![
            "monday".into(),
            "tuesday".into(),
            "wednesday".into(),
            "thursday".into(),
            "friday".into(),
        ],
        timezone: "UTC".to_string(),
        status: CampaignStatus::Active,
        execution_status: ExecutionStatus::Running,
        dials: 0,
        pickups: 0,
        interested: 0,
        failed: 0,
        current_daily_calls: 0,
        daily_calls_date: None,
        last_error: None,
        last_dispatch_at: None,
        next_dispatch_at: None,
        created_at: chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
        updated_at: chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_follows_contact_source() {
        let mut campaign = test_campaign();
        campaign.contact_source = ContactSource::ContactList;
        campaign.contact_list_id = Some(7);
        campaign.csv_file_id = Some(9);
        assert_eq!(campaign.source_id(), Some(7));

        campaign.contact_source = ContactSource::CsvFile;
        assert_eq!(campaign.source_id(), Some(9));
    }

    #[test]
    fn enums_serialize_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&ContactSource::ContactList).unwrap(),
            "\"contact_list\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(serde_json::to_string(&CampaignChannel::Sms).unwrap(), "\"sms\"");
    }
}
