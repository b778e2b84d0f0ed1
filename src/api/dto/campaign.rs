//! Campaign-related DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{
    Campaign, CampaignAttempt, CampaignChannel, CampaignStatus, ContactSource, ExecutionStatus,
    NewCampaign,
};
use crate::models::{AttemptStatus, UpdateCampaignConfig};
use crate::repositories::AttemptQueueStats;
use crate::services::CampaignDetail;

fn default_daily_cap() -> i32 {
    100
}

fn default_start_hour() -> i32 {
    9
}

fn default_end_hour() -> i32 {
    17
}

fn default_calling_days() -> Vec<String> {
    vec![
        "monday".to_string(),
        "tuesday".to_string(),
        "wednesday".to_string(),
        "thursday".to_string(),
        "friday".to_string(),
    ]
}

fn default_timezone() -> String {
    "UTC".to_string()
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request body for creating a campaign (always created as a draft).
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[schema(example = json!({
    "name": "June outreach",
    "assistant_id": 12,
    "channel": "voice",
    "contact_source": "contact_list",
    "contact_list_id": 7,
    "daily_cap": 100,
    "start_hour": 9,
    "end_hour": 17,
    "calling_days": ["monday", "tuesday", "wednesday", "thursday", "friday"],
    "timezone": "America/New_York",
    "prompt": "You are calling on behalf of Acme."
}))]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    #[schema(example = "June outreach")]
    pub name: String,

    #[schema(example = 12)]
    pub assistant_id: i32,

    pub channel: CampaignChannel,

    pub contact_source: ContactSource,

    pub contact_list_id: Option<i32>,
    pub csv_file_id: Option<i32>,
    pub email_integration_id: Option<i32>,

    /// Voice: call script override handed to the agent
    pub prompt: Option<String>,
    /// SMS: message body
    pub sms_body: Option<String>,
    /// Email: subject line
    #[validate(length(max = 255, message = "Subject must be at most 255 characters"))]
    pub email_subject: Option<String>,
    /// Email: message body
    pub email_body: Option<String>,

    #[serde(default = "default_daily_cap")]
    #[validate(range(min = 0, max = 10_000, message = "Daily cap must be between 0 and 10000"))]
    #[schema(example = 100)]
    pub daily_cap: i32,

    #[serde(default = "default_start_hour")]
    #[validate(range(min = 0, max = 23, message = "Start hour must be between 0 and 23"))]
    pub start_hour: i32,

    #[serde(default = "default_end_hour")]
    #[validate(range(min = 0, max = 23, message = "End hour must be between 0 and 23"))]
    pub end_hour: i32,

    #[serde(default = "default_calling_days")]
    #[validate(length(min = 1, message = "At least one calling day is required"))]
    pub calling_days: Vec<String>,

    #[serde(default = "default_timezone")]
    #[schema(example = "America/New_York")]
    pub timezone: String,
}

impl CreateCampaignRequest {
    /// Builds the insert model. `user_id`, `status` and `execution_status`
    /// are set by the service.
    pub fn into_new_campaign(self) -> NewCampaign {
        let contact_list_id = match self.contact_source {
            ContactSource::ContactList => self.contact_list_id,
            ContactSource::CsvFile => None,
        };
        let csv_file_id = match self.contact_source {
            ContactSource::CsvFile => self.csv_file_id,
            ContactSource::ContactList => None,
        };

        NewCampaign {
            user_id: 0,
            assistant_id: self.assistant_id,
            name: self.name,
            channel: self.channel,
            contact_source: self.contact_source,
            contact_list_id,
            csv_file_id,
            email_integration_id: self.email_integration_id,
            prompt: self.prompt,
            sms_body: self.sms_body,
            email_subject: self.email_subject,
            email_body: self.email_body,
            attachment_path: None,
            attachment_name: None,
            daily_cap: self.daily_cap,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            calling_days: self.calling_days,
            timezone: self.timezone,
            status: CampaignStatus::Draft,
            execution_status: ExecutionStatus::Idle,
        }
    }
}

/// Request body for editing a campaign while it is not running.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateCampaignRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    pub prompt: Option<String>,
    pub sms_body: Option<String>,
    #[validate(length(max = 255))]
    pub email_subject: Option<String>,
    pub email_body: Option<String>,

    #[validate(range(min = 0, max = 10_000))]
    pub daily_cap: Option<i32>,
    #[validate(range(min = 0, max = 23))]
    pub start_hour: Option<i32>,
    #[validate(range(min = 0, max = 23))]
    pub end_hour: Option<i32>,
    #[validate(length(min = 1))]
    pub calling_days: Option<Vec<String>>,
    pub timezone: Option<String>,
}

impl UpdateCampaignRequest {
    pub fn into_update(self) -> UpdateCampaignConfig {
        UpdateCampaignConfig {
            name: self.name,
            prompt: self.prompt,
            sms_body: self.sms_body,
            email_subject: self.email_subject,
            email_body: self.email_body,
            daily_cap: self.daily_cap,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            calling_days: self.calling_days,
            timezone: self.timezone,
        }
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response body for campaign data.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignResponse {
    pub id: i32,
    pub name: String,
    pub assistant_id: i32,
    pub channel: CampaignChannel,
    pub contact_source: ContactSource,
    pub contact_list_id: Option<i32>,
    pub csv_file_id: Option<i32>,
    pub email_integration_id: Option<i32>,
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
    pub last_error: Option<String>,
    pub last_dispatch_at: Option<String>,
    pub next_dispatch_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn fmt_ts(ts: chrono::NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            assistant_id: campaign.assistant_id,
            channel: campaign.channel,
            contact_source: campaign.contact_source,
            contact_list_id: campaign.contact_list_id,
            csv_file_id: campaign.csv_file_id,
            email_integration_id: campaign.email_integration_id,
            daily_cap: campaign.daily_cap,
            start_hour: campaign.start_hour,
            end_hour: campaign.end_hour,
            calling_days: campaign.calling_days,
            timezone: campaign.timezone,
            status: campaign.status,
            execution_status: campaign.execution_status,
            dials: campaign.dials,
            pickups: campaign.pickups,
            interested: campaign.interested,
            failed: campaign.failed,
            current_daily_calls: campaign.current_daily_calls,
            last_error: campaign.last_error,
            last_dispatch_at: campaign.last_dispatch_at.map(fmt_ts),
            next_dispatch_at: campaign.next_dispatch_at.map(fmt_ts),
            created_at: fmt_ts(campaign.created_at),
            updated_at: fmt_ts(campaign.updated_at),
        }
    }
}

/// Campaign with live queue statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignDetailResponse {
    #[serde(flatten)]
    pub campaign: CampaignResponse,
    pub queue_stats: AttemptQueueStats,
    /// Eligible recipients in the contact source (before de-duplication)
    pub eligible_total: i64,
}

impl From<CampaignDetail> for CampaignDetailResponse {
    fn from(detail: CampaignDetail) -> Self {
        Self {
            campaign: CampaignResponse::from(detail.campaign),
            queue_stats: detail.queue_stats,
            eligible_total: detail.eligible_total,
        }
    }
}

/// Response body for one recipient attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttemptResponse {
    pub id: i64,
    pub contact_id: Option<i32>,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub status: AttemptStatus,
    pub provider_ref: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

impl From<CampaignAttempt> for AttemptResponse {
    fn from(attempt: CampaignAttempt) -> Self {
        Self {
            id: attempt.id,
            contact_id: attempt.contact_id,
            recipient_name: attempt.recipient_name,
            recipient_phone: attempt.recipient_phone,
            recipient_email: attempt.recipient_email,
            status: attempt.status,
            provider_ref: attempt.provider_ref,
            error_message: attempt.error_message,
            claimed_at: attempt.claimed_at.map(fmt_ts),
            completed_at: attempt.completed_at.map(fmt_ts),
            created_at: fmt_ts(attempt.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_campaign;

    #[test]
    fn create_request_clears_mismatched_source_id() {
        let request = CreateCampaignRequest {
            name: "t".to_string(),
            assistant_id: 1,
            channel: CampaignChannel::Voice,
            contact_source: ContactSource::ContactList,
            contact_list_id: Some(7),
            csv_file_id: Some(9),
            email_integration_id: None,
            prompt: None,
            sms_body: None,
            email_subject: None,
            email_body: None,
            daily_cap: 100,
            start_hour: 9,
            end_hour: 17,
            calling_days: default_calling_days(),
            timezone: "UTC".to_string(),
        };

        let new_campaign = request.into_new_campaign();
        assert_eq!(new_campaign.contact_list_id, Some(7));
        assert_eq!(new_campaign.csv_file_id, None);
        assert_eq!(new_campaign.status, CampaignStatus::Draft);
        assert_eq!(new_campaign.execution_status, ExecutionStatus::Idle);
    }

    #[test]
    fn campaign_response_formats_timestamps() {
        let response = CampaignResponse::from(test_campaign());
        assert_eq!(response.created_at, "1970-01-01T00:00:00.000Z");
        assert_eq!(response.next_dispatch_at, None);
    }
}
