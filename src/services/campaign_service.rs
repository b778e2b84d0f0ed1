//! Campaign service: lifecycle transitions, ownership scoping and
//! start-time preflight checks.
//!
//! The service mutates durable state only; the engine's pause signal and
//! eager pass are wired in by the API layer so the service stays testable
//! against a bare database.

use crate::engine::gate::DialWindow;
use crate::engine::types::RecipientSource;
use crate::engine::PgRecipientResolver;
use crate::error::{AppError, AppResult};
use crate::models::{
    Campaign, CampaignAttempt, CampaignChannel, CampaignStatus, ContactSource, ExecutionStatus,
    NewCampaign, UpdateCampaignConfig,
};
use crate::repositories::{AttemptQueueStats, Repositories};

/// Campaign plus its live queue statistics.
#[derive(Debug)]
pub struct CampaignDetail {
    pub campaign: Campaign,
    pub queue_stats: AttemptQueueStats,
    pub eligible_total: i64,
}

#[derive(Clone)]
pub struct CampaignService {
    repos: Repositories,
    resolver: PgRecipientResolver,
}

impl CampaignService {
    pub fn new(repos: Repositories) -> Self {
        let resolver = PgRecipientResolver::new(repos.contacts.clone(), repos.attempts.clone());
        Self { repos, resolver }
    }

    pub async fn create(&self, user_id: i32, mut new_campaign: NewCampaign) -> AppResult<Campaign> {
        new_campaign.user_id = user_id;
        new_campaign.status = CampaignStatus::Draft;
        new_campaign.execution_status = ExecutionStatus::Idle;

        self.repos
            .integrations
            .assistant_for_user(new_campaign.assistant_id, user_id)
            .await?
            .ok_or_else(|| AppError::Validation {
                field: "assistant_id".to_string(),
                reason: "Assistant not found".to_string(),
            })?;

        match new_campaign.contact_source {
            ContactSource::ContactList if new_campaign.contact_list_id.is_none() => {
                return Err(AppError::Validation {
                    field: "contact_list_id".to_string(),
                    reason: "Contact list id is required for list campaigns".to_string(),
                });
            }
            ContactSource::CsvFile if new_campaign.csv_file_id.is_none() => {
                return Err(AppError::Validation {
                    field: "csv_file_id".to_string(),
                    reason: "CSV file id is required for file campaigns".to_string(),
                });
            }
            _ => {}
        }

        match new_campaign.channel {
            CampaignChannel::Sms if new_campaign.sms_body.is_none() => {
                return Err(AppError::Validation {
                    field: "sms_body".to_string(),
                    reason: "SMS campaigns require a message body".to_string(),
                });
            }
            CampaignChannel::Email
                if new_campaign.email_subject.is_none()
                    || new_campaign.email_body.is_none()
                    || new_campaign.email_integration_id.is_none() =>
            {
                return Err(AppError::Validation {
                    field: "email".to_string(),
                    reason: "Email campaigns require a subject, a body and an email integration"
                        .to_string(),
                });
            }
            _ => {}
        }

        self.repos.campaigns.create(new_campaign).await
    }

    pub async fn list(&self, user_id: i32) -> AppResult<Vec<Campaign>> {
        self.repos.campaigns.list_for_user(user_id).await
    }

    pub async fn get(&self, user_id: i32, id: i32) -> AppResult<Campaign> {
        self.repos
            .campaigns
            .find_for_user(id, user_id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn get_detail(&self, user_id: i32, id: i32) -> AppResult<CampaignDetail> {
        let campaign = self.get(user_id, id).await?;
        let queue_stats = self.repos.attempts.queue_stats(id).await?;
        let eligible_total = self.resolver.count_eligible(&campaign).await.unwrap_or(0);
        Ok(CampaignDetail {
            campaign,
            queue_stats,
            eligible_total,
        })
    }

    /// Configuration edits are only allowed while the engine is not
    /// actively dispatching the campaign.
    pub async fn update(
        &self,
        user_id: i32,
        id: i32,
        update: UpdateCampaignConfig,
    ) -> AppResult<Campaign> {
        let campaign = self.get(user_id, id).await?;
        if campaign.execution_status == ExecutionStatus::Running {
            return Err(AppError::BadRequest {
                message: "Pause the campaign before editing its configuration".to_string(),
            });
        }
        self.repos.campaigns.update_config(id, update).await
    }

    pub async fn delete(&self, user_id: i32, id: i32) -> AppResult<()> {
        let deleted = self.repos.campaigns.delete_for_user(id, user_id).await?;
        if deleted == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    /// Validates and starts a campaign. Preflight failures are 400s, not
    /// engine-side error states: the user gets immediate feedback before
    /// anything runs.
    pub async fn start(&self, user_id: i32, id: i32) -> AppResult<Campaign> {
        let campaign = self.get(user_id, id).await?;
        if campaign.execution_status == ExecutionStatus::Running {
            return Err(AppError::BadRequest {
                message: "Campaign is already running".to_string(),
            });
        }

        self.preflight(&campaign).await?;

        self.repos
            .campaigns
            .set_lifecycle(
                id,
                CampaignStatus::Active,
                ExecutionStatus::Running,
                Some(chrono::Utc::now().naive_utc()),
            )
            .await
    }

    pub async fn pause(&self, user_id: i32, id: i32) -> AppResult<Campaign> {
        let campaign = self.get(user_id, id).await?;
        match campaign.execution_status {
            // Pausing twice is a no-op, not an error.
            ExecutionStatus::Running | ExecutionStatus::Paused => self
                .repos
                .campaigns
                .set_lifecycle(id, CampaignStatus::Paused, ExecutionStatus::Paused, None)
                .await,
            other => Err(AppError::BadRequest {
                message: format!("Cannot pause a campaign in the {} state", other),
            }),
        }
    }

    pub async fn resume(&self, user_id: i32, id: i32) -> AppResult<Campaign> {
        let campaign = self.get(user_id, id).await?;
        match campaign.execution_status {
            ExecutionStatus::Paused | ExecutionStatus::Error | ExecutionStatus::Running => {
                self.preflight(&campaign).await?;
                self.repos
                    .campaigns
                    .set_lifecycle(
                        id,
                        CampaignStatus::Active,
                        ExecutionStatus::Running,
                        Some(chrono::Utc::now().naive_utc()),
                    )
                    .await
            }
            other => Err(AppError::BadRequest {
                message: format!("Cannot resume a campaign in the {} state", other),
            }),
        }
    }

    pub async fn attempts(
        &self,
        user_id: i32,
        id: i32,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<CampaignAttempt>, i64)> {
        self.get(user_id, id).await?;
        let attempts = self.repos.attempts.list_by_campaign(id, limit, offset).await?;
        let total = self.repos.attempts.count_by_campaign(id).await?;
        Ok((attempts, total))
    }

    /// Start-time checks: schedule parses, channel credentials exist, the
    /// contact source yields at least one usable recipient.
    async fn preflight(&self, campaign: &Campaign) -> AppResult<()> {
        DialWindow::from_campaign(campaign).map_err(|e| AppError::BadRequest {
            message: format!("Invalid campaign schedule: {}", e),
        })?;

        match campaign.channel {
            CampaignChannel::Voice | CampaignChannel::Sms => {
                self.repos
                    .integrations
                    .active_number_for_assistant(campaign.assistant_id)
                    .await?
                    .ok_or_else(|| AppError::BadRequest {
                        message: "No phone number configured for this assistant".to_string(),
                    })?;
            }
            CampaignChannel::Email => {
                let integration_id =
                    campaign
                        .email_integration_id
                        .ok_or_else(|| AppError::BadRequest {
                            message: "No email integration selected".to_string(),
                        })?;
                self.repos
                    .integrations
                    .active_email_integration(integration_id)
                    .await?
                    .ok_or_else(|| AppError::BadRequest {
                        message: "Selected email account is not active".to_string(),
                    })?;
            }
        }

        let eligible = self.resolver.count_eligible(campaign).await?;
        if eligible == 0 {
            return Err(AppError::BadRequest {
                message: "No valid recipients found in selected source".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(id: i32) -> AppError {
        AppError::NotFound {
            entity: "Campaign".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }
}
