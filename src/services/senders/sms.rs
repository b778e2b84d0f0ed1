//! SMS channel sender.
//!
//! Sends through a Twilio-style Messages API: basic auth with account
//! credentials, form-encoded body, message SID returned on acceptance.
//! Delivery receipts arrive on the status callback, outside this sender.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{ChannelSender, SendOutcome, SendRequest};
use crate::config::SmsGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::external::client::HTTP_CLIENT;
use crate::models::CampaignChannel;
use crate::repositories::IntegrationRepository;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct SmsGatewaySender {
    config: SmsGatewayConfig,
    integrations: IntegrationRepository,
}

impl SmsGatewaySender {
    pub fn new(config: SmsGatewayConfig, integrations: IntegrationRepository) -> Self {
        Self {
            config,
            integrations,
        }
    }

    fn messages_url(&self) -> AppResult<String> {
        if self.config.base_url.is_empty()
            || self.config.account_sid.is_empty()
            || self.config.auth_token.is_empty()
        {
            return Err(AppError::Configuration {
                key: "providers.sms".to_string(),
                source: anyhow::anyhow!("SMS gateway credentials are not configured"),
            });
        }
        Ok(format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        ))
    }
}

#[async_trait]
impl ChannelSender for SmsGatewaySender {
    fn channel(&self) -> CampaignChannel {
        CampaignChannel::Sms
    }

    async fn send(&self, request: SendRequest<'_>) -> AppResult<SendOutcome> {
        let url = self.messages_url()?;
        let campaign = request.campaign;

        let body = campaign
            .sms_body
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Configuration {
                key: "campaign.sms_body".to_string(),
                source: anyhow::anyhow!("Campaign {} has no SMS body", campaign.id),
            })?;

        let number = self
            .integrations
            .active_number_for_assistant(campaign.assistant_id)
            .await?
            .ok_or_else(|| AppError::Configuration {
                key: "phone_number".to_string(),
                source: anyhow::anyhow!(
                    "No active phone number configured for assistant {}",
                    campaign.assistant_id
                ),
            })?;

        let Some(to_number) = request.recipient.phone.as_deref() else {
            return Ok(SendOutcome::Invalid {
                reason: "Recipient has no phone number".to_string(),
            });
        };

        let mut form = vec![
            ("To", to_number.to_string()),
            ("From", number.number.clone()),
            ("Body", body.to_string()),
        ];
        if let Some(callback) = &self.config.status_callback_url {
            form.push(("StatusCallback", callback.clone()));
        }

        let response = HTTP_CLIENT
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<MessageResponse>().await {
                    Ok(message) => Ok(SendOutcome::Delivered {
                        provider_ref: message.sid,
                        engagement: None,
                    }),
                    Err(e) => Ok(SendOutcome::Rejected {
                        reason: format!("Unreadable gateway response: {}", e),
                    }),
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let detail = resp.text().await.unwrap_or_default();
                Ok(SendOutcome::Rejected {
                    reason: format!("SMS gateway returned {}: {}", status, detail),
                })
            }
            Err(e) => Ok(SendOutcome::Rejected {
                reason: format!("SMS gateway unreachable: {}", e),
            }),
        }
    }
}
