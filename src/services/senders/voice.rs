//! Voice channel sender.
//!
//! Places outbound calls through the dial gateway's HTTP API: the gateway
//! creates the call room, dispatches the configured agent into it and
//! dials the recipient over the assistant's outbound trunk. Call progress
//! (pickup, outcome) is reported back by the gateway via webhooks handled
//! elsewhere; this sender only observes call placement.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::provider::{ChannelSender, SendOutcome, SendRequest};
use crate::config::VoiceGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::external::client::HTTP_CLIENT;
use crate::models::CampaignChannel;
use crate::repositories::IntegrationRepository;

#[derive(Debug, Deserialize)]
struct PlaceCallResponse {
    call_id: Option<String>,
}

pub struct VoiceGatewaySender {
    config: VoiceGatewayConfig,
    integrations: IntegrationRepository,
}

impl VoiceGatewaySender {
    pub fn new(config: VoiceGatewayConfig, integrations: IntegrationRepository) -> Self {
        Self {
            config,
            integrations,
        }
    }

    fn gateway_url(&self) -> AppResult<String> {
        if self.config.base_url.is_empty() {
            return Err(AppError::Configuration {
                key: "providers.voice.base_url".to_string(),
                source: anyhow::anyhow!("Voice gateway is not configured"),
            });
        }
        Ok(format!(
            "{}/v1/calls",
            self.config.base_url.trim_end_matches('/')
        ))
    }
}

#[async_trait]
impl ChannelSender for VoiceGatewaySender {
    fn channel(&self) -> CampaignChannel {
        CampaignChannel::Voice
    }

    async fn send(&self, request: SendRequest<'_>) -> AppResult<SendOutcome> {
        let url = self.gateway_url()?;
        let campaign = request.campaign;

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

        let reference = format!("campaign-{}-{}", campaign.id, Uuid::new_v4());
        let body = json!({
            "reference": reference,
            "assistant_id": campaign.assistant_id,
            "agent_name": self.config.agent_name,
            "from": number.number,
            "trunk_id": number.trunk_id,
            "to": to_number,
            "contact_name": request.recipient.name,
            "prompt": campaign.prompt,
            "metadata": {
                "campaign_id": campaign.id,
                "call_type": "campaign",
            },
        });

        let response = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let call_id = resp
                    .json::<PlaceCallResponse>()
                    .await
                    .ok()
                    .and_then(|r| r.call_id)
                    .unwrap_or(reference);
                Ok(SendOutcome::Delivered {
                    provider_ref: call_id,
                    engagement: None,
                })
            }
            Ok(resp) => {
                let status = resp.status();
                let detail = resp.text().await.unwrap_or_default();
                Ok(SendOutcome::Rejected {
                    reason: format!("Dial gateway returned {}: {}", status, detail),
                })
            }
            Err(e) => Ok(SendOutcome::Rejected {
                reason: format!("Dial gateway unreachable: {}", e),
            }),
        }
    }
}
