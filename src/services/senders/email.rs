//! Email channel sender.
//!
//! Delivers through the campaign's SMTP integration using lettre's async
//! transport. The message is multipart/alternative (plain text plus a
//! minimal HTML rendering), with an optional file attachment.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use super::provider::{ChannelSender, SendOutcome, SendRequest};
use crate::config::settings::SmtpDefaults;
use crate::error::{AppError, AppResult};
use crate::models::{Campaign, CampaignChannel, EmailIntegration};
use crate::repositories::IntegrationRepository;

pub struct SmtpEmailSender {
    defaults: SmtpDefaults,
    integrations: IntegrationRepository,
}

impl SmtpEmailSender {
    pub fn new(defaults: SmtpDefaults, integrations: IntegrationRepository) -> Self {
        Self {
            defaults,
            integrations,
        }
    }

    async fn integration_for(&self, campaign: &Campaign) -> AppResult<EmailIntegration> {
        let integration_id =
            campaign
                .email_integration_id
                .ok_or_else(|| AppError::Configuration {
                    key: "campaign.email_integration_id".to_string(),
                    source: anyhow::anyhow!(
                        "Campaign {} has no email integration selected",
                        campaign.id
                    ),
                })?;

        self.integrations
            .active_email_integration(integration_id)
            .await?
            .ok_or_else(|| AppError::Configuration {
                key: "email_integration".to_string(),
                source: anyhow::anyhow!(
                    "Email integration {} is missing or inactive",
                    integration_id
                ),
            })
    }

    fn transport(
        &self,
        integration: &EmailIntegration,
    ) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if integration.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&integration.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&integration.smtp_host)
        }
        .map_err(|e| AppError::Configuration {
            key: "email_integration.smtp_host".to_string(),
            source: anyhow::anyhow!("SMTP transport setup failed: {}", e),
        })?;

        Ok(builder
            .port(integration.smtp_port as u16)
            .credentials(Credentials::new(
                integration.smtp_username.clone(),
                integration.smtp_password.clone(),
            ))
            .timeout(Some(Duration::from_secs(self.defaults.timeout_seconds)))
            .build())
    }

    async fn build_message(
        &self,
        campaign: &Campaign,
        integration: &EmailIntegration,
        to: Mailbox,
    ) -> AppResult<Message> {
        let from: Mailbox =
            integration
                .from_email
                .parse()
                .map_err(|e| AppError::Configuration {
                    key: "email_integration.from_email".to_string(),
                    source: anyhow::anyhow!("Invalid sender address: {}", e),
                })?;

        let subject = campaign
            .email_subject
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                key: "campaign.email_subject".to_string(),
                source: anyhow::anyhow!("Campaign {} has no email subject", campaign.id),
            })?;
        let text = campaign
            .email_body
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Configuration {
                key: "campaign.email_body".to_string(),
                source: anyhow::anyhow!("Campaign {} has no email body", campaign.id),
            })?;

        let html = format!(
            "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">{}</div>",
            text.replace('\n', "<br>")
        );
        let alternative = MultiPart::alternative()
            .singlepart(SinglePart::plain(text.to_string()))
            .singlepart(SinglePart::html(html));

        let builder = Message::builder().from(from).to(to).subject(subject);

        let message = match &campaign.attachment_path {
            Some(path) => {
                let bytes =
                    tokio::fs::read(path)
                        .await
                        .map_err(|e| AppError::Configuration {
                            key: "campaign.attachment_path".to_string(),
                            source: anyhow::anyhow!("Cannot read attachment {}: {}", path, e),
                        })?;
                let filename = campaign
                    .attachment_name
                    .clone()
                    .unwrap_or_else(|| "attachment".to_string());
                let content_type = ContentType::parse("application/octet-stream")
                    .map_err(|e| AppError::Configuration {
                        key: "campaign.attachment_path".to_string(),
                        source: anyhow::anyhow!("Attachment content type: {}", e),
                    })?;
                let attachment = Attachment::new(filename).body(bytes, content_type);
                builder.multipart(MultiPart::mixed().multipart(alternative).singlepart(attachment))
            }
            None => builder.multipart(alternative),
        }
        .map_err(|e| AppError::Configuration {
            key: "campaign.email".to_string(),
            source: anyhow::anyhow!("Failed to build email: {}", e),
        })?;

        Ok(message)
    }
}

#[async_trait]
impl ChannelSender for SmtpEmailSender {
    fn channel(&self) -> CampaignChannel {
        CampaignChannel::Email
    }

    async fn send(&self, request: SendRequest<'_>) -> AppResult<SendOutcome> {
        let campaign = request.campaign;
        let integration = self.integration_for(campaign).await?;

        let Some(to_address) = request.recipient.email.as_deref() else {
            return Ok(SendOutcome::Invalid {
                reason: "Recipient has no email address".to_string(),
            });
        };
        let to: Mailbox = match to_address.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                return Ok(SendOutcome::Invalid {
                    reason: format!("Unparseable recipient address: {}", e),
                });
            }
        };

        let message = self.build_message(campaign, &integration, to).await?;
        let mailer = self.transport(&integration)?;

        match mailer.send(message).await {
            Ok(_) => Ok(SendOutcome::Delivered {
                provider_ref: format!("<{}@dialflow>", Uuid::new_v4()),
                engagement: None,
            }),
            Err(e) => Ok(SendOutcome::Rejected {
                reason: format!("SMTP delivery failed: {}", e),
            }),
        }
    }
}
