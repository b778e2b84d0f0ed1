//! Core channel sender trait and types.
//!
//! Each campaign channel (voice, SMS, email) implements `ChannelSender`.
//! The dispatcher treats senders as capability interfaces: an `Err` from
//! `send` is a configuration problem fatal to the campaign, while delivery
//! problems are reported inside `SendOutcome` and stay recipient-scoped.

use async_trait::async_trait;

use crate::engine::types::{Engagement, Recipient};
use crate::error::AppResult;
use crate::models::{Campaign, CampaignChannel};

/// One send operation: the campaign supplies the payload and persona, the
/// recipient supplies the address.
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    pub campaign: &'a Campaign,
    pub recipient: &'a Recipient,
}

/// Result of one provider send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The provider accepted the send.
    Delivered {
        provider_ref: String,
        engagement: Option<Engagement>,
    },
    /// The send reached the provider and was rejected. Consumes the daily
    /// cap so a rejected number cannot trigger a retry storm.
    Rejected { reason: String },
    /// Nothing was ever attempted downstream (unusable address). Does not
    /// consume the daily cap.
    Invalid { reason: String },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }
}

/// Trait for channel senders (voice dialer, SMS gateway, SMTP).
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender serves.
    fn channel(&self) -> CampaignChannel;

    /// Performs one send.
    ///
    /// # Errors
    /// Returns `AppError::Configuration` when the campaign cannot send at
    /// all (missing phone number, inactive SMTP integration, bad gateway
    /// config); the engine aborts the campaign on these. Transport-level
    /// delivery failures must be reported as `Rejected`/`Invalid` instead.
    async fn send(&self, request: SendRequest<'_>) -> AppResult<SendOutcome>;
}
