//! Channel senders: the capability interfaces campaigns send through.

mod email;
mod provider;
mod sms;
mod voice;

pub use email::SmtpEmailSender;
pub use provider::{ChannelSender, SendOutcome, SendRequest};
pub use sms::SmsGatewaySender;
pub use voice::VoiceGatewaySender;

use std::sync::Arc;

use crate::models::CampaignChannel;

/// Registry mapping each campaign channel to its sender.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    voice: Option<Arc<dyn ChannelSender>>,
    sms: Option<Arc<dyn ChannelSender>>,
    email: Option<Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sender under the channel it reports.
    pub fn register(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        match sender.channel() {
            CampaignChannel::Voice => self.voice = Some(sender),
            CampaignChannel::Sms => self.sms = Some(sender),
            CampaignChannel::Email => self.email = Some(sender),
        }
        self
    }

    pub fn for_channel(&self, channel: CampaignChannel) -> Option<Arc<dyn ChannelSender>> {
        match channel {
            CampaignChannel::Voice => self.voice.clone(),
            CampaignChannel::Sms => self.sms.clone(),
            CampaignChannel::Email => self.email.clone(),
        }
    }
}
