//! Database models grouped by domain.

mod attempt;
mod campaign;
mod contact;
mod integration;

pub use attempt::{AttemptStatus, CampaignAttempt, NewCampaignAttempt};
pub use campaign::{
    Campaign, CampaignChannel, CampaignStatus, ContactSource, ExecutionStatus, NewCampaign,
    UpdateCampaignConfig,
};
#[cfg(test)]
pub use campaign::test_campaign;
pub use contact::{Contact, ContactList, ContactStatus, CsvContact, CsvFile};
pub use integration::{Assistant, EmailIntegration, PhoneNumber};
