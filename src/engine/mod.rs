//! Campaign execution engine.
//!
//! Components: the pure rate/window gate, the recipient resolver, the
//! single-recipient dispatcher and the recurring runner driving them.

pub mod dispatcher;
pub mod gate;
pub mod resolver;
pub mod runner;
pub mod types;

#[cfg(test)]
pub mod test_support;

pub use dispatcher::Dispatcher;
pub use gate::{DialWindow, Evaluation, GateDecision, GateState};
pub use resolver::PgRecipientResolver;
pub use runner::CampaignEngine;
pub use types::{
    AttemptStore, CampaignStore, ClaimOutcome, DispatchOutcome, Engagement, Recipient,
    RecipientSource,
};
