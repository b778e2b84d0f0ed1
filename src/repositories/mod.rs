//! Repository layer for data access operations.
//!
//! Provides async CRUD operations for all domain entities.

mod attempt_repo;
mod campaign_repo;
mod contact_repo;
mod integration_repo;

pub use attempt_repo::{AttemptQueueStats, AttemptRepository};
pub use campaign_repo::CampaignRepository;
pub use contact_repo::ContactRepository;
pub use integration_repo::IntegrationRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub campaigns: CampaignRepository,
    pub attempts: AttemptRepository,
    pub contacts: ContactRepository,
    pub integrations: IntegrationRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            attempts: AttemptRepository::new(pool.clone()),
            contacts: ContactRepository::new(pool.clone()),
            integrations: IntegrationRepository::new(pool),
        }
    }
}
