//! Core types and store seams for the campaign execution engine.
//!
//! The engine is constructed with trait objects for its campaign store,
//! recipient source, attempt store and channel senders, so the dispatch
//! pipeline can be exercised in tests without a database or a timer.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::AppResult;
use crate::models::{Campaign, ExecutionStatus};

/// A resolved recipient, ready to be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub contact_id: Option<i32>,
    /// Normalized address used for de-duplication and the claim key.
    pub key: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Engagement signal a provider reports synchronously with the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// Call picked up / message replied to
    Pickup,
    /// Recipient flagged interested
    Interested,
}

/// Result of one dispatcher pass over a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// One recipient was sent to successfully
    Sent,
    /// One recipient failed; the run continues next tick
    RecipientFailed,
    /// The resolver is exhausted; the campaign was marked completed
    Exhausted,
    /// The pause signal was observed before a claim was made
    Paused,
    /// Claim contention left nothing to dispatch this pass
    Skipped,
    /// A configuration error moved the campaign to the error state
    Fatal,
}

/// Outcome of an attempt claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim succeeded; the attempt id is now `processing`
    Claimed(i64),
    /// Another pass already holds or finished this recipient
    AlreadyTaken,
}

/// Durable campaign state the engine reads and mutates.
///
/// Counter mutations must be atomic increments so a background tick and a
/// user-triggered immediate pass cannot lose updates.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Campaigns with `execution_status = running` whose `next_dispatch_at`
    /// is unset or due, ordered by due time.
    async fn list_due_running(&self, now: NaiveDateTime) -> AppResult<Vec<Campaign>>;

    async fn get(&self, campaign_id: i32) -> AppResult<Option<Campaign>>;

    /// Current engine-facing status, checked immediately before each claim.
    async fn execution_status(&self, campaign_id: i32) -> AppResult<Option<ExecutionStatus>>;

    /// Zeroes `current_daily_calls` for a new local day. Applied once per
    /// day-boundary crossing, before the cap check.
    async fn reset_daily_counter(&self, campaign_id: i32, local_date: NaiveDate) -> AppResult<()>;

    /// Records a successful send: dials and the daily counter increment
    /// atomically, plus any engagement counter.
    async fn record_delivery(
        &self,
        campaign_id: i32,
        engagement: Option<Engagement>,
    ) -> AppResult<()>;

    /// Records a failed send. `consumed_cap` follows the uniform
    /// attempt-consumes-cap rule: true when the send reached the provider.
    async fn record_failure(&self, campaign_id: i32, consumed_cap: bool) -> AppResult<()>;

    async fn set_next_dispatch_at(
        &self,
        campaign_id: i32,
        at: Option<NaiveDateTime>,
    ) -> AppResult<()>;

    async fn mark_completed(&self, campaign_id: i32) -> AppResult<()>;

    async fn mark_error(&self, campaign_id: i32, summary: &str) -> AppResult<()>;
}

/// Ordered, de-duplicated recipient lookup for a campaign's contact source.
#[async_trait]
pub trait RecipientSource: Send + Sync {
    /// The next eligible recipient, or `None` when the source is exhausted.
    /// Repeated calls are deterministic for unchanged state (creation
    /// order), which makes a paused campaign resumable.
    async fn next_recipient(&self, campaign: &Campaign) -> AppResult<Option<Recipient>>;

    /// Count of source rows still eligible for this campaign.
    async fn count_eligible(&self, campaign: &Campaign) -> AppResult<i64>;
}

/// Per-recipient attempt records; the claim is the engine's only mutual
/// exclusion point.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Atomically claims a recipient for sending. Exactly one caller wins;
    /// the rest observe `AlreadyTaken`.
    async fn claim(&self, campaign_id: i32, recipient: &Recipient) -> AppResult<ClaimOutcome>;

    async fn complete(&self, attempt_id: i64, provider_ref: Option<&str>) -> AppResult<()>;

    async fn fail(&self, attempt_id: i64, error: &str) -> AppResult<()>;

    /// True while any attempt of the campaign is `processing`. Exhaustion
    /// is not terminal while a send is still in flight.
    async fn has_processing(&self, campaign_id: i32) -> AppResult<bool>;

    /// Returns a claimed attempt to `queued` (used when a configuration
    /// error aborts the campaign before the send happened).
    async fn release(&self, attempt_id: i64) -> AppResult<()>;

    /// Releases attempts stuck in `processing` longer than the timeout back
    /// to `queued`. Returns the number of reclaimed attempts.
    async fn release_stuck(&self, older_than_seconds: i64) -> AppResult<usize>;
}
