//! In-memory fakes for engine tests.
//!
//! These mirror the semantics of the Postgres-backed stores closely enough
//! to drive the dispatcher and runner without a database: claims are
//! atomic under a mutex, counter updates are applied like their SQL
//! increments, and the resolver honors attempted-key exclusion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::engine::types::{
    AttemptStore, CampaignStore, ClaimOutcome, Engagement, Recipient, RecipientSource,
};
use crate::error::{AppError, AppResult};
use crate::models::{AttemptStatus, Campaign, CampaignStatus, ExecutionStatus};
use crate::services::senders::{ChannelSender, SendOutcome, SendRequest};

pub fn recipient(phone: &str) -> Recipient {
    Recipient {
        contact_id: None,
        key: phone.to_string(),
        name: format!("Contact {}", phone),
        phone: Some(phone.to_string()),
        email: None,
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

pub struct MemoryStore {
    campaigns: Mutex<HashMap<i32, Campaign>>,
}

impl MemoryStore {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self {
            campaigns: Mutex::new(campaigns.into_iter().map(|c| (c.id, c)).collect()),
        }
    }

    pub fn get_campaign(&self, id: i32) -> Campaign {
        self.campaigns.lock().unwrap().get(&id).unwrap().clone()
    }

    pub fn set_execution_status(&self, id: i32, status: ExecutionStatus) {
        let mut campaigns = self.campaigns.lock().unwrap();
        campaigns.get_mut(&id).unwrap().execution_status = status;
    }

    fn update<F: FnOnce(&mut Campaign)>(&self, id: i32, f: F) -> AppResult<()> {
        let mut campaigns = self.campaigns.lock().unwrap();
        if let Some(campaign) = campaigns.get_mut(&id) {
            f(campaign);
        }
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn list_due_running(&self, now: NaiveDateTime) -> AppResult<Vec<Campaign>> {
        let campaigns = self.campaigns.lock().unwrap();
        let mut due: Vec<Campaign> = campaigns
            .values()
            .filter(|c| c.execution_status == ExecutionStatus::Running)
            .filter(|c| c.next_dispatch_at.is_none_or(|at| at <= now))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.next_dispatch_at);
        Ok(due)
    }

    async fn get(&self, campaign_id: i32) -> AppResult<Option<Campaign>> {
        Ok(self.campaigns.lock().unwrap().get(&campaign_id).cloned())
    }

    async fn execution_status(&self, campaign_id: i32) -> AppResult<Option<ExecutionStatus>> {
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .get(&campaign_id)
            .map(|c| c.execution_status))
    }

    async fn reset_daily_counter(&self, campaign_id: i32, local_date: NaiveDate) -> AppResult<()> {
        self.update(campaign_id, |c| {
            c.current_daily_calls = 0;
            c.daily_calls_date = Some(local_date);
        })
    }

    async fn record_delivery(
        &self,
        campaign_id: i32,
        engagement: Option<Engagement>,
    ) -> AppResult<()> {
        self.update(campaign_id, |c| {
            c.dials += 1;
            c.current_daily_calls += 1;
            c.last_dispatch_at = Some(Utc::now().naive_utc());
            match engagement {
                Some(Engagement::Pickup) => c.pickups += 1,
                Some(Engagement::Interested) => c.interested += 1,
                None => {}
            }
        })
    }

    async fn record_failure(&self, campaign_id: i32, consumed_cap: bool) -> AppResult<()> {
        self.update(campaign_id, |c| {
            c.failed += 1;
            if consumed_cap {
                c.current_daily_calls += 1;
            }
            c.last_dispatch_at = Some(Utc::now().naive_utc());
        })
    }

    async fn set_next_dispatch_at(
        &self,
        campaign_id: i32,
        at: Option<NaiveDateTime>,
    ) -> AppResult<()> {
        self.update(campaign_id, |c| c.next_dispatch_at = at)
    }

    async fn mark_completed(&self, campaign_id: i32) -> AppResult<()> {
        self.update(campaign_id, |c| {
            c.execution_status = ExecutionStatus::Completed;
            c.status = CampaignStatus::Completed;
            c.next_dispatch_at = None;
        })
    }

    async fn mark_error(&self, campaign_id: i32, summary: &str) -> AppResult<()> {
        let summary = summary.to_string();
        self.update(campaign_id, move |c| {
            c.execution_status = ExecutionStatus::Error;
            c.last_error = Some(summary);
            c.next_dispatch_at = None;
        })
    }
}

// ============================================================================
// MemoryAttempts
// ============================================================================

#[derive(Debug, Clone)]
struct FakeAttempt {
    id: i64,
    campaign_id: i32,
    recipient: Recipient,
    status: AttemptStatus,
}

#[derive(Default)]
pub struct MemoryAttempts {
    attempts: Mutex<Vec<FakeAttempt>>,
}

impl MemoryAttempts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    fn count_with(&self, status: AttemptStatus) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status == status)
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.count_with(AttemptStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count_with(AttemptStatus::Failed)
    }

    pub fn queued_count(&self) -> usize {
        self.count_with(AttemptStatus::Queued)
    }

    /// Keys that must not be offered again by the resolver (anything with
    /// an attempt row that is not reclaimed-queued).
    fn blocked_keys(&self, campaign_id: i32) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.campaign_id == campaign_id && a.status != AttemptStatus::Queued)
            .map(|a| a.recipient.key.clone())
            .collect()
    }

    fn next_queued(&self, campaign_id: i32) -> Option<Recipient> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.campaign_id == campaign_id && a.status == AttemptStatus::Queued)
            .map(|a| a.recipient.clone())
    }
}

#[async_trait]
impl AttemptStore for MemoryAttempts {
    async fn claim(&self, campaign_id: i32, recipient: &Recipient) -> AppResult<ClaimOutcome> {
        let mut attempts = self.attempts.lock().unwrap();

        if let Some(existing) = attempts
            .iter_mut()
            .find(|a| a.campaign_id == campaign_id && a.recipient.key == recipient.key)
        {
            return if existing.status == AttemptStatus::Queued {
                existing.status = AttemptStatus::Processing;
                Ok(ClaimOutcome::Claimed(existing.id))
            } else {
                Ok(ClaimOutcome::AlreadyTaken)
            };
        }

        let id = attempts.len() as i64 + 1;
        attempts.push(FakeAttempt {
            id,
            campaign_id,
            recipient: recipient.clone(),
            status: AttemptStatus::Processing,
        });
        Ok(ClaimOutcome::Claimed(id))
    }

    async fn complete(&self, attempt_id: i64, _provider_ref: Option<&str>) -> AppResult<()> {
        let mut attempts = self.attempts.lock().unwrap();
        if let Some(attempt) = attempts.iter_mut().find(|a| a.id == attempt_id) {
            attempt.status = AttemptStatus::Completed;
        }
        Ok(())
    }

    async fn fail(&self, attempt_id: i64, _error: &str) -> AppResult<()> {
        let mut attempts = self.attempts.lock().unwrap();
        if let Some(attempt) = attempts.iter_mut().find(|a| a.id == attempt_id) {
            attempt.status = AttemptStatus::Failed;
        }
        Ok(())
    }

    async fn has_processing(&self, campaign_id: i32) -> AppResult<bool> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.campaign_id == campaign_id && a.status == AttemptStatus::Processing))
    }

    async fn release(&self, attempt_id: i64) -> AppResult<()> {
        let mut attempts = self.attempts.lock().unwrap();
        if let Some(attempt) = attempts.iter_mut().find(|a| a.id == attempt_id) {
            attempt.status = AttemptStatus::Queued;
        }
        Ok(())
    }

    async fn release_stuck(&self, _older_than_seconds: i64) -> AppResult<usize> {
        let mut attempts = self.attempts.lock().unwrap();
        let mut released = 0;
        for attempt in attempts.iter_mut() {
            if attempt.status == AttemptStatus::Processing {
                attempt.status = AttemptStatus::Queued;
                released += 1;
            }
        }
        Ok(released)
    }
}

// ============================================================================
// StaticRecipients
// ============================================================================

/// Fixed recipient list resolver honoring attempted-key exclusion, mirroring
/// the Postgres resolver's queued-first behavior.
pub struct StaticRecipients {
    recipients: Vec<Recipient>,
    attempts: Arc<MemoryAttempts>,
}

impl StaticRecipients {
    pub fn new(recipients: Vec<Recipient>, attempts: Arc<MemoryAttempts>) -> Self {
        Self {
            recipients,
            attempts,
        }
    }
}

#[async_trait]
impl RecipientSource for StaticRecipients {
    async fn next_recipient(&self, campaign: &Campaign) -> AppResult<Option<Recipient>> {
        if let Some(reclaimed) = self.attempts.next_queued(campaign.id) {
            return Ok(Some(reclaimed));
        }

        let blocked = self.attempts.blocked_keys(campaign.id);
        Ok(self
            .recipients
            .iter()
            .find(|r| !blocked.contains(&r.key))
            .cloned())
    }

    async fn count_eligible(&self, _campaign: &Campaign) -> AppResult<i64> {
        Ok(self.recipients.len() as i64)
    }
}

/// Resolver that always fails with a configuration error, for the fatal
/// error path (e.g. the contact source was deleted).
pub struct BrokenSource;

#[async_trait]
impl RecipientSource for BrokenSource {
    async fn next_recipient(&self, campaign: &Campaign) -> AppResult<Option<Recipient>> {
        Err(AppError::Configuration {
            key: "campaign.contact_source".to_string(),
            source: anyhow::anyhow!("No contact source for campaign {}", campaign.id),
        })
    }

    async fn count_eligible(&self, _campaign: &Campaign) -> AppResult<i64> {
        Ok(0)
    }
}

// ============================================================================
// ScriptedSender
// ============================================================================

/// Sender replaying a scripted list of outcomes, then delivering by default.
pub struct ScriptedSender {
    channel: crate::models::CampaignChannel,
    script: Mutex<Vec<AppResult<SendOutcome>>>,
    sends: AtomicUsize,
}

impl ScriptedSender {
    pub fn always_delivered(channel: crate::models::CampaignChannel) -> Self {
        Self::with_outcomes(channel, Vec::new())
    }

    pub fn with_outcomes(
        channel: crate::models::CampaignChannel,
        mut outcomes: Vec<AppResult<SendOutcome>>,
    ) -> Self {
        outcomes.reverse(); // popped back-to-front
        Self {
            channel,
            script: Mutex::new(outcomes),
            sends: AtomicUsize::new(0),
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    fn channel(&self) -> crate::models::CampaignChannel {
        self.channel
    }

    async fn send(&self, _request: SendRequest<'_>) -> AppResult<SendOutcome> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop();
        scripted.unwrap_or_else(|| {
            Ok(SendOutcome::Delivered {
                provider_ref: format!("scripted-{}", n + 1),
                engagement: None,
            })
        })
    }
}
