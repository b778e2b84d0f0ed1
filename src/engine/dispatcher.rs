//! Dispatcher: claims one recipient and performs one send.
//!
//! Per-recipient failures are absorbed into counters and the attempt
//! record; only configuration errors escalate to the campaign level.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::gate::{self, DialWindow, GateDecision, GateState};
use crate::engine::types::{
    AttemptStore, CampaignStore, ClaimOutcome, DispatchOutcome, RecipientSource,
};
use crate::error::{AppError, AppResult};
use crate::models::Campaign;
use crate::services::senders::{ChannelSenders, SendOutcome, SendRequest};

/// Upper bound on claim-conflict skips within one pass. Contention is rare
/// (passes are serialized per campaign); the bound only guards the loop.
const MAX_CLAIM_SKIPS: u32 = 16;

pub struct Dispatcher {
    store: Arc<dyn CampaignStore>,
    resolver: Arc<dyn RecipientSource>,
    attempts: Arc<dyn AttemptStore>,
    senders: ChannelSenders,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        resolver: Arc<dyn RecipientSource>,
        attempts: Arc<dyn AttemptStore>,
        senders: ChannelSenders,
    ) -> Self {
        Self {
            store,
            resolver,
            attempts,
            senders,
        }
    }

    /// Dispatches to exactly one recipient of `campaign`.
    ///
    /// The cancellation token is flipped by the pause API; it is checked
    /// immediately before every claim so a pause takes effect without
    /// waiting for the current pass to finish naturally. An in-flight send
    /// is allowed to complete.
    pub async fn dispatch_one(
        &self,
        campaign: &Campaign,
        cancel: &CancellationToken,
    ) -> AppResult<DispatchOutcome> {
        let mut skips = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(campaign_id = campaign.id, "Pause observed before claim");
                return Ok(DispatchOutcome::Paused);
            }

            let recipient = match self.resolver.next_recipient(campaign).await {
                Ok(Some(recipient)) => recipient,
                Ok(None) => {
                    if self.attempts.has_processing(campaign.id).await? {
                        // A send is still in flight elsewhere; completion is
                        // decided once it settles.
                        return Ok(DispatchOutcome::Skipped);
                    }
                    tracing::info!(campaign_id = campaign.id, "Recipient source exhausted");
                    self.store.mark_completed(campaign.id).await?;
                    return Ok(DispatchOutcome::Exhausted);
                }
                Err(e) if e.is_configuration() => {
                    self.fail_campaign(campaign, &e).await?;
                    return Ok(DispatchOutcome::Fatal);
                }
                Err(e) => return Err(e),
            };

            let attempt_id = match self.attempts.claim(campaign.id, &recipient).await? {
                ClaimOutcome::Claimed(id) => id,
                ClaimOutcome::AlreadyTaken => {
                    skips += 1;
                    if skips >= MAX_CLAIM_SKIPS {
                        tracing::warn!(
                            campaign_id = campaign.id,
                            skips,
                            "Giving up after repeated claim conflicts"
                        );
                        return Ok(DispatchOutcome::Skipped);
                    }
                    continue;
                }
            };

            let outcome = self.send_claimed(campaign, attempt_id, &recipient).await?;
            if !matches!(outcome, DispatchOutcome::Fatal) {
                // Settle completion eagerly: when the last recipient was just
                // attempted, the campaign must finish now instead of idling
                // until the gate (e.g. a reached cap) lets another pass in.
                self.complete_if_exhausted(campaign).await;
                self.reschedule(campaign.id).await;
            }
            return Ok(outcome);
        }
    }

    async fn send_claimed(
        &self,
        campaign: &Campaign,
        attempt_id: i64,
        recipient: &crate::engine::types::Recipient,
    ) -> AppResult<DispatchOutcome> {
        let Some(sender) = self.senders.for_channel(campaign.channel) else {
            let error = AppError::Configuration {
                key: "providers".to_string(),
                source: anyhow::anyhow!("No sender configured for channel {}", campaign.channel),
            };
            self.attempts.release(attempt_id).await?;
            self.fail_campaign(campaign, &error).await?;
            return Ok(DispatchOutcome::Fatal);
        };

        let request = SendRequest {
            campaign,
            recipient,
        };

        match sender.send(request).await {
            Ok(SendOutcome::Delivered {
                provider_ref,
                engagement,
            }) => {
                tracing::info!(
                    campaign_id = campaign.id,
                    attempt_id,
                    channel = %campaign.channel,
                    provider_ref = %provider_ref,
                    "Send delivered"
                );
                self.attempts
                    .complete(attempt_id, Some(provider_ref.as_str()))
                    .await?;
                self.store.record_delivery(campaign.id, engagement).await?;
                Ok(DispatchOutcome::Sent)
            }
            Ok(SendOutcome::Rejected { reason }) => {
                tracing::warn!(
                    campaign_id = campaign.id,
                    attempt_id,
                    reason = %reason,
                    "Send rejected by provider"
                );
                self.attempts.fail(attempt_id, &reason).await?;
                // Attempt consumes cap: a rejected number must not be
                // retried into a storm within the same day.
                self.store.record_failure(campaign.id, true).await?;
                Ok(DispatchOutcome::RecipientFailed)
            }
            Ok(SendOutcome::Invalid { reason }) => {
                tracing::warn!(
                    campaign_id = campaign.id,
                    attempt_id,
                    reason = %reason,
                    "Recipient unusable, nothing attempted downstream"
                );
                self.attempts.fail(attempt_id, &reason).await?;
                self.store.record_failure(campaign.id, false).await?;
                Ok(DispatchOutcome::RecipientFailed)
            }
            Err(e) if e.is_configuration() => {
                // The recipient was never contacted; give the claim back so
                // a manual resume retries them.
                self.attempts.release(attempt_id).await?;
                self.fail_campaign(campaign, &e).await?;
                Ok(DispatchOutcome::Fatal)
            }
            Err(e) => {
                tracing::error!(
                    campaign_id = campaign.id,
                    attempt_id,
                    error = %e,
                    "Unexpected send error"
                );
                self.attempts.fail(attempt_id, &e.to_string()).await?;
                self.store.record_failure(campaign.id, true).await?;
                Ok(DispatchOutcome::RecipientFailed)
            }
        }
    }

    async fn complete_if_exhausted(&self, campaign: &Campaign) {
        let result: AppResult<()> = async {
            if self.resolver.next_recipient(campaign).await?.is_none()
                && !self.attempts.has_processing(campaign.id).await?
            {
                tracing::info!(campaign_id = campaign.id, "All recipients attempted");
                self.store.mark_completed(campaign.id).await?;
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(campaign_id = campaign.id, error = %e, "Completion check failed");
        }
    }

    async fn fail_campaign(&self, campaign: &Campaign, error: &AppError) -> AppResult<()> {
        tracing::error!(
            campaign_id = campaign.id,
            error = %error,
            "Configuration error, campaign moved to error state"
        );
        self.store.mark_error(campaign.id, &error.to_string()).await
    }

    /// Persists the next due time from a fresh gate evaluation, so the loop
    /// skips this campaign until it can actually dispatch again.
    async fn reschedule(&self, campaign_id: i32) {
        let result: AppResult<()> = async {
            let Some(current) = self.store.get(campaign_id).await? else {
                return Ok(());
            };
            let window = match DialWindow::from_campaign(&current) {
                Ok(window) => window,
                // The window parsed before this pass; if editing raced us,
                // the next tick surfaces the configuration error properly.
                Err(_) => return Ok(()),
            };
            let state = GateState::from_campaign(&current);
            let next = match gate::evaluate(&window, &state, chrono::Utc::now()).decision {
                GateDecision::Dispatch => Some(chrono::Utc::now().naive_utc()),
                GateDecision::Hold { retry_at } => retry_at.map(|dt| dt.naive_utc()),
            };
            self.store.set_next_dispatch_at(campaign_id, next).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(campaign_id, error = %e, "Failed to persist next dispatch time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{
        MemoryAttempts, MemoryStore, ScriptedSender, StaticRecipients, recipient,
    };
    use crate::engine::types::Engagement;
    use crate::models::{CampaignChannel, ExecutionStatus, test_campaign};

    fn harness(
        recipients: Vec<crate::engine::types::Recipient>,
        sender: ScriptedSender,
    ) -> (Dispatcher, Arc<MemoryStore>, Arc<MemoryAttempts>) {
        let store = Arc::new(MemoryStore::new(vec![test_campaign()]));
        let attempts = Arc::new(MemoryAttempts::new());
        let resolver = Arc::new(StaticRecipients::new(recipients, attempts.clone()));
        let dispatcher = Dispatcher::new(
            store.clone(),
            resolver,
            attempts.clone(),
            ChannelSenders::new().register(Arc::new(sender)),
        );
        (dispatcher, store, attempts)
    }

    #[tokio::test]
    async fn delivered_send_completes_attempt_and_counts() {
        let (dispatcher, store, attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::always_delivered(CampaignChannel::Voice),
        );

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Sent);
        let campaign = store.get_campaign(1);
        assert_eq!(campaign.dials, 1);
        assert_eq!(campaign.current_daily_calls, 1);
        assert_eq!(campaign.failed, 0);
        assert_eq!(attempts.completed_count(), 1);
    }

    #[tokio::test]
    async fn engagement_signals_increment_counters() {
        let (dispatcher, store, _attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::with_outcomes(
                CampaignChannel::Voice,
                vec![Ok(SendOutcome::Delivered {
                    provider_ref: "call-1".to_string(),
                    engagement: Some(Engagement::Interested),
                })],
            ),
        );

        dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.get_campaign(1).interested, 1);
    }

    #[tokio::test]
    async fn rejected_send_consumes_cap() {
        let (dispatcher, store, attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::with_outcomes(
                CampaignChannel::Voice,
                vec![Ok(SendOutcome::Rejected {
                    reason: "quota".to_string(),
                })],
            ),
        );

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::RecipientFailed);
        let campaign = store.get_campaign(1);
        assert_eq!(campaign.failed, 1);
        assert_eq!(campaign.current_daily_calls, 1);
        assert_eq!(campaign.dials, 0);
        assert_eq!(attempts.failed_count(), 1);
    }

    #[tokio::test]
    async fn invalid_recipient_does_not_consume_cap() {
        let (dispatcher, store, _attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::with_outcomes(
                CampaignChannel::Voice,
                vec![Ok(SendOutcome::Invalid {
                    reason: "unroutable".to_string(),
                })],
            ),
        );

        dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        let campaign = store.get_campaign(1);
        assert_eq!(campaign.failed, 1);
        assert_eq!(campaign.current_daily_calls, 0);
    }

    #[tokio::test]
    async fn exhausted_source_completes_campaign() {
        let (dispatcher, store, _attempts) = harness(
            vec![],
            ScriptedSender::always_delivered(CampaignChannel::Voice),
        );

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Exhausted);
        assert_eq!(
            store.get_campaign(1).execution_status,
            ExecutionStatus::Completed
        );
    }

    #[tokio::test]
    async fn configuration_error_fails_campaign_and_releases_claim() {
        let (dispatcher, store, attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::with_outcomes(
                CampaignChannel::Voice,
                vec![Err(AppError::Configuration {
                    key: "phone_number".to_string(),
                    source: anyhow::anyhow!("no active number"),
                })],
            ),
        );

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Fatal);
        let campaign = store.get_campaign(1);
        assert_eq!(campaign.execution_status, ExecutionStatus::Error);
        assert!(campaign.last_error.as_deref().unwrap().contains("phone_number"));
        // Claim went back to queued so a manual resume retries them.
        assert_eq!(attempts.queued_count(), 1);
        assert_eq!(campaign.failed, 0);
    }

    #[tokio::test]
    async fn missing_sender_is_a_configuration_error() {
        let store = Arc::new(MemoryStore::new(vec![test_campaign()]));
        let attempts = Arc::new(MemoryAttempts::new());
        let resolver = Arc::new(StaticRecipients::new(
            vec![recipient("+15550001111")],
            attempts.clone(),
        ));
        // Registry without a voice sender
        let dispatcher = Dispatcher::new(
            store.clone(),
            resolver,
            attempts.clone(),
            ChannelSenders::new(),
        );

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Fatal);
        assert_eq!(store.get_campaign(1).execution_status, ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn cancelled_token_prevents_new_claims() {
        let (dispatcher, store, attempts) = harness(
            vec![recipient("+15550001111")],
            ScriptedSender::always_delivered(CampaignChannel::Voice),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = dispatcher
            .dispatch_one(&store.get_campaign(1), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Paused);
        assert_eq!(attempts.total_count(), 0);
    }

    #[tokio::test]
    async fn failed_recipient_does_not_block_the_next_one() {
        let (dispatcher, store, attempts) = harness(
            vec![recipient("+15550001111"), recipient("+15550002222")],
            ScriptedSender::with_outcomes(
                CampaignChannel::Voice,
                vec![
                    Ok(SendOutcome::Rejected {
                        reason: "bad number".to_string(),
                    }),
                    Ok(SendOutcome::Delivered {
                        provider_ref: "call-2".to_string(),
                        engagement: None,
                    }),
                ],
            ),
        );
        let cancel = CancellationToken::new();

        let first = dispatcher
            .dispatch_one(&store.get_campaign(1), &cancel)
            .await
            .unwrap();
        let second = dispatcher
            .dispatch_one(&store.get_campaign(1), &cancel)
            .await
            .unwrap();

        assert_eq!(first, DispatchOutcome::RecipientFailed);
        assert_eq!(second, DispatchOutcome::Sent);
        let campaign = store.get_campaign(1);
        assert_eq!(campaign.failed, 1);
        assert_eq!(campaign.dials, 1);
        assert_eq!(attempts.failed_count(), 1);
        assert_eq!(attempts.completed_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_dispatches_never_double_claim() {
        // Two dispatchers over the same stores race for a single recipient:
        // exactly one send happens.
        let store = Arc::new(MemoryStore::new(vec![test_campaign()]));
        let attempts = Arc::new(MemoryAttempts::new());
        let resolver = Arc::new(StaticRecipients::new(
            vec![recipient("+15550001111")],
            attempts.clone(),
        ));
        let sender = Arc::new(ScriptedSender::always_delivered(CampaignChannel::Voice));

        let mk = || {
            Dispatcher::new(
                store.clone(),
                resolver.clone(),
                attempts.clone(),
                ChannelSenders::new().register(sender.clone()),
            )
        };
        let (a, b) = (mk(), mk());
        let campaign = store.get_campaign(1);
        let campaign2 = campaign.clone();

        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        let (ra, rb) = tokio::join!(
            a.dispatch_one(&campaign, &cancel),
            b.dispatch_one(&campaign2, &cancel2),
        );

        let outcomes = [ra.unwrap(), rb.unwrap()];
        assert!(outcomes.contains(&DispatchOutcome::Sent));
        assert_eq!(sender.send_count(), 1);
        assert_eq!(attempts.completed_count(), 1);
        assert_eq!(store.get_campaign(1).dials, 1);
    }
}
