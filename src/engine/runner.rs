//! Campaign execution engine: the recurring driver over running campaigns.
//!
//! An explicitly constructed instance with injected stores and senders.
//! `start` is idempotent, `stop` shuts the scheduler down, and `tick` is
//! public so tests drive the loop without a timer. Each tick handles every
//! due running campaign as an isolated unit of work serialized per
//! campaign id, dispatching at most one recipient per campaign.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::gate::{self, DialWindow, GateDecision, GateState};
use crate::engine::types::{AttemptStore, CampaignStore, RecipientSource};
use crate::error::{AppError, AppResult};
use crate::models::{Campaign, ExecutionStatus};
use crate::services::senders::ChannelSenders;

pub struct CampaignEngine {
    store: Arc<dyn CampaignStore>,
    attempts: Arc<dyn AttemptStore>,
    dispatcher: Dispatcher,
    config: EngineConfig,
    scheduler: Mutex<Option<TokioCronScheduler>>,
    /// Campaign ids with a pass currently in flight. One concurrent
    /// dispatch pass per campaign, across ticks and eager kicks.
    in_flight: DashMap<i32, ()>,
    /// Pause signals flipped by the pause/resume API, checked by the
    /// dispatcher before each claim.
    pause_signals: DashMap<i32, CancellationToken>,
}

impl CampaignEngine {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        resolver: Arc<dyn RecipientSource>,
        attempts: Arc<dyn AttemptStore>,
        senders: ChannelSenders,
        config: EngineConfig,
    ) -> Arc<Self> {
        let dispatcher = Dispatcher::new(
            store.clone(),
            resolver,
            attempts.clone(),
            senders,
        );
        Arc::new(Self {
            store,
            attempts,
            dispatcher,
            config,
            scheduler: Mutex::new(None),
            in_flight: DashMap::new(),
            pause_signals: DashMap::new(),
        })
    }

    /// Starts the recurring driver. Calling twice is a no-op: one loop per
    /// engine instance.
    pub async fn start(self: &Arc<Self>) -> AppResult<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            tracing::debug!("Campaign engine already running");
            return Ok(());
        }

        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        let engine = Arc::clone(self);
        let tick_job = Job::new_repeated_async(
            Duration::from_secs(self.config.tick_seconds),
            move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                Box::pin(async move {
                    engine.tick().await;
                })
            },
        )
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        let engine = Arc::clone(self);
        let sweep_job = Job::new_repeated_async(
            Duration::from_secs(self.config.recovery_sweep_seconds),
            move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                Box::pin(async move {
                    engine.recovery_sweep().await;
                })
            },
        )
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        scheduler.add(tick_job).await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        scheduler
            .add(sweep_job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        scheduler.start().await.map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        *guard = Some(scheduler);
        drop(guard);

        tracing::info!(
            tick_seconds = self.config.tick_seconds,
            recovery_sweep_seconds = self.config.recovery_sweep_seconds,
            "Campaign engine started"
        );

        // Reclaim attempts orphaned by a previous crash, then run one pass
        // right away instead of waiting out the first interval.
        self.recovery_sweep().await;
        self.tick().await;
        Ok(())
    }

    /// Stops the recurring driver. In-flight sends finish on their own.
    pub async fn stop(&self) -> AppResult<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(mut scheduler) = guard.take() {
            scheduler.shutdown().await.map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
            tracing::info!("Campaign engine stopped");
        }
        Ok(())
    }

    /// One pass over all due running campaigns. Units run concurrently and
    /// are awaited, so tests drive the loop deterministically; the
    /// scheduler runs each tick as its own task, keeping one stuck
    /// campaign from delaying the next firing.
    pub async fn tick(&self) {
        let now = Utc::now().naive_utc();
        let due = match self.store.list_due_running(now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list running campaigns");
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        tracing::debug!(count = due.len(), "Campaigns due for dispatch");
        let units = due.into_iter().map(|campaign| self.run_unit(campaign));
        futures::future::join_all(units).await;
    }

    /// Eager pass for one campaign, used by the start/resume API for
    /// responsiveness instead of waiting for the next scheduled tick.
    pub async fn kick(&self, campaign_id: i32) {
        match self.store.get(campaign_id).await {
            Ok(Some(campaign)) if campaign.execution_status == ExecutionStatus::Running => {
                self.run_unit(campaign).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(campaign_id, error = %e, "Eager pass failed to load campaign");
            }
        }
    }

    /// Flips the pause signal. The durable status flip happens in the
    /// service layer; the signal only stops the dispatcher from claiming
    /// another recipient mid-pass without polling the database.
    pub fn pause(&self, campaign_id: i32) {
        if let Some(signal) = self.pause_signals.get(&campaign_id) {
            signal.cancel();
        }
    }

    /// Re-arms the pause signal for a campaign entering `running`.
    pub fn resume(&self, campaign_id: i32) {
        self.pause_signals
            .insert(campaign_id, CancellationToken::new());
    }

    fn pause_signal(&self, campaign_id: i32) -> CancellationToken {
        self.pause_signals
            .entry(campaign_id)
            .or_default()
            .value()
            .clone()
    }

    /// Releases attempts stuck in `processing` beyond the timeout.
    pub async fn recovery_sweep(&self) {
        match self
            .attempts
            .release_stuck(self.config.processing_timeout_seconds)
            .await
        {
            Ok(0) => {}
            Ok(released) => {
                tracing::warn!(released, "Released attempts stuck in processing");
            }
            Err(e) => {
                tracing::error!(error = %e, "Recovery sweep failed");
            }
        }
    }

    /// One serialized unit of work for one campaign: gate, daily reset,
    /// at most one dispatch.
    async fn run_unit(&self, campaign: Campaign) {
        let campaign_id = campaign.id;
        match self.in_flight.entry(campaign_id) {
            Entry::Occupied(_) => {
                tracing::debug!(campaign_id, "Pass already in flight, skipping");
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        if let Err(e) = self.process_campaign(&campaign).await {
            tracing::error!(campaign_id, error = %e, "Campaign pass failed");
        }
        self.in_flight.remove(&campaign_id);
    }

    async fn process_campaign(&self, campaign: &Campaign) -> AppResult<()> {
        let window = match DialWindow::from_campaign(campaign) {
            Ok(window) => window,
            Err(e) => {
                self.store.mark_error(campaign.id, &e.to_string()).await?;
                return Ok(());
            }
        };
        let state = GateState::from_campaign(campaign);

        match gate::evaluate(&window, &state, Utc::now()) {
            gate::Evaluation {
                decision: GateDecision::Dispatch,
                reset_daily,
            } => {
                if reset_daily {
                    let today = Utc::now().with_timezone(&window.tz).date_naive();
                    self.store.reset_daily_counter(campaign.id, today).await?;
                }
                let cancel = self.pause_signal(campaign.id);
                self.dispatcher.dispatch_one(campaign, &cancel).await?;
                Ok(())
            }
            gate::Evaluation {
                decision: GateDecision::Hold { retry_at: Some(at) },
                ..
            } => {
                tracing::debug!(
                    campaign_id = campaign.id,
                    retry_at = %at,
                    "Campaign held by gate"
                );
                self.store
                    .set_next_dispatch_at(campaign.id, Some(at.naive_utc()))
                    .await
            }
            gate::Evaluation {
                decision: GateDecision::Hold { retry_at: None },
                ..
            } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{
        BrokenSource, MemoryAttempts, MemoryStore, ScriptedSender, StaticRecipients, recipient,
    };
    use crate::models::{CampaignChannel, test_campaign};

    fn always_open_campaign(daily_cap: i32) -> Campaign {
        let mut campaign = test_campaign();
        campaign.start_hour = 0;
        campaign.end_hour = 0;
        campaign.calling_days = vec![
            "monday".into(),
            "tuesday".into(),
            "wednesday".into(),
            "thursday".into(),
            "friday".into(),
            "saturday".into(),
            "sunday".into(),
        ];
        campaign.daily_cap = daily_cap;
        campaign
    }

    fn engine_with(
        campaign: Campaign,
        recipients: Vec<crate::engine::types::Recipient>,
    ) -> (Arc<CampaignEngine>, Arc<MemoryStore>, Arc<MemoryAttempts>) {
        let store = Arc::new(MemoryStore::new(vec![campaign]));
        let attempts = Arc::new(MemoryAttempts::new());
        let resolver = Arc::new(StaticRecipients::new(recipients, attempts.clone()));
        let senders = ChannelSenders::new().register(Arc::new(ScriptedSender::always_delivered(
            CampaignChannel::Voice,
        )));
        let engine = CampaignEngine::new(
            store.clone(),
            resolver,
            attempts.clone(),
            senders,
            EngineConfig::default(),
        );
        (engine, store, attempts)
    }

    #[tokio::test]
    async fn each_tick_dispatches_at_most_one_recipient_per_campaign() {
        let (engine, store, attempts) = engine_with(
            always_open_campaign(100),
            vec![recipient("+15550001111"), recipient("+15550002222")],
        );

        engine.tick().await;
        assert_eq!(attempts.completed_count(), 1);
        assert_eq!(store.get_campaign(1).current_daily_calls, 1);

        engine.tick().await;
        assert_eq!(attempts.completed_count(), 2);
        assert_eq!(store.get_campaign(1).current_daily_calls, 2);
    }

    #[tokio::test]
    async fn cap_equal_to_recipient_count_completes_instead_of_blocking() {
        // dailyCap=2 and exactly two recipients: the run must end in
        // `completed`, not in a cap hold with recipients pending.
        let (engine, store, _attempts) = engine_with(
            always_open_campaign(2),
            vec![recipient("+15550001111"), recipient("+15550002222")],
        );

        engine.tick().await;
        assert_eq!(store.get_campaign(1).current_daily_calls, 1);
        engine.tick().await;

        let campaign = store.get_campaign(1);
        assert_eq!(campaign.current_daily_calls, 2);
        assert_eq!(campaign.dials, 2);
        assert_eq!(campaign.execution_status, ExecutionStatus::Completed);

        // Further ticks are no-ops.
        engine.tick().await;
        assert_eq!(store.get_campaign(1).dials, 2);
    }

    #[tokio::test]
    async fn cap_reached_holds_until_next_day_and_stays_running() {
        // dailyCap=1 and three recipients: after one send the gate refuses
        // further dispatch, the campaign stays `running` and the retry
        // points past today.
        let (engine, store, attempts) = engine_with(
            always_open_campaign(1),
            vec![
                recipient("+15550001111"),
                recipient("+15550002222"),
                recipient("+15550003333"),
            ],
        );

        engine.tick().await;
        assert_eq!(store.get_campaign(1).current_daily_calls, 1);

        engine.tick().await;
        let campaign = store.get_campaign(1);
        assert_eq!(campaign.execution_status, ExecutionStatus::Running);
        assert_eq!(attempts.completed_count(), 1);
        let retry = campaign.next_dispatch_at.expect("cap hold schedules a retry");
        assert!(retry > Utc::now().naive_utc());
    }

    #[tokio::test]
    async fn exhaustion_completes_after_exactly_three_dispatches() {
        let (engine, store, attempts) = engine_with(
            always_open_campaign(100),
            vec![
                recipient("+15550001111"),
                recipient("+15550002222"),
                recipient("+15550003333"),
            ],
        );

        for _ in 0..5 {
            engine.tick().await;
        }

        let campaign = store.get_campaign(1);
        assert_eq!(campaign.dials, 3);
        assert_eq!(attempts.completed_count(), 3);
        assert_eq!(campaign.execution_status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn daily_reset_applies_once_before_dispatch() {
        let mut campaign = always_open_campaign(5);
        // Counter exhausted yesterday; today must start from zero.
        campaign.current_daily_calls = 5;
        campaign.daily_calls_date = Some(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let (engine, store, _attempts) = engine_with(campaign, vec![recipient("+15550001111")]);

        engine.tick().await;

        let campaign = store.get_campaign(1);
        assert_eq!(campaign.current_daily_calls, 1);
        assert_eq!(
            campaign.daily_calls_date,
            Some(Utc::now().date_naive())
        );
    }

    #[tokio::test]
    async fn paused_campaigns_are_not_picked_up() {
        let (engine, store, attempts) =
            engine_with(always_open_campaign(100), vec![recipient("+15550001111")]);
        store.set_execution_status(1, ExecutionStatus::Paused);

        engine.tick().await;
        assert_eq!(attempts.total_count(), 0);
    }

    #[tokio::test]
    async fn pause_signal_stops_claims_mid_pass() {
        let (engine, store, attempts) =
            engine_with(always_open_campaign(100), vec![recipient("+15550001111")]);

        engine.resume(1);
        engine.pause(1);
        engine.tick().await;

        // The row still said running, but the flipped signal prevented any
        // claim from being made.
        assert_eq!(attempts.total_count(), 0);
        assert_eq!(store.get_campaign(1).dials, 0);
    }

    #[tokio::test]
    async fn resume_rearms_the_pause_signal() {
        let (engine, store, attempts) =
            engine_with(always_open_campaign(100), vec![recipient("+15550001111")]);

        engine.resume(1);
        engine.pause(1);
        engine.tick().await;
        assert_eq!(attempts.total_count(), 0);

        engine.resume(1);
        engine.tick().await;
        assert_eq!(attempts.completed_count(), 1);
        assert_eq!(store.get_campaign(1).dials, 1);
    }

    #[tokio::test]
    async fn kick_runs_immediately_even_when_not_due() {
        let mut campaign = always_open_campaign(100);
        // Far-future due time: the scheduled loop would skip this campaign.
        campaign.next_dispatch_at = Some(Utc::now().naive_utc() + chrono::Duration::hours(6));
        let (engine, store, _attempts) = engine_with(campaign, vec![recipient("+15550001111")]);

        engine.tick().await;
        assert_eq!(store.get_campaign(1).dials, 0);

        engine.kick(1).await;
        assert_eq!(store.get_campaign(1).dials, 1);
    }

    #[tokio::test]
    async fn configuration_failure_moves_campaign_to_error() {
        let store = Arc::new(MemoryStore::new(vec![always_open_campaign(100)]));
        let attempts = Arc::new(MemoryAttempts::new());
        let senders = ChannelSenders::new().register(Arc::new(ScriptedSender::always_delivered(
            CampaignChannel::Voice,
        )));
        let engine = CampaignEngine::new(
            store.clone(),
            Arc::new(BrokenSource),
            attempts,
            senders,
            EngineConfig::default(),
        );

        engine.tick().await;

        let campaign = store.get_campaign(1);
        assert_eq!(campaign.execution_status, ExecutionStatus::Error);
        assert!(campaign.last_error.is_some());
    }

    #[tokio::test]
    async fn invalid_timezone_moves_campaign_to_error() {
        let mut campaign = always_open_campaign(100);
        campaign.timezone = "Not/AZone".to_string();
        let (engine, store, _attempts) = engine_with(campaign, vec![recipient("+15550001111")]);

        engine.tick().await;
        assert_eq!(store.get_campaign(1).execution_status, ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn outside_window_schedules_retry_and_sends_nothing() {
        let mut campaign = test_campaign(); // Mon-Fri 9-17 UTC
        campaign.start_hour = 0;
        campaign.end_hour = 1; // almost certainly closed while tests run
        campaign.calling_days = vec!["monday".into()];
        let (engine, store, attempts) = engine_with(campaign, vec![recipient("+15550001111")]);

        engine.tick().await;

        let campaign = store.get_campaign(1);
        if campaign.dials == 0 {
            // Held: a retry must be on the books and nothing attempted.
            assert!(campaign.next_dispatch_at.is_some());
            assert_eq!(attempts.total_count(), 0);
        }
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_shuts_down() {
        let (engine, _store, attempts) =
            engine_with(always_open_campaign(100), vec![recipient("+15550001111")]);

        engine.start().await.unwrap();
        engine.start().await.unwrap(); // no second loop
        engine.stop().await.unwrap();
        engine.stop().await.unwrap(); // already stopped is fine

        // The initial eager pass dispatched the one recipient exactly once.
        assert_eq!(attempts.completed_count(), 1);
    }
}
