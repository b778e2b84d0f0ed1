//! Rate/window gate: the pure eligibility decision for one campaign.
//!
//! Given a campaign's dial window, its counters and the current instant,
//! decides whether a dispatch may happen now and, if not, when to retry.
//! No hidden state: the same inputs always produce the same decision.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};
use crate::models::{Campaign, ExecutionStatus};

/// Allowed days, hour range and timezone of a campaign.
#[derive(Debug, Clone)]
pub struct DialWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub days: Vec<Weekday>,
    pub tz: Tz,
}

impl DialWindow {
    /// Builds the window from campaign configuration.
    ///
    /// An unknown timezone or day name, or an empty day set, is a
    /// configuration error: the campaign cannot make progress until the
    /// user fixes it.
    pub fn from_campaign(campaign: &Campaign) -> AppResult<Self> {
        let tz: Tz = campaign
            .timezone
            .parse()
            .map_err(|_| AppError::Configuration {
                key: "campaign.timezone".to_string(),
                source: anyhow::anyhow!(
                    "Unknown timezone '{}' on campaign {}",
                    campaign.timezone,
                    campaign.id
                ),
            })?;

        let mut days = Vec::with_capacity(campaign.calling_days.len());
        for name in &campaign.calling_days {
            let day: Weekday = name.parse().map_err(|_| AppError::Configuration {
                key: "campaign.calling_days".to_string(),
                source: anyhow::anyhow!(
                    "Unknown day name '{}' on campaign {}",
                    name,
                    campaign.id
                ),
            })?;
            days.push(day);
        }
        if days.is_empty() {
            return Err(AppError::Configuration {
                key: "campaign.calling_days".to_string(),
                source: anyhow::anyhow!("Campaign {} has no calling days", campaign.id),
            });
        }

        Ok(Self {
            start_hour: campaign.start_hour.clamp(0, 23) as u32,
            end_hour: campaign.end_hour.clamp(0, 23) as u32,
            days,
            tz,
        })
    }

    /// 0..0 means always open (no hour restriction).
    pub fn is_always_open(&self) -> bool {
        self.start_hour == 0 && self.end_hour == 0
    }

    fn day_allowed(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Hour-of-day check; `start > end` wraps past midnight.
    fn hour_open(&self, hour: u32) -> bool {
        if self.is_always_open() {
            return true;
        }
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Counter snapshot the gate decides over.
#[derive(Debug, Clone)]
pub struct GateState {
    pub execution_status: ExecutionStatus,
    pub daily_cap: i32,
    pub current_daily_calls: i32,
    pub daily_calls_date: Option<NaiveDate>,
}

impl GateState {
    pub fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            execution_status: campaign.execution_status,
            daily_cap: campaign.daily_cap,
            current_daily_calls: campaign.current_daily_calls,
            daily_calls_date: campaign.daily_calls_date,
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Dispatch one recipient now.
    Dispatch,
    /// Hold. `retry_at = None` means explicit user action is required
    /// (campaign not running); otherwise the next instant worth checking.
    Hold { retry_at: Option<DateTime<Utc>> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: GateDecision,
    /// A new local day has begun since the counter was last reset. The
    /// caller zeroes the daily counter exactly once before dispatching.
    pub reset_daily: bool,
}

/// Evaluates the gate rules in order: execution status, weekday, hour
/// window, day-boundary reset, daily cap.
pub fn evaluate(window: &DialWindow, state: &GateState, now: DateTime<Utc>) -> Evaluation {
    if state.execution_status != ExecutionStatus::Running {
        return Evaluation {
            decision: GateDecision::Hold { retry_at: None },
            reset_daily: false,
        };
    }

    let local = now.with_timezone(&window.tz);
    let today = local.date_naive();

    if !window.day_allowed(local.weekday()) || !window.hour_open(local.hour()) {
        return Evaluation {
            decision: GateDecision::Hold {
                retry_at: next_window_open(window, now, 0),
            },
            reset_daily: false,
        };
    }

    let reset_daily = state.daily_calls_date != Some(today);
    let effective_calls = if reset_daily {
        0
    } else {
        state.current_daily_calls
    };

    if state.daily_cap > 0 && effective_calls >= state.daily_cap {
        return Evaluation {
            decision: GateDecision::Hold {
                retry_at: next_window_open(window, now, 1),
            },
            reset_daily,
        };
    }

    Evaluation {
        decision: GateDecision::Dispatch,
        reset_daily,
    }
}

/// The next instant, strictly after `now`, at which the window opens on an
/// allowed day. `min_day_offset = 1` skips the rest of today (used when the
/// daily cap is exhausted). Returns `None` only for windows with no allowed
/// day, which `DialWindow::from_campaign` already rejects.
pub fn next_window_open(
    window: &DialWindow,
    now: DateTime<Utc>,
    min_day_offset: i64,
) -> Option<DateTime<Utc>> {
    let local = now.with_timezone(&window.tz);
    let today = local.date_naive();

    for offset in min_day_offset..=(min_day_offset + 7) {
        let date = today + Duration::days(offset);
        if !window.day_allowed(date.weekday()) {
            continue;
        }
        let opens = date.and_hms_opt(window.start_hour, 0, 0)?;
        let candidate = resolve_local(&window.tz, opens)?;
        if candidate > now {
            return Some(candidate);
        }
    }
    None
}

/// Maps a local wall-clock time into UTC, resolving DST folds to the
/// earlier instant and shifting DST gaps forward one hour.
fn resolve_local(tz: &Tz, naive: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
    let resolved = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()?,
    };
    Some(resolved.with_timezone(&Utc))
}
