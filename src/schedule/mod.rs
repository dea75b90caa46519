//! Daily ambient posts.
//!
//! Each configured base time is shifted once, at setup, by a uniform random
//! offset and then fires every day at the resulting local wall-clock time.
//! A firing posts a joke or quote only while the chat is quiet; when people
//! are talking the slot is dropped for that day.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime, NaiveTime, TimeZone};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::OutboundMessage;
use crate::channels::Channel;
use crate::config::{Config, PostTime};
use crate::content::{ContentGenerator, ContentKind};
use crate::monitor::ActivityMonitor;
use crate::utils::string::log_preview;

/// How long `stop` waits for an in-flight firing before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Lateness past which a slot counts as missed and is not posted.
const MISFIRE_GRACE: Duration = Duration::from_secs(60);

/// A randomized daily trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleEntry {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleEntry {
    /// Shift `base` by `offset_minutes`.
    ///
    /// Minute overflow carries one hour in either direction; the hour is then
    /// clamped to `0..=23` and the minute to `0..=59`. Clamping does not wrap
    /// across midnight, so `23:50 + 20` lands on `23:10`.
    pub fn with_offset(base: PostTime, offset_minutes: i32) -> Self {
        let mut hour = base.hour as i64;
        let mut minute = base.minute as i64 + offset_minutes as i64;

        if minute < 0 {
            minute += 60;
            hour -= 1;
        } else if minute >= 60 {
            minute -= 60;
            hour += 1;
        }

        Self {
            hour: hour.clamp(0, 23) as u32,
            minute: minute.clamp(0, 59) as u32,
        }
    }

    /// Shift `base` by an offset drawn uniformly from `[-max, +max]` minutes.
    pub fn randomized<R: Rng + ?Sized>(base: PostTime, max_offset_minutes: u32, rng: &mut R) -> Self {
        let max = max_offset_minutes as i32;
        let offset = if max == 0 { 0 } else { rng.gen_range(-max..=max) };
        Self::with_offset(base, offset)
    }

    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Randomize every base time with the thread RNG.
pub fn plan_entries(posts: &[PostTime], max_offset_minutes: u32) -> Vec<ScheduleEntry> {
    plan_entries_with(posts, max_offset_minutes, &mut rand::thread_rng())
}

/// Randomize every base time, sorted by time of day.
///
/// Entries that land on the same minute collapse into one firing.
pub fn plan_entries_with<R: Rng + ?Sized>(
    posts: &[PostTime],
    max_offset_minutes: u32,
    rng: &mut R,
) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = posts
        .iter()
        .map(|post| ScheduleEntry::randomized(*post, max_offset_minutes, rng))
        .collect();
    entries.sort();

    let before = entries.len();
    entries.dedup();
    if entries.len() < before {
        crate::log_component!(
            warn,
            "schedule",
            "collapsed colliding post times",
            dropped = before - entries.len()
        );
    }
    entries
}

/// The earliest firing strictly after `after`, today or tomorrow.
pub fn next_fire_after(entries: &[ScheduleEntry], after: NaiveDateTime) -> Option<NaiveDateTime> {
    let today = after.date();
    let tomorrow = today.succ_opt()?;

    entries
        .iter()
        .map(|entry| {
            let at = today.and_time(entry.time());
            if at > after {
                at
            } else {
                tomorrow.and_time(entry.time())
            }
        })
        .min()
}

/// The next slot to wait for once `last` has been handled and the wall clock
/// reads `now`.
///
/// Slots that went by while the timer was stalled (host suspend, clock jump)
/// are not replayed.
pub fn next_fire_resuming(
    entries: &[ScheduleEntry],
    last: NaiveDateTime,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    next_fire_after(entries, last.max(now))
}

/// Whether a slot reached at wall time `now` is too late to post.
fn is_misfire(scheduled: NaiveDateTime, now: NaiveDateTime, grace: Duration) -> bool {
    (now - scheduled).to_std().is_ok_and(|late| late > grace)
}

/// Real-time delay from now until local wall-clock time `at`.
///
/// An ambiguous local time (DST fold) resolves to its earlier instant. A
/// time that does not exist (DST gap) yields `None`.
fn delay_until_local(at: NaiveDateTime) -> Option<Duration> {
    let target = Local.from_local_datetime(&at).earliest()?;
    Some((target - Local::now()).to_std().unwrap_or(Duration::ZERO))
}

/// What a single firing did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// The chat was active; nothing was posted
    SkippedActive,
    /// Ambient content was posted
    Posted { kind: ContentKind, fallback: bool },
    /// Content was generated but the send failed
    SendFailed,
}

/// Owns the daily timer task.
pub struct ScheduleController {
    entries: Vec<ScheduleEntry>,
    chat_id: String,
    activity_timeout: Duration,
    monitor: Arc<ActivityMonitor>,
    generator: Arc<ContentGenerator>,
    channel: Arc<dyn Channel>,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduleController {
    pub fn new(
        entries: Vec<ScheduleEntry>,
        chat_id: &str,
        activity_timeout: Duration,
        monitor: Arc<ActivityMonitor>,
        generator: Arc<ContentGenerator>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            entries,
            chat_id: chat_id.to_string(),
            activity_timeout,
            monitor,
            generator,
            channel,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Build from config, randomizing the configured post times.
    pub fn from_config(
        config: &Config,
        monitor: Arc<ActivityMonitor>,
        generator: Arc<ContentGenerator>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        let entries = if config.schedule.enabled {
            plan_entries(&config.schedule.posts, config.schedule.max_offset_minutes)
        } else {
            Vec::new()
        };
        Self::new(
            entries,
            &config.monitor.chat_id,
            Duration::from_secs(config.monitor.activity_timeout_secs),
            monitor,
            generator,
            channel,
        )
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Spawn the timer task. Calling it again while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        if self.entries.is_empty() {
            crate::log_component!(info, "schedule", "no scheduled posts configured");
            return;
        }

        self.shutdown_tx.send_replace(false);
        for entry in &self.entries {
            crate::log_component!(
                info,
                "schedule",
                "post scheduled",
                at = tracing::field::display(entry)
            );
        }

        let this = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        *slot = Some(tokio::spawn(async move { this.run(shutdown_rx).await }));
    }

    async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut last = Local::now().naive_local();

        loop {
            // A stop can land before this task is first polled
            if *shutdown_rx.borrow_and_update() {
                break;
            }
            let Some(next) = next_fire_resuming(&self.entries, last, Local::now().naive_local())
            else {
                return;
            };
            let Some(wait) = delay_until_local(next) else {
                crate::log_component!(
                    warn,
                    "schedule",
                    "post time does not exist today, skipping",
                    at = tracing::field::display(next)
                );
                last = next;
                continue;
            };

            crate::log_component!(
                debug,
                "schedule",
                "waiting for next post",
                at = tracing::field::display(next),
                wait_secs = wait.as_secs()
            );

            tokio::select! {
                _ = shutdown_rx.changed() => continue,
                _ = tokio::time::sleep(wait) => {}
            }

            let woke = Local::now().naive_local();
            if is_misfire(next, woke, MISFIRE_GRACE) {
                crate::log_component!(
                    warn,
                    "schedule",
                    "missed post time, skipping",
                    at = tracing::field::display(next),
                    late_secs = (woke - next).num_seconds()
                );
            } else {
                self.fire(Instant::now()).await;
            }
            last = next;
        }

        crate::log_component!(info, "schedule", "scheduler stopped");
    }

    /// One firing: post ambient content unless the chat is active at `now`.
    pub async fn fire(&self, now: Instant) -> FireOutcome {
        if self.monitor.is_active(now, self.activity_timeout) {
            crate::log_component!(
                info,
                "schedule",
                "chat is active, skipping scheduled post",
                counter = self.monitor.counter()
            );
            return FireOutcome::SkippedActive;
        }

        let content = self.generator.generate_ambient_content().await;
        let outbound = OutboundMessage::new(&self.chat_id, &content.text);

        match self.channel.send(outbound).await {
            Ok(()) => {
                crate::log_component!(
                    info,
                    "schedule",
                    "scheduled post sent",
                    kind = content.kind.as_str(),
                    fallback = content.fallback,
                    preview = log_preview(&content.text).as_str()
                );
                FireOutcome::Posted {
                    kind: content.kind,
                    fallback: content.fallback,
                }
            }
            Err(e) => {
                crate::log_component!(
                    error,
                    "schedule",
                    "failed to send scheduled post",
                    error = tracing::field::display(&e)
                );
                FireOutcome::SendFailed
            }
        }
    }

    /// Stop firing. An in-flight post gets a short grace period, then the
    /// task is aborted.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut handle) = handle {
            if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                crate::log_component!(warn, "schedule", "aborting in-flight scheduled post");
                handle.abort();
            }
        }
    }
}
