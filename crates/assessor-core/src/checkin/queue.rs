//! Min-heap of scheduled check-in jobs and the fixed cron table.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::types::UserId;

/// Gap between a user's last message and the return ping.
pub const RETURN_PING_HOURS: i64 = 6;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Daily,
    MotivationalMission,
    WeeklyReview,
    ReturnPing,
}

impl JobKind {
    /// Kinds seeded from the cron table; `ReturnPing` is armed per poll.
    pub fn recurring() -> [JobKind; 3] {
        [JobKind::Daily, JobKind::MotivationalMission, JobKind::WeeklyReview]
    }

    /// Next run strictly after `after` for recurring kinds.
    ///
    /// `ReturnPing` has no fixed slot and is scheduled `RETURN_PING_HOURS` out.
    pub fn next_run_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            JobKind::Daily => next_daily(after, 9, 0),
            JobKind::MotivationalMission => next_daily(after, 10, 30),
            JobKind::WeeklyReview => next_weekly(after, Weekday::Fri, 18, 0),
            JobKind::ReturnPing => after + Duration::hours(RETURN_PING_HOURS),
        }
    }
}

/// A job waiting in the queue. Ordered by `run_at`, then user, then kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduledJob {
    pub run_at: DateTime<Utc>,
    pub user_id: UserId,
    pub kind: JobKind,
}

#[derive(Debug, Default)]
pub struct CheckInQueue {
    heap: BinaryHeap<Reverse<ScheduledJob>>,
}

impl CheckInQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: ScheduledJob) {
        self.heap.push(Reverse(job));
    }

    pub fn peek(&self) -> Option<&ScheduledJob> {
        self.heap.peek().map(|Reverse(job)| job)
    }

    /// Pop every job whose `run_at` is at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledJob> {
        let mut due = Vec::new();
        while self.peek().is_some_and(|job| job.run_at <= now) {
            if let Some(Reverse(job)) = self.heap.pop() {
                due.push(job);
            }
        }
        due
    }

    /// Replace the pending job of `kind` for `user_id`.
    pub fn rearm(&mut self, user_id: UserId, kind: JobKind, run_at: DateTime<Utc>) {
        self.heap
            .retain(|Reverse(job)| !(job.user_id == user_id && job.kind == kind));
        self.push(ScheduledJob {
            run_at,
            user_id,
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending jobs for one user, earliest first.
    pub fn jobs_for(&self, user_id: UserId) -> Vec<ScheduledJob> {
        let mut jobs: Vec<ScheduledJob> = self
            .heap
            .iter()
            .map(|Reverse(job)| *job)
            .filter(|job| job.user_id == user_id)
            .collect();
        jobs.sort();
        jobs
    }
}

fn at_time(day: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    day.date_naive().and_time(time).and_utc()
}

/// Next `hour:minute` strictly after `after`.
pub fn next_daily(after: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = at_time(after, hour, minute);
    if today > after {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Next `weekday hour:minute` strictly after `after`.
pub fn next_weekly(after: DateTime<Utc>, weekday: Weekday, hour: u32, minute: u32) -> DateTime<Utc> {
    let days_ahead = (7 + weekday.num_days_from_monday() as i64
        - after.weekday().num_days_from_monday() as i64)
        % 7;
    let candidate = at_time(after + Duration::days(days_ahead), hour, minute);
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}
