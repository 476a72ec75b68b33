//! Check-in worker: drains due jobs, renders them and hands them to delivery.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::checkin::queue::{CheckInQueue, JobKind, ScheduledJob, RETURN_PING_HOURS};
use crate::checkin::render::{render_check_in, CheckInContext, CheckInMessage};
use crate::clock::Clock;
use crate::store::SafeStore;
use crate::types::UserId;

/// Transport hook for rendered check-ins. The worker never assumes one.
pub type DeliveryCallback = Arc<dyn Fn(UserId, CheckInMessage) + Send + Sync>;

#[derive(Debug, Default)]
struct WorkerState {
    queue: CheckInQueue,
    enrolled: BTreeSet<UserId>,
    /// Last-message instant each user was already pinged for.
    pinged_for: HashMap<UserId, DateTime<Utc>>,
}

pub struct CheckInWorker {
    store: SafeStore,
    clock: Arc<dyn Clock>,
    state: Mutex<WorkerState>,
    delivery: Option<DeliveryCallback>,
}

impl CheckInWorker {
    pub fn new(store: SafeStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: Mutex::new(WorkerState::default()),
            delivery: None,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryCallback) -> Self {
        self.delivery = Some(delivery);
        self
    }

    fn state(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed the recurring jobs and the return ping for a user.
    ///
    /// Returns `false` when the user was already enrolled.
    pub fn enroll(&self, user_id: UserId) -> bool {
        let now = self.clock.now();
        let anchor = self.last_activity(user_id).unwrap_or(now);

        let mut state = self.state();
        if !state.enrolled.insert(user_id) {
            return false;
        }
        for kind in JobKind::recurring() {
            state.queue.push(ScheduledJob {
                run_at: kind.next_run_after(now),
                user_id,
                kind,
            });
        }
        state.queue.push(ScheduledJob {
            run_at: JobKind::ReturnPing.next_run_after(anchor),
            user_id,
            kind: JobKind::ReturnPing,
        });
        debug!(user_id, "Enrolled user for check-ins");
        true
    }

    pub fn is_enrolled(&self, user_id: UserId) -> bool {
        self.state().enrolled.contains(&user_id)
    }

    pub fn enrolled_count(&self) -> usize {
        self.state().enrolled.len()
    }

    /// Pending jobs for one user, earliest first.
    pub fn pending(&self, user_id: UserId) -> Vec<ScheduledJob> {
        self.state().queue.jobs_for(user_id)
    }

    /// One worker tick.
    ///
    /// Re-arms every return ping from the latest logged message, pops all due
    /// jobs, renders them and reschedules the recurring ones. Returns what was
    /// delivered.
    pub fn poll(&self) -> Vec<(UserId, CheckInMessage)> {
        let now = self.clock.now();

        let users: Vec<UserId> = self.state().enrolled.iter().copied().collect();
        let anchors: Vec<(UserId, DateTime<Utc>)> = users
            .into_iter()
            .map(|user_id| (user_id, self.last_activity(user_id).unwrap_or(now)))
            .collect();

        let due = {
            let mut state = self.state();
            for (user_id, anchor) in &anchors {
                let run_at = JobKind::ReturnPing.next_run_after(*anchor);
                state.queue.rearm(*user_id, JobKind::ReturnPing, run_at);
            }

            let mut due = Vec::new();
            for job in state.queue.pop_due(now) {
                if JobKind::recurring().contains(&job.kind) {
                    state.queue.push(ScheduledJob {
                        run_at: job.kind.next_run_after(now),
                        ..job
                    });
                    due.push(job);
                    continue;
                }

                let anchor = job.run_at - Duration::hours(RETURN_PING_HOURS);
                if state.pinged_for.get(&job.user_id) == Some(&anchor) {
                    continue;
                }
                state.pinged_for.insert(job.user_id, anchor);
                due.push(job);
            }
            due
        };

        let delivered: Vec<(UserId, CheckInMessage)> = due
            .into_iter()
            .map(|job| (job.user_id, self.render(job)))
            .collect();

        if let Some(delivery) = &self.delivery {
            for (user_id, message) in &delivered {
                delivery(*user_id, message.clone());
            }
        }
        if !delivered.is_empty() {
            info!(count = delivered.len(), "Delivered check-ins");
        }
        delivered
    }

    fn render(&self, job: ScheduledJob) -> CheckInMessage {
        let context = CheckInContext::gather(
            &self.store.get_core(job.user_id),
            &self.store.get_domains(job.user_id),
            &self.store.get_micro_modules(job.user_id),
        );
        debug!(user_id = job.user_id, kind = %job.kind, "Rendering check-in");
        render_check_in(job.kind, &context)
    }

    fn last_activity(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.store
            .list_recent_messages(user_id, 1)
            .last()
            .map(|message| message.created_at)
    }
}

impl std::fmt::Debug for CheckInWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckInWorker")
            .field("enrolled", &self.enrolled_count())
            .field("has_delivery", &self.delivery.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::render::Channel;
    use crate::clock::ManualClock;
    use crate::store::SqliteProfileStore;
    use crate::types::MessageRole;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        // March 2024: the 4th is a Monday
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn worker() -> (SafeStore, Arc<ManualClock>, CheckInWorker) {
        let store = SafeStore::new(Arc::new(SqliteProfileStore::in_memory().unwrap()));
        let clock = Arc::new(ManualClock::new(at(4, 8, 0)));
        let worker = CheckInWorker::new(store.clone(), clock.clone());
        (store, clock, worker)
    }

    fn kinds(delivered: &[(UserId, CheckInMessage)]) -> Vec<JobKind> {
        delivered.iter().map(|(_, m)| m.kind).collect()
    }

    #[test]
    fn test_enroll_seeds_all_kinds_once() {
        let (_, _, worker) = worker();
        assert!(worker.enroll(1));
        assert!(!worker.enroll(1));
        assert!(worker.is_enrolled(1));

        let pending = worker.pending(1);
        assert_eq!(pending.len(), 4);
        assert_eq!(pending[0].kind, JobKind::Daily);
        assert_eq!(pending[0].run_at, at(4, 9, 0));
        assert_eq!(pending[1].kind, JobKind::MotivationalMission);
        assert_eq!(pending[1].run_at, at(4, 10, 30));
        assert_eq!(pending[2].kind, JobKind::ReturnPing);
        assert_eq!(pending[3].kind, JobKind::WeeklyReview);
        assert_eq!(pending[3].run_at, at(8, 18, 0));
    }

    #[test]
    fn test_poll_delivers_due_jobs_and_reschedules() {
        let (_, clock, worker) = worker();
        worker.enroll(1);
        assert!(worker.poll().is_empty());

        clock.set(at(4, 9, 0));
        let delivered = worker.poll();
        assert_eq!(kinds(&delivered), vec![JobKind::Daily]);
        assert_eq!(delivered[0].1.title, "Check-in diário");
        assert_eq!(delivered[0].1.channel, Channel::Chat);

        let daily = worker
            .pending(1)
            .into_iter()
            .find(|job| job.kind == JobKind::Daily)
            .unwrap();
        assert_eq!(daily.run_at, at(5, 9, 0));
        assert!(worker.poll().is_empty());
    }

    #[test]
    fn test_return_ping_fires_once_per_last_message() {
        let (store, clock, worker) = worker();
        store.log_message(1, MessageRole::User, "oi", at(4, 8, 0));
        worker.enroll(1);

        clock.set(at(4, 14, 0));
        let delivered = worker.poll();
        assert!(kinds(&delivered).contains(&JobKind::ReturnPing));

        clock.set(at(4, 14, 5));
        assert!(!kinds(&worker.poll()).contains(&JobKind::ReturnPing));

        // a new message re-arms the ping six hours later
        store.log_message(1, MessageRole::User, "voltei", at(4, 15, 0));
        clock.set(at(4, 20, 59));
        assert!(!kinds(&worker.poll()).contains(&JobKind::ReturnPing));
        clock.set(at(4, 21, 0));
        assert!(kinds(&worker.poll()).contains(&JobKind::ReturnPing));
    }

    #[test]
    fn test_no_return_ping_without_messages() {
        let (_, clock, worker) = worker();
        worker.enroll(1);
        clock.advance(Duration::hours(30));
        let delivered = worker.poll();
        assert!(!kinds(&delivered).contains(&JobKind::ReturnPing));
        assert!(kinds(&delivered).contains(&JobKind::Daily));
    }

    #[test]
    fn test_delivery_callback_receives_messages() {
        let (store, clock, _) = worker();
        let received: Arc<Mutex<Vec<(UserId, CheckInMessage)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let worker = CheckInWorker::new(store, clock.clone()).with_delivery(Arc::new(
            move |user_id: UserId, message: CheckInMessage| sink.lock().unwrap().push((user_id, message)),
        ));
        worker.enroll(7);

        clock.set(at(4, 10, 30));
        let delivered = worker.poll();
        assert_eq!(delivered.len(), 2);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].0, 7);
        assert_eq!(received[1].1.title, "Missão do dia");
    }
}
