//! Proactive check-ins: a job queue, message rendering and the polling worker.

pub mod queue;
pub mod render;
pub mod scheduler;
pub mod worker;

pub use queue::{CheckInQueue, JobKind, ScheduledJob, RETURN_PING_HOURS};
pub use render::{render_check_in, Channel, CheckInContext, CheckInMessage};
pub use scheduler::CheckInScheduler;
pub use worker::{CheckInWorker, DeliveryCallback};
