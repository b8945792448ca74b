use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ticketsmith_kernel::run::{RunReport, RunStatus};
use ticketsmith_kernel::task::{IdempotencyKey, TicketTask};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::idempotency::AdmissionStore;
use crate::pipeline::Pipeline;

// ---------------------------------------------------------------------------
// Scheduler — bounded, deduplicated run supervision
// ---------------------------------------------------------------------------

/// Anything the scheduler can drive for a task (the pipeline in
/// production, stubs in tests).
pub trait TaskRunner: Send + Sync {
    fn run_task<'a>(
        &'a self,
        task: &'a TicketTask,
    ) -> Pin<Box<dyn Future<Output = RunReport> + Send + 'a>>;
}

impl TaskRunner for Pipeline {
    fn run_task<'a>(
        &'a self,
        task: &'a TicketTask,
    ) -> Pin<Box<dyn Future<Output = RunReport> + Send + 'a>> {
        Box::pin(self.run(task))
    }
}

/// What happened to a submitted task.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Admitted and spawned; the handle resolves to the run's report.
    Accepted(JoinHandle<RunReport>),
    /// A run for the same (ticket, repository) is already in flight.
    Duplicate,
}

/// Releases the admission when the run ends, including an unwind out of a
/// panicking runner.
struct ReleaseOnDrop {
    admissions: Arc<dyn AdmissionStore>,
    key: IdempotencyKey,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.admissions.release(&self.key);
    }
}

/// Admits tasks through the idempotency gate and runs them on the tokio
/// runtime under a concurrency bound.
///
/// Admission happens before spawning, so a duplicate webhook delivered
/// while the first run is still queued is rejected immediately. The key is
/// released when the run finishes, whatever its outcome.
pub struct Scheduler {
    runner: Arc<dyn TaskRunner>,
    admissions: Arc<dyn AdmissionStore>,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        admissions: Arc<dyn AdmissionStore>,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            runner,
            admissions,
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    pub fn submit(&self, task: TicketTask) -> SubmitOutcome {
        let key = IdempotencyKey::from(&task);
        if !self.admissions.admit(&key) {
            info!(key = %key, "duplicate task, not scheduling");
            return SubmitOutcome::Duplicate;
        }

        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        let release = ReleaseOnDrop {
            admissions: Arc::clone(&self.admissions),
            key,
        };
        let handle = tokio::spawn(async move {
            let _release = release;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // Semaphore closed: scheduler is shutting down.
                    error!(key = %_release.key, "scheduler unavailable, dropping run");
                    return RunReport {
                        run_id: String::new(),
                        ticket_id: task.ticket_id.clone(),
                        status: RunStatus::WorkspaceFault,
                        branch: None,
                        attempts: 0,
                        validation_passed: false,
                        pr_url: None,
                        error: Some("scheduler shut down before run started".into()),
                    };
                }
            };
            runner.run_task(&task).await
        });
        SubmitOutcome::Accepted(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::InMemoryAdmissions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use ticketsmith_kernel::task::GitProvider;

    fn task(ticket: &str) -> TicketTask {
        TicketTask {
            ticket_id: ticket.into(),
            title: "t".into(),
            description: String::new(),
            acceptance_criteria: vec![],
            labels: vec![],
            reporter: None,
            provider: GitProvider::Github,
            repo_owner: "o".into(),
            repo_name: "r".into(),
            repo_full_name: "o/r".into(),
            default_branch: "main".into(),
            raw_payload: serde_json::Value::Null,
        }
    }

    fn report_for(task: &TicketTask) -> RunReport {
        RunReport {
            run_id: "run".into(),
            ticket_id: task.ticket_id.clone(),
            status: RunStatus::DeliverySkipped,
            branch: None,
            attempts: 1,
            validation_passed: true,
            pr_url: None,
            error: None,
        }
    }

    /// Sleeps a little and tracks how many runs are in flight at once.
    struct SlowRunner {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowRunner {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl TaskRunner for SlowRunner {
        fn run_task<'a>(
            &'a self,
            task: &'a TicketTask,
        ) -> Pin<Box<dyn Future<Output = RunReport> + Send + 'a>> {
            Box::pin(async move {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                report_for(task)
            })
        }
    }

    fn scheduler(runner: Arc<dyn TaskRunner>, max: usize) -> Scheduler {
        let admissions = Arc::new(InMemoryAdmissions::new(Duration::from_secs(60)));
        Scheduler::new(runner, admissions, max)
    }

    #[tokio::test]
    async fn duplicate_while_running_is_rejected() {
        let sched = scheduler(Arc::new(SlowRunner::new()), 4);
        let first = sched.submit(task("#1"));
        let second = sched.submit(task("#1"));
        assert!(matches!(second, SubmitOutcome::Duplicate));

        let SubmitOutcome::Accepted(handle) = first else {
            panic!("first submit not accepted");
        };
        let report = handle.await.unwrap();
        assert_eq!(report.ticket_id, "#1");
    }

    struct PanicRunner;

    impl TaskRunner for PanicRunner {
        fn run_task<'a>(
            &'a self,
            _task: &'a TicketTask,
        ) -> Pin<Box<dyn Future<Output = RunReport> + Send + 'a>> {
            Box::pin(async { panic!("runner exploded") })
        }
    }

    #[tokio::test]
    async fn key_released_after_run_allows_resubmission() {
        let sched = scheduler(Arc::new(SlowRunner::new()), 4);
        let SubmitOutcome::Accepted(handle) = sched.submit(task("#1")) else {
            panic!("not accepted");
        };
        handle.await.unwrap();
        assert!(matches!(sched.submit(task("#1")), SubmitOutcome::Accepted(_)));
    }

    #[tokio::test]
    async fn key_released_when_runner_panics() {
        let sched = scheduler(Arc::new(PanicRunner), 4);
        let SubmitOutcome::Accepted(handle) = sched.submit(task("#1")) else {
            panic!("not accepted");
        };
        assert!(handle.await.is_err());
        assert!(matches!(sched.submit(task("#1")), SubmitOutcome::Accepted(_)));
    }

    #[tokio::test]
    async fn distinct_tickets_run_independently() {
        let sched = scheduler(Arc::new(SlowRunner::new()), 4);
        assert!(matches!(sched.submit(task("#1")), SubmitOutcome::Accepted(_)));
        assert!(matches!(sched.submit(task("#2")), SubmitOutcome::Accepted(_)));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let runner = Arc::new(SlowRunner::new());
        let sched = scheduler(runner.clone(), 2);

        let mut handles = Vec::new();
        for i in 0..6 {
            match sched.submit(task(&format!("#{i}"))) {
                SubmitOutcome::Accepted(h) => handles.push(h),
                SubmitOutcome::Duplicate => panic!("unexpected duplicate"),
            }
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
    }
}
