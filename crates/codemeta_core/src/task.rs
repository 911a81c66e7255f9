//! Cancellable background execution for reconciliation runs.
//!
//! # Responsibility
//! - Provide a shared cancel flag checked by the walker and the engine.
//! - Keep at most one in-flight run per project; a new run cancels the old.
//!
//! # Invariants
//! - Last started wins: a superseded run always joins as cancelled, even if
//!   its job already produced a value.
//! - The registry keeps the latest token per project until that run is
//!   joined or the project is forgotten.

use crate::model::project::ProjectId;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

/// Cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Outcome of a scheduled job.
#[derive(Debug)]
pub enum TaskOutcome<T, E> {
    /// Job finished and was still the current run for its project.
    Completed(Result<T, E>),
    /// Job was superseded or cancelled; its result must not be applied.
    Cancelled,
    /// Worker thread panicked.
    Panicked,
}

type Registry = Arc<Mutex<HashMap<ProjectId, CancelToken>>>;

/// Per-project last-started-wins scheduler.
#[derive(Debug, Clone, Default)]
pub struct ReconcileScheduler {
    in_flight: Registry,
}

impl ReconcileScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `job` on a worker thread, cancelling any earlier run for the
    /// same project.
    pub fn spawn<T, E, F>(&self, project_id: ProjectId, job: F) -> ReconcileHandle<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
    {
        let token = CancelToken::new();
        {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = in_flight.insert(project_id, token.clone()) {
                previous.cancel();
                info!(
                    "event=reconcile_superseded module=task status=ok project_id={}",
                    project_id
                );
            }
        }

        let worker_token = token.clone();
        let join = std::thread::spawn(move || job(&worker_token));

        debug!(
            "event=reconcile_spawn module=task status=ok project_id={}",
            project_id
        );
        ReconcileHandle {
            project_id,
            token,
            registry: Arc::clone(&self.in_flight),
            join,
        }
    }

    /// Cancels the latest run of `project_id`, if any.
    pub fn cancel(&self, project_id: ProjectId) -> bool {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match in_flight.get(&project_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of projects with a run that has not been joined yet.
    pub fn tracked(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Cancels and drops the latest run of `project_id`, e.g. on project close.
    pub fn forget(&self, project_id: ProjectId) {
        let removed = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&project_id);
        if let Some(token) = removed {
            token.cancel();
        }
    }
}

/// Handle to one scheduled run.
#[derive(Debug)]
pub struct ReconcileHandle<T, E> {
    project_id: ProjectId,
    token: CancelToken,
    registry: Registry,
    join: JoinHandle<Result<T, E>>,
}

impl<T, E> ReconcileHandle<T, E> {
    /// Cancels this run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the worker and applies last-started-wins.
    ///
    /// Joining the current run of a project releases its registry entry.
    pub fn join(self) -> TaskOutcome<T, E> {
        let joined = self.join.join();

        // Decide under the lock so a concurrent spawn either supersedes this
        // run or finds the entry already released.
        let cancelled = {
            let mut in_flight = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let cancelled = self.token.is_cancelled();
            if in_flight
                .get(&self.project_id)
                .is_some_and(|current| current.same_as(&self.token))
            {
                in_flight.remove(&self.project_id);
            }
            cancelled
        };

        match joined {
            Ok(_) if cancelled => TaskOutcome::Cancelled,
            Ok(result) => TaskOutcome::Completed(result),
            Err(_) => {
                warn!("event=reconcile_join module=task status=error error_code=worker_panicked");
                TaskOutcome::Panicked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, ReconcileScheduler, TaskOutcome};
    use std::sync::mpsc;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn completed_run_returns_job_result() {
        let scheduler = ReconcileScheduler::new();
        let project = Uuid::new_v4();
        let handle = scheduler.spawn(project, |_| Ok::<_, ()>(7));
        assert!(matches!(handle.join(), TaskOutcome::Completed(Ok(7))));
    }

    #[test]
    fn newer_run_supersedes_older_one_for_same_project() {
        let scheduler = ReconcileScheduler::new();
        let project = Uuid::new_v4();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let first = scheduler.spawn(project, move |_| {
            release_rx
                .recv_timeout(Duration::from_secs(5))
                .map_err(|_| "not released")?;
            Ok::<_, &'static str>("stale")
        });
        let second = scheduler.spawn(project, |_| Ok::<_, &'static str>("fresh"));
        release_tx.send(()).unwrap();

        assert!(matches!(first.join(), TaskOutcome::Cancelled));
        assert!(matches!(second.join(), TaskOutcome::Completed(Ok("fresh"))));
    }

    #[test]
    fn finished_but_unjoined_run_is_still_superseded() {
        let scheduler = ReconcileScheduler::new();
        let project = Uuid::new_v4();
        let first = scheduler.spawn(project, |_| Ok::<_, ()>(1));
        std::thread::sleep(Duration::from_millis(20));
        let second = scheduler.spawn(project, |_| Ok::<_, ()>(2));

        assert!(matches!(first.join(), TaskOutcome::Cancelled));
        assert!(matches!(second.join(), TaskOutcome::Completed(Ok(2))));

        assert!(!scheduler.cancel(project));
    }

    #[test]
    fn joining_current_run_releases_registry_entry() {
        let scheduler = ReconcileScheduler::new();
        let projects: Vec<_> = (0..8).map(|_| Uuid::new_v4()).collect();
        let handles: Vec<_> = projects
            .iter()
            .map(|&project| scheduler.spawn(project, |_| Ok::<_, ()>(())))
            .collect();
        assert_eq!(scheduler.tracked(), projects.len());

        for handle in handles {
            assert!(matches!(handle.join(), TaskOutcome::Completed(Ok(()))));
        }
        assert_eq!(scheduler.tracked(), 0);
    }

    #[test]
    fn forget_cancels_unjoined_run() {
        let scheduler = ReconcileScheduler::new();
        let project = Uuid::new_v4();
        let handle = scheduler.spawn(project, |_| Ok::<_, ()>(1));
        scheduler.forget(project);
        assert!(handle.is_cancelled());
        assert!(matches!(handle.join(), TaskOutcome::Cancelled));
        assert_eq!(scheduler.tracked(), 0);
    }

    #[test]
    fn runs_for_different_projects_do_not_cancel_each_other() {
        let scheduler = ReconcileScheduler::new();
        let first = scheduler.spawn(Uuid::new_v4(), |_| Ok::<_, ()>(1));
        let second = scheduler.spawn(Uuid::new_v4(), |_| Ok::<_, ()>(2));
        assert!(matches!(first.join(), TaskOutcome::Completed(Ok(1))));
        assert!(matches!(second.join(), TaskOutcome::Completed(Ok(2))));
    }

    #[test]
    fn explicit_cancel_is_observed_by_job() {
        let scheduler = ReconcileScheduler::new();
        let project = Uuid::new_v4();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let handle = scheduler.spawn(project, move |token| {
            started_tx.send(()).map_err(|_| ())?;
            while !token.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err::<(), ()>(())
        });

        started_rx.recv().unwrap();
        assert!(scheduler.cancel(project));
        assert!(matches!(handle.join(), TaskOutcome::Cancelled));
    }
}
