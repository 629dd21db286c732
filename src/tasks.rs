//! Supervised background tasks
//!
//! Side work that must not hold up a response still gets a deadline and a
//! reported outcome. Every task ends in exactly one `TaskReport`, published on
//! a broadcast channel and counted for `/health`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
}

/// Counters exposed on `/health`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub spawned: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub in_flight: u64,
}

/// Result of draining on shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub completed: usize,
    pub abandoned: usize,
}

#[derive(Default)]
struct Counters {
    spawned: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// A running task: its name and a handle on the work itself
struct InFlight {
    name: String,
    work: AbortHandle,
}

struct Shared {
    reports: broadcast::Sender<TaskReport>,
    counters: Counters,
    in_flight: DashMap<u64, InFlight>,
    next_id: AtomicU64,
}

impl Shared {
    fn finish(&self, id: u64, name: String, outcome: TaskOutcome) {
        if self.in_flight.remove(&id).is_none() {
            // Already reported as abandoned by drain
            return;
        }
        let counter = match &outcome {
            TaskOutcome::Succeeded => &self.counters.succeeded,
            TaskOutcome::Failed(_) => &self.counters.failed,
            TaskOutcome::TimedOut => &self.counters.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match &outcome {
            TaskOutcome::Succeeded => debug!(task = %name, "Background task succeeded"),
            TaskOutcome::Failed(reason) => {
                warn!(task = %name, reason = %reason, "Background task failed")
            }
            TaskOutcome::TimedOut => warn!(task = %name, "Background task timed out"),
        }

        // No subscribers is fine
        let _ = self.reports.send(TaskReport { name, outcome });
    }
}

pub struct TaskSupervisor {
    deadline: Duration,
    shared: Arc<Shared>,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskSupervisor {
    pub fn new(deadline: Duration) -> Self {
        let (reports, _) = broadcast::channel(256);
        Self {
            deadline,
            shared: Arc::new(Shared {
                reports,
                counters: Counters::default(),
                in_flight: DashMap::new(),
                next_id: AtomicU64::new(0),
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Receive a report for every task finishing after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TaskReport> {
        self.shared.reports.subscribe()
    }

    /// Run `work` in the background under the supervisor's deadline
    pub fn spawn<F>(&self, name: impl Into<String>, work: F)
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        let name = name.into();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        // Inner task so a panic is reported rather than lost
        let mut handle = tokio::spawn(work);
        self.shared.in_flight.insert(
            id,
            InFlight {
                name: name.clone(),
                work: handle.abort_handle(),
            },
        );
        self.shared.counters.spawned.fetch_add(1, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let deadline = self.deadline;
        let supervised = async move {
            let outcome = match tokio::time::timeout(deadline, &mut handle).await {
                Ok(Ok(Ok(()))) => TaskOutcome::Succeeded,
                Ok(Ok(Err(reason))) => TaskOutcome::Failed(reason),
                Ok(Err(join_err)) => TaskOutcome::Failed(format!("task aborted: {}", join_err)),
                Err(_) => {
                    handle.abort();
                    TaskOutcome::TimedOut
                }
            };
            shared.finish(id, name, outcome);
        };

        match self.tasks.lock() {
            Ok(mut tasks) => {
                while tasks.try_join_next().is_some() {}
                tasks.spawn(supervised);
            }
            Err(poisoned) => {
                poisoned.into_inner().spawn(supervised);
            }
        }
    }

    pub fn stats(&self) -> TaskStats {
        let c = &self.shared.counters;
        TaskStats {
            spawned: c.spawned.load(Ordering::Relaxed),
            succeeded: c.succeeded.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            in_flight: self.shared.in_flight.len() as u64,
        }
    }

    /// Wait up to `deadline` for running tasks; the rest are reported timed out
    pub async fn drain(&self, deadline: Duration) -> DrainSummary {
        let mut tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut completed = 0;
        let _ = tokio::time::timeout(deadline, async {
            while tasks.join_next().await.is_some() {
                completed += 1;
            }
        })
        .await;

        let abandoned: Vec<(u64, String)> = self
            .shared
            .in_flight
            .iter()
            .map(|e| {
                // Stop the work itself, not only its supervisor
                e.value().work.abort();
                (*e.key(), e.value().name.clone())
            })
            .collect();
        tasks.abort_all();
        for (id, name) in &abandoned {
            self.shared.finish(*id, name.clone(), TaskOutcome::TimedOut);
        }

        DrainSummary {
            completed,
            abandoned: abandoned.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_and_failure_are_reported() {
        let supervisor = TaskSupervisor::new(Duration::from_secs(1));
        let mut reports = supervisor.subscribe();

        supervisor.spawn("ok", async { Ok(()) });
        let first = reports.recv().await.unwrap();
        assert_eq!(first.outcome, TaskOutcome::Succeeded);

        supervisor.spawn("bad", async { Err("store unavailable".to_string()) });
        let second = reports.recv().await.unwrap();
        assert_eq!(second.name, "bad");
        assert_eq!(second.outcome, TaskOutcome::Failed("store unavailable".into()));

        let stats = supervisor.stats();
        assert_eq!((stats.spawned, stats.succeeded, stats.failed), (2, 1, 1));
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_deadline_reports_timeout() {
        let supervisor = TaskSupervisor::new(Duration::from_millis(20));
        let mut reports = supervisor.subscribe();

        supervisor.spawn("slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });

        let report = reports.recv().await.unwrap();
        assert_eq!(report.outcome, TaskOutcome::TimedOut);
        assert_eq!(supervisor.stats().timed_out, 1);
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_failure() {
        let supervisor = TaskSupervisor::new(Duration::from_secs(1));
        let mut reports = supervisor.subscribe();

        supervisor.spawn("boom", async {
            if true {
                panic!("boom");
            }
            Ok(())
        });
        let report = reports.recv().await.unwrap();
        assert!(matches!(report.outcome, TaskOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_drain_waits_then_abandons() {
        let supervisor = TaskSupervisor::new(Duration::from_secs(10));
        supervisor.spawn("quick", async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        });
        supervisor.spawn("stuck", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        });

        let summary = supervisor.drain(Duration::from_millis(200)).await;
        assert_eq!(summary.abandoned, 1);

        let stats = supervisor.stats();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_abandoned_work_does_not_complete_after_drain() {
        let supervisor = TaskSupervisor::new(Duration::from_secs(10));
        let mut reports = supervisor.subscribe();
        let wrote = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = Arc::clone(&wrote);
        supervisor.spawn("late-write", async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let summary = supervisor.drain(Duration::from_millis(50)).await;
        assert_eq!(summary.abandoned, 1);
        assert_eq!(reports.recv().await.unwrap().outcome, TaskOutcome::TimedOut);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!wrote.load(Ordering::SeqCst));
        assert_eq!(supervisor.stats().timed_out, 1);
    }
}
