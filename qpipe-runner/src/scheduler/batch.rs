//! Batch runner
//!
//! Submits tasks in input order, never letting the user's queue grow past
//! the configured ceiling, and returns once every submitted job has left
//! the queue. Waiting is plain interval polling: the scheduler has no way
//! to tell us a job finished.

use qpipe_client::QueueClient;
use qpipe_core::{BatchReport, Task, TaskOutcome, TaskReport};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::admission::AdmissionController;
use crate::config::RunnerConfig;
use crate::job::{Job, job_name};

/// Runs batches of tasks through the cluster queue
pub struct BatchRunner {
    client: Arc<dyn QueueClient>,
    config: RunnerConfig,
}

/// A submitted job together with its position in the input
struct Outstanding {
    index: usize,
    job: Job,
}

impl BatchRunner {
    /// Creates a new batch runner
    pub fn new(client: Arc<dyn QueueClient>, config: RunnerConfig) -> Self {
        Self { client, config }
    }

    /// Runs `script` once per task and waits for every job to finish
    ///
    /// A task whose submission fails is recorded in the report and skipped;
    /// it never stops the rest of the batch.
    pub async fn run(
        &self,
        script: &str,
        tasks: Vec<Task>,
        working_dir: Option<&Path>,
    ) -> BatchReport {
        let mut report = BatchReport::start(script);

        if tasks.is_empty() {
            info!("No tasks to run for {}", script);
            return report.complete();
        }

        info!(
            "Running {} on {} task(s) (batch {}, at most {} queued)",
            script,
            tasks.len(),
            report.id,
            self.config.max_concurrent_jobs
        );

        let admission = AdmissionController::new(
            Arc::clone(&self.client),
            self.config.max_concurrent_jobs,
            self.config.user.clone(),
        );

        let mut results: Vec<Option<TaskReport>> = vec![None; tasks.len()];
        let mut pending: VecDeque<(usize, Task)> = tasks.into_iter().enumerate().collect();
        let mut outstanding: Vec<Outstanding> = Vec::new();

        while !pending.is_empty() {
            self.retire_finished(&mut outstanding, &mut results).await;

            if !admission.has_capacity(outstanding.len()).await {
                debug!("Waiting for free space in queue...");
                sleep(self.config.poll_interval).await;
                continue;
            }

            let Some((index, task)) = pending.pop_front() else {
                break;
            };

            let mut job = Job::new(
                job_name(script, index + 1),
                script,
                task,
                working_dir.map(Path::to_path_buf),
                Arc::clone(&self.client),
                self.config.job_timing(),
            );

            info!(
                "Submitting job: {} {} (working dir: {:?})",
                script,
                job.task(),
                working_dir
            );

            match job.start().await {
                Ok(id) => {
                    info!("Job id = {}", id);
                    if let Some(log) = job.log_path() {
                        info!("Log file = {}", log.display());
                    }
                    outstanding.push(Outstanding { index, job });
                }
                Err(e) => {
                    error!("Failed to submit '{}' for {}: {}", job.name(), job.task(), e);
                    results[index] = Some(TaskReport {
                        outcome: TaskOutcome::SubmissionFailed {
                            reason: e.to_string(),
                        },
                        ..job.report()
                    });
                }
            }
        }

        debug!("All jobs submitted, waiting for running jobs to complete...");
        loop {
            self.retire_finished(&mut outstanding, &mut results).await;
            if outstanding.is_empty() {
                break;
            }
            sleep(self.config.poll_interval).await;
        }

        report.tasks = results.into_iter().flatten().collect();
        let report = report.complete();

        if report.all_finished() {
            info!(
                "Batch {} complete: {} task(s) finished",
                report.id,
                report.finished_count()
            );
        } else {
            warn!(
                "Batch {} complete: {} finished, {} not finished",
                report.id,
                report.finished_count(),
                report.failed_count()
            );
        }

        report
    }

    /// Drops jobs that have left the queue, recording their reports
    async fn retire_finished(
        &self,
        outstanding: &mut Vec<Outstanding>,
        results: &mut [Option<TaskReport>],
    ) {
        let mut still_running = Vec::with_capacity(outstanding.len());

        for mut entry in outstanding.drain(..) {
            if entry.job.is_running().await {
                still_running.push(entry);
                continue;
            }

            let job_report = entry.job.report();
            match &job_report.outcome {
                TaskOutcome::Finished => info!(
                    "Job {} has completed",
                    entry.job.id().map(ToString::to_string).unwrap_or_default()
                ),
                outcome => warn!(
                    "Job {} left the queue: {:?}",
                    entry.job.id().map(ToString::to_string).unwrap_or_default(),
                    outcome
                ),
            }
            results[entry.index] = Some(job_report);
        }

        *outstanding = still_running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeQueue;
    use qpipe_core::JobId;
    use std::time::Duration;
    use tokio::time::Instant;

    fn tasks(n: usize) -> Vec<Task> {
        (1..=n)
            .map(|i| Task::new([format!("s{}.csfasta", i), format!("s{}_QV.qual", i)]))
            .collect()
    }

    fn runner(fake: &Arc<FakeQueue>, ceiling: usize) -> BatchRunner {
        BatchRunner::new(
            fake.clone(),
            RunnerConfig::default().with_max_concurrent_jobs(ceiling),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_is_noop() {
        let fake = Arc::new(FakeQueue::new(1));
        let report = runner(&fake, 4).run("qc.sh", Vec::new(), None).await;

        assert!(report.tasks.is_empty());
        assert!(report.all_finished());
        assert_eq!(fake.list_calls(), 0);
        assert!(fake.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_tasks_with_ceiling_two() {
        // Each pair of jobs leaves the queue within one poll interval
        let fake = Arc::new(
            FakeQueue::new(1)
                .script_next(vec![true; 4])
                .script_next(vec![true])
                .script_next(vec![true; 4])
                .script_next(vec![true]),
        );
        let input = tasks(5);
        let started = Instant::now();

        let report = runner(&fake, 2)
            .run("/opt/qc.sh", input.clone(), Some(Path::new("/data/run1")))
            .await;

        assert_eq!(report.tasks.len(), 5);
        assert!(report.all_finished());
        assert!(fake.max_live_at_submit() <= 2);
        assert!(fake.max_listed() <= 2);

        let submissions = fake.submissions();
        assert_eq!(submissions.len(), 5);
        for (i, (_, request)) in submissions.iter().enumerate() {
            assert_eq!(request.args, input[i].args());
            assert_eq!(request.name, format!("qc_{}", i + 1));
        }
        for (task_report, (id, _)) in report.tasks.iter().zip(&submissions) {
            assert_eq!(task_report.job_id.as_ref(), Some(id));
        }

        // Tasks 1-2 go out at once, 3-4 after one interval, 5 after another
        let offsets: Vec<u64> = fake
            .submit_times()
            .iter()
            .map(|at| at.duration_since(started).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 0, 30, 30, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_after_queue_is_empty() {
        let fake = Arc::new(FakeQueue::new(6));

        let report = runner(&fake, 3).run("qc.sh", tasks(4), None).await;

        assert!(fake.live().is_empty());
        let listed = fake.list_jobs(None).await.unwrap();
        for task_report in &report.tasks {
            let id = task_report.job_id.as_ref().unwrap();
            assert!(!listed.contains(id));
            assert_eq!(task_report.outcome, TaskOutcome::Finished);
            assert!(task_report.completed_at.is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_capacity() {
        let fake = Arc::new(FakeQueue::new(4));
        let started = Instant::now();

        let report = runner(&fake, 1).run("qc.sh", tasks(2), None).await;

        assert!(report.all_finished());
        assert_eq!(fake.max_live_at_submit(), 1);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_ceiling_submits_everything_at_once() {
        let fake = Arc::new(FakeQueue::new(20));

        let report = runner(&fake, 10).run("qc.sh", tasks(3), None).await;

        assert!(report.all_finished());
        assert_eq!(fake.max_live_at_submit(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_does_not_stop_batch() {
        let fake = Arc::new(FakeQueue::new(1).succeed_next_submit().fail_next_submit());

        let report = runner(&fake, 2).run("qc.sh", tasks(3), None).await;

        assert_eq!(report.tasks.len(), 3);
        assert_eq!(report.tasks[0].outcome, TaskOutcome::Finished);
        assert!(matches!(
            report.tasks[1].outcome,
            TaskOutcome::SubmissionFailed { .. }
        ));
        assert!(report.tasks[1].job_id.is_none());
        assert_eq!(report.tasks[1].job_name, "qc_2");
        assert_eq!(report.tasks[2].outcome, TaskOutcome::Finished);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(fake.submissions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_tasks_are_independent() {
        let fake = Arc::new(FakeQueue::new(1));
        let task = Task::new(["same.fastq"]);

        let report = runner(&fake, 4)
            .run("qc.sh", vec![task.clone(), task], None)
            .await;

        let ids: Vec<&JobId> = report
            .tasks
            .iter()
            .filter_map(|t| t.job_id.as_ref())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_survives_failed_queries() {
        let fake = Arc::new(FakeQueue::new(2));
        fake.fail_next_lists(3);

        let report = runner(&fake, 2).run("qc.sh", tasks(3), None).await;

        assert!(report.all_finished());
        assert!(fake.live().is_empty());
    }
}
