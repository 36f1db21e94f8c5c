//! Admission control
//!
//! Decides whether another job may be submitted right now. Nothing is
//! cached: every check asks the scheduler, which is the only authority on
//! how many jobs the user has queued.

use qpipe_client::{ClientError, QueueClient};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bounds the number of jobs a user has in the queue
pub struct AdmissionController {
    client: Arc<dyn QueueClient>,
    ceiling: usize,
    user: Option<String>,
}

impl AdmissionController {
    /// Creates a controller admitting at most `ceiling` queued jobs for `user`
    pub fn new(client: Arc<dyn QueueClient>, ceiling: usize, user: Option<String>) -> Self {
        Self {
            client,
            ceiling,
            user,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Number of jobs the scheduler currently lists for the user
    pub async fn queued_jobs(&self) -> Result<usize, ClientError> {
        let ids = self.client.list_jobs(self.user.as_deref()).await?;
        Ok(ids.len())
    }

    /// Checks whether one more job fits under the ceiling
    ///
    /// `outstanding` is the caller's own count of unretired jobs, which
    /// covers jobs the scheduler has not listed yet. When the queue cannot
    /// be read there is no room.
    pub async fn has_capacity(&self, outstanding: usize) -> bool {
        if outstanding >= self.ceiling {
            debug!(
                "{} outstanding job(s), ceiling is {}",
                outstanding, self.ceiling
            );
            return false;
        }

        match self.queued_jobs().await {
            Ok(queued) => {
                debug!("{} job(s) queued, ceiling is {}", queued, self.ceiling);
                queued < self.ceiling
            }
            Err(e) => {
                warn!("Unable to read queue, assuming it is full: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeQueue;
    use qpipe_client::SubmitRequest;

    async fn submit(fake: &FakeQueue, n: usize) {
        for i in 0..n {
            let request = SubmitRequest::new(format!("qc_{}", i + 1), "qc.sh", ["a.fastq"]);
            fake.submit(&request).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_capacity_against_queue() {
        let fake = Arc::new(FakeQueue::new(10));
        let admission = AdmissionController::new(fake.clone(), 2, None);

        assert!(admission.has_capacity(0).await);

        submit(&fake, 1).await;
        assert!(admission.has_capacity(0).await);

        submit(&fake, 1).await;
        assert!(!admission.has_capacity(0).await);
        assert_eq!(admission.queued_jobs().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_outstanding_jobs_count_before_listing() {
        let fake = Arc::new(FakeQueue::new(10));
        let admission = AdmissionController::new(fake.clone(), 2, None);

        assert!(!admission.has_capacity(2).await);
        assert_eq!(fake.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_ceiling_never_admits() {
        let fake = Arc::new(FakeQueue::new(10));
        let admission = AdmissionController::new(fake.clone(), 0, None);

        assert_eq!(admission.ceiling(), 0);
        assert!(!admission.has_capacity(0).await);
    }

    #[tokio::test]
    async fn test_failed_query_means_no_capacity() {
        let fake = Arc::new(FakeQueue::new(10));
        let admission = AdmissionController::new(fake.clone(), 4, None);

        fake.fail_next_lists(1);
        assert!(!admission.has_capacity(0).await);
        assert!(admission.has_capacity(0).await);
    }
}
