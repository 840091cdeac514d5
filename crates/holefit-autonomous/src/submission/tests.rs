use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

use holefit_core::Point;

use super::*;

/// Replays scripted responses, then accepts everything.
#[derive(Debug, Default)]
struct ScriptedSubmitter {
    script: Mutex<VecDeque<Result<SubmissionReceipt>>>,
    calls: AtomicUsize,
}

impl ScriptedSubmitter {
    fn new(script: Vec<Result<SubmissionReceipt>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Submitter for ScriptedSubmitter {
    async fn submit(&self, _puzzle: ProblemId, _pose: &Pose) -> Result<SubmissionReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SubmissionReceipt::default()))
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    }
}

fn pose() -> Pose {
    Pose::new(vec![Point::new(1, 2), Point::new(3, 4)])
}

fn transient() -> Result<SubmissionReceipt> {
    Err(OrchestratorError::SubmissionTransient("HTTP 503".to_string()))
}

#[test]
fn test_backoff_doubles_and_caps() {
    let policy = RetryPolicy {
        max_attempts: 10,
        initial_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_millis(3_000),
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(500));
    assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
    assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
    assert_eq!(policy.backoff(4), Duration::from_millis(3_000));
    assert_eq!(policy.backoff(40), Duration::from_millis(3_000));
}

#[test]
fn test_policy_from_config_needs_one_attempt() {
    let config = SubmissionConfig {
        max_attempts: 0,
        ..SubmissionConfig::default()
    };
    assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
}

#[test]
fn test_classify_status() {
    assert!(classify_status(503, "down").is_transient());
    assert!(classify_status(429, "slow down").is_transient());
    assert!(!classify_status(400, "bad pose").is_transient());
    assert!(!classify_status(404, "").is_transient());
}

#[test]
fn test_url_for_trims_trailing_slash() {
    let submitter = HttpSubmitter::new("https://poses.example/", "token");
    assert_eq!(
        submitter.url_for(ProblemId(42)),
        "https://poses.example/api/problems/42/solutions"
    );
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let submitter = ScriptedSubmitter::new(vec![
        transient(),
        transient(),
        Ok(SubmissionReceipt {
            id: Some("abc".to_string()),
            dislikes: Some(12),
        }),
    ]);
    let record = fast_policy(5)
        .submit(&submitter, ProblemId(1), &pose(), &AtomicBool::new(false))
        .await;

    assert_eq!(record.attempts, 3);
    assert_eq!(record.outcome, SubmissionOutcome::Accepted { dislikes: Some(12) });
    assert_eq!(submitter.calls(), 3);
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let submitter = ScriptedSubmitter::new(vec![transient(), transient(), transient()]);
    let record = fast_policy(2)
        .submit(&submitter, ProblemId(1), &pose(), &AtomicBool::new(false))
        .await;

    assert_eq!(record.attempts, 2);
    assert!(matches!(record.outcome, SubmissionOutcome::PendingRetry { .. }));
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let submitter = ScriptedSubmitter::new(vec![Err(OrchestratorError::SubmissionPermanent(
        "HTTP 400: invalid".to_string(),
    ))]);
    let record = fast_policy(5)
        .submit(&submitter, ProblemId(9), &pose(), &AtomicBool::new(false))
        .await;

    assert_eq!(record.attempts, 1);
    assert!(matches!(record.outcome, SubmissionOutcome::Rejected { .. }));
    assert_eq!(submitter.calls(), 1);
}

#[tokio::test]
async fn test_cancel_stops_retrying() {
    let submitter = ScriptedSubmitter::new(vec![transient(), transient()]);
    let record = fast_policy(5)
        .submit(&submitter, ProblemId(1), &pose(), &AtomicBool::new(true))
        .await;
    assert_eq!(record.attempts, 1);
    assert!(matches!(record.outcome, SubmissionOutcome::PendingRetry { .. }));
}

#[tokio::test]
async fn test_queue_reports_each_job_and_skips_repeats() {
    let submitter = Arc::new(ScriptedSubmitter::default());
    let (queue, mut records) = SubmissionQueue::spawn(
        Arc::clone(&submitter),
        fast_policy(3),
        Arc::new(AtomicBool::new(false)),
    );

    for puzzle in [1, 2, 1] {
        queue
            .enqueue(SubmissionJob {
                puzzle: ProblemId(puzzle),
                pose: pose(),
            })
            .unwrap();
    }
    queue.close().await.unwrap();

    let mut reported = Vec::new();
    while let Some(record) = records.recv().await {
        assert!(record.is_accepted());
        reported.push(record.puzzle);
    }
    assert_eq!(reported, vec![ProblemId(1), ProblemId(2), ProblemId(1)]);
    // The repeated pose for puzzle 1 never reached the service.
    assert_eq!(submitter.calls(), 2);
}
