use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ticket::TicketId;

/// Status text shown while a run is in progress and the backend gave none.
pub const DEFAULT_RUNNING_MESSAGE: &str = "AI analysis in progress...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl JobState {
    /// How far along the lifecycle a state is. Terminal states share the top rank.
    pub fn rank(self) -> u8 {
        match self {
            JobState::NotStarted => 0,
            JobState::Running => 1,
            JobState::Completed | JobState::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Result of feeding one status observation into a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Observation belongs to an earlier run and was discarded.
    Stale,
    /// Observation was behind (or equal to) the current state; nothing changed.
    Ignored,
    /// Same state, but the status message changed.
    Refreshed,
    Advanced { from: JobState, to: JobState },
}

impl Transition {
    pub fn is_modified(self) -> bool {
        matches!(self, Transition::Refreshed | Transition::Advanced { .. })
    }

    pub fn entered(self, state: JobState) -> bool {
        matches!(self, Transition::Advanced { to, .. } if to == state)
    }
}

/// Lifecycle of the server-side filtering run for one ticket.
///
/// `epoch` increments on every accepted trigger. Observations tagged with an
/// older epoch are dropped, so a slow response from a previous run can never
/// overwrite the run that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteringJob {
    pub ticket_id: TicketId,
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub epoch: u64,
}

impl FilteringJob {
    pub fn new(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            state: JobState::NotStarted,
            started_at: None,
            finished_at: None,
            message: None,
            epoch: 0,
        }
    }

    /// Enters Running for a fresh run and returns the new epoch.
    pub fn begin_run(&mut self, message: Option<String>, now: DateTime<Utc>) -> u64 {
        self.epoch += 1;
        self.state = JobState::Running;
        self.started_at = Some(now);
        self.finished_at = None;
        self.message = Some(message.unwrap_or_else(|| DEFAULT_RUNNING_MESSAGE.to_string()));
        self.epoch
    }

    /// Applies an observed state, keeping whichever of current and observed is
    /// further along. Completed and Failed never replace each other within a run.
    pub fn observe(
        &mut self,
        epoch: u64,
        observed: JobState,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Transition {
        if epoch != self.epoch {
            return Transition::Stale;
        }

        if observed == self.state {
            return match message {
                Some(m) if self.message.as_deref() != Some(m.as_str()) => {
                    self.message = Some(m);
                    Transition::Refreshed
                }
                _ => Transition::Ignored,
            };
        }

        if self.state.is_terminal() || observed.rank() < self.state.rank() {
            return Transition::Ignored;
        }

        let from = self.state;
        self.state = observed;
        match observed {
            JobState::Running => {
                self.started_at.get_or_insert(now);
                self.message =
                    Some(message.unwrap_or_else(|| DEFAULT_RUNNING_MESSAGE.to_string()));
            }
            JobState::Completed | JobState::Failed => {
                self.finished_at = Some(now);
                if message.is_some() {
                    self.message = message;
                }
            }
            JobState::NotStarted => {}
        }

        Transition::Advanced { from, to: observed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> FilteringJob {
        FilteringJob::new(TicketId::new("T-1"))
    }

    #[test]
    fn test_begin_run_sets_default_message_and_bumps_epoch() {
        let mut job = job();
        let epoch = job.begin_run(None, Utc::now());
        assert_eq!(epoch, 1);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.message.as_deref(), Some(DEFAULT_RUNNING_MESSAGE));
        assert!(job.started_at.is_some());
    }

    #[test]
    fn test_running_then_completed_advances() {
        let mut job = job();
        let epoch = job.begin_run(Some("queued".to_string()), Utc::now());
        let t = job.observe(epoch, JobState::Completed, None, Utc::now());
        assert_eq!(
            t,
            Transition::Advanced {
                from: JobState::Running,
                to: JobState::Completed
            }
        );
        assert!(job.finished_at.is_some());
        assert_eq!(job.message.as_deref(), Some("queued"));
    }

    #[test]
    fn test_late_running_does_not_regress_completed() {
        let mut job = job();
        let epoch = job.begin_run(None, Utc::now());
        job.observe(epoch, JobState::Completed, None, Utc::now());
        let t = job.observe(epoch, JobState::Running, None, Utc::now());
        assert_eq!(t, Transition::Ignored);
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn test_failed_does_not_replace_completed_within_run() {
        let mut job = job();
        let epoch = job.begin_run(None, Utc::now());
        job.observe(epoch, JobState::Completed, None, Utc::now());
        assert_eq!(
            job.observe(epoch, JobState::Failed, None, Utc::now()),
            Transition::Ignored
        );
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn test_observation_from_previous_run_is_stale() {
        let mut job = job();
        let first = job.begin_run(None, Utc::now());
        job.observe(first, JobState::Completed, None, Utc::now());
        job.begin_run(None, Utc::now());
        assert_eq!(
            job.observe(first, JobState::Completed, None, Utc::now()),
            Transition::Stale
        );
        assert_eq!(job.state, JobState::Running);
    }

    #[test]
    fn test_retrigger_from_failed_reenters_running() {
        let mut job = job();
        let epoch = job.begin_run(None, Utc::now());
        job.observe(epoch, JobState::Failed, Some("model crashed".to_string()), Utc::now());
        assert_eq!(job.state, JobState::Failed);
        let epoch = job.begin_run(None, Utc::now());
        assert_eq!(epoch, 2);
        assert_eq!(job.state, JobState::Running);
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_not_started_can_observe_backend_side_run() {
        let mut job = job();
        let t = job.observe(0, JobState::Running, None, Utc::now());
        assert!(t.entered(JobState::Running));
        assert!(job.started_at.is_some());
    }

    #[test]
    fn test_message_only_change_is_refresh() {
        let mut job = job();
        let epoch = job.begin_run(None, Utc::now());
        let t = job.observe(epoch, JobState::Running, Some("40% done".to_string()), Utc::now());
        assert_eq!(t, Transition::Refreshed);
        assert!(t.is_modified());
        assert_eq!(
            job.observe(epoch, JobState::Running, Some("40% done".to_string()), Utc::now()),
            Transition::Ignored
        );
    }
}
