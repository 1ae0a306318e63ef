//! Per-ticket state owned by the orchestrator.
//!
//! Writers are crate-internal: the tracker writes the job, the result
//! aggregator writes the candidate sets and report. Everyone else reads
//! snapshots or subscribes through `watch` receivers.

use std::future::Future;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::candidate::CandidateRecord;
use crate::models::job::{FilteringJob, Transition};
use crate::models::report::FilteringReport;
use crate::models::ticket::TicketId;

pub struct TicketContext {
    ticket: TicketId,
    job: watch::Sender<FilteringJob>,
    applications: watch::Sender<Vec<CandidateRecord>>,
    top_candidates: watch::Sender<Vec<CandidateRecord>>,
    report: watch::Sender<Option<FilteringReport>>,
    cancel: CancellationToken,
}

/// Receivers for every piece of per-ticket state.
#[derive(Clone)]
pub struct TicketSubscription {
    pub job: watch::Receiver<FilteringJob>,
    pub applications: watch::Receiver<Vec<CandidateRecord>>,
    pub top_candidates: watch::Receiver<Vec<CandidateRecord>>,
    pub report: watch::Receiver<Option<FilteringReport>>,
}

impl TicketContext {
    pub fn new(ticket: TicketId, parent: &CancellationToken) -> Self {
        Self {
            job: watch::Sender::new(FilteringJob::new(ticket.clone())),
            applications: watch::Sender::new(Vec::new()),
            top_candidates: watch::Sender::new(Vec::new()),
            report: watch::Sender::new(None),
            cancel: parent.child_token(),
            ticket,
        }
    }

    pub fn ticket(&self) -> &TicketId {
        &self.ticket
    }

    pub fn job(&self) -> FilteringJob {
        self.job.borrow().clone()
    }

    pub fn applications(&self) -> Vec<CandidateRecord> {
        self.applications.borrow().clone()
    }

    pub fn application_count(&self) -> usize {
        self.applications.borrow().len()
    }

    pub fn top_candidates(&self) -> Vec<CandidateRecord> {
        self.top_candidates.borrow().clone()
    }

    pub fn report(&self) -> Option<FilteringReport> {
        self.report.borrow().clone()
    }

    pub fn subscribe(&self) -> TicketSubscription {
        TicketSubscription {
            job: self.job.subscribe(),
            applications: self.applications.subscribe(),
            top_candidates: self.top_candidates.subscribe(),
            report: self.report.subscribe(),
        }
    }

    /// Observation lifetime of this ticket. Cancelled by `release`.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_released(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn release(&self) {
        self.cancel.cancel();
    }

    /// Spawns background work that dies with the ticket's observation.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = work => {}
            }
        });
    }

    pub(crate) fn update_job(&self, apply: impl FnOnce(&mut FilteringJob) -> Transition) -> Transition {
        let mut transition = Transition::Ignored;
        self.job.send_if_modified(|job| {
            transition = apply(job);
            transition.is_modified()
        });
        transition
    }

    pub(crate) fn begin_run(&self, apply: impl FnOnce(&mut FilteringJob) -> u64) -> u64 {
        let mut epoch = 0;
        self.job.send_modify(|job| epoch = apply(job));
        epoch
    }

    pub(crate) fn set_applications(&self, records: Vec<CandidateRecord>) {
        self.applications.send_replace(records);
    }

    pub(crate) fn set_top_candidates(&self, records: Vec<CandidateRecord>) {
        self.top_candidates.send_replace(records);
    }

    pub(crate) fn set_report(&self, report: FilteringReport) {
        self.report.send_replace(Some(report));
    }
}
