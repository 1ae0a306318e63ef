//! Filtering Job Tracker: starts runs, polls their status and detects
//! completion.
//!
//! Owns the job slot of each `TicketContext` and the per-ticket poll loops.
//! There is at most one poll loop per ticket; starting a new one replaces the
//! old one.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::backend_client::{ApiRequest, Endpoint, Envelope, Transport};
use crate::filtering::context::TicketContext;
use crate::filtering::error::OrchestratorError;
use crate::filtering::fetch::{fetch_data, FetchMode};
use crate::filtering::guard::{ConcurrencyGuard, GuardKey, Resource};
use crate::filtering::poller::PollTask;
use crate::filtering::status::{detect_status, StatusSignal};
use crate::models::job::{FilteringJob, JobState, Transition};
use crate::models::ticket::TicketId;
use crate::results::ResultAggregator;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct FilteringTracker {
    transport: Arc<dyn Transport>,
    guard: Arc<ConcurrencyGuard>,
    aggregator: Arc<ResultAggregator>,
    poll_interval: Duration,
    polls: DashMap<TicketId, PollTask>,
    next_poll_id: AtomicU64,
}

impl FilteringTracker {
    pub fn new(
        transport: Arc<dyn Transport>,
        guard: Arc<ConcurrencyGuard>,
        aggregator: Arc<ResultAggregator>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            guard,
            aggregator,
            poll_interval,
            polls: DashMap::new(),
            next_poll_id: AtomicU64::new(1),
        }
    }

    /// Asks the backend to start AI filtering for the ticket.
    ///
    /// Rejected without any backend call when no applications are cached or a
    /// run started here is still in progress. On success the job enters Running under a
    /// new epoch and a poll loop is started.
    pub async fn trigger(
        self: &Arc<Self>,
        ctx: &Arc<TicketContext>,
    ) -> Result<FilteringJob, OrchestratorError> {
        let ticket = ctx.ticket().clone();

        if ctx.application_count() == 0 {
            warn!("Ticket {}: refusing to filter an empty application set", ticket);
            return Err(OrchestratorError::NoApplications(ticket));
        }
        // Running inferred from a status poll (epoch 0) must not block a start;
        // the backend reports "ready for filtering" that way.
        let job = ctx.job();
        if job.state == JobState::Running && job.epoch > 0 {
            warn!("Ticket {}: filtering already running", ticket);
            return Err(OrchestratorError::AlreadyRunning(ticket));
        }

        let request = ApiRequest::new(Endpoint::StartFiltering, &ticket);
        let key = GuardKey::new(Resource::StartFiltering, &ticket);
        let Some(response) = self.guard.run(key, self.transport.call(&request)).await else {
            return Err(OrchestratorError::TriggerInFlight(ticket));
        };

        let envelope = Envelope::parse(response?)?;
        if !envelope.success {
            let reason = envelope
                .message
                .unwrap_or_else(|| "Failed to start filtering".to_string());
            warn!("Ticket {}: start rejected: {}", ticket, reason);
            return Err(OrchestratorError::Rejected(reason));
        }

        let epoch = ctx.begin_run(|job| job.begin_run(envelope.message, Utc::now()));
        info!("Ticket {}: filtering started (run {})", ticket, epoch);
        self.start_polling(ctx);

        Ok(ctx.job())
    }

    /// Fetches the status once and folds it into the job.
    ///
    /// Returns `None` when nothing was fetched (background skip or failure).
    pub async fn refresh_status(
        self: &Arc<Self>,
        ctx: &Arc<TicketContext>,
        mode: FetchMode,
    ) -> Result<Option<Transition>, OrchestratorError> {
        let epoch = ctx.job().epoch;
        let request = ApiRequest::new(Endpoint::FilteringStatus, ctx.ticket());
        let data =
            fetch_data(self.transport.as_ref(), &self.guard, Resource::FilteringStatus, request, mode)
                .await?;

        Ok(data.map(|data| self.apply_signal(ctx, epoch, detect_status(&data))))
    }

    /// Applies a status observation made under `epoch`.
    fn apply_signal(
        self: &Arc<Self>,
        ctx: &Arc<TicketContext>,
        epoch: u64,
        signal: StatusSignal,
    ) -> Transition {
        let Some(observed) = signal.state else {
            return Transition::Ignored;
        };

        let transition = ctx.update_job(|job| job.observe(epoch, observed, signal.message, Utc::now()));
        if transition == Transition::Stale {
            debug!("Ticket {}: dropping status from run {}", ctx.ticket(), epoch);
            return transition;
        }

        if observed.is_terminal() {
            self.cancel_poll(ctx.ticket());
        }

        if transition.entered(JobState::Completed) {
            info!("Ticket {}: filtering completed, collecting results", ctx.ticket());
            let aggregator = Arc::clone(&self.aggregator);
            let results_ctx = Arc::clone(ctx);
            ctx.spawn(async move { aggregator.collect_results(&results_ctx).await });
        } else if transition.entered(JobState::Failed) {
            warn!(
                "Ticket {}: filtering failed: {}",
                ctx.ticket(),
                ctx.job().message.unwrap_or_default()
            );
        } else if ctx.job().state == JobState::Running && !self.has_active_poll(ctx.ticket()) {
            // Run started elsewhere (another session, or before a restart).
            self.start_polling(ctx);
        }

        transition
    }

    fn start_polling(self: &Arc<Self>, ctx: &Arc<TicketContext>) {
        if ctx.is_released() {
            return;
        }

        let id = self.next_poll_id.fetch_add(1, Ordering::Relaxed);
        let tracker = Arc::clone(self);
        let poll_ctx = Arc::clone(ctx);
        let task = PollTask::start(id, ctx.token(), self.poll_interval, move || {
            let tracker = Arc::clone(&tracker);
            let ctx = Arc::clone(&poll_ctx);
            async move { tracker.poll_once(&ctx, id).await }
        });

        // Replacing drops the previous task, which cancels it.
        self.polls.insert(ctx.ticket().clone(), task);
        debug!("Ticket {}: poll loop {} started", ctx.ticket(), id);
    }

    async fn poll_once(self: &Arc<Self>, ctx: &Arc<TicketContext>, id: u64) -> ControlFlow<()> {
        let epoch = ctx.job().epoch;
        let request = ApiRequest::new(Endpoint::FilteringStatus, ctx.ticket());
        let data = match fetch_data(
            self.transport.as_ref(),
            &self.guard,
            Resource::FilteringStatus,
            request,
            FetchMode::Background,
        )
        .await
        {
            Ok(Some(data)) => data,
            _ => return ControlFlow::Continue(()),
        };

        let signal = detect_status(&data);
        let terminal = signal.is_terminal();
        self.apply_signal(ctx, epoch, signal);

        if terminal {
            self.polls.remove_if(ctx.ticket(), |_, task| task.id() == id);
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Stops the ticket's poll loop, if any. Returns whether one was running.
    pub fn cancel_poll(&self, ticket: &TicketId) -> bool {
        match self.polls.remove(ticket) {
            Some((_, task)) => {
                task.cancel();
                debug!("Ticket {}: poll loop {} stopped", ticket, task.id());
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.polls.clear();
    }

    pub fn has_active_poll(&self, ticket: &TicketId) -> bool {
        self.polls
            .get(ticket)
            .map(|task| task.is_active())
            .unwrap_or(false)
    }

    pub fn active_polls(&self) -> usize {
        self.polls.iter().filter(|entry| entry.is_active()).count()
    }
}
