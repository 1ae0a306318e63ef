//! Orchestration Facade: the single entry point the HTTP layer talks to.
//!
//! Owns one `TicketContext` per watched ticket. Reads answer from the cache
//! immediately and schedule a guarded background refresh; callers that want
//! the refreshed value subscribe. User actions (trigger, refresh, send)
//! surface their errors.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend_client::{ApiRequest, Envelope, Transport};
use crate::filtering::context::{TicketContext, TicketSubscription};
use crate::filtering::error::OrchestratorError;
use crate::filtering::fetch::FetchMode;
use crate::filtering::guard::ConcurrencyGuard;
use crate::filtering::tracker::{FilteringTracker, DEFAULT_POLL_INTERVAL};
use crate::models::candidate::CandidateRecord;
use crate::models::job::{FilteringJob, JobState};
use crate::models::report::FilteringReport;
use crate::models::ticket::TicketId;
use crate::results::ResultAggregator;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    /// Periodic background refresh of every watched ticket. `None` disables it.
    pub auto_refresh: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_refresh: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Applications,
    Status,
    TopCandidates,
    Report,
}

/// Counters exposed on the health endpoint.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct OrchestratorStats {
    pub watched_tickets: usize,
    pub active_polls: usize,
    pub requests_in_flight: usize,
    pub requests_acquired: u64,
    pub requests_dropped: u64,
}

pub struct FilteringOrchestrator {
    tickets: DashMap<TicketId, Arc<TicketContext>>,
    transport: Arc<dyn Transport>,
    guard: Arc<ConcurrencyGuard>,
    tracker: Arc<FilteringTracker>,
    aggregator: Arc<ResultAggregator>,
    shutdown: CancellationToken,
    auto_refresh: Option<Duration>,
}

impl FilteringOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, settings: OrchestratorSettings) -> Self {
        let guard = Arc::new(ConcurrencyGuard::new());
        let aggregator = Arc::new(ResultAggregator::new(transport.clone(), guard.clone()));
        let tracker = Arc::new(FilteringTracker::new(
            transport.clone(),
            guard.clone(),
            aggregator.clone(),
            settings.poll_interval,
        ));

        Self {
            tickets: DashMap::new(),
            transport,
            guard,
            tracker,
            aggregator,
            shutdown: CancellationToken::new(),
            auto_refresh: settings.auto_refresh.filter(|every| !every.is_zero()),
        }
    }

    /// Context for `ticket`, created on first use.
    fn context(&self, ticket: &TicketId) -> Arc<TicketContext> {
        if let Some(ctx) = self.tickets.get(ticket) {
            return Arc::clone(&ctx);
        }

        let mut created = false;
        let ctx = self
            .tickets
            .entry(ticket.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(TicketContext::new(ticket.clone(), &self.shutdown))
            })
            .clone();

        if created {
            info!("Watching ticket {}", ticket);
            if let Some(every) = self.auto_refresh {
                self.spawn_auto_refresh(&ctx, every);
            }
        }
        ctx
    }

    fn spawn_auto_refresh(&self, ctx: &Arc<TicketContext>, every: Duration) {
        let tracker = Arc::clone(&self.tracker);
        let aggregator = Arc::clone(&self.aggregator);
        let refresh_ctx = Arc::clone(ctx);

        ctx.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("Ticket {}: auto-refresh", refresh_ctx.ticket());
                let _ = aggregator
                    .refresh_applications(&refresh_ctx, FetchMode::Background)
                    .await;
                let _ = tracker
                    .refresh_status(&refresh_ctx, FetchMode::Background)
                    .await;
            }
        });
    }

    /// Runs one guarded background refresh of `slot`. Failures are dropped;
    /// the cache keeps its last good value.
    fn refresh_in_background(&self, ctx: &Arc<TicketContext>, slot: Slot) {
        let tracker = Arc::clone(&self.tracker);
        let aggregator = Arc::clone(&self.aggregator);
        let refresh_ctx = Arc::clone(ctx);

        ctx.spawn(async move {
            let mode = FetchMode::Background;
            let _ = match slot {
                Slot::Applications => aggregator
                    .refresh_applications(&refresh_ctx, mode)
                    .await
                    .map(drop),
                Slot::Status => tracker.refresh_status(&refresh_ctx, mode).await.map(drop),
                Slot::TopCandidates => aggregator
                    .refresh_top_candidates(&refresh_ctx, mode)
                    .await
                    .map(drop),
                Slot::Report => aggregator.refresh_report(&refresh_ctx, mode).await.map(drop),
            };
        });
    }

    pub fn list_applications(&self, ticket: &TicketId) -> Vec<CandidateRecord> {
        let ctx = self.context(ticket);
        self.refresh_in_background(&ctx, Slot::Applications);
        ctx.applications()
    }

    pub fn get_status(&self, ticket: &TicketId) -> FilteringJob {
        let ctx = self.context(ticket);
        self.refresh_in_background(&ctx, Slot::Status);
        ctx.job()
    }

    pub fn get_top_candidates(&self, ticket: &TicketId) -> Vec<CandidateRecord> {
        let ctx = self.context(ticket);
        self.refresh_in_background(&ctx, Slot::TopCandidates);
        ctx.top_candidates()
    }

    pub fn get_report(&self, ticket: &TicketId) -> Option<FilteringReport> {
        let ctx = self.context(ticket);
        self.refresh_in_background(&ctx, Slot::Report);
        ctx.report()
    }

    pub async fn trigger_filtering(&self, ticket: &TicketId) -> Result<FilteringJob, OrchestratorError> {
        let ctx = self.context(ticket);
        let job = self.tracker.trigger(&ctx).await?;
        self.refresh_in_background(&ctx, Slot::Applications);
        Ok(job)
    }

    /// User-requested refresh of everything. Results are only fetched once the
    /// job is known to be Completed.
    pub async fn refresh_all(&self, ticket: &TicketId) -> Result<FilteringJob, OrchestratorError> {
        let ctx = self.context(ticket);
        let (_, transition) = tokio::try_join!(
            self.aggregator.refresh_applications(&ctx, FetchMode::Manual),
            self.tracker.refresh_status(&ctx, FetchMode::Manual),
        )?;

        // A fresh transition into Completed already scheduled the collection.
        let just_completed = transition.is_some_and(|t| t.entered(JobState::Completed));
        if ctx.job().state == JobState::Completed && !just_completed {
            tokio::try_join!(
                self.aggregator.refresh_top_candidates(&ctx, FetchMode::Manual),
                self.aggregator.refresh_report(&ctx, FetchMode::Manual),
            )?;
        }

        info!("Ticket {}: manual refresh done", ticket);
        Ok(ctx.job())
    }

    /// Forwards the cached top candidates to the hiring manager. Returns the
    /// confirmation message.
    pub async fn send_top_candidates(&self, ticket: &TicketId) -> Result<String, OrchestratorError> {
        let ctx = self.context(ticket);
        let count = ctx.top_candidates().len();
        if count == 0 {
            warn!("Ticket {}: nothing to send", ticket);
            return Err(OrchestratorError::NoTopCandidates(ticket.clone()));
        }

        let request = ApiRequest::send_top_resumes(ticket, count);
        let envelope = Envelope::parse(self.transport.call(&request).await?)?;
        if !envelope.success {
            return Err(OrchestratorError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Failed to send top candidates".to_string()),
            ));
        }

        info!("Ticket {}: {} top candidates sent", ticket, count);
        Ok(envelope
            .message
            .unwrap_or_else(|| format!("{count} candidates forwarded to hiring manager")))
    }

    /// Stops observing `ticket`: its poll loop and every in-flight background
    /// request are cancelled and later results are discarded.
    pub fn stop_watching(&self, ticket: &TicketId) -> bool {
        let Some((_, ctx)) = self.tickets.remove(ticket) else {
            return false;
        };
        ctx.release();
        self.tracker.cancel_poll(ticket);
        info!("Stopped watching ticket {}", ticket);
        true
    }

    pub fn subscribe(&self, ticket: &TicketId) -> TicketSubscription {
        self.context(ticket).subscribe()
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            watched_tickets: self.tickets.len(),
            active_polls: self.tracker.active_polls(),
            requests_in_flight: self.guard.in_flight_count(),
            requests_acquired: self.guard.acquired_total(),
            requests_dropped: self.guard.dropped_total(),
        }
    }

    /// Releases every ticket. Used on graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.cancel_all();
        self.tickets.clear();
        info!("Orchestrator shut down");
    }
}
