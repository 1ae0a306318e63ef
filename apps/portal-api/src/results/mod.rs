//! Result Aggregator: pulls candidate lists and the filtering report and
//! normalizes them into the per-ticket caches.
//!
//! Writes only the candidate and report caches of a `TicketContext`; job state
//! belongs to the tracker. A failed background fetch leaves the cache as it was.

pub mod candidates;
pub mod report;
pub mod scoring;

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend_client::{ApiRequest, Endpoint, Transport};
use crate::filtering::context::TicketContext;
use crate::filtering::error::OrchestratorError;
use crate::filtering::fetch::{fetch_data, FetchMode};
use crate::filtering::guard::{ConcurrencyGuard, Resource};

use self::candidates::{aggregate_candidates, aggregate_top_candidates, correlate_with_applications};
use self::report::aggregate_report;

pub struct ResultAggregator {
    transport: Arc<dyn Transport>,
    guard: Arc<ConcurrencyGuard>,
}

impl ResultAggregator {
    pub fn new(transport: Arc<dyn Transport>, guard: Arc<ConcurrencyGuard>) -> Self {
        Self { transport, guard }
    }

    /// Refreshes the application list. Returns the new count, or `None` if
    /// nothing was fetched.
    pub async fn refresh_applications(
        &self,
        ctx: &TicketContext,
        mode: FetchMode,
    ) -> Result<Option<usize>, OrchestratorError> {
        let request = ApiRequest::new(Endpoint::ListResumes, ctx.ticket());
        let Some(data) = self.fetch(Resource::Applications, request, mode).await? else {
            return Ok(None);
        };

        let records = aggregate_candidates(&data);
        let count = records.len();
        debug!("Ticket {}: {} applications", ctx.ticket(), count);
        ctx.set_applications(records);
        Ok(Some(count))
    }

    /// Refreshes the ranked top-candidate set.
    pub async fn refresh_top_candidates(
        &self,
        ctx: &TicketContext,
        mode: FetchMode,
    ) -> Result<Option<usize>, OrchestratorError> {
        let request = ApiRequest::new(Endpoint::TopResumes, ctx.ticket());
        let Some(data) = self.fetch(Resource::TopCandidates, request, mode).await? else {
            return Ok(None);
        };

        let mut records = aggregate_top_candidates(&data);
        correlate_with_applications(&mut records, &ctx.applications());
        let count = records.len();
        info!("Ticket {}: {} top candidates", ctx.ticket(), count);
        ctx.set_top_candidates(records);
        Ok(Some(count))
    }

    /// Refreshes the filtering report. Returns whether a report was stored.
    pub async fn refresh_report(
        &self,
        ctx: &TicketContext,
        mode: FetchMode,
    ) -> Result<bool, OrchestratorError> {
        let request = ApiRequest::new(Endpoint::FilteringReport, ctx.ticket());
        let Some(data) = self.fetch(Resource::FilteringReport, request, mode).await? else {
            return Ok(false);
        };

        match aggregate_report(&data) {
            Some(report) => {
                ctx.set_report(report);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs after a transition into Completed: one fetch of each, concurrently,
    /// neither depending on the other's outcome.
    pub async fn collect_results(&self, ctx: &TicketContext) {
        let (top, report) = tokio::join!(
            self.refresh_top_candidates(ctx, FetchMode::Background),
            self.refresh_report(ctx, FetchMode::Background),
        );
        debug!(
            "Ticket {}: results collected (top={:?}, report={:?})",
            ctx.ticket(),
            top,
            report
        );
    }

    async fn fetch(
        &self,
        resource: Resource,
        request: ApiRequest,
        mode: FetchMode,
    ) -> Result<Option<serde_json::Value>, OrchestratorError> {
        fetch_data(self.transport.as_ref(), &self.guard, resource, request, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_client::fake::{ok, ScriptedTransport};
    use crate::backend_client::TransportError;
    use crate::models::ticket::TicketId;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn setup() -> (Arc<ScriptedTransport>, ResultAggregator, TicketContext) {
        let transport = ScriptedTransport::new();
        let aggregator = ResultAggregator::new(transport.clone(), Arc::new(ConcurrencyGuard::new()));
        let ctx = TicketContext::new(TicketId::new("T-100"), &CancellationToken::new());
        (transport, aggregator, ctx)
    }

    fn top_payload() -> serde_json::Value {
        ok(json!({"top_candidates": [
            {"rank": 2, "filename": "b.pdf", "scores": {"overall": "71.0%"}},
            {"rank": 1, "filename": "a.pdf", "scores": {"overall": "90.0%"}},
        ]}))
    }

    #[tokio::test]
    async fn test_top_candidates_are_ranked_and_correlated() {
        let (transport, aggregator, ctx) = setup();
        transport.push(
            Endpoint::ListResumes,
            Ok(ok(json!({"resumes": [{"filename": "a.pdf", "applicant_name": "Alice"}]}))),
        );
        transport.push(Endpoint::TopResumes, Ok(top_payload()));

        aggregator
            .refresh_applications(&ctx, FetchMode::Manual)
            .await
            .unwrap();
        let count = aggregator
            .refresh_top_candidates(&ctx, FetchMode::Manual)
            .await
            .unwrap();

        assert_eq!(count, Some(2));
        let top = ctx.top_candidates();
        assert_eq!(top[0].filename.as_deref(), Some("a.pdf"));
        assert_eq!(top[0].applicant_name.as_deref(), Some("Alice"));
        assert_eq!(top[1].rank, Some(2));
    }

    #[tokio::test]
    async fn test_background_failure_keeps_last_good_value() {
        let (transport, aggregator, ctx) = setup();
        transport.push(Endpoint::TopResumes, Ok(top_payload()));
        transport.push(
            Endpoint::TopResumes,
            Err(TransportError::Timeout(std::time::Duration::from_secs(15))),
        );
        transport.push(
            Endpoint::TopResumes,
            Ok(json!({"success": false, "error": "No filtering results found"})),
        );

        for _ in 0..3 {
            aggregator
                .refresh_top_candidates(&ctx, FetchMode::Background)
                .await
                .unwrap();
        }
        assert_eq!(ctx.top_candidates().len(), 2);
        assert_eq!(transport.count(Endpoint::TopResumes), 3);
    }

    #[tokio::test]
    async fn test_manual_failure_propagates_and_keeps_cache() {
        let (transport, aggregator, ctx) = setup();
        transport.push(Endpoint::TopResumes, Ok(top_payload()));
        transport.push(
            Endpoint::TopResumes,
            Err(TransportError::Http {
                status: 503,
                body: String::new(),
            }),
        );

        aggregator
            .refresh_top_candidates(&ctx, FetchMode::Manual)
            .await
            .unwrap();
        let err = aggregator
            .refresh_top_candidates(&ctx, FetchMode::Manual)
            .await
            .unwrap_err();

        assert!(err.user_message().contains("Server error (503)"));
        assert_eq!(ctx.top_candidates().len(), 2);
    }

    #[tokio::test]
    async fn test_collect_results_fetches_each_once_independently() {
        let (transport, aggregator, ctx) = setup();
        transport.push(
            Endpoint::TopResumes,
            Err(TransportError::Network("reset".to_string())),
        );
        transport.push(
            Endpoint::FilteringReport,
            Ok(ok(json!({"analysis_summary": {"total_resumes": 3, "average_score": 0.7}}))),
        );

        aggregator.collect_results(&ctx).await;

        assert_eq!(transport.count(Endpoint::TopResumes), 1);
        assert_eq!(transport.count(Endpoint::FilteringReport), 1);
        assert!(ctx.top_candidates().is_empty());
        assert_eq!(ctx.report().unwrap().total_resumes, Some(3));
    }

    #[tokio::test]
    async fn test_empty_report_body_stores_nothing() {
        let (transport, aggregator, ctx) = setup();
        transport.push(Endpoint::FilteringReport, Ok(ok(json!({}))));
        let stored = aggregator
            .refresh_report(&ctx, FetchMode::Background)
            .await
            .unwrap();
        assert!(!stored);
        assert!(ctx.report().is_none());
    }
}
