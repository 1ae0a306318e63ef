//! Axum route handlers for the Filtering API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRecord, ScoreStats};
use crate::models::job::FilteringJob;
use crate::models::report::FilteringReport;
use crate::models::ticket::TicketId;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ApplicationsResponse {
    pub ticket_id: TicketId,
    pub count: usize,
    pub applications: Vec<CandidateRecord>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: FilteringJob,
}

#[derive(Debug, Serialize)]
pub struct TopCandidatesResponse {
    pub ticket_id: TicketId,
    pub count: usize,
    pub stats: Option<ScoreStats>,
    pub candidates: Vec<CandidateRecord>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub ticket_id: TicketId,
    pub report: Option<FilteringReport>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub ticket_id: TicketId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopWatchingResponse {
    pub ticket_id: TicketId,
    pub was_watched: bool,
}

fn ticket_from_path(raw: String) -> Result<TicketId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("ticket id cannot be empty".to_string()));
    }
    Ok(TicketId::new(trimmed))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/tickets/:id/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ApplicationsResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let applications = state.orchestrator.list_applications(&ticket);

    Ok(Json(ApplicationsResponse {
        ticket_id: ticket,
        count: applications.len(),
        applications,
    }))
}

/// POST /api/v1/tickets/:id/filtering
///
/// Starts AI filtering. Refused when no applications are known or a run is
/// already in progress.
pub async fn handle_trigger_filtering(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let job = state.orchestrator.trigger_filtering(&ticket).await?;
    Ok(Json(JobResponse { job }))
}

/// GET /api/v1/tickets/:id/filtering
pub async fn handle_get_status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let job = state.orchestrator.get_status(&ticket);
    Ok(Json(JobResponse { job }))
}

/// GET /api/v1/tickets/:id/top-candidates
///
/// Ranked candidates plus min/max/mean of their overall scores.
pub async fn handle_get_top_candidates(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<TopCandidatesResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let candidates = state.orchestrator.get_top_candidates(&ticket);

    Ok(Json(TopCandidatesResponse {
        ticket_id: ticket,
        count: candidates.len(),
        stats: ScoreStats::from_candidates(&candidates),
        candidates,
    }))
}

/// GET /api/v1/tickets/:id/report
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let report = state.orchestrator.get_report(&ticket);
    Ok(Json(ReportResponse {
        ticket_id: ticket,
        report,
    }))
}

/// POST /api/v1/tickets/:id/refresh
///
/// Re-fetches everything and reports failures instead of keeping quiet.
pub async fn handle_refresh(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let job = state.orchestrator.refresh_all(&ticket).await?;
    Ok(Json(JobResponse { job }))
}

/// POST /api/v1/tickets/:id/send-top-candidates
pub async fn handle_send_top_candidates(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<SendResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let message = state.orchestrator.send_top_candidates(&ticket).await?;
    Ok(Json(SendResponse {
        ticket_id: ticket,
        message,
    }))
}

/// DELETE /api/v1/tickets/:id/watch
///
/// Stops polling and discards any in-flight results for the ticket.
pub async fn handle_stop_watching(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<StopWatchingResponse>, AppError> {
    let ticket = ticket_from_path(raw)?;
    let was_watched = state.orchestrator.stop_watching(&ticket);
    Ok(Json(StopWatchingResponse {
        ticket_id: ticket,
        was_watched,
    }))
}
