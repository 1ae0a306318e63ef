use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use crate::models::ticket::TicketId;

/// The backend operations the orchestrator is allowed to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    StartFiltering,
    FilteringStatus,
    TopResumes,
    FilteringReport,
    ListResumes,
    SendTopResumes,
}

/// Which timeout budget a call runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Status and metadata calls.
    Standard,
    /// Bulk listings.
    Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub standard: Duration,
    pub listing: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(15),
            listing: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    pub fn for_class(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Standard => self.standard,
            TimeoutClass::Listing => self.listing,
        }
    }
}

impl Endpoint {
    pub fn method(self) -> Method {
        match self {
            Endpoint::StartFiltering | Endpoint::SendTopResumes => Method::POST,
            _ => Method::GET,
        }
    }

    /// Final path segment under `/tickets/{id}/`.
    pub fn action(self) -> &'static str {
        match self {
            Endpoint::StartFiltering => "filter-resumes",
            Endpoint::FilteringStatus => "filtering-status",
            Endpoint::TopResumes => "top-resumes",
            Endpoint::FilteringReport => "filtering-report",
            Endpoint::ListResumes => "resumes",
            Endpoint::SendTopResumes => "send-top-resumes",
        }
    }

    pub fn timeout_class(self) -> TimeoutClass {
        match self {
            Endpoint::ListResumes => TimeoutClass::Listing,
            _ => TimeoutClass::Standard,
        }
    }
}

/// One call against the backend, scoped to a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub ticket: TicketId,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint, ticket: &TicketId) -> Self {
        Self {
            endpoint,
            ticket: ticket.clone(),
            body: None,
        }
    }

    pub fn send_top_resumes(ticket: &TicketId, candidate_count: usize) -> Self {
        Self {
            endpoint: Endpoint::SendTopResumes,
            ticket: ticket.clone(),
            body: Some(json!({
                "ticket_id": ticket.as_str(),
                "candidate_count": candidate_count,
            })),
        }
    }

    /// Path relative to the backend base URL, for logs.
    pub fn path(&self) -> String {
        format!("/tickets/{}/{}", self.ticket, self.endpoint.action())
    }
}
