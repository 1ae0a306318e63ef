//! Shared read path: transport call, envelope check, and the
//! background-vs-manual error policy.

use serde_json::Value;
use tracing::debug;

use crate::backend_client::{ApiRequest, Envelope, Transport};
use crate::filtering::error::OrchestratorError;
use crate::filtering::guard::{ConcurrencyGuard, GuardKey, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Guarded; overlapping calls are dropped and every failure is swallowed.
    Background,
    /// User-initiated; bypasses the guard and propagates failures.
    Manual,
}

/// Fetches the envelope `data` for `request`.
///
/// `Ok(None)` means "nothing new": the key was busy, a background call
/// failed, or the backend answered `success: false` to a background call.
pub async fn fetch_data(
    transport: &dyn Transport,
    guard: &ConcurrencyGuard,
    resource: Resource,
    request: ApiRequest,
    mode: FetchMode,
) -> Result<Option<Value>, OrchestratorError> {
    match mode {
        FetchMode::Manual => {
            let envelope = Envelope::parse(transport.call(&request).await?)?;
            if !envelope.success {
                return Err(OrchestratorError::Rejected(
                    envelope
                        .message
                        .unwrap_or_else(|| "Unknown error".to_string()),
                ));
            }
            Ok(Some(envelope.data))
        }
        FetchMode::Background => {
            let key = GuardKey::new(resource, &request.ticket);
            let Some(result) = guard.run(key, transport.call(&request)).await else {
                return Ok(None);
            };

            let envelope = match result.and_then(Envelope::parse) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!("Background {} failed: {e}", request.path());
                    return Ok(None);
                }
            };

            if !envelope.success {
                debug!(
                    "Background {} answered success=false: {}",
                    request.path(),
                    envelope.message.as_deref().unwrap_or("no message")
                );
                return Ok(None);
            }

            Ok(Some(envelope.data))
        }
    }
}
