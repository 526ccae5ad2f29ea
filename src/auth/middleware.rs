use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthGate, AuthOutcome};

/// Gate every request behind [`AuthGate`]; the accepted `Identity` is
/// inserted into the request extensions.
pub async fn require_authentication(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let outcome = gate.evaluate(request.headers()).await;
    match outcome {
        AuthOutcome::Accepted(identity) => {
            tracing::debug!(
                subject = %identity.subject,
                scheme = %identity.scheme,
                "Request authenticated"
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthOutcome::Rejected => {
            tracing::debug!(path = %request.uri().path(), "Request rejected");
            gate.challenge_response()
        }
    }
}
