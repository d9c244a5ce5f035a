// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{AuthError, Result};
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

/// What the authorization server sent back to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Denied(String),
    Invalid,
}

impl CallbackOutcome {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        if let Some(reason) = params.get("error_reason").or_else(|| params.get("error")) {
            return Self::Denied(reason.clone());
        }

        match params.get("code") {
            Some(code) if !code.is_empty() => Self::Code(code.clone()),
            _ => Self::Invalid,
        }
    }

    fn into_result(self) -> Result<String> {
        match self {
            Self::Code(code) => Ok(code),
            Self::Denied(reason) => Err(AuthError::Denied(reason)),
            Self::Invalid => Err(AuthError::InvalidCallback),
        }
    }
}

type OutcomeSlot = Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>;

/// Local HTTP listener that serves exactly one OAuth redirect and then shuts down.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    pub async fn bind(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| AuthError::Bind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve `callback_path` until the first request arrives or `timeout` elapses.
    pub async fn wait_for_code(self, callback_path: &str, timeout: Duration) -> Result<String> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let slot: OutcomeSlot = Arc::new(Mutex::new(Some(outcome_tx)));

        let router = Router::new()
            .route(callback_path, get(handle_callback))
            .with_state(slot);

        if let Ok(addr) = self.listener.local_addr() {
            info!(target: "auth", "waiting for OAuth callback on http://{}{}", addr, callback_path);
        }

        let server = tokio::spawn(async move {
            axum::serve(self.listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::time::timeout(timeout, outcome_rx).await;

        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Ok(())) => debug!(target: "auth", "callback listener shut down"),
            Ok(Err(e)) => warn!(target: "auth", error = %e, "callback listener failed"),
            Err(e) => warn!(target: "auth", error = %e, "callback listener task panicked"),
        }

        match outcome {
            Err(_) => Err(AuthError::CallbackTimeout(timeout)),
            Ok(Err(_)) => Err(AuthError::InvalidCallback),
            Ok(Ok(outcome)) => outcome.into_result(),
        }
    }
}

async fn handle_callback(
    State(slot): State<OutcomeSlot>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let outcome = CallbackOutcome::from_query(&params);
    let page = status_page(&outcome);

    if let Some(sender) = slot.lock().await.take() {
        let _ = sender.send(outcome);
    }

    Html(page)
}

fn status_page(outcome: &CallbackOutcome) -> String {
    let status = match outcome {
        CallbackOutcome::Code(_) => "successful".to_string(),
        CallbackOutcome::Denied(reason) => {
            format!("failed (Received error from auth server: {reason})")
        }
        CallbackOutcome::Invalid => {
            return "<html><body><h1>Invalid request</h1></body></html>".to_string();
        }
    };

    format!(
        r#"<html>
<body>
<h1>Authentication status: {status}</h1>
This window can be closed.
<script>
window.close()
</script>
<button class="closeButton" style="cursor: pointer" onclick="window.close();">Close Window</button>
</body>
</html>"#
    )
}
