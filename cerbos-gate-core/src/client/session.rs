//! Lazy, single-flight decision-client session.
//!
//! The session moves through four states: uninitialized (no network
//! resource held), warming (one caller holds the write lock and is
//! constructing the connection), ready (connection cached and shared
//! read-only by all requests) and closed (back to uninitialized). Warm-up
//! failures are never cached: the state reverts to uninitialized so a later
//! request can retry.
//!
//! Externally supplied clients are ready from construction. The session
//! only uses them; it never constructs or closes a connection it does not
//! own.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::{ClientError, DecisionClient, DecisionClientFactory};
use crate::principal::Principal;
use crate::resource::Resource;

/// Cached connection state shared by all in-flight requests.
struct SessionState {
    client: Option<Arc<dyn DecisionClient>>,
    warmed_up: bool,
}

/// Owns the lazy connection to the decision service.
///
/// Cheap to share behind the gate; all methods take `&self`. The write half
/// of the internal lock is the only synchronization primitive: warm-up and
/// close mutate under it, queries clone the cached client out of the read
/// half and run without holding it.
pub struct DecisionSession {
    state: RwLock<SessionState>,
    factory: Option<Arc<dyn DecisionClientFactory>>,
}

impl DecisionSession {
    /// Session that constructs and owns its client via the given factory.
    pub fn owned(factory: impl DecisionClientFactory + 'static) -> Self {
        Self::with_factory(Arc::new(factory))
    }

    /// Session that constructs and owns its client via a shared factory.
    pub fn with_factory(factory: Arc<dyn DecisionClientFactory>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                client: None,
                warmed_up: false,
            }),
            factory: Some(factory),
        }
    }

    /// Session around an externally supplied client.
    ///
    /// The client is treated as ready immediately; [`close`](Self::close)
    /// never touches it.
    pub fn external(client: Arc<dyn DecisionClient>) -> Self {
        Self {
            state: RwLock::new(SessionState {
                client: Some(client),
                warmed_up: true,
            }),
            factory: None,
        }
    }

    /// Whether this session owns (and may close) its client.
    pub fn owns_client(&self) -> bool {
        self.factory.is_some()
    }

    /// Whether the connection is established and cached.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.warmed_up
    }

    /// Establish the connection if it is not already cached.
    ///
    /// Idempotent. Concurrent first-callers serialize on the write lock and
    /// re-check readiness after acquiring it, so at most one connection
    /// construction and one liveness probe happen regardless of how many
    /// requests race here. Construction and probe failures propagate to the
    /// caller unchanged and leave the session retryable.
    pub async fn warm_up(&self) -> Result<(), ClientError> {
        if self.state.read().await.warmed_up {
            return Ok(());
        }

        let mut state = self.state.write().await;
        // Another caller may have completed warm-up while we waited.
        if state.warmed_up {
            return Ok(());
        }

        let factory = self.factory.as_ref().ok_or_else(|| {
            ClientError::Connection("external decision client is not available".to_string())
        })?;

        let client = factory.connect().await?;
        // Fail fast on bad configuration before caching anything; an error
        // here drops the client and leaves the session uninitialized.
        client.server_info().await?;

        state.client = Some(client);
        state.warmed_up = true;
        Ok(())
    }

    /// Query the decision service, warming up on first use.
    pub async fn is_allowed(
        &self,
        action: &str,
        principal: &Principal,
        resource: &Resource,
    ) -> Result<bool, ClientError> {
        self.warm_up().await?;

        let client = self.state.read().await.client.clone().ok_or_else(|| {
            ClientError::Connection("decision client is not available".to_string())
        })?;

        client.check(action, principal, resource).await
    }

    /// Release an owned client and reset to uninitialized.
    ///
    /// No-op for externally supplied clients: the caller still owns those.
    pub async fn close(&self) -> Result<(), ClientError> {
        if self.factory.is_none() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        state.warmed_up = false;
        if let Some(client) = state.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}
