//! Single-flight guard for token refreshes.
//!
//! Concurrent session reads holding the same expired refresh token share one
//! outbound refresh call. Finished outcomes stay available for a short
//! window so readers that arrive just after the refresh reuse them instead of
//! spending the (now rotated) refresh token a second time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::ApiError;

use super::session::TokenBundle;

/// How long a finished refresh outcome is reused.
pub const OUTCOME_RETENTION: Duration = Duration::from_secs(30);

/// Result of one refresh, shared by every caller that waited on it.
pub type RefreshOutcome = Result<TokenBundle, Arc<ApiError>>;

/// Outcome of a finished refresh and when it finished.
type Finished = Option<(Instant, RefreshOutcome)>;

struct Flight {
    created: Instant,
    slot: Arc<tokio::sync::Mutex<Finished>>,
}

impl Flight {
    /// Whether the entry can be dropped. A refresh still running holds the
    /// slot lock and is never stale.
    fn is_stale(&self, now: Instant, retention: Duration) -> bool {
        let Ok(finished) = self.slot.try_lock() else {
            return false;
        };
        match finished.as_ref() {
            Some((at, _)) => now.duration_since(*at) >= retention,
            // Abandoned by a cancelled leader
            None => now.duration_since(self.created) >= retention,
        }
    }
}

pub struct RefreshGuard {
    flights: Mutex<HashMap<String, Flight>>,
    retention: Duration,
}

impl Default for RefreshGuard {
    fn default() -> Self {
        Self::new(OUTCOME_RETENTION)
    }
}

impl RefreshGuard {
    pub fn new(retention: Duration) -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Run `refresh` for `refresh_token` unless another caller already is
    /// (or recently did), in which case its outcome is returned.
    pub async fn run<F, Fut>(&self, refresh_token: &str, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let slot = self.slot(refresh_token);
        let mut finished = slot.lock().await;
        if let Some((_, shared)) = finished.as_ref() {
            debug!("Reusing outcome of concurrent token refresh");
            return shared.clone();
        }

        // A cancelled leader leaves the slot empty, so the next waiter runs
        // the refresh itself.
        let fresh = refresh().await;
        *finished = Some((Instant::now(), fresh.clone()));
        fresh
    }

    fn slot(&self, refresh_token: &str) -> Arc<tokio::sync::Mutex<Finished>> {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        flights.retain(|_, flight| !flight.is_stale(now, self.retention));
        flights
            .entry(refresh_token.to_string())
            .or_insert_with(|| Flight {
                created: now,
                slot: Arc::default(),
            })
            .slot
            .clone()
    }

    /// Number of refresh tokens currently tracked.
    pub fn tracked(&self) -> usize {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
