//! Contracts for the external collaborators.
//!
//! The engine owns no model weights, no persistence, and no browser session;
//! concrete apps implement these traits around whatever serves them. Methods
//! return `impl Future + Send` so implementations are plain `async fn` and
//! the orchestrator can move calls onto background tasks.

use hopwise_core::{Result, SimilarityIndex, Vector, Venue};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::info;

/// Unit a distance measurement is requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl DistanceUnit {
    /// Conversion factor to meters, the unit route costs accumulate in.
    #[must_use]
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => 1609.344,
            DistanceUnit::Feet => 0.3048,
        }
    }
}

/// Embedding model collaborator: free text in, L2-normalized vector of the
/// catalog's dimension out. Deterministic given identical model weights.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vector>> + Send;
}

/// Read contract of the venue catalog store. The write side belongs to the
/// ingestion pipeline and is out of engine scope.
pub trait CatalogStore: Send + Sync {
    fn list_venues(&self) -> impl Future<Output = Result<Vec<Venue>>> + Send;
}

/// Pairwise walking-distance collaborator.
///
/// The real implementation drives a crash-prone browser session. A per-pair
/// measurement problem is `Error::DistanceUnavailable` and degrades that
/// matrix entry; a session-level crash is `Error::Collaborator` and makes
/// the engine call [`reset`](DistanceOracle::reset) exactly once per request
/// before surfacing. Retry policy for individual pairs, if any, lives in the
/// collaborator itself.
pub trait DistanceOracle: Send + Sync {
    fn pairwise_distance(
        &self,
        from: &str,
        to: &str,
        unit: DistanceUnit,
    ) -> impl Future<Output = Result<f64>> + Send;

    /// Tear down and reinitialize the collaborator's session state.
    fn reset(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Builds a shareable route-visualization link for an ordered address list.
/// Invoked once per request, from the orchestrator's background task.
pub trait RouteVisualizer: Send + Sync {
    fn build_route_link(
        &self,
        ordered_addresses: Vec<String>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Tear down and reinitialize the collaborator's session state.
    fn reset(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Reload the catalog from the store and atomically swap it into the index.
/// Returns the new venue count.
pub async fn refresh_from_store<C: CatalogStore>(
    store: &C,
    index: &SimilarityIndex,
) -> Result<usize> {
    let venues = store.list_venues().await?;
    let count = venues.len();
    index.refresh(venues)?;
    info!("catalog refreshed from store: {} venues", count);
    Ok(count)
}
