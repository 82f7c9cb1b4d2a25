//! Streaming composition of the recommendation pipeline.
//!
//! One request walks `Retrieving -> Reranking -> BuildingDistances ->
//! SolvingRoute -> StreamingResults -> AwaitingVisual -> Done`, with `Failed`
//! terminal from any stage. Results are streamed as immutable snapshots over
//! a bounded channel; each snapshot's stop list strictly extends the
//! previous one, and the visualization increment is always last. The
//! route-visualization fetch runs on a single background task per request
//! and is never allowed to block the stop stream.

use crate::distances::build_distance_matrix;
use crate::traits::{DistanceOracle, DistanceUnit, Embedder, RouteVisualizer};
use hopwise_core::{Candidate, Error, RelevanceScorer, Reranker, Result, SimilarityIndex};
use hopwise_routing::{solve, RoutePlan};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Pipeline stage, for logging and instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieving,
    Reranking,
    BuildingDistances,
    SolvingRoute,
    StreamingResults,
    AwaitingVisual,
    Done,
    Failed,
}

/// One stop along the recommended route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub candidate: Candidate,
    /// Walking distance in meters from the previous stop. `None` for the
    /// first stop, and for every stop when no feasible route exists.
    pub leg_from_previous: Option<f64>,
}

/// Immutable partial-result snapshot.
///
/// Snapshots form a finite, non-restartable, ordered sequence; each one's
/// `stops` is strictly a superset of the previous snapshot's. The last
/// snapshot has `complete: true` and, when available, the visualization URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSnapshot {
    pub stops: Vec<RouteStop>,
    /// False when the solver found no feasible route and the stops are in
    /// rerank order instead of visiting order.
    pub route_available: bool,
    pub visualization: Option<String>,
    pub complete: bool,
}

/// What the consumer receives: either a snapshot or a single terminal
/// degraded message. Never a half-built state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecommendationUpdate {
    Snapshot(RecommendationSnapshot),
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Route size; retrieval fetches `2 * top_k` candidates for reranking.
    pub top_k: usize,
    /// Optional rerank score floor. When set, `top_k` is not applied.
    pub rerank_threshold: Option<f32>,
    /// Unit requested from the distance oracle.
    pub unit: DistanceUnit,
    /// Bounded wait for the background visualization fetch.
    pub visual_timeout: Duration,
    /// Capacity of the snapshot channel.
    pub channel_capacity: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rerank_threshold: None,
            unit: DistanceUnit::Meters,
            visual_timeout: Duration::from_secs(30),
            channel_capacity: 8,
        }
    }
}

/// The recommendation orchestrator.
///
/// Receives every collaborator at construction time; lifecycle of the
/// underlying sessions (lazy init, teardown) belongs to the collaborator
/// implementations, not to ambient global state.
pub struct Recommender<E, S, O, V> {
    index: Arc<SimilarityIndex>,
    reranker: Reranker<S>,
    embedder: E,
    oracle: O,
    visualizer: Arc<V>,
    config: RecommenderConfig,
}

impl<E, S, O, V> Recommender<E, S, O, V>
where
    E: Embedder + 'static,
    S: RelevanceScorer + 'static,
    O: DistanceOracle + 'static,
    V: RouteVisualizer + 'static,
{
    pub fn new(
        index: Arc<SimilarityIndex>,
        reranker: Reranker<S>,
        embedder: E,
        oracle: O,
        visualizer: Arc<V>,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            index,
            reranker,
            embedder,
            oracle,
            visualizer,
            config,
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Run the pipeline for `query`, streaming updates into the returned
    /// bounded receiver.
    ///
    /// Dropping the receiver cancels the request at its next suspension
    /// point; an already-spawned visualization task is left to complete and
    /// be discarded, not awaited. A caller issuing a new request simply
    /// abandons the previous receiver.
    pub fn recommend(self: Arc<Self>, query: impl Into<String>) -> mpsc::Receiver<RecommendationUpdate> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let this = self;
        let query = query.into();

        tokio::spawn(async move {
            if let Err(err) = this.run_pipeline(&query, &tx).await {
                debug!("stage {:?}", Stage::Failed);
                warn!("recommendation failed: {err}");
                let _ = tx
                    .send(RecommendationUpdate::Failed {
                        message: degraded_message(&err),
                    })
                    .await;
            }
        });

        rx
    }

    async fn run_pipeline(
        &self,
        query: &str,
        tx: &mpsc::Sender<RecommendationUpdate>,
    ) -> Result<()> {
        debug!("stage {:?}: '{query}'", Stage::Retrieving);
        let query_vector = self.embedder.embed(query).await?;
        let retrieved = self.index.search(&query_vector, self.config.top_k)?;
        if retrieved.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        debug!("stage {:?}: {} candidates", Stage::Reranking, retrieved.len());
        let ranked = self
            .reranker
            .rerank(query, retrieved, self.config.top_k, self.config.rerank_threshold)
            .await?;
        if ranked.is_empty() {
            // Threshold filtered everything out; same degraded signal as an
            // empty retrieval.
            return Err(Error::EmptyCatalog);
        }

        debug!("stage {:?}", Stage::BuildingDistances);
        let addresses: Vec<String> = ranked.iter().map(Candidate::route_address).collect();
        let matrix = build_distance_matrix(&self.oracle, &addresses, self.config.unit).await?;

        debug!("stage {:?}", Stage::SolvingRoute);
        match solve(&matrix, 0) {
            Some(plan) => self.stream_route(ranked, &addresses, plan, tx).await,
            None => {
                info!("{}; presenting candidates in rerank order", Error::RouteInfeasible);
                self.stream_fallback(ranked, tx).await
            }
        }
    }

    /// Emit stops in solved order while the visualization fetch runs in the
    /// background, then append the visualization as the final increment.
    async fn stream_route(
        &self,
        ranked: Vec<Candidate>,
        addresses: &[String],
        plan: RoutePlan,
        tx: &mpsc::Sender<RecommendationUpdate>,
    ) -> Result<()> {
        let ordered_addresses: Vec<String> =
            plan.path.iter().map(|&i| addresses[i].clone()).collect();
        let visual_task = self.spawn_visualization(ordered_addresses);

        debug!("stage {:?}: {} stops", Stage::StreamingResults, plan.path.len());
        let mut stops = Vec::with_capacity(plan.path.len());
        for (step, &index) in plan.path.iter().enumerate() {
            stops.push(RouteStop {
                candidate: ranked[index].clone(),
                leg_from_previous: (step > 0).then(|| plan.leg_distances[step - 1]),
            });
            let snapshot = RecommendationSnapshot {
                stops: stops.clone(),
                route_available: true,
                visualization: None,
                complete: false,
            };
            if !send_update(tx, RecommendationUpdate::Snapshot(snapshot)).await {
                return Ok(());
            }
        }

        debug!("stage {:?}", Stage::AwaitingVisual);
        let visualization = match timeout(self.config.visual_timeout, visual_task).await {
            Err(_) => {
                warn!("{}", Error::VisualizationTimeout(self.config.visual_timeout));
                None
            }
            Ok(Err(join_err)) => {
                return Err(Error::Collaborator(format!(
                    "route visualizer task failed: {join_err}"
                )))
            }
            Ok(Ok(Err(err))) => return Err(err),
            Ok(Ok(Ok(url))) => Some(url),
        };

        let final_snapshot = RecommendationSnapshot {
            stops,
            route_available: true,
            visualization,
            complete: true,
        };
        send_update(tx, RecommendationUpdate::Snapshot(final_snapshot)).await;
        debug!("stage {:?}", Stage::Done);
        Ok(())
    }

    /// No feasible route: present candidates in rerank order, legs omitted,
    /// no visualization.
    async fn stream_fallback(
        &self,
        ranked: Vec<Candidate>,
        tx: &mpsc::Sender<RecommendationUpdate>,
    ) -> Result<()> {
        let mut stops = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            stops.push(RouteStop {
                candidate,
                leg_from_previous: None,
            });
            let snapshot = RecommendationSnapshot {
                stops: stops.clone(),
                route_available: false,
                visualization: None,
                complete: false,
            };
            if !send_update(tx, RecommendationUpdate::Snapshot(snapshot)).await {
                return Ok(());
            }
        }

        let final_snapshot = RecommendationSnapshot {
            stops,
            route_available: false,
            visualization: None,
            complete: true,
        };
        send_update(tx, RecommendationUpdate::Snapshot(final_snapshot)).await;
        debug!("stage {:?}", Stage::Done);
        Ok(())
    }

    /// One background task per request. On a session-level failure the
    /// visualizer is reinitialized exactly once before the call is retried.
    fn spawn_visualization(&self, addresses: Vec<String>) -> JoinHandle<Result<String>> {
        let visualizer = Arc::clone(&self.visualizer);
        tokio::spawn(async move {
            match visualizer.build_route_link(addresses.clone()).await {
                Ok(url) => Ok(url),
                Err(Error::Collaborator(reason)) => {
                    warn!("route visualizer session failed ({reason}), reinitializing once");
                    visualizer.reset().await?;
                    visualizer.build_route_link(addresses).await
                }
                Err(err) => Err(err),
            }
        })
    }
}

/// Send one update; false means the consumer dropped the receiver and the
/// request is superseded.
async fn send_update(tx: &mpsc::Sender<RecommendationUpdate>, update: RecommendationUpdate) -> bool {
    if tx.send(update).await.is_err() {
        debug!("consumer abandoned the stream, cancelling request");
        return false;
    }
    true
}

fn degraded_message(err: &Error) -> String {
    match err {
        Error::EmptyCatalog => {
            "No venues matched your vibe. Try describing it differently.".to_string()
        }
        _ => "Sorry, something went wrong while building your route. Please try again.".to_string(),
    }
}
