//! # hopwise
//!
//! Vibe-driven venue recommendations ordered into walkable routes.
//!
//! A free-text query ("cozy bars with dim lighting and jazz") is embedded,
//! matched against an in-memory venue catalog, reranked by a relevance
//! model, and the winning venues are ordered into the shortest walkable
//! route, streamed to the caller stop by stop while a route-visualization
//! link is fetched in the background.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hopwise::prelude::*;
//! # use hopwise::Result;
//! # async fn example(embedder: impl hopwise::Embedder + 'static,
//! #                  scorer: impl hopwise::RelevanceScorer + 'static,
//! #                  oracle: impl hopwise::DistanceOracle + 'static,
//! #                  visualizer: impl hopwise::RouteVisualizer + 'static,
//! #                  venues: Vec<Venue>) -> Result<()> {
//! let index = Arc::new(SimilarityIndex::with_venues(384, venues)?);
//! let recommender = Arc::new(Recommender::new(
//!     index,
//!     Reranker::new(scorer),
//!     embedder,
//!     oracle,
//!     Arc::new(visualizer),
//!     RecommenderConfig::default(),
//! ));
//!
//! let mut updates = recommender.recommend("retro arcade vibes and neon lights");
//! while let Some(update) = updates.recv().await {
//!     match update {
//!         RecommendationUpdate::Snapshot(snapshot) => { /* render stops */ }
//!         RecommendationUpdate::Failed { message } => eprintln!("{message}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `hopwise-core` - Venue catalog, similarity index, reranking
//! - `hopwise-routing` - Distance matrix and exact Hamiltonian-path solver
//! - `hopwise-engine` - Collaborator contracts and the streaming orchestrator

// Re-export core types
pub use hopwise_core::{
    Candidate, Error, RelevanceScorer, Reranker, Result, SimilarityIndex, Vector, Venue,
};

// Re-export routing
pub use hopwise_routing::{solve, DistanceMatrix, RoutePlan, MAX_STOPS};

// Re-export engine
pub use hopwise_engine::{
    build_distance_matrix, refresh_from_store, CatalogStore, DistanceOracle, DistanceUnit,
    Embedder, Recommender, RecommenderConfig, RecommendationSnapshot, RecommendationUpdate,
    RouteStop, RouteVisualizer, Stage,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        build_distance_matrix, refresh_from_store, solve, Candidate, CatalogStore,
        DistanceMatrix, DistanceOracle, DistanceUnit, Embedder, Error, Recommender,
        RecommenderConfig, RecommendationSnapshot, RecommendationUpdate, RelevanceScorer,
        Reranker, Result, RoutePlan, RouteStop, RouteVisualizer, SimilarityIndex, Stage, Vector,
        Venue,
    };
}
