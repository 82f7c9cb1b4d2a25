//! # hopwise Engine
//!
//! Composition layer for the hopwise venue recommender:
//!
//! - [`traits`] - Contracts for the external collaborators (embedding model,
//!   catalog store, distance oracle, route visualizer)
//! - [`distances`] - Per-request acquisition of the walking-distance matrix
//! - [`orchestrator`] - [`Recommender`], the streaming retrieval-to-route
//!   pipeline

pub mod distances;
pub mod orchestrator;
pub mod traits;

pub use distances::build_distance_matrix;
pub use orchestrator::{
    Recommender, RecommenderConfig, RecommendationSnapshot, RecommendationUpdate, RouteStop, Stage,
};
pub use traits::{refresh_from_store, CatalogStore, DistanceOracle, DistanceUnit, Embedder, RouteVisualizer};
