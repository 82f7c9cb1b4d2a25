//! # hopwise Core
//!
//! Core library for the hopwise venue recommender.
//!
//! This crate provides the retrieval-side data structures and algorithms:
//!
//! - [`Vector`] - Dense embedding vector with inner-product scoring
//! - [`Venue`] - A catalog entry as supplied by the catalog store
//! - [`Candidate`] - A venue scored against a query
//! - [`SimilarityIndex`] - In-memory catalog with top-N inner-product search
//! - [`Reranker`] - Second-stage relevance reranking over a batched scorer
//!
//! ## Example
//!
//! ```rust
//! use hopwise_core::{SimilarityIndex, Vector, Venue};
//!
//! let index = SimilarityIndex::new(3);
//! index.refresh(vec![
//!     Venue::new(1, "Neon Alley", "123 Arcade St").with_summary("retro arcade bar")
//!         .with_embedding(Vector::new(vec![1.0, 0.0, 0.0])),
//! ]).unwrap();
//!
//! let query = Vector::new(vec![1.0, 0.0, 0.0]);
//! let candidates = index.search(&query, 5).unwrap();
//! assert_eq!(candidates[0].id, 1);
//! ```

pub mod error;
pub mod index;
pub mod rerank;
pub mod venue;
pub mod vector;

pub use error::{Error, Result};
pub use index::SimilarityIndex;
pub use rerank::{RelevanceScorer, Reranker};
pub use venue::{Candidate, Venue};
pub use vector::Vector;
