use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// A catalog entry as supplied by the catalog store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: u64,
    pub name: String,
    /// Listing page for the venue (e.g. its maps entry).
    pub url: String,
    pub address: String,
    pub photo: Option<String>,
    pub summary: String,
    pub embedding: Vector,
}

impl Venue {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: String::new(),
            address: address.into(),
            photo: None,
            summary: String::new(),
            embedding: Vector::default(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vector) -> Self {
        self.embedding = embedding;
        self
    }
}

/// A venue scored against a query.
///
/// Created by [`SimilarityIndex::search`](crate::SimilarityIndex::search) with
/// `vector_score` populated and `rerank_score` unset; the
/// [`Reranker`](crate::Reranker) fills in `rerank_score` and re-orders the
/// list. Read-only after that. `id` is unique within one search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub address: String,
    pub photo: Option<String>,
    pub summary: String,
    pub vector_score: f32,
    pub rerank_score: Option<f32>,
}

impl Candidate {
    #[must_use]
    pub fn from_venue(venue: &Venue, vector_score: f32) -> Self {
        Self {
            id: venue.id,
            name: venue.name.clone(),
            url: venue.url.clone(),
            address: venue.address.clone(),
            photo: venue.photo.clone(),
            summary: venue.summary.clone(),
            vector_score,
            rerank_score: None,
        }
    }

    /// Text paired with the query for relevance scoring.
    #[must_use]
    pub fn pair_text(&self) -> String {
        format!("{}: {}", self.name, self.summary)
    }

    /// Address line handed to the distance oracle and route visualizer.
    /// Prefixing the venue name disambiguates chains at nearby addresses.
    #[must_use]
    pub fn route_address(&self) -> String {
        format!("{}, {}", self.name, self.address)
    }
}
