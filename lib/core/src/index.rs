use crate::{Candidate, Error, Result, Vector, Venue};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-memory vector catalog with top-N inner-product search.
///
/// The catalog is the only cross-request shared mutable state in the system.
/// [`refresh`](SimilarityIndex::refresh) swaps the whole snapshot atomically:
/// searches clone the `Arc` under the read lock and score outside it, so a
/// search running concurrently with a refresh observes either the fully old
/// or the fully new catalog, never a mixture.
pub struct SimilarityIndex {
    dim: usize,
    catalog: RwLock<Arc<Vec<Venue>>>,
}

impl SimilarityIndex {
    /// Create an empty index for embeddings of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            catalog: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Create an index pre-populated with `venues`.
    pub fn with_venues(dim: usize, venues: Vec<Venue>) -> Result<Self> {
        let index = Self::new(dim);
        index.refresh(venues)?;
        Ok(index)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.catalog.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.read().is_empty()
    }

    /// Atomically replace the entire catalog.
    ///
    /// In-flight searches keep scoring their own snapshot; the swap never
    /// waits for them to drain.
    pub fn refresh(&self, venues: Vec<Venue>) -> Result<()> {
        for venue in &venues {
            if venue.embedding.dim() != self.dim {
                return Err(Error::InvalidDimension {
                    expected: self.dim,
                    actual: venue.embedding.dim(),
                });
            }
        }

        let count = venues.len();
        *self.catalog.write() = Arc::new(venues);
        info!("similarity index refreshed with {} venues", count);
        Ok(())
    }

    /// Top candidates by descending inner product, at most `2 * limit` items.
    ///
    /// Both catalog and query vectors are assumed pre-normalized by the
    /// embedding collaborator. An empty catalog yields an empty list, not an
    /// error; the caller decides whether that degrades the whole request.
    pub fn search(&self, query: &Vector, limit: usize) -> Result<Vec<Candidate>> {
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }

        let snapshot = Arc::clone(&self.catalog.read());
        if snapshot.is_empty() {
            warn!("similarity search over an empty catalog");
            return Ok(Vec::new());
        }

        let mut scored: Vec<Candidate> = snapshot
            .iter()
            .map(|venue| Candidate::from_venue(venue, venue.embedding.dot(query)))
            .collect();

        // Stable sort keeps catalog order on score ties.
        scored.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(2 * limit);

        debug!(
            "similarity search returned {} of {} venues",
            scored.len(),
            snapshot.len()
        );
        Ok(scored)
    }
}
