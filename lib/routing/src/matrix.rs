/// Symmetric pairwise walking-distance matrix over a fixed candidate index
/// set, in meters.
///
/// A missing or failed measurement is `f64::INFINITY`, never a negative or
/// zero sentinel: zero is a valid same-location distance. Built once per
/// route request and discarded after.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    cells: Vec<f64>,
}

impl DistanceMatrix {
    /// A matrix with a zero diagonal and every other pair unmeasured.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut cells = vec![f64::INFINITY; n * n];
        for i in 0..n {
            cells[i * n + i] = 0.0;
        }
        Self { n, cells }
    }

    /// Build from rows, e.g. a literal in tests. Panics on a ragged input.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let mut matrix = Self::new(n);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), n, "distance matrix must be square");
            for (j, &d) in row.iter().enumerate() {
                matrix.cells[i * n + j] = d;
            }
        }
        matrix
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.n + j]
    }

    /// Record a measurement for both orientations of a pair.
    #[inline]
    pub fn set_pair(&mut self, i: usize, j: usize, distance: f64) {
        self.cells[i * self.n + j] = distance;
        self.cells[j * self.n + i] = distance;
    }

    /// Number of unordered pairs with a finite measurement.
    #[must_use]
    pub fn measured_pairs(&self) -> usize {
        let mut count = 0;
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.get(i, j).is_finite() {
                    count += 1;
                }
            }
        }
        count
    }
}
