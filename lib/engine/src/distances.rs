//! Per-request acquisition of the walking-distance matrix.

use crate::traits::{DistanceOracle, DistanceUnit};
use hopwise_core::{Error, Result};
use hopwise_routing::DistanceMatrix;
use tracing::{info, warn};

/// Build the symmetric distance matrix for `addresses` with one oracle call
/// per unordered pair.
///
/// A per-pair `DistanceUnavailable` degrades that entry to infinity. A
/// session-level `Collaborator` failure triggers exactly one
/// [`reset`](DistanceOracle::reset) followed by a retry of the failed pair;
/// a second session failure within the same request - or a failed reset -
/// surfaces the error.
pub async fn build_distance_matrix<O: DistanceOracle>(
    oracle: &O,
    addresses: &[String],
    unit: DistanceUnit,
) -> Result<DistanceMatrix> {
    let n = addresses.len();
    let mut matrix = DistanceMatrix::new(n);
    let mut session_recovered = false;

    for i in 0..n {
        for j in (i + 1)..n {
            let mut attempt = oracle
                .pairwise_distance(&addresses[i], &addresses[j], unit)
                .await;

            if let Err(Error::Collaborator(reason)) = &attempt {
                if session_recovered {
                    return Err(Error::Collaborator(format!(
                        "distance oracle failed again after one reinitialization: {reason}"
                    )));
                }
                warn!("distance oracle session failed ({reason}), reinitializing once");
                session_recovered = true;
                oracle.reset().await?;
                attempt = oracle
                    .pairwise_distance(&addresses[i], &addresses[j], unit)
                    .await;
            }

            match attempt {
                Ok(distance) => {
                    matrix.set_pair(i, j, distance * unit.meters_per_unit());
                    info!(
                        "distance between '{}' and '{}': {:.0} {:?}",
                        addresses[i], addresses[j], distance, unit
                    );
                }
                Err(Error::DistanceUnavailable { from, to }) => {
                    warn!("distance unavailable between '{from}' and '{to}', degrading to infinity");
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(matrix)
}
