// Integration tests for hopwise
use hopwise::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// ==================== Mock collaborators ====================

/// Embeds every query to the same fixed vector.
struct FixedEmbedder {
    vector: Vec<f32>,
}

impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Ok(Vector::new(self.vector.clone()))
    }
}

/// Scores each candidate by its venue name.
struct NameScorer {
    scores: HashMap<String, f32>,
}

impl RelevanceScorer for NameScorer {
    async fn score_batch(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>> {
        Ok(texts
            .iter()
            .map(|text| {
                let name = text.split(':').next().unwrap_or("");
                *self.scores.get(name).unwrap_or(&0.0)
            })
            .collect())
    }
}

/// Serves distances from a fixed matrix, keyed by route address. Pairs set
/// to infinity in the matrix report a per-pair measurement failure; an
/// optional session crash is scripted by call number.
struct MatrixOracle {
    rows: Vec<Vec<f64>>,
    address_index: HashMap<String, usize>,
    calls: AtomicUsize,
    resets: AtomicUsize,
    crash_on_call: Option<usize>,
}

impl MatrixOracle {
    fn new(rows: Vec<Vec<f64>>, addresses: &[String]) -> Self {
        let address_index = addresses
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i))
            .collect();
        Self {
            rows,
            address_index,
            calls: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            crash_on_call: None,
        }
    }

    fn with_crash_on_call(mut self, call: usize) -> Self {
        self.crash_on_call = Some(call);
        self
    }
}

impl DistanceOracle for MatrixOracle {
    async fn pairwise_distance(&self, from: &str, to: &str, _unit: DistanceUnit) -> Result<f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.crash_on_call == Some(call) && self.resets.load(Ordering::SeqCst) == 0 {
            return Err(Error::Collaborator("driver session died".into()));
        }

        let i = self.address_index[from];
        let j = self.address_index[to];
        let distance = self.rows[i][j];
        if distance.is_infinite() {
            return Err(Error::DistanceUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(distance)
    }

    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Returns a canned URL after an optional delay; crashes are scripted.
struct CannedVisualizer {
    url: String,
    delay: Duration,
    crashes_before_success: AtomicUsize,
    calls: AtomicUsize,
    resets: AtomicUsize,
}

impl CannedVisualizer {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            delay: Duration::ZERO,
            crashes_before_success: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_crashes(self, crashes: usize) -> Self {
        self.crashes_before_success.store(crashes, Ordering::SeqCst);
        self
    }
}

impl RouteVisualizer for CannedVisualizer {
    async fn build_route_link(&self, ordered_addresses: Vec<String>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .crashes_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Collaborator("browser crashed".into()));
        }
        tokio::time::sleep(self.delay).await;
        Ok(format!("{}?stops={}", self.url, ordered_addresses.len()))
    }

    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ==================== Fixtures ====================

fn venue(id: u64, embedding: Vec<f32>) -> Venue {
    Venue::new(id, format!("v{id}"), format!("{id} Main St"))
        .with_url(format!("https://maps.example/v{id}"))
        .with_summary(format!("venue number {id}"))
        .with_embedding(Vector::new(embedding))
}

/// Four venues, rerank scores ordering them v0 > v1 > v2 > v3.
fn four_venue_setup() -> (Arc<SimilarityIndex>, NameScorer, Vec<String>) {
    let venues = vec![
        venue(0, vec![1.0, 0.0]),
        venue(1, vec![0.9, 0.1]),
        venue(2, vec![0.8, 0.2]),
        venue(3, vec![0.7, 0.3]),
    ];
    let addresses: Vec<String> = venues
        .iter()
        .map(|v| format!("{}, {}", v.name, v.address))
        .collect();
    let index = Arc::new(SimilarityIndex::with_venues(2, venues).unwrap());

    let scores = HashMap::from([
        ("v0".to_string(), 0.9),
        ("v1".to_string(), 0.8),
        ("v2".to_string(), 0.7),
        ("v3".to_string(), 0.6),
    ]);

    (index, NameScorer { scores }, addresses)
}

/// The known 4-stop matrix: optimal path 0 -> 1 -> 3 -> 2, legs 2, 4, 8.
fn known_rows() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 2.0, 9.0, 10.0],
        vec![2.0, 0.0, 6.0, 4.0],
        vec![9.0, 6.0, 0.0, 8.0],
        vec![10.0, 4.0, 8.0, 0.0],
    ]
}

fn recommender(
    index: Arc<SimilarityIndex>,
    scorer: NameScorer,
    oracle: MatrixOracle,
    visualizer: Arc<CannedVisualizer>,
    config: RecommenderConfig,
) -> Arc<Recommender<FixedEmbedder, NameScorer, MatrixOracle, CannedVisualizer>> {
    Arc::new(Recommender::new(
        index,
        Reranker::new(scorer),
        FixedEmbedder {
            vector: vec![1.0, 0.0],
        },
        oracle,
        visualizer,
        config,
    ))
}

async fn collect_updates(
    mut rx: tokio::sync::mpsc::Receiver<RecommendationUpdate>,
) -> Vec<RecommendationUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    updates
}

fn snapshots(updates: &[RecommendationUpdate]) -> Vec<&RecommendationSnapshot> {
    updates
        .iter()
        .filter_map(|u| match u {
            RecommendationUpdate::Snapshot(s) => Some(s),
            RecommendationUpdate::Failed { .. } => None,
        })
        .collect()
}

// ==================== Retrieval scenarios ====================

#[test]
fn test_search_ranks_closest_venues_first() {
    // Catalog of 4 venues; the query vector is closest to C, then B.
    let a = venue(1, vec![1.0, 0.0, 0.0]);
    let b = venue(2, vec![0.0, 0.6, 0.8]);
    let c = venue(3, vec![0.0, 0.0, 1.0]);
    let d = venue(4, vec![0.0, 1.0, 0.0]);
    let index = SimilarityIndex::with_venues(3, vec![a, b, c, d]).unwrap();

    let query = Vector::new(vec![0.0, 0.1, 0.99]).normalized();
    let results = index.search(&query, 2).unwrap();

    assert_eq!(results.len(), 4); // 2 * limit
    assert_eq!(results[0].id, 3); // C
    assert_eq!(results[1].id, 2); // B
}

// ==================== End-to-end streaming ====================

#[tokio::test]
async fn test_streams_route_in_solved_order_with_visualization_last() {
    init_tracing();
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route"));

    let config = RecommenderConfig {
        top_k: 4,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, Arc::clone(&visualizer), config);

    let updates = collect_updates(recommender.recommend("neon arcade vibes")).await;
    let snaps = snapshots(&updates);
    assert_eq!(snaps.len(), updates.len(), "no terminal failure expected");
    assert_eq!(snaps.len(), 5); // 4 stop increments + final visualization

    // Snapshots strictly grow.
    for pair in snaps.windows(2) {
        assert!(pair[1].stops.len() >= pair[0].stops.len());
        for (prev, next) in pair[0].stops.iter().zip(pair[1].stops.iter()) {
            assert_eq!(prev.candidate.id, next.candidate.id);
        }
    }

    let last = snaps.last().unwrap();
    assert!(last.complete && last.route_available);
    let order: Vec<u64> = last.stops.iter().map(|s| s.candidate.id).collect();
    assert_eq!(order, vec![0, 1, 3, 2]);

    let legs: Vec<Option<f64>> = last.stops.iter().map(|s| s.leg_from_previous).collect();
    assert_eq!(legs, vec![None, Some(2.0), Some(4.0), Some(8.0)]);

    assert_eq!(
        last.visualization.as_deref(),
        Some("https://maps.example/route?stops=4")
    );
    // Only the final snapshot carries the visualization.
    assert!(snaps[..4].iter().all(|s| s.visualization.is_none() && !s.complete));

    // Every candidate went through both scoring stages.
    assert!(last
        .stops
        .iter()
        .all(|s| s.candidate.rerank_score.is_some()));

    assert_eq!(visualizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(visualizer.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_infeasible_route_falls_back_to_rerank_order() {
    let (index, scorer, addresses) = four_venue_setup();
    // Node 2 unreachable from everything.
    let mut rows = known_rows();
    for i in 0..4 {
        if i != 2 {
            rows[i][2] = f64::INFINITY;
            rows[2][i] = f64::INFINITY;
        }
    }
    let oracle = MatrixOracle::new(rows, &addresses);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route"));

    let config = RecommenderConfig {
        top_k: 4,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, Arc::clone(&visualizer), config);

    let updates = collect_updates(recommender.recommend("anything")).await;
    let snaps = snapshots(&updates);
    assert_eq!(snaps.len(), updates.len());

    let last = snaps.last().unwrap();
    assert!(last.complete);
    assert!(!last.route_available);
    assert!(last.visualization.is_none());

    // Rerank order, leg distances omitted.
    let order: Vec<u64> = last.stops.iter().map(|s| s.candidate.id).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
    assert!(last.stops.iter().all(|s| s.leg_from_previous.is_none()));

    // No route, so the visualizer is never consulted.
    assert_eq!(visualizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_catalog_yields_single_degraded_message() {
    let index = Arc::new(SimilarityIndex::new(2));
    let oracle = MatrixOracle::new(Vec::new(), &[]);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route"));

    let recommender = recommender(
        index,
        NameScorer {
            scores: HashMap::new(),
        },
        oracle,
        visualizer,
        RecommenderConfig::default(),
    );

    let updates = collect_updates(recommender.recommend("anything")).await;
    assert_eq!(updates.len(), 1);
    assert!(matches!(
        &updates[0],
        RecommendationUpdate::Failed { message } if message.contains("No venues matched")
    ));
}

#[tokio::test]
async fn test_oracle_session_crash_recovers_once() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses).with_crash_on_call(3);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route"));

    let config = RecommenderConfig {
        top_k: 4,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, visualizer, config);

    let updates = collect_updates(recommender.recommend("anything")).await;
    let snaps = snapshots(&updates);
    assert_eq!(snaps.len(), updates.len(), "crash should be absorbed by one reset");
    let last = snaps.last().unwrap();
    assert!(last.complete && last.route_available);
    assert_eq!(last.stops.len(), 4);
}

#[tokio::test]
async fn test_visualization_timeout_omits_final_link() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(
        CannedVisualizer::new("https://maps.example/route").with_delay(Duration::from_secs(5)),
    );

    let config = RecommenderConfig {
        top_k: 4,
        visual_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, visualizer, config);

    let updates = collect_updates(recommender.recommend("anything")).await;
    let snaps = snapshots(&updates);
    assert_eq!(snaps.len(), updates.len());

    let last = snaps.last().unwrap();
    assert!(last.complete && last.route_available);
    assert!(last.visualization.is_none());
    // The streamed stops remain valid.
    assert_eq!(last.stops.len(), 4);
}

#[tokio::test]
async fn test_visualizer_crash_recovers_once() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route").with_crashes(1));

    let config = RecommenderConfig {
        top_k: 4,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, Arc::clone(&visualizer), config);

    let updates = collect_updates(recommender.recommend("anything")).await;
    let last_snapshot = snapshots(&updates).last().copied().cloned().unwrap();
    assert!(last_snapshot.visualization.is_some());

    // First call crashed, one reset, second call succeeded.
    assert_eq!(visualizer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(visualizer.resets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_visualizer_repeated_crash_surfaces_terminal_failure() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route").with_crashes(2));

    let config = RecommenderConfig {
        top_k: 4,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, visualizer, config);

    let updates = collect_updates(recommender.recommend("anything")).await;

    // Stop snapshots were streamed, then the exhausted retry surfaced.
    assert!(snapshots(&updates).len() >= 4);
    assert!(matches!(
        updates.last().unwrap(),
        RecommendationUpdate::Failed { .. }
    ));
}

#[tokio::test]
async fn test_dropping_receiver_cancels_request() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(
        CannedVisualizer::new("https://maps.example/route").with_delay(Duration::from_millis(20)),
    );

    let config = RecommenderConfig {
        top_k: 4,
        channel_capacity: 1,
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, visualizer, config);

    let mut rx = recommender.recommend("anything");
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, RecommendationUpdate::Snapshot(_)));
    drop(rx);

    // The abandoned pipeline and its background task finish on their own.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_rerank_threshold_flows_through_pipeline() {
    let (index, scorer, addresses) = four_venue_setup();
    let oracle = MatrixOracle::new(known_rows(), &addresses);
    let visualizer = Arc::new(CannedVisualizer::new("https://maps.example/route"));

    // Only v0 and v1 score at or above 0.75.
    let config = RecommenderConfig {
        top_k: 4,
        rerank_threshold: Some(0.75),
        ..Default::default()
    };
    let recommender = recommender(index, scorer, oracle, visualizer, config);

    let updates = collect_updates(recommender.recommend("anything")).await;
    let snaps = snapshots(&updates);
    let last = snaps.last().unwrap();
    assert!(last.complete && last.route_available);

    let ids: Vec<u64> = last.stops.iter().map(|s| s.candidate.id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(last.stops[1].leg_from_previous, Some(2.0));
}

// ==================== Refresh atomicity ====================

#[test]
fn test_refresh_is_atomic_under_concurrent_searches() {
    // Two generations of the catalog, distinguishable by id range and
    // embedding direction. A search must only ever see one generation.
    let generation_a: Vec<Venue> = (1..=8).map(|i| venue(i, vec![1.0, 0.0])).collect();
    let generation_b: Vec<Venue> = (11..=18).map(|i| venue(i, vec![0.0, 1.0])).collect();

    let index = Arc::new(SimilarityIndex::with_venues(2, generation_a.clone()).unwrap());

    let searchers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                let query = Vector::new(vec![0.6, 0.8]);
                for _ in 0..500 {
                    let results = index.search(&query, 4).unwrap();
                    assert_eq!(results.len(), 8);
                    let old_generation = results[0].id <= 8;
                    for candidate in &results {
                        assert_eq!(
                            candidate.id <= 8,
                            old_generation,
                            "search observed a mixed catalog"
                        );
                    }
                }
            })
        })
        .collect();

    for round in 0..200 {
        let next = if round % 2 == 0 {
            generation_b.clone()
        } else {
            generation_a.clone()
        };
        index.refresh(next).unwrap();
    }

    for searcher in searchers {
        searcher.join().unwrap();
    }
}

// ==================== Serialization ====================

#[test]
fn test_snapshot_serializes() {
    let candidate = Candidate::from_venue(&venue(1, vec![1.0, 0.0]), 0.8);
    let update = RecommendationUpdate::Snapshot(RecommendationSnapshot {
        stops: vec![RouteStop {
            candidate,
            leg_from_previous: Some(125.0),
        }],
        route_available: true,
        visualization: Some("https://maps.example/route".to_string()),
        complete: true,
    });

    let json = serde_json::to_string(&update).unwrap();
    let parsed: RecommendationUpdate = serde_json::from_str(&json).unwrap();
    match parsed {
        RecommendationUpdate::Snapshot(snapshot) => {
            assert_eq!(snapshot.stops.len(), 1);
            assert_eq!(snapshot.stops[0].leg_from_previous, Some(125.0));
        }
        RecommendationUpdate::Failed { .. } => panic!("expected a snapshot"),
    }
}
