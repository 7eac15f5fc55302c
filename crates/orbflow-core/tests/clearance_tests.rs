use orbflow_core::{
    ClearanceConfig, ClearanceSolver, CollisionOracle, Hit, LayerMask, ObstacleScene, OwnerId,
    SearchOutcome, Vec3,
};
use proptest::prelude::*;
use std::cell::Cell;

/// Clear iff the probe radius is at most `limit`
struct ThresholdOracle {
    limit: f32,
    queries: Cell<u32>,
}

impl ThresholdOracle {
    fn new(limit: f32) -> Self {
        Self {
            limit,
            queries: Cell::new(0),
        }
    }
}

impl CollisionOracle for ThresholdOracle {
    fn overlap_sphere(&self, _center: Vec3, radius: f32, _layers: LayerMask) -> Vec<Hit> {
        self.queries.set(self.queries.get() + 1);
        if radius > self.limit {
            vec![Hit {
                collider: 1,
                owner: OwnerId(99),
            }]
        } else {
            Vec::new()
        }
    }
}

fn unpadded() -> ClearanceConfig {
    ClearanceConfig {
        padding: 0.0,
        ..Default::default()
    }
}

#[test]
fn test_converges_for_clear_up_to_half() {
    let solver = ClearanceSolver::new(unpadded());
    let oracle = ThresholdOracle::new(0.5);
    let report = solver.search(Vec3::ZERO, &oracle);

    assert!(report.radius >= 0.45 && report.radius <= 0.5, "{}", report.radius);
    match report.outcome {
        SearchOutcome::Searched { iterations } => assert!(iterations <= 8),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(report.queries, oracle.queries.get());
}

#[test]
fn test_padding_shrinks_probes() {
    let solver = ClearanceSolver::new(ClearanceConfig::default());
    // With 0.1 padding, a 0.5 clear region fits the 0.6 maximum
    let report = solver.search(Vec3::ZERO, &ThresholdOracle::new(0.5));
    assert_eq!(report.outcome, SearchOutcome::FitsMax);
    assert_eq!(report.radius, 0.6);
    assert_eq!(report.queries, 1);
}

#[test]
fn test_scene_follows_anchor() {
    let mut scene = ObstacleScene::new();
    scene.add_box(
        OwnerId(1),
        0,
        Vec3::new(1.0, -5.0, -5.0),
        Vec3::new(2.0, 5.0, 5.0),
    );
    let mut solver = ClearanceSolver::new(unpadded());

    // Far from the wall
    solver.update(0.0, Vec3::new(-3.0, 0.0, 0.0), &scene);
    assert_eq!(solver.target_radius(), 0.6);

    // 0.3 from the wall face
    solver.invalidate();
    solver.update(0.0, Vec3::new(0.7, 0.0, 0.0), &scene);
    let target = solver.target_radius();
    assert!(target <= 0.3 && target >= 0.25, "{}", target);

    // Smoothing moves current toward the new target over time
    let before = solver.current_radius();
    solver.tick(0.1);
    assert!(solver.current_radius() < before);
    assert!(solver.current_radius() >= target);
}

proptest! {
    #[test]
    fn prop_search_within_precision(limit in 0.0f32..1.0) {
        let config = unpadded();
        let solver = ClearanceSolver::new(config.clone());
        let radius = solver.search(Vec3::ZERO, &ThresholdOracle::new(limit)).radius;

        if limit >= config.max_radius {
            prop_assert_eq!(radius, config.max_radius);
        } else if limit < config.min_radius {
            prop_assert_eq!(radius, config.min_radius);
        } else {
            prop_assert!(radius <= limit + 1e-6);
            prop_assert!(limit - radius < config.precision + 1e-6);
        }
    }

    #[test]
    fn prop_search_is_monotonic(a in 0.0f32..1.0, b in 0.0f32..1.0) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let solver = ClearanceSolver::new(ClearanceConfig::default());
        let r_small = solver.search(Vec3::ZERO, &ThresholdOracle::new(small)).radius;
        let r_large = solver.search(Vec3::ZERO, &ThresholdOracle::new(large)).radius;
        prop_assert!(r_small <= r_large);
    }

    #[test]
    fn prop_radius_stays_bounded(
        limits in proptest::collection::vec(0.0f32..1.0, 1..40),
        dts in proptest::collection::vec(0.0f32..0.5, 1..40),
    ) {
        let config = ClearanceConfig::default();
        let mut solver = ClearanceSolver::new(config.clone());
        for (limit, dt) in limits.iter().zip(dts.iter().cycle()) {
            solver.update(*dt, Vec3::ZERO, &ThresholdOracle::new(*limit));
            let state = solver.state();
            prop_assert!(state.target >= config.min_radius && state.target <= config.max_radius);
            prop_assert!(state.current >= config.min_radius && state.current <= config.max_radius);
        }
    }
}
