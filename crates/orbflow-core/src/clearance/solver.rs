//! Clearance Solver - largest obstacle-free radius around an anchor
//!
//! Recomputation (the binary search) runs on a fixed cadence, while the
//! smoothing step runs every tick.

use super::oracle::{ClearanceQuery, CollisionOracle, LayerMask, OwnerId};
use crate::approach_factor;
use crate::config::{finite_or, fix, ConfigCorrection};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Configuration for the clearance solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearanceConfig {
    /// Smallest radius the solver will report
    pub min_radius: f32,
    /// Largest radius the solver will report
    pub max_radius: f32,
    /// Safety margin subtracted from every probe radius
    pub padding: f32,
    /// Search stops once the bracket is narrower than this
    pub precision: f32,
    /// Iteration budget of the binary search
    pub max_iterations: u32,
    /// Seconds between two recomputations
    pub recompute_interval: f32,
    /// Exponential approach rate of `current` toward `target` (per second)
    pub smoothing_rate: f32,
    /// Layers considered obstacles
    pub layers: LayerMask,
    /// Ignore hits on geometry owned by `self_owner`
    pub exclude_self: bool,
    /// Owner id of the solver's own geometry
    pub self_owner: Option<OwnerId>,
}

impl Default for ClearanceConfig {
    fn default() -> Self {
        Self {
            min_radius: 0.15,
            max_radius: 0.6,
            padding: 0.1,
            precision: 0.05,
            max_iterations: 8,
            recompute_interval: 0.5,
            smoothing_rate: 5.0,
            layers: LayerMask::ALL,
            exclude_self: true,
            self_owner: None,
        }
    }
}

impl ClearanceConfig {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();

        let min = finite_or(self.min_radius, d.min_radius).max(0.0);
        self.min_radius = fix(c, "clearance.min_radius", self.min_radius, min);
        let max = finite_or(self.max_radius, d.max_radius).max(0.0);
        self.max_radius = fix(c, "clearance.max_radius", self.max_radius, max);
        if self.min_radius > self.max_radius {
            self.min_radius = fix(c, "clearance.min_radius", self.min_radius, self.max_radius);
        }

        let padding = finite_or(self.padding, d.padding).max(0.0);
        self.padding = fix(c, "clearance.padding", self.padding, padding);

        let precision = finite_or(self.precision, d.precision);
        let precision = if precision > 0.0 { precision } else { d.precision };
        self.precision = fix(c, "clearance.precision", self.precision, precision);

        let interval = finite_or(self.recompute_interval, d.recompute_interval);
        let interval = if interval > 0.0 { interval } else { 0.1 };
        self.recompute_interval = fix(
            c,
            "clearance.recompute_interval",
            self.recompute_interval,
            interval,
        );

        let rate = finite_or(self.smoothing_rate, d.smoothing_rate).max(0.0);
        self.smoothing_rate = fix(c, "clearance.smoothing_rate", self.smoothing_rate, rate);
    }
}

/// Radius state owned by the solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadiusState {
    /// Smoothed radius (moved only by [`ClearanceSolver::tick`])
    pub current: f32,
    /// Last search result (moved only by [`ClearanceSolver::recompute`])
    pub target: f32,
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
    /// Probe padding
    pub padding: f32,
}

/// How a search concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The maximum radius is clear
    FitsMax,
    /// Even the minimum radius is blocked
    Blocked,
    /// Binary search ran for this many iterations
    Searched {
        /// Iterations used
        iterations: u32,
    },
}

/// Result of one search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchReport {
    /// Largest clear radius found
    pub radius: f32,
    /// How the search ended
    pub outcome: SearchOutcome,
    /// Oracle queries issued
    pub queries: u32,
}

/// Spatial clearance solver
pub struct ClearanceSolver {
    config: ClearanceConfig,
    state: RadiusState,
    since_recompute: f32,
    degenerate: bool,
    last_report: Option<SearchReport>,
}

impl ClearanceSolver {
    /// Create a solver. The configuration is corrected if invalid; `current`
    /// and `target` start at the maximum radius.
    pub fn new(config: ClearanceConfig) -> Self {
        let mut config = config;
        let mut corrections = Vec::new();
        config.sanitize(&mut corrections);

        let state = RadiusState {
            current: config.max_radius,
            target: config.max_radius,
            min: config.min_radius,
            max: config.max_radius,
            padding: config.padding,
        };

        debug!(
            "ClearanceSolver created: min={}, max={}, padding={}, precision={}",
            state.min, state.max, state.padding, config.precision
        );

        Self {
            config,
            state,
            // First update recomputes immediately
            since_recompute: f32::INFINITY,
            degenerate: false,
            last_report: None,
        }
    }

    /// Search for the largest clear radius at `position` without changing state
    pub fn search(&self, position: Vec3, oracle: &dyn CollisionOracle) -> SearchReport {
        let RadiusState { min, max, .. } = self.state;
        let mut queries = 0;

        if self.probe(position, max, oracle, &mut queries) {
            return SearchReport {
                radius: max,
                outcome: SearchOutcome::FitsMax,
                queries,
            };
        }
        if !self.probe(position, min, oracle, &mut queries) {
            return SearchReport {
                radius: min,
                outcome: SearchOutcome::Blocked,
                queries,
            };
        }

        let (mut lo, mut hi, mut best) = (min, max, min);
        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            if hi - lo < self.config.precision {
                break;
            }
            iterations += 1;
            let mid = (lo + hi) * 0.5;
            if self.probe(position, mid, oracle, &mut queries) {
                lo = mid;
                best = mid;
            } else {
                hi = mid;
            }
        }

        SearchReport {
            radius: best.clamp(min, max),
            outcome: SearchOutcome::Searched { iterations },
            queries,
        }
    }

    fn probe(
        &self,
        position: Vec3,
        radius: f32,
        oracle: &dyn CollisionOracle,
        queries: &mut u32,
    ) -> bool {
        *queries += 1;
        ClearanceQuery {
            position,
            radius: radius - self.state.padding,
            exclude_self: self.config.exclude_self,
        }
        .is_clear(oracle, self.config.layers, self.config.self_owner)
    }

    /// Run the search and store the result as the new target
    pub fn recompute(&mut self, position: Vec3, oracle: &dyn CollisionOracle) -> f32 {
        let report = self.search(position, oracle);

        let blocked = report.outcome == SearchOutcome::Blocked;
        if blocked && !self.degenerate {
            warn!(
                "No clearance even at minimum radius {} around {:?}; using minimum",
                self.state.min, position
            );
        } else if !blocked && self.degenerate {
            debug!("Clearance recovered: target radius {}", report.radius);
        }
        self.degenerate = blocked;

        trace!(
            "Clearance recompute: radius={} outcome={:?} queries={}",
            report.radius,
            report.outcome,
            report.queries
        );

        self.state.target = report.radius;
        self.last_report = Some(report);
        self.since_recompute = 0.0;
        report.radius
    }

    /// Smoothing step: move `current` toward `target` without overshoot
    pub fn tick(&mut self, dt: f32) -> f32 {
        let t = approach_factor(dt, self.config.smoothing_rate);
        let state = &mut self.state;
        state.current += (state.target - state.current) * t;
        state.current = state.current.clamp(state.min, state.max);
        state.current
    }

    /// Recompute when the cadence interval has elapsed, then smooth
    pub fn update(&mut self, dt: f32, position: Vec3, oracle: &dyn CollisionOracle) -> f32 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.since_recompute += dt;
        if self.since_recompute >= self.config.recompute_interval {
            self.recompute(position, oracle);
        }
        self.tick(dt)
    }

    /// Force a recompute on the next update
    pub fn invalidate(&mut self) {
        self.since_recompute = f32::INFINITY;
    }

    /// Current radius state
    pub fn state(&self) -> RadiusState {
        self.state
    }

    /// Smoothed radius
    pub fn current_radius(&self) -> f32 {
        self.state.current
    }

    /// Target radius of the last search
    pub fn target_radius(&self) -> f32 {
        self.state.target
    }

    /// Report of the last search
    pub fn last_report(&self) -> Option<SearchReport> {
        self.last_report
    }

    /// Whether the last search found no clearance even at the minimum radius
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Effective configuration
    pub fn config(&self) -> &ClearanceConfig {
        &self.config
    }
}
