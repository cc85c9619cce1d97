//! Orientation-sweep placement search on top of the solver contract.
//!
//! Runs the solver once per container-orientation × item-orientation
//! combination with a bounded item budget and keeps the best literal
//! placement count. Container orientations run as sequential waves; the
//! trials inside a wave are independent and run on the rayon pool. The
//! early exit and the tie-breaks are evaluated in fixed order, so the
//! search is deterministic for equal inputs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::grid::GridEstimate;
use crate::model::{PlacedItem, ShapedItem};
use crate::solver::{ContainerRequest, ItemRequest, PlacementSolver, StrategyParams};
use crate::types::Vec3;

/// Weight capacity handed to the solver. The pipeline packs weightless
/// copies, so the capacity only exists to satisfy the solver contract.
const CONTAINER_CAPACITY: f64 = 99_999.0;

/// Cooperative cancellation token shared between the engine and the
/// service layer. Checked between waves; a cancelled search returns the
/// best outcome found so far.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Budget and scheduling knobs of the search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchPolicy {
    /// Lower bound of the per-trial item budget.
    pub budget_min: usize,
    /// Upper bound of the per-trial item budget.
    pub budget_max: usize,
    /// Grid estimates above this are considered large.
    pub large_grid_threshold: usize,
    /// Budget cap applied to large grid estimates.
    pub large_grid_cap: usize,
    /// Fraction of the budget that ends the orientation sweep early.
    pub early_exit_ratio: f64,
    /// Worker threads for the trials of one wave (0 = rayon default).
    pub trial_threads: usize,
}

impl SearchPolicy {
    pub const DEFAULT_BUDGET_MIN: usize = 50;
    pub const DEFAULT_BUDGET_MAX: usize = 500;
    pub const DEFAULT_LARGE_GRID_THRESHOLD: usize = 500;
    pub const DEFAULT_LARGE_GRID_CAP: usize = 200;
    pub const DEFAULT_EARLY_EXIT_RATIO: f64 = 0.8;
    pub const DEFAULT_TRIAL_THREADS: usize = 0;
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            budget_min: Self::DEFAULT_BUDGET_MIN,
            budget_max: Self::DEFAULT_BUDGET_MAX,
            large_grid_threshold: Self::DEFAULT_LARGE_GRID_THRESHOLD,
            large_grid_cap: Self::DEFAULT_LARGE_GRID_CAP,
            early_exit_ratio: Self::DEFAULT_EARLY_EXIT_RATIO,
            trial_threads: Self::DEFAULT_TRIAL_THREADS,
        }
    }
}

/// Item budget for one trial, derived from the grid estimate.
///
/// Large grid estimates are capped so a single solver call stays bounded;
/// the result is always confined to `[budget_min, budget_max]`.
pub fn budget_for(grid_max: usize, policy: &SearchPolicy) -> usize {
    let base = if grid_max > policy.large_grid_threshold {
        grid_max.min(policy.large_grid_cap)
    } else {
        grid_max
    };
    base.max(policy.budget_min).min(policy.budget_max)
}

/// Result of one finished solver trial, reported in wave order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialReport {
    pub container_dims: (f64, f64, f64),
    pub item_dims: (f64, f64, f64),
    pub count: usize,
}

/// Best outcome of the orientation sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    /// Literal number of items the winning trial placed.
    pub count: usize,
    pub placements: Vec<PlacedItem>,
    pub container_dims: (f64, f64, f64),
    pub item_dims: (f64, f64, f64),
    /// Name of the strategy preset the trials ran with.
    pub strategy: &'static str,
    /// Trials completed before the sweep ended.
    pub trials_evaluated: usize,
}

/// Runs the placement search for one container/item pair.
///
/// Up to 3 container orientations × up to 3 item orientations; the item
/// side collapses to the single grid-best orientation when the grid found
/// one. Ties keep the earlier trial, and a wave that reaches
/// `early_exit_ratio` of the budget ends the sweep.
///
/// # Parameters
/// * `container` - Container solid
/// * `item` - Repeated item solid
/// * `grid` - Grid estimate driving budget and orientation narrowing
/// * `policy` - Budget and scheduling knobs
/// * `solver` - Placement backend, invoked once per trial
/// * `cancel` - Cooperative cancellation token
/// * `on_trial` - Callback invoked per finished trial, in wave order
pub fn run(
    container: &ShapedItem,
    item: &ShapedItem,
    grid: &GridEstimate,
    policy: &SearchPolicy,
    solver: &(impl PlacementSolver + Sync),
    cancel: &CancelHandle,
    mut on_trial: impl FnMut(&TrialReport),
) -> SearchOutcome {
    let budget = budget_for(grid.max_objects, policy);
    let strategy = StrategyParams::high_stability();

    let container_orients = axis_orientations(container.dimensions.as_vec3());
    let item_orients: Vec<(f64, f64, f64)> = if grid.max_objects > 0 {
        vec![grid.oriented_item.as_tuple()]
    } else {
        axis_orientations(item.dimensions.as_vec3()).to_vec()
    };

    let pool = if policy.trial_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(policy.trial_threads)
            .build()
            .ok()
    } else {
        None
    };

    let mut best: Option<SearchOutcome> = None;
    let mut trials_evaluated = 0;

    for container_dims in container_orients {
        if cancel.is_cancelled() {
            break;
        }

        let wave = match &pool {
            Some(pool) => pool.install(|| {
                run_wave(solver, container_dims, &item_orients, budget, &strategy)
            }),
            None => run_wave(solver, container_dims, &item_orients, budget, &strategy),
        };

        for (item_dims, placements) in wave {
            trials_evaluated += 1;
            let count = placements.len();
            on_trial(&TrialReport {
                container_dims,
                item_dims,
                count,
            });
            if best.as_ref().is_none_or(|b| count > b.count) {
                best = Some(SearchOutcome {
                    count,
                    placements,
                    container_dims,
                    item_dims,
                    strategy: strategy.name,
                    trials_evaluated: 0,
                });
            }
        }

        let reached = best.as_ref().map(|b| b.count).unwrap_or(0);
        if reached as f64 >= budget as f64 * policy.early_exit_ratio {
            break;
        }
    }

    let mut outcome = best.unwrap_or_else(|| SearchOutcome {
        count: 0,
        placements: Vec::new(),
        container_dims: container.dimensions.as_tuple(),
        item_dims: item.dimensions.as_tuple(),
        strategy: strategy.name,
        trials_evaluated: 0,
    });
    outcome.trials_evaluated = trials_evaluated;
    outcome
}

/// One wave: every item orientation against a fixed container orientation.
/// The trials are read-only with respect to the inputs and collect in
/// enumeration order.
fn run_wave(
    solver: &(impl PlacementSolver + Sync),
    container_dims: (f64, f64, f64),
    item_orients: &[(f64, f64, f64)],
    budget: usize,
    strategy: &StrategyParams,
) -> Vec<((f64, f64, f64), Vec<PlacedItem>)> {
    let container = ContainerRequest {
        dims: container_dims,
        max_weight: CONTAINER_CAPACITY,
    };
    item_orients
        .par_iter()
        .map(|&item_dims| {
            let requests = vec![
                ItemRequest {
                    dims: item_dims,
                    weight: 1.0,
                    allow_rotation: true,
                };
                budget
            ];
            (item_dims, solver.pack(&container, &requests, strategy))
        })
        .collect()
}

/// The three axis orientations the sweep enumerates per solid.
fn axis_orientations(dims: Vec3) -> [(f64, f64, f64); 3] {
    [
        (dims.x, dims.y, dims.z),
        (dims.y, dims.x, dims.z),
        (dims.z, dims.y, dims.x),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;
    use crate::model::{Dimensions, ShapeProfile};
    use crate::solver::HeuristicSolver;

    fn rect_item(l: f64, w: f64, h: f64) -> ShapedItem {
        ShapedItem::new(
            Dimensions::new(l, w, h).expect("valid dims"),
            ShapeProfile::rectangular(),
        )
    }

    #[test]
    fn test_budget_policy_table() {
        let policy = SearchPolicy::default();
        assert_eq!(budget_for(10, &policy), 50);
        assert_eq!(budget_for(300, &policy), 300);
        assert_eq!(budget_for(500, &policy), 500);
        assert_eq!(budget_for(501, &policy), 200);
        assert_eq!(budget_for(600, &policy), 200);
        assert_eq!(budget_for(0, &policy), 50);
    }

    #[test]
    fn test_budget_stays_bounded() {
        let policy = SearchPolicy::default();
        for grid_max in [0, 1, 100, 499, 500, 501, 10_000] {
            let budget = budget_for(grid_max, &policy);
            assert!(budget >= policy.budget_min);
            assert!(budget <= policy.budget_max);
        }
    }

    #[test]
    fn test_narrowed_search_runs_one_trial_per_wave() {
        let container = rect_item(20.0, 20.0, 20.0);
        let item = rect_item(10.0, 10.0, 10.0);
        let estimate = grid::estimate(&container, &item);
        assert_eq!(estimate.max_objects, 8);

        let mut reports = Vec::new();
        let outcome = run(
            &container,
            &item,
            &estimate,
            &SearchPolicy::default(),
            &HeuristicSolver::default(),
            &CancelHandle::new(),
            |report| reports.push(*report),
        );

        // Budget floors at 50, so 8 placed items never trigger the early
        // exit and all 3 waves run, each narrowed to one item orientation.
        assert_eq!(outcome.count, 8);
        assert_eq!(outcome.trials_evaluated, 3);
        assert_eq!(reports.len(), 3);
        assert_eq!(outcome.strategy, "high_stability");
    }

    #[test]
    fn test_early_exit_stops_after_first_wave() {
        let container = rect_item(20.0, 20.0, 20.0);
        let item = rect_item(10.0, 10.0, 10.0);
        let estimate = grid::estimate(&container, &item);

        let policy = SearchPolicy {
            budget_min: 1,
            ..SearchPolicy::default()
        };
        let outcome = run(
            &container,
            &item,
            &estimate,
            &policy,
            &HeuristicSolver::default(),
            &CancelHandle::new(),
            |_| {},
        );

        // Budget equals the grid estimate (8); the first wave places all 8
        // and ends the sweep.
        assert_eq!(outcome.count, 8);
        assert_eq!(outcome.trials_evaluated, 1);
    }

    #[test]
    fn test_unfittable_item_runs_full_sweep() {
        let container = rect_item(10.0, 10.0, 10.0);
        let item = rect_item(12.0, 12.0, 12.0);
        let estimate = grid::estimate(&container, &item);
        assert_eq!(estimate.max_objects, 0);

        let outcome = run(
            &container,
            &item,
            &estimate,
            &SearchPolicy::default(),
            &HeuristicSolver::default(),
            &CancelHandle::new(),
            |_| {},
        );

        // No narrowing without a grid orientation: 3 x 3 trials, all empty.
        assert_eq!(outcome.count, 0);
        assert!(outcome.placements.is_empty());
        assert_eq!(outcome.trials_evaluated, 9);
    }

    #[test]
    fn test_cancelled_before_start() {
        let container = rect_item(20.0, 20.0, 20.0);
        let item = rect_item(10.0, 10.0, 10.0);
        let estimate = grid::estimate(&container, &item);

        let cancel = CancelHandle::new();
        cancel.cancel();
        let outcome = run(
            &container,
            &item,
            &estimate,
            &SearchPolicy::default(),
            &HeuristicSolver::default(),
            &cancel,
            |_| {},
        );

        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.trials_evaluated, 0);
        assert!(outcome.placements.is_empty());
    }

    #[test]
    fn test_repeated_runs_agree() {
        let container = rect_item(35.0, 25.0, 20.0);
        let item = rect_item(10.0, 10.0, 10.0);
        let estimate = grid::estimate(&container, &item);
        let policy = SearchPolicy::default();
        let solver = HeuristicSolver::default();

        let first = run(
            &container,
            &item,
            &estimate,
            &policy,
            &solver,
            &CancelHandle::new(),
            |_| {},
        );
        let second = run(
            &container,
            &item,
            &estimate,
            &policy,
            &solver,
            &CancelHandle::new(),
            |_| {},
        );
        assert_eq!(first, second);
    }
}
