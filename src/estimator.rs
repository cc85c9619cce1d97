//! Estimation pipeline: grid estimate, placement search, aggregation.
//!
//! One call runs the full reference pipeline for a container/item pair:
//! volumetric upper bound, fit rejection, grid estimate, orientation
//! search, and the final `PackingReport`. Every failure inside the
//! optimization degrades to the conservative grid result; only service
//! level concerns (I/O, serialization) live outside this module.

use std::time::Instant;

use crate::grid::{self, GridEstimate};
use crate::model::{OptimizationInfo, PackingReport, PlacedItem, PlacementSource, ShapedItem};
use crate::search::{self, CancelHandle, SearchOutcome, SearchPolicy};
use crate::solver::{HeuristicSolver, PlacementSolver};
use crate::types::{AXIS_PERMUTATIONS, Dimensional, EPSILON_GENERAL};

/// Progress events emitted while an estimation runs.
///
/// Serialized as tagged JSON objects for the SSE stream.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimateEvent {
    /// The analytic grid pass finished.
    GridEstimated {
        max_objects: usize,
        item_orientation: (f64, f64, f64),
        efficiency_percent: f64,
    },
    /// The orientation search is about to start.
    SearchStarted {
        budget: usize,
        trials_planned: usize,
    },
    /// One solver trial finished.
    TrialCompleted {
        container_dims: (f64, f64, f64),
        item_dims: (f64, f64, f64),
        count: usize,
    },
    /// The orientation search ended.
    SearchCompleted {
        best_count: usize,
        trials_evaluated: usize,
    },
    /// The final report is ready.
    Finished {
        max_objects: usize,
        efficiency_percent: f64,
    },
}

/// Runs the estimation pipeline with default policy and solver.
///
/// # Parameters
/// * `container` - Container solid with its shape profile
/// * `item` - Repeated item solid with its shape profile
///
/// # Returns
/// The final `PackingReport`; never fails, oversized items yield a
/// zero-count report carrying an error string.
pub fn estimate_packing(container: &ShapedItem, item: &ShapedItem) -> PackingReport {
    estimate_packing_with_config(
        container,
        item,
        &SearchPolicy::default(),
        &HeuristicSolver::default(),
    )
}

/// Estimation with caller-provided search policy and solver.
pub fn estimate_packing_with_config(
    container: &ShapedItem,
    item: &ShapedItem,
    policy: &SearchPolicy,
    solver: &(impl PlacementSolver + Sync),
) -> PackingReport {
    estimate_packing_with_progress(container, item, policy, solver, &CancelHandle::new(), |_| {})
}

/// Estimation with a live progress callback.
///
/// Emits one [`EstimateEvent`] per pipeline milestone (suitable for SSE).
/// The cancellation handle is polled between search waves; a cancelled run
/// still produces a complete report from whatever was evaluated.
pub fn estimate_packing_with_progress(
    container: &ShapedItem,
    item: &ShapedItem,
    policy: &SearchPolicy,
    solver: &(impl PlacementSolver + Sync),
    cancel: &CancelHandle,
    mut on_event: impl FnMut(&EstimateEvent),
) -> PackingReport {
    let theoretical_max = theoretical_max(container, item);

    if !fits_any_orientation(container, item) {
        let report = rejection_report(container, item, theoretical_max);
        on_event(&EstimateEvent::Finished {
            max_objects: 0,
            efficiency_percent: 0.0,
        });
        return report;
    }

    let grid_estimate = grid::estimate(container, item);
    on_event(&EstimateEvent::GridEstimated {
        max_objects: grid_estimate.max_objects,
        item_orientation: grid_estimate.oriented_item.as_tuple(),
        efficiency_percent: grid_estimate.efficiency_percent,
    });

    let budget = search::budget_for(grid_estimate.max_objects, policy);
    let trials_planned = if grid_estimate.max_objects > 0 { 3 } else { 9 };
    on_event(&EstimateEvent::SearchStarted {
        budget,
        trials_planned,
    });

    let started = Instant::now();
    let outcome = search::run(
        container,
        item,
        &grid_estimate,
        policy,
        solver,
        cancel,
        |trial| {
            on_event(&EstimateEvent::TrialCompleted {
                container_dims: trial.container_dims,
                item_dims: trial.item_dims,
                count: trial.count,
            });
        },
    );
    let elapsed_ms = started.elapsed().as_millis() as u64;
    on_event(&EstimateEvent::SearchCompleted {
        best_count: outcome.count,
        trials_evaluated: outcome.trials_evaluated,
    });

    let report = aggregate(container, item, theoretical_max, &grid_estimate, outcome, elapsed_ms);
    on_event(&EstimateEvent::Finished {
        max_objects: report.max_objects,
        efficiency_percent: report.efficiency_percent,
    });
    report
}

/// Volumetric upper bound from the real (factor-scaled) volumes.
fn theoretical_max(container: &ShapedItem, item: &ShapedItem) -> usize {
    (container.real_volume() / item.real_volume()).floor() as usize
}

/// True when at least one of the six axis orientations of the item fits
/// inside the container's bounding box.
fn fits_any_orientation(container: &ShapedItem, item: &ShapedItem) -> bool {
    let container_dims = container.dimensions();
    let item_dims = item.dimensions();
    AXIS_PERMUTATIONS
        .iter()
        .any(|&perm| item_dims.permuted(perm).fits_within(&container_dims, EPSILON_GENERAL))
}

/// Zero-count report for an item that fits in no orientation.
fn rejection_report(
    container: &ShapedItem,
    item: &ShapedItem,
    theoretical_max: usize,
) -> PackingReport {
    let (il, iw, ih) = item.dimensions.as_tuple();
    let (cl, cw, ch) = container.dimensions.as_tuple();
    PackingReport {
        max_objects: 0,
        theoretical_max,
        efficiency_percent: 0.0,
        box_volume: round2(container.bounding_volume()),
        used_volume: 0.0,
        placements: Vec::new(),
        error: Some(format!(
            "Item ({} x {} x {} mm) does not fit into the container ({} x {} x {} mm) in any orientation",
            il, iw, ih, cl, cw, ch
        )),
        optimization: None,
    }
}

/// Merges the grid estimate and the search outcome into the final report.
///
/// The higher count wins; on a tie the solver placements are kept when it
/// produced any, since they carry the richer (non-grid) geometry. Volumes
/// and efficiency always derive from the final count.
fn aggregate(
    container: &ShapedItem,
    item: &ShapedItem,
    theoretical_max: usize,
    grid_estimate: &GridEstimate,
    outcome: SearchOutcome,
    elapsed_ms: u64,
) -> PackingReport {
    let grid_count = grid_estimate.max_objects;
    let search_count = outcome.count;
    let use_solver = search_count > grid_count
        || (search_count == grid_count && !outcome.placements.is_empty());
    let final_count = grid_count.max(search_count);

    let (strategy, placements, placement_source, container_orientation, item_orientation) =
        if use_solver {
            (
                outcome.strategy.to_string(),
                outcome.placements,
                PlacementSource::Solver,
                outcome.container_dims,
                outcome.item_dims,
            )
        } else {
            (
                "grid".to_string(),
                synthesize_grid_placements(grid_estimate),
                PlacementSource::Grid,
                container.dimensions.as_tuple(),
                grid_estimate.oriented_item.as_tuple(),
            )
        };

    let box_volume = container.bounding_volume();
    let used_volume = final_count as f64 * item.real_volume();
    let efficiency_percent = if box_volume > 0.0 {
        used_volume / box_volume * 100.0
    } else {
        0.0
    };

    PackingReport {
        max_objects: final_count,
        theoretical_max,
        efficiency_percent: round2(efficiency_percent),
        box_volume: round2(box_volume),
        used_volume: round2(used_volume),
        placements,
        error: None,
        optimization: Some(OptimizationInfo {
            strategy,
            container_orientation,
            item_orientation,
            trials_evaluated: outcome.trials_evaluated,
            placement_source,
            elapsed_ms,
        }),
    }
}

/// Grid placements for the winning orientation: one copy per cell, walked
/// in nested z/y/x order, truncated at the adjusted count.
fn synthesize_grid_placements(grid_estimate: &GridEstimate) -> Vec<PlacedItem> {
    let dims = grid_estimate.oriented_item.as_tuple();
    let mut placements = Vec::with_capacity(grid_estimate.max_objects);
    'cells: for k in 0..grid_estimate.fit_counts[2] {
        for j in 0..grid_estimate.fit_counts[1] {
            for i in 0..grid_estimate.fit_counts[0] {
                if placements.len() == grid_estimate.max_objects {
                    break 'cells;
                }
                placements.push(PlacedItem {
                    position: (i as f64 * dims.0, j as f64 * dims.1, k as f64 * dims.2),
                    dimensions: dims,
                    rotation_index: 0,
                });
            }
        }
    }
    placements
}

/// Rounds to 2 decimal places for report output.
#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
