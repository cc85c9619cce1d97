//! Placement solver contract and the bundled heuristic implementation.
//!
//! The search engine treats the solver as a black box: it hands over one
//! container, a list of item requests and a strategy preset, and evaluates
//! only the literal set of placements that comes back. `HeuristicSolver`
//! is the deterministic layer-and-support implementation shipped with the
//! engine; alternative solvers plug in through [`PlacementSolver`].

use std::cmp::Ordering;

use crate::geometry::{overlap_1d, overlap_area_xy, point_inside};
use crate::model::PlacedItem;
use crate::types::{EPSILON_GENERAL, EPSILON_HEIGHT};

/// Tuning knobs of one placement strategy.
///
/// The engine only ever runs the high-stability preset; the others exist
/// for direct solver consumers and for comparing preset behavior in tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategyParams {
    pub name: &'static str,
    /// Sort requests by volume, largest first, before placing.
    pub prefer_larger_first: bool,
    /// Additionally try positions snapped to the edges of placed items.
    pub anchor_to_fixed_point: bool,
    /// Enforce the support-surface ratio and center support at z > 0.
    pub require_support_stability: bool,
    /// Minimum supported fraction of the base area, in [0, 1].
    pub min_support_surface_ratio: f64,
}

impl StrategyParams {
    /// Safest preset: anchored placement, strict support checks.
    pub const fn high_stability() -> Self {
        Self {
            name: "high_stability",
            prefer_larger_first: true,
            anchor_to_fixed_point: true,
            require_support_stability: true,
            min_support_surface_ratio: 0.85,
        }
    }

    /// Anchored placement without the strict support ratio.
    pub const fn balanced() -> Self {
        Self {
            name: "balanced",
            prefer_larger_first: true,
            anchor_to_fixed_point: true,
            require_support_stability: false,
            min_support_surface_ratio: 0.5,
        }
    }

    /// Pure grid scan, minimal stability requirements.
    pub const fn aggressive() -> Self {
        Self {
            name: "aggressive",
            prefer_larger_first: true,
            anchor_to_fixed_point: false,
            require_support_stability: false,
            min_support_surface_ratio: 0.1,
        }
    }
}

/// One container offered to the solver.
///
/// `max_weight` is part of the contract but effectively unbounded in the
/// estimation pipeline, which packs identical weightless copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerRequest {
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

/// One item the caller asks the solver to place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemRequest {
    pub dims: (f64, f64, f64),
    pub weight: f64,
    /// Permit the solver to swap the X and Y extents.
    pub allow_rotation: bool,
}

/// Contract between the search engine and any placement backend.
///
/// Implementations return the subset of requested items actually placed.
/// Callers must not assume determinism across implementations and always
/// evaluate the literal placement count returned.
pub trait PlacementSolver {
    fn pack(
        &self,
        container: &ContainerRequest,
        items: &[ItemRequest],
        strategy: &StrategyParams,
    ) -> Vec<PlacedItem>;
}

/// Deterministic layer-and-support solver.
///
/// Candidate positions come from z-layers (floor plus tops of placed
/// items) crossed with an x/y grid of the configured step, extended by
/// edge-snap positions of placed items when the strategy anchors. The
/// first feasible position in ascending (z, y, x) order wins, so equal
/// inputs always produce equal packings.
#[derive(Clone, Copy, Debug)]
pub struct HeuristicSolver {
    /// Step of the x/y position grid in mm.
    pub grid_step: f64,
}

impl HeuristicSolver {
    pub const DEFAULT_GRID_STEP: f64 = 5.0;

    pub fn new(grid_step: f64) -> Self {
        let grid_step = if grid_step.is_finite() && grid_step > EPSILON_GENERAL {
            grid_step
        } else {
            Self::DEFAULT_GRID_STEP
        };
        Self { grid_step }
    }

    /// Finds the first feasible position for one oriented box, if any.
    fn find_position(
        &self,
        container: &ContainerRequest,
        placed: &[PlacedItem],
        dims: (f64, f64, f64),
        strategy: &StrategyParams,
    ) -> Option<(f64, f64, f64)> {
        let xs = self.axis_positions(container.dims.0, dims.0, placed, strategy, |p| {
            (p.position.0, p.dimensions.0)
        });
        let ys = self.axis_positions(container.dims.1, dims.1, placed, strategy, |p| {
            (p.position.1, p.dimensions.1)
        });

        // Candidate levels: the floor plus the top of every placed item.
        let mut z_layers: Vec<f64> = placed.iter().map(|p| p.top_z()).collect();
        z_layers.push(0.0);
        z_layers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        z_layers.dedup_by(|a, b| (*a - *b).abs() < EPSILON_HEIGHT);

        for &z in &z_layers {
            if z + dims.2 > container.dims.2 + EPSILON_GENERAL {
                continue;
            }

            for &y in &ys {
                if y + dims.1 > container.dims.1 + EPSILON_GENERAL {
                    continue;
                }

                // Only items overlapping this y band and z slab can collide.
                let band: Vec<&PlacedItem> = placed
                    .iter()
                    .filter(|p| {
                        overlap_1d(y, y + dims.1, p.position.1, p.position.1 + p.dimensions.1)
                            > 0.0
                            && overlap_1d(z, z + dims.2, p.position.2, p.position.2 + p.dimensions.2)
                                > 0.0
                    })
                    .collect();

                let mut xi = 0;
                while xi < xs.len() {
                    let x = xs[xi];
                    if x + dims.0 > container.dims.0 + EPSILON_GENERAL {
                        break;
                    }

                    // Furthest right edge among band items overlapping
                    // [x, x + w); every candidate left of it collides too.
                    let mut skip_to: Option<f64> = None;
                    for p in &band {
                        if x < p.position.0 + p.dimensions.0 && p.position.0 < x + dims.0 {
                            let edge = p.position.0 + p.dimensions.0;
                            if skip_to.is_none_or(|s| edge > s) {
                                skip_to = Some(edge);
                            }
                        }
                    }

                    if let Some(past) = skip_to {
                        let next = xs.partition_point(|&c| c < past - EPSILON_GENERAL);
                        xi = next.max(xi + 1);
                        continue;
                    }

                    let candidate = PlacedItem {
                        position: (x, y, z),
                        dimensions: dims,
                        rotation_index: 0,
                    };
                    if z <= EPSILON_HEIGHT || self.is_supported(&candidate, placed, strategy) {
                        return Some((x, y, z));
                    }
                    xi += 1;
                }
            }
        }

        None
    }

    /// Candidate offsets along one axis: a regular grid of `grid_step`,
    /// always including the far wall, plus edge snaps of placed items when
    /// the strategy anchors.
    fn axis_positions(
        &self,
        container_len: f64,
        object_len: f64,
        placed: &[PlacedItem],
        strategy: &StrategyParams,
        extent: impl Fn(&PlacedItem) -> (f64, f64),
    ) -> Vec<f64> {
        let max_pos = (container_len - object_len).max(0.0);
        let mut positions = Vec::new();

        if max_pos <= EPSILON_GENERAL {
            positions.push(0.0);
            return positions;
        }

        let mut pos = 0.0;
        while pos <= max_pos + EPSILON_GENERAL {
            positions.push(pos.min(max_pos));
            pos += self.grid_step;
        }
        if positions
            .last()
            .is_none_or(|&last| (last - max_pos).abs() > EPSILON_GENERAL)
        {
            positions.push(max_pos);
        }

        if strategy.anchor_to_fixed_point {
            for p in placed {
                let (start, len) = extent(p);
                for snap in [start + len, start - object_len] {
                    if snap > EPSILON_GENERAL && snap < max_pos - EPSILON_GENERAL {
                        positions.push(snap);
                    }
                }
            }
        }

        positions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        positions.dedup_by(|a, b| (*a - *b).abs() < EPSILON_GENERAL);
        positions
    }

    /// Support rules for a candidate above the floor.
    ///
    /// Resting on at least one surface is always required; the strict
    /// presets additionally demand the support-surface ratio and a placed
    /// item directly under the base center.
    fn is_supported(
        &self,
        candidate: &PlacedItem,
        placed: &[PlacedItem],
        strategy: &StrategyParams,
    ) -> bool {
        let level = candidate.position.2;
        let mut support_area = 0.0;
        for p in placed {
            if (level - p.top_z()).abs() < EPSILON_HEIGHT {
                support_area += overlap_area_xy(candidate, p);
            }
        }
        if support_area <= EPSILON_GENERAL {
            return false;
        }

        if !strategy.require_support_stability {
            return true;
        }

        let base_area = candidate.dimensions.0 * candidate.dimensions.1;
        if base_area <= EPSILON_GENERAL
            || support_area / base_area < strategy.min_support_surface_ratio
        {
            return false;
        }

        let center = (
            candidate.position.0 + candidate.dimensions.0 / 2.0,
            candidate.position.1 + candidate.dimensions.1 / 2.0,
            level,
        );
        placed
            .iter()
            .any(|p| (level - p.top_z()).abs() < EPSILON_HEIGHT && point_inside(center, p))
    }
}

impl Default for HeuristicSolver {
    fn default() -> Self {
        Self {
            grid_step: Self::DEFAULT_GRID_STEP,
        }
    }
}

impl PlacementSolver for HeuristicSolver {
    fn pack(
        &self,
        container: &ContainerRequest,
        items: &[ItemRequest],
        strategy: &StrategyParams,
    ) -> Vec<PlacedItem> {
        let mut requests = items.to_vec();
        if strategy.prefer_larger_first {
            requests.sort_by(|a, b| {
                volume(b.dims)
                    .partial_cmp(&volume(a.dims))
                    .unwrap_or(Ordering::Equal)
            });
        }

        // Equal requests against an unchanged packing fail identically, so
        // one failure ends a uniform batch.
        let uniform = items.windows(2).all(|w| w[0] == w[1]);

        let mut placed: Vec<PlacedItem> = Vec::new();
        let mut total_weight = 0.0;

        for request in requests {
            if total_weight + request.weight > container.max_weight + EPSILON_GENERAL {
                if uniform {
                    break;
                }
                continue;
            }

            let mut variants = vec![(request.dims, 0)];
            if request.allow_rotation
                && (request.dims.0 - request.dims.1).abs() > EPSILON_GENERAL
            {
                variants.push(((request.dims.1, request.dims.0, request.dims.2), 1));
            }

            let mut placement = None;
            for (dims, rotation_index) in variants {
                if let Some(position) = self.find_position(container, &placed, dims, strategy) {
                    placement = Some(PlacedItem {
                        position,
                        dimensions: dims,
                        rotation_index,
                    });
                    break;
                }
            }

            match placement {
                Some(item) => {
                    total_weight += request.weight;
                    placed.push(item);
                }
                None if uniform => break,
                None => {}
            }
        }

        placed
    }
}

#[inline]
fn volume(dims: (f64, f64, f64)) -> f64 {
    dims.0 * dims.1 * dims.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::intersects;

    fn container(l: f64, w: f64, h: f64) -> ContainerRequest {
        ContainerRequest {
            dims: (l, w, h),
            max_weight: 99_999.0,
        }
    }

    fn requests(count: usize, dims: (f64, f64, f64)) -> Vec<ItemRequest> {
        vec![
            ItemRequest {
                dims,
                weight: 1.0,
                allow_rotation: true,
            };
            count
        ]
    }

    #[test]
    fn test_single_item_snaps_to_corner() {
        let solver = HeuristicSolver::default();
        let placed = solver.pack(
            &container(20.0, 20.0, 20.0),
            &requests(1, (10.0, 10.0, 10.0)),
            &StrategyParams::high_stability(),
        );
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].position, (0.0, 0.0, 0.0));
        assert_eq!(placed[0].rotation_index, 0);
    }

    #[test]
    fn test_fills_exact_grid() {
        let solver = HeuristicSolver::default();
        let placed = solver.pack(
            &container(20.0, 20.0, 20.0),
            &requests(8, (10.0, 10.0, 10.0)),
            &StrategyParams::high_stability(),
        );
        assert_eq!(placed.len(), 8);

        // No pair overlaps.
        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                assert!(!intersects(a, b), "{:?} overlaps {:?}", a, b);
            }
        }

        // Lower layer fills before the upper layer starts.
        let bottom = placed.iter().filter(|p| p.position.2 == 0.0).count();
        assert_eq!(bottom, 4);
    }

    #[test]
    fn test_placed_bounding_boxes_stay_disjoint() {
        let solver = HeuristicSolver::default();
        let placed = solver.pack(
            &container(20.0, 20.0, 20.0),
            &requests(4, (10.0, 10.0, 20.0)),
            &StrategyParams::high_stability(),
        );
        assert_eq!(placed.len(), 4);
        for (i, a) in placed.iter().enumerate() {
            for b in placed.iter().skip(i + 1) {
                assert!(!a.bounding_box().intersects(&b.bounding_box()));
                assert_eq!(a.bounding_box().overlap_area_xy(&b.bounding_box()), 0.0);
            }
        }
    }

    #[test]
    fn test_respects_container_bounds() {
        let solver = HeuristicSolver::default();
        let cont = container(25.0, 25.0, 25.0);
        let placed = solver.pack(
            &cont,
            &requests(30, (10.0, 10.0, 10.0)),
            &StrategyParams::high_stability(),
        );
        assert!(placed.len() <= 8);
        for p in &placed {
            assert!(p.position.0 + p.dimensions.0 <= cont.dims.0 + EPSILON_GENERAL);
            assert!(p.position.1 + p.dimensions.1 <= cont.dims.1 + EPSILON_GENERAL);
            assert!(p.position.2 + p.dimensions.2 <= cont.dims.2 + EPSILON_GENERAL);
        }
    }

    #[test]
    fn test_oversized_item_is_rejected() {
        let solver = HeuristicSolver::default();
        let placed = solver.pack(
            &container(10.0, 10.0, 10.0),
            &requests(1, (50.0, 50.0, 50.0)),
            &StrategyParams::high_stability(),
        );
        assert!(placed.is_empty());
    }

    #[test]
    fn test_rotation_unlocks_tight_fit() {
        let solver = HeuristicSolver::default();
        // 10 x 20 footprint only enters the 12 x 22 container rotated.
        let item = ItemRequest {
            dims: (20.0, 10.0, 10.0),
            weight: 1.0,
            allow_rotation: true,
        };
        let placed = solver.pack(
            &container(12.0, 22.0, 15.0),
            &[item],
            &StrategyParams::high_stability(),
        );
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].rotation_index, 1);
        assert_eq!(placed[0].dimensions, (10.0, 20.0, 10.0));

        let fixed = ItemRequest {
            allow_rotation: false,
            ..item
        };
        let placed = solver.pack(
            &container(12.0, 22.0, 15.0),
            &[fixed],
            &StrategyParams::high_stability(),
        );
        assert!(placed.is_empty());
    }

    #[test]
    fn test_weight_capacity_limits_count() {
        let solver = HeuristicSolver::default();
        let cont = ContainerRequest {
            dims: (100.0, 100.0, 100.0),
            max_weight: 3.0,
        };
        let placed = solver.pack(
            &cont,
            &requests(10, (10.0, 10.0, 10.0)),
            &StrategyParams::high_stability(),
        );
        assert_eq!(placed.len(), 3);
    }

    /// Floor fully covered by a pedestal and a taller blocker; a 30-wide
    /// slab can only rest on the blocker top with 2/3 of its base.
    fn overhang_scene() -> (ContainerRequest, Vec<PlacedItem>) {
        let cont = container(30.0, 10.0, 25.0);
        let placed = vec![
            PlacedItem {
                position: (0.0, 0.0, 0.0),
                dimensions: (10.0, 10.0, 10.0),
                rotation_index: 0,
            },
            PlacedItem {
                position: (10.0, 0.0, 0.0),
                dimensions: (20.0, 10.0, 12.0),
                rotation_index: 0,
            },
        ];
        (cont, placed)
    }

    #[test]
    fn test_strict_preset_rejects_unsupported_overhang() {
        let solver = HeuristicSolver::default();
        let (cont, placed) = overhang_scene();
        let strict = StrategyParams::high_stability();
        assert!(solver
            .find_position(&cont, &placed, (30.0, 10.0, 10.0), &strict)
            .is_none());
    }

    #[test]
    fn test_aggressive_preset_accepts_partial_support() {
        let solver = HeuristicSolver::default();
        let (cont, placed) = overhang_scene();
        let lax = StrategyParams::aggressive();
        let position = solver.find_position(&cont, &placed, (30.0, 10.0, 10.0), &lax);
        assert_eq!(position, Some((0.0, 0.0, 12.0)));
    }

    #[test]
    fn test_center_support_required() {
        let solver = HeuristicSolver::default();
        // Two pedestals carry 90% of the base but leave the center hanging
        // over the gap between them.
        let placed = vec![
            PlacedItem {
                position: (0.0, 0.0, 0.0),
                dimensions: (4.5, 10.0, 10.0),
                rotation_index: 0,
            },
            PlacedItem {
                position: (5.5, 0.0, 0.0),
                dimensions: (4.5, 10.0, 10.0),
                rotation_index: 0,
            },
        ];
        let candidate = PlacedItem {
            position: (0.0, 0.0, 10.0),
            dimensions: (10.0, 10.0, 10.0),
            rotation_index: 0,
        };
        assert!(!solver.is_supported(&candidate, &placed, &StrategyParams::high_stability()));
        assert!(solver.is_supported(&candidate, &placed, &StrategyParams::balanced()));
    }

    #[test]
    fn test_deterministic_packing() {
        let solver = HeuristicSolver::default();
        let cont = container(35.0, 25.0, 25.0);
        let items = requests(12, (10.0, 10.0, 10.0));
        let strategy = StrategyParams::high_stability();
        let first = solver.pack(&cont, &items, &strategy);
        let second = solver.pack(&cont, &items, &strategy);
        assert_eq!(first, second);
    }
}
