//! Quadratic placement with clique and star net models.

use super::cg::{default_max_iterations, solve_pcg};
use super::partial::PartialPlacement;
use super::sparse::CsrMatrix;
use super::AnalyticalSolver;
use crate::error::{PlaceError, PlaceResult};
use crate::netlist::NetModel;
use strata_config::AnalyticalOptions;

/// The system `A x = b_x`, `A y = b_y` over moveable and star nodes.
#[derive(Debug, Clone)]
pub struct HybridSystem {
    /// Symmetric positive definite connection matrix.
    pub a: CsrMatrix,
    /// Right-hand side for x.
    pub b_x: Vec<f64>,
    /// Right-hand side for y.
    pub b_y: Vec<f64>,
    /// Index of the first star node.
    pub num_moveable: usize,
}

impl HybridSystem {
    /// Builds the system for the nets of `p` at its current positions.
    ///
    /// A net with `p` pins has weight `p / (p - 1)`. Clique nets connect
    /// every pin pair; star nets connect every pin to one synthetic node.
    /// Fixed nodes contribute to the diagonal and right-hand side only.
    pub fn build(p: &PartialPlacement) -> Self {
        let num_moveable = p.num_moveable_nodes();
        let n = num_moveable + p.num_star_nets();
        let mut triplets = Vec::new();
        let mut b_x = vec![0.0; n];
        let mut b_y = vec![0.0; n];

        let mut star = num_moveable;
        for net in p.nets() {
            let pins = net.nodes.len();
            if pins < 2 {
                continue;
            }
            let w = pins as f64 / (pins - 1) as f64;
            match net.model {
                NetModel::Clique => {
                    for a in 0..pins {
                        for b in a + 1..pins {
                            let pair = (net.nodes[a], net.nodes[b]);
                            add_pair(p, &mut triplets, &mut b_x, &mut b_y, pair, w);
                        }
                    }
                }
                NetModel::Star => {
                    for &node in &net.nodes {
                        if p.is_moveable(node) {
                            triplets.extend([
                                (star, star, w),
                                (node, node, w),
                                (star, node, -w),
                                (node, star, -w),
                            ]);
                        } else {
                            triplets.push((star, star, w));
                            b_x[star] += w * p.x[node];
                            b_y[star] += w * p.y[node];
                        }
                    }
                    star += 1;
                }
            }
        }

        Self {
            a: CsrMatrix::from_triplets(n, &triplets),
            b_x,
            b_y,
            num_moveable,
        }
    }

    /// Pulls every moveable node toward its position in `p` with weight `w`.
    pub fn add_anchors(&mut self, p: &PartialPlacement, w: f64) {
        for i in 0..self.num_moveable {
            self.a.add_to_diagonal(i, w);
            self.b_x[i] += w * p.x[i];
            self.b_y[i] += w * p.y[i];
        }
    }
}

/// Adds one clique edge. Pairs of fixed nodes and pairs on the same node
/// contribute nothing.
fn add_pair(
    p: &PartialPlacement,
    triplets: &mut Vec<(usize, usize, f64)>,
    b_x: &mut [f64],
    b_y: &mut [f64],
    (i, j): (usize, usize),
    w: f64,
) {
    let (i, j) = if p.is_moveable(i) { (i, j) } else { (j, i) };
    if i == j || !p.is_moveable(i) {
        return;
    }
    if p.is_moveable(j) {
        triplets.extend([(i, i, w), (j, j, w), (i, j, -w), (j, i, -w)]);
    } else {
        triplets.push((i, i, w));
        b_x[i] += w * p.x[j];
        b_y[i] += w * p.y[j];
    }
}

/// Quadratic solver over the hybrid clique/star system.
///
/// The base system is built at iteration 0 and cached; later iterations add
/// pseudo-anchors of weight `anchor_coeff * exp(k / anchor_decay)`.
#[derive(Debug, Clone)]
pub struct QpHybridSolver {
    options: AnalyticalOptions,
    base: Option<HybridSystem>,
    seed_x: Vec<f64>,
    seed_y: Vec<f64>,
}

impl QpHybridSolver {
    /// Creates a solver. The base system is built on the first solve.
    pub fn new(options: AnalyticalOptions) -> Self {
        Self {
            options,
            base: None,
            seed_x: Vec::new(),
            seed_y: Vec::new(),
        }
    }

    /// The cached base system, once built.
    pub fn system(&self) -> Option<&HybridSystem> {
        self.base.as_ref()
    }

    fn seed(&mut self, p: &PartialPlacement, n: usize) {
        self.seed_x = vec![0.0; n];
        self.seed_y = vec![0.0; n];
        let m = p.num_moveable_nodes();
        self.seed_x[..m].copy_from_slice(&p.x[..m]);
        self.seed_y[..m].copy_from_slice(&p.y[..m]);
        // Star nodes start at the centroid of their pins.
        let stars = p.nets().iter().filter(|net| net.model == NetModel::Star);
        for (s, net) in stars.enumerate() {
            let k = net.nodes.len() as f64;
            self.seed_x[m + s] = net.nodes.iter().map(|&i| p.x[i]).sum::<f64>() / k;
            self.seed_y[m + s] = net.nodes.iter().map(|&i| p.y[i]).sum::<f64>() / k;
        }
    }
}

impl AnalyticalSolver for QpHybridSolver {
    fn solve(&mut self, iteration: u32, p: &mut PartialPlacement) -> PlaceResult<()> {
        if iteration == 0 || self.base.is_none() {
            let system = HybridSystem::build(p);
            self.seed(p, system.a.dim());
            self.base = Some(system);
        }
        let Some(base) = self.base.as_mut() else {
            return Ok(());
        };

        let mut anchored;
        let system = if iteration == 0 {
            &*base
        } else if self.options.accumulate_anchors {
            base.add_anchors(p, self.options.anchor_weight(iteration));
            &*base
        } else {
            anchored = base.clone();
            anchored.add_anchors(p, self.options.anchor_weight(iteration));
            &anchored
        };

        let n = system.a.dim();
        let cap = self
            .options
            .cg_max_iterations
            .unwrap_or_else(|| default_max_iterations(n));
        let tol = self.options.cg_tolerance;
        let ox = solve_pcg(&system.a, &system.b_x, &mut self.seed_x, tol, cap)?;
        let oy = solve_pcg(&system.a, &system.b_y, &mut self.seed_y, tol, cap)?;
        log::debug!(
            "qp solve {iteration}: {n} unknowns, cg {}/{} iterations",
            ox.iterations,
            oy.iterations
        );

        for i in 0..system.num_moveable {
            let (x, y) = (self.seed_x[i], self.seed_y[i]);
            if !x.is_finite() || !y.is_finite() {
                return Err(PlaceError::NumericalDivergence {
                    reason: format!("non-finite position for node {i}"),
                });
            }
            p.x[i] = x;
            p.y[i] = y;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::BlockId;
    use crate::macros::MacroRegistry;
    use crate::netlist::PlaceNetlist;
    use crate::state::BlockLocations;
    use strata_arch::{BlockType, Loc};

    fn build(netlist: &PlaceNetlist, locs: &[Loc]) -> PartialPlacement {
        let macros = MacroRegistry::new();
        let locations = BlockLocations::from_locs(locs).unwrap();
        PartialPlacement::new(netlist, &macros, &locations)
    }

    #[test]
    fn three_pin_clique_edges() {
        let mut nl = PlaceNetlist::new();
        let b: Vec<BlockId> = (0..3).map(|i| nl.add_block(&format!("b{i}"), BlockType::Clb)).collect();
        nl.add_net("n", b[0], &[b[1], b[2]]);
        let p = build(&nl, &[Loc::new(0, 0, 0), Loc::new(1, 0, 0), Loc::new(2, 0, 0)]);
        let s = HybridSystem::build(&p);
        assert_eq!(s.a.dim(), 3);
        for i in 0..3 {
            // Two edges of weight 1.5 meet at every node.
            assert!((s.a.get(i, i) - 3.0).abs() < 1e-12);
            for j in 0..3 {
                if i != j {
                    assert!((s.a.get(i, j) + 1.5).abs() < 1e-12);
                }
            }
        }
        assert_eq!(s.a.nnz(), 9);
    }

    #[test]
    fn four_pin_net_gets_one_star_node() {
        let mut nl = PlaceNetlist::new();
        let b: Vec<BlockId> = (0..4).map(|i| nl.add_block(&format!("b{i}"), BlockType::Clb)).collect();
        let pad = nl.add_fixed_block("pad", BlockType::Io, Loc::new(0, 3, 0));
        nl.add_net("n", b[0], &[b[1], b[2], b[3]]);
        nl.add_net("io", pad, &[b[0]]);
        let p = build(
            &nl,
            &[
                Loc::new(1, 1, 0),
                Loc::new(2, 1, 0),
                Loc::new(3, 1, 0),
                Loc::new(4, 1, 0),
                Loc::new(0, 3, 0),
            ],
        );
        let s = HybridSystem::build(&p);
        assert_eq!(s.a.dim(), 5);
        let w = 4.0 / 3.0;
        let star = 4;
        assert!((s.a.get(star, star) - 4.0 * w).abs() < 1e-12);
        for i in 0..4 {
            assert!((s.a.get(i, star) + w).abs() < 1e-12);
            for j in 0..4 {
                if i != j {
                    assert_eq!(s.a.get(i, j), 0.0);
                }
            }
        }
        // The pad pulls b0 through the 2-pin net of weight 2.
        assert!((s.a.get(0, 0) - (w + 2.0)).abs() < 1e-12);
        assert!((s.b_y[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn system_is_symmetric_with_zero_free_row_sums() {
        let mut nl = PlaceNetlist::new();
        let b: Vec<BlockId> = (0..7).map(|i| nl.add_block(&format!("b{i}"), BlockType::Clb)).collect();
        let pad = nl.add_fixed_block("pad", BlockType::Io, Loc::new(0, 0, 0));
        nl.add_net("a", b[0], &[b[1], b[2]]);
        nl.add_net("b", b[2], &[b[3], b[4], b[5], b[6]]);
        nl.add_net("c", b[6], &[b[0]]);
        nl.add_net("d", pad, &[b[1]]);
        let locs: Vec<Loc> = (0..8).map(|i| Loc::new(i, i, 0)).collect();
        let p = build(&nl, &locs);
        let s = HybridSystem::build(&p);
        assert!(s.a.is_symmetric(1e-12));
        assert!(s.a.is_diagonally_dominant());
        for i in 0..s.a.dim() {
            let row_sum: f64 = s.a.row(i).map(|(_, v)| v).sum();
            if i == p.node_of(b[1]) {
                // The only node tied to the pad.
                assert!((row_sum - 2.0).abs() < 1e-12);
            } else {
                assert!(row_sum.abs() < 1e-12, "row {i} sums to {row_sum}");
            }
        }
    }

    #[test]
    fn two_pin_net_converges_to_fixed_node() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_fixed_block("a", BlockType::Io, Loc::new(0, 0, 0));
        let b = nl.add_block("b", BlockType::Clb);
        nl.add_net("n", a, &[b]);
        let mut p = build(&nl, &[Loc::new(0, 0, 0), Loc::new(7, 5, 0)]);
        let mut solver = QpHybridSolver::new(AnalyticalOptions::default());
        solver.solve(0, &mut p).unwrap();
        let node = p.node_of(b);
        assert!(p.x[node].abs() < 1e-9);
        assert!(p.y[node].abs() < 1e-9);
    }

    #[test]
    fn anchors_pull_toward_previous_positions() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_fixed_block("a", BlockType::Io, Loc::new(0, 0, 0));
        let b = nl.add_block("b", BlockType::Clb);
        nl.add_net("n", a, &[b]);
        let opts = AnalyticalOptions {
            anchor_coeff: 1.0,
            anchor_decay: 1.0,
            ..AnalyticalOptions::default()
        };
        assert!(opts.anchor_weight(2) > opts.anchor_weight(1));
        let mut p = build(&nl, &[Loc::new(0, 0, 0), Loc::new(8, 0, 0)]);
        let mut solver = QpHybridSolver::new(opts);
        solver.solve(0, &mut p).unwrap();
        let node = p.node_of(b);
        p.x[node] = 8.0;
        solver.solve(1, &mut p).unwrap();
        // Net weight 2 against anchor weight e: x = 8e / (2 + e).
        let e = std::f64::consts::E;
        assert!((p.x[node] - 8.0 * e / (2.0 + e)).abs() < 1e-9);
        // The cached system is untouched by anchors.
        let base = solver.system().unwrap();
        assert!((base.a.get(0, 0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn accumulated_anchors_stay_in_cached_system() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_fixed_block("a", BlockType::Io, Loc::new(0, 0, 0));
        let b = nl.add_block("b", BlockType::Clb);
        nl.add_net("n", a, &[b]);
        let opts = AnalyticalOptions {
            accumulate_anchors: true,
            ..AnalyticalOptions::default()
        };
        let w1 = opts.anchor_weight(1);
        let w2 = opts.anchor_weight(2);
        let mut p = build(&nl, &[Loc::new(0, 0, 0), Loc::new(3, 3, 0)]);
        let mut solver = QpHybridSolver::new(opts);
        solver.solve(0, &mut p).unwrap();
        solver.solve(1, &mut p).unwrap();
        solver.solve(2, &mut p).unwrap();
        let base = solver.system().unwrap();
        assert!((base.a.get(0, 0) - (2.0 + w1 + w2)).abs() < 1e-12);
    }
}
