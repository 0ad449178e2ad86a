//! Flow routing over the router topology.

use super::topology::NocTopology;
use crate::ids::{LinkId, RouterId};
use std::collections::VecDeque;
use strata_config::NocRoutingAlgorithm;

/// Routes from `src` to `dst` and returns the links in traversal order.
///
/// XY routing walks along the row to the destination column and then along
/// the column; when the links it needs are missing (or the routers sit on
/// different layers) it falls back to breadth-first search. Returns `None`
/// when the routers are disconnected.
pub fn route_flow(
    topology: &NocTopology,
    algorithm: NocRoutingAlgorithm,
    src: RouterId,
    dst: RouterId,
) -> Option<Vec<LinkId>> {
    if src == dst {
        return Some(Vec::new());
    }
    match algorithm {
        NocRoutingAlgorithm::Xy => {
            route_xy(topology, src, dst).or_else(|| route_bfs(topology, src, dst))
        }
        NocRoutingAlgorithm::ShortestPath => route_bfs(topology, src, dst),
    }
}

fn route_xy(topology: &NocTopology, src: RouterId, dst: RouterId) -> Option<Vec<LinkId>> {
    let target = topology.router(dst).loc;
    if topology.router(src).loc.layer != target.layer {
        return None;
    }
    let mut route = Vec::new();
    let mut cur = src;
    while cur != dst {
        let here = topology.router(cur).loc;
        let step = topology
            .outgoing(cur)
            .iter()
            .copied()
            .filter(|&l| {
                let next = topology.router(topology.link(l).dst).loc;
                if here.x != target.x {
                    next.y == here.y
                        && next.layer == here.layer
                        && between(here.x, next.x, target.x)
                } else {
                    next.x == here.x
                        && next.layer == here.layer
                        && between(here.y, next.y, target.y)
                }
            })
            .min_by_key(|&l| topology.router(topology.link(l).dst).loc.manhattan(here))?;
        route.push(step);
        cur = topology.link(step).dst;
    }
    Some(route)
}

/// Whether `next` moves from `from` toward `to` without overshooting.
fn between(from: i32, next: i32, to: i32) -> bool {
    if to > from {
        next > from && next <= to
    } else {
        next < from && next >= to
    }
}

fn route_bfs(topology: &NocTopology, src: RouterId, dst: RouterId) -> Option<Vec<LinkId>> {
    let mut via: Vec<Option<LinkId>> = vec![None; topology.router_count()];
    let mut seen = vec![false; topology.router_count()];
    let mut queue = VecDeque::from([src]);
    seen[src.index()] = true;
    while let Some(r) = queue.pop_front() {
        if r == dst {
            let mut route = Vec::new();
            let mut cur = dst;
            while let Some(l) = via[cur.index()] {
                route.push(l);
                cur = topology.link(l).src;
            }
            route.reverse();
            return Some(route);
        }
        for &l in topology.outgoing(r) {
            let next = topology.link(l).dst;
            if !seen[next.index()] {
                seen[next.index()] = true;
                via[next.index()] = Some(l);
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_arch::Loc;

    fn mesh() -> NocTopology {
        let mut t = NocTopology::new(1.0);
        for y in 0..3 {
            for x in 0..3 {
                t.add_router(Loc::new(x * 2, y * 2, 0));
            }
        }
        for y in 0..3u32 {
            for x in 0..3u32 {
                let r = RouterId::from_raw(y * 3 + x);
                if x < 2 {
                    let e = RouterId::from_raw(y * 3 + x + 1);
                    t.add_link(r, e, 1.0, 1.0);
                    t.add_link(e, r, 1.0, 1.0);
                }
                if y < 2 {
                    let n = RouterId::from_raw((y + 1) * 3 + x);
                    t.add_link(r, n, 1.0, 1.0);
                    t.add_link(n, r, 1.0, 1.0);
                }
            }
        }
        t
    }

    fn path(t: &NocTopology, route: &[LinkId]) -> Vec<Loc> {
        route.iter().map(|&l| t.router(t.link(l).dst).loc).collect()
    }

    #[test]
    fn xy_goes_along_x_first() {
        let t = mesh();
        let route = route_flow(&t, NocRoutingAlgorithm::Xy, RouterId::from_raw(0), RouterId::from_raw(8)).unwrap();
        assert_eq!(
            path(&t, &route),
            vec![
                Loc::new(2, 0, 0),
                Loc::new(4, 0, 0),
                Loc::new(4, 2, 0),
                Loc::new(4, 4, 0)
            ]
        );
    }

    #[test]
    fn xy_falls_back_when_link_missing() {
        let mut t = NocTopology::new(1.0);
        let a = t.add_router(Loc::new(0, 0, 0));
        let b = t.add_router(Loc::new(0, 1, 0));
        let c = t.add_router(Loc::new(1, 1, 0));
        t.add_link(a, b, 1.0, 1.0);
        t.add_link(b, c, 1.0, 1.0);
        // XY would need a -> (1, 0) first; no such router exists.
        let route = route_flow(&t, NocRoutingAlgorithm::Xy, a, c).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route_flow(&t, NocRoutingAlgorithm::Xy, c, a), None);
    }

    #[test]
    fn shortest_path_hop_count() {
        let t = mesh();
        let route = route_flow(
            &t,
            NocRoutingAlgorithm::ShortestPath,
            RouterId::from_raw(2),
            RouterId::from_raw(6),
        )
        .unwrap();
        assert_eq!(route.len(), 4);
        assert_eq!(t.link(route[0]).src, RouterId::from_raw(2));
        assert_eq!(t.link(route[3]).dst, RouterId::from_raw(6));
        assert!(route_flow(&t, NocRoutingAlgorithm::Xy, RouterId::from_raw(4), RouterId::from_raw(4))
            .unwrap()
            .is_empty());
    }
}
