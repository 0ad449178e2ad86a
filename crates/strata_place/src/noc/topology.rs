//! Router and link topology.

use crate::ids::{LinkId, RouterId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strata_arch::{DeviceGrid, Loc, SiteType};

/// A router at a fixed grid site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NocRouter {
    /// The router's ID.
    pub id: RouterId,
    /// Grid site of the router.
    pub loc: Loc,
}

/// A directed link between two routers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NocLink {
    /// The link's ID.
    pub id: LinkId,
    /// Upstream router.
    pub src: RouterId,
    /// Downstream router.
    pub dst: RouterId,
    /// Bandwidth capacity.
    pub bandwidth: f64,
    /// Traversal latency in nanoseconds.
    pub latency_ns: f64,
}

/// Routers, their links, and the per-router traversal latency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NocTopology {
    routers: Vec<NocRouter>,
    links: Vec<NocLink>,
    outgoing: Vec<Vec<LinkId>>,
    by_loc: HashMap<Loc, RouterId>,
    router_latency_ns: f64,
}

impl NocTopology {
    /// Creates an empty topology whose routers each add `router_latency_ns`
    /// per hop.
    pub fn new(router_latency_ns: f64) -> Self {
        Self {
            router_latency_ns,
            ..Self::default()
        }
    }

    /// Builds a mesh over every `NocRouter` site of `grid`. Each router is
    /// linked both ways to its nearest router along the row and along the
    /// column.
    pub fn mesh_from_grid(
        grid: &DeviceGrid,
        link_bandwidth: f64,
        link_latency_ns: f64,
        router_latency_ns: f64,
    ) -> Self {
        let mut topo = Self::new(router_latency_ns);
        for loc in grid.locations() {
            if grid.site_type(loc) == Some(SiteType::NocRouter) {
                topo.add_router(loc);
            }
        }
        let routers = topo.routers.clone();
        for r in &routers {
            let right = routers
                .iter()
                .filter(|o| o.loc.layer == r.loc.layer && o.loc.y == r.loc.y && o.loc.x > r.loc.x)
                .min_by_key(|o| o.loc.x);
            let up = routers
                .iter()
                .filter(|o| o.loc.layer == r.loc.layer && o.loc.x == r.loc.x && o.loc.y > r.loc.y)
                .min_by_key(|o| o.loc.y);
            for n in right.into_iter().chain(up) {
                topo.add_link(r.id, n.id, link_bandwidth, link_latency_ns);
                topo.add_link(n.id, r.id, link_bandwidth, link_latency_ns);
            }
        }
        topo
    }

    /// Adds a router at `loc`. A second router at the same site replaces the
    /// first in site lookups.
    pub fn add_router(&mut self, loc: Loc) -> RouterId {
        let id = RouterId::from_raw(self.routers.len() as u32);
        self.routers.push(NocRouter { id, loc });
        self.outgoing.push(Vec::new());
        self.by_loc.insert(loc, id);
        id
    }

    /// Adds a directed link.
    pub fn add_link(&mut self, src: RouterId, dst: RouterId, bandwidth: f64, latency_ns: f64) -> LinkId {
        let id = LinkId::from_raw(self.links.len() as u32);
        self.links.push(NocLink {
            id,
            src,
            dst,
            bandwidth,
            latency_ns,
        });
        self.outgoing[src.index()].push(id);
        id
    }

    /// The router with `id`.
    pub fn router(&self, id: RouterId) -> &NocRouter {
        &self.routers[id.index()]
    }

    /// The link with `id`.
    pub fn link(&self, id: LinkId) -> &NocLink {
        &self.links[id.index()]
    }

    /// Every router, in ID order.
    pub fn routers(&self) -> &[NocRouter] {
        &self.routers
    }

    /// Every link, in ID order.
    pub fn links(&self) -> &[NocLink] {
        &self.links
    }

    /// Links leaving `router`.
    pub fn outgoing(&self, router: RouterId) -> &[LinkId] {
        &self.outgoing[router.index()]
    }

    /// The router at a grid site.
    pub fn router_at(&self, loc: Loc) -> Option<RouterId> {
        self.by_loc.get(&loc).copied()
    }

    /// The first link from `src` to `dst`.
    pub fn link_between(&self, src: RouterId, dst: RouterId) -> Option<LinkId> {
        self.outgoing(src)
            .iter()
            .copied()
            .find(|&l| self.link(l).dst == dst)
    }

    /// Latency added by each router on a route.
    pub fn router_latency_ns(&self) -> f64 {
        self.router_latency_ns
    }

    /// Number of routers.
    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noc_grid() -> DeviceGrid {
        let mut grid = DeviceGrid::new(9, 9, 1, SiteType::Logic);
        for x in [0, 4, 8] {
            for y in [0, 4, 8] {
                grid.set_site(Loc::new(x, y, 0), SiteType::NocRouter);
            }
        }
        grid
    }

    #[test]
    fn mesh_links_neighbours_both_ways() {
        let topo = NocTopology::mesh_from_grid(&noc_grid(), 10.0, 1.0, 0.5);
        assert_eq!(topo.router_count(), 9);
        // 3 rows x 2 + 3 columns x 2 pairs, each pair linked both ways.
        assert_eq!(topo.link_count(), 24);
        let a = topo.router_at(Loc::new(0, 0, 0)).unwrap();
        let b = topo.router_at(Loc::new(4, 0, 0)).unwrap();
        let far = topo.router_at(Loc::new(8, 0, 0)).unwrap();
        assert!(topo.link_between(a, b).is_some());
        assert!(topo.link_between(b, a).is_some());
        assert!(topo.link_between(a, far).is_none());
        assert_eq!(topo.outgoing(a).len(), 2);
    }

    #[test]
    fn router_lookup_by_site() {
        let mut topo = NocTopology::new(1.0);
        let r = topo.add_router(Loc::new(3, 3, 0));
        assert_eq!(topo.router_at(Loc::new(3, 3, 0)), Some(r));
        assert_eq!(topo.router_at(Loc::new(3, 4, 0)), None);
        assert_eq!(topo.router(r).loc, Loc::new(3, 3, 0));
    }
}
