//!
//! # Row Placer
//!
//! Orders a cell's instances left to right, minimizing the summed bounding-box
//! width of its nets. A three-region heuristic (full-height instances, then
//! NMOS-only, then PMOS-only) seeds the placement; each region may then be
//! re-ordered by a branch-and-bound permutation search.
//!

// Crates.io
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Local imports
use crate::coords::DbUnits;
use crate::cost::CostModel;
use crate::error::{LayoutError, LayoutResult};
use crate::model::{InstKey, InstKind, Loc, PlaceModel, Positions};
use crate::tech::{Tech, DEFAULT_MAX_PERMS};

/// # Placer Configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacerConfig {
    /// Re-optimize each region by permutation search.
    /// If false, the three-region heuristic order is final.
    pub exhaustive: bool,
    /// Prune search branches by their lower-bound cost
    pub prune: bool,
    /// Stop each search after this many complete permutations
    pub max_perms: usize,
}
impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            exhaustive: true,
            prune: true,
            max_perms: DEFAULT_MAX_PERMS,
        }
    }
}
impl PlacerConfig {
    /// Default configuration, with the permutation cap from `tech`
    pub fn from_tech(tech: &Tech) -> Self {
        Self {
            max_perms: tech.max_placer_perms,
            ..Default::default()
        }
    }
}

/// # Placement Result
///
/// Final left-to-right order and per-instance x-coordinates.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order: Vec<InstKey>,
    pub positions: Positions,
    /// Right edge of the last full-height instance. Zero if there are none.
    pub right_full_x: DbUnits,
    /// Total net cost at `positions`
    pub cost: DbUnits,
}
impl Placement {
    /// Location of instance `key`, if placed
    pub fn loc(&self, key: InstKey) -> Option<Loc> {
        self.positions.get(key).map(|x| Loc { x: *x, row: 0 })
    }
}

/// # Permutation-Search Result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Best order found
    pub order: Vec<InstKey>,
    /// Total cost of `order`
    pub cost: DbUnits,
    /// Number of complete permutations evaluated
    pub perms_evaluated: usize,
    /// Whether the search stopped at its permutation cap
    pub capped: bool,
}

///
/// # Placer
///
/// Holds a flattened [CostModel] of the cell, plus the current x-coordinate of
/// every instance. Searches over one region see the others at these positions.
///
pub struct Placer<'m> {
    model: &'m PlaceModel,
    cm: CostModel,
    config: PlacerConfig,
    xs: Vec<DbUnits>,
}
impl<'m> Placer<'m> {
    ///
    /// [Placer] public API entrypoint.
    /// Place every instance of `model` in a single row.
    ///
    pub fn place(model: &'m PlaceModel, config: PlacerConfig) -> LayoutResult<Placement> {
        let mut this = Self::new(model, config)?;
        this.place_row()
    }
    /// Create a new [Placer], with all instances initially at x = 0
    pub fn new(model: &'m PlaceModel, config: PlacerConfig) -> LayoutResult<Self> {
        if config.max_perms == 0 {
            return LayoutError::invalid("Placer permutation cap must be positive");
        }
        let cm = CostModel::new(model)?;
        let xs = vec![DbUnits(0); cm.len()];
        Ok(Self {
            model,
            cm,
            config,
            xs,
        })
    }
    /// Place all instances: three-region heuristic, then optional per-region search.
    fn place_row(&mut self) -> LayoutResult<Placement> {
        let (mut pn, mut n, mut p) = self.regions();
        let right_full_x = self.heuristic(&pn, &n, &p)?;
        let seed_cost = self.cm.cost(&self.xs);
        debug!("Heuristic placement cost {}", seed_cost);

        if self.config.exhaustive {
            for (group, left_x) in [
                (&mut pn, DbUnits(0)),
                (&mut n, right_full_x),
                (&mut p, right_full_x),
            ] {
                if group.is_empty() {
                    continue;
                }
                let result = self.search(&group[..], left_x)?;
                *group = result.order;
            }
        }
        let order: Vec<InstKey> = pn.into_iter().chain(n).chain(p).collect();
        let cost = self.cm.cost(&self.xs);
        info!(
            "Placed {} instances, cost {} (heuristic {})",
            order.len(),
            cost,
            seed_cost
        );
        Ok(Placement {
            order,
            positions: self.cm.positions(&self.xs),
            right_full_x,
            cost,
        })
    }
    /// Split instances into full-height, NMOS-only, and PMOS-only regions,
    /// each in the model's insertion order.
    fn regions(&self) -> (Vec<InstKey>, Vec<InstKey>, Vec<InstKey>) {
        let (mut pn, mut n, mut p) = (Vec::new(), Vec::new(), Vec::new());
        for idx in 0..self.cm.len() {
            let key = self.cm.key(idx);
            match self.cm.kind(idx) {
                InstKind::PN => pn.push(key),
                InstKind::N => n.push(key),
                InstKind::P => p.push(key),
            }
        }
        (pn, n, p)
    }
    /// Abut regions `pn ++ n ++ p` from x = 0.
    /// Returns the right edge of the full-height region.
    fn heuristic(&mut self, pn: &[InstKey], n: &[InstKey], p: &[InstKey]) -> LayoutResult<DbUnits> {
        let all: Vec<InstKey> = pn.iter().chain(n.iter()).chain(p.iter()).copied().collect();
        let idxs = self.indices(&all)?;
        self.cm.abut(&idxs, DbUnits(0), &mut self.xs);
        // Both lane-cursors meet at the end of the last full-height instance
        let pn_idxs = &idxs[..pn.len()];
        Ok(self.cm.abut(pn_idxs, DbUnits(0), &mut self.xs).n)
    }
    /// Current placed positions of all instances
    pub fn positions(&self) -> Positions {
        self.cm.positions(&self.xs)
    }
    /// Total cost at the current positions
    pub fn cost(&self) -> DbUnits {
        self.cm.cost(&self.xs)
    }
    /// Abut `order` from `left_x`, updating the current positions,
    /// and return the resulting total cost.
    pub fn apply(&mut self, order: &[InstKey], left_x: DbUnits) -> LayoutResult<DbUnits> {
        let idxs = self.indices(order)?;
        self.cm.abut(&idxs, left_x, &mut self.xs);
        Ok(self.cm.cost(&self.xs))
    }
    ///
    /// Search orderings of `group`, abutted from `left_x`, for the lowest total cost.
    /// All other instances stay at their current positions.
    /// On return the current positions reflect the best order found.
    ///
    pub fn search(&mut self, group: &[InstKey], left_x: DbUnits) -> LayoutResult<SearchResult> {
        if group.is_empty() {
            return Err(LayoutError::EmptyGroup);
        }
        let idxs = self.indices(group)?;
        let mut search = Search {
            cm: &self.cm,
            xs: self.xs.clone(),
            left_x,
            prune: self.config.prune,
            max_perms: self.config.max_perms,
            best: None,
            evaluated: 0,
            capped: false,
        };
        let mut prefix = Vec::with_capacity(idxs.len());
        search.extend(&mut prefix, &idxs);

        let (cost, best) = search
            .best
            .ok_or_else(|| LayoutError::msg("Placement search evaluated no permutations"))?;
        if search.capped {
            warn!(
                "Placement search of {} instances stopped after {} permutations",
                group.len(),
                search.evaluated
            );
        }
        let perm: Vec<usize> = best
            .iter()
            .map(|idx| idxs.iter().position(|i| i == idx).unwrap_or(usize::MAX))
            .collect();
        let order = apply_permutation(group, &perm)?;
        self.cm.abut(&best, left_x, &mut self.xs);
        Ok(SearchResult {
            order,
            cost,
            perms_evaluated: search.evaluated,
            capped: search.capped,
        })
    }
    /// Cost-model indices of `keys`
    fn indices(&self, keys: &[InstKey]) -> LayoutResult<Vec<usize>> {
        keys.iter().map(|k| self.cm.index(*k)).collect()
    }
    /// Our [PlaceModel]
    pub fn model(&self) -> &PlaceModel {
        self.model
    }
}

/// Re-order `group` by `perm`, in which entry `i` is the index into `group` of the `i`th result.
/// Fails unless `perm` is a permutation of `0..group.len()`.
pub fn apply_permutation<T: Copy>(group: &[T], perm: &[usize]) -> LayoutResult<Vec<T>> {
    if perm.len() != group.len() {
        return Err(LayoutError::PermutationLength {
            expected: group.len(),
            got: perm.len(),
        });
    }
    let mut seen = vec![false; group.len()];
    let mut rv = Vec::with_capacity(group.len());
    for &i in perm {
        if i >= group.len() || seen[i] {
            return LayoutError::invalid(format!("Invalid permutation entry {}", i));
        }
        seen[i] = true;
        rv.push(group[i]);
    }
    Ok(rv)
}

///
/// # Branch-and-Bound Search State
///
/// Depth-first over (prefix, remaining) pairs. Each level hands its children an
/// owned copy of the remaining set, with the chosen entry swapped to the front,
/// which visits orders in the same sequence as the classic in-place recursive-swap
/// enumeration. The identity order is always the first complete permutation.
///
struct Search<'c> {
    cm: &'c CostModel,
    /// Scratch positions. Instances outside the group keep their current x.
    xs: Vec<DbUnits>,
    left_x: DbUnits,
    prune: bool,
    max_perms: usize,
    /// Best (cost, order) so far. Ties keep the first found.
    best: Option<(DbUnits, Vec<usize>)>,
    evaluated: usize,
    capped: bool,
}
impl Search<'_> {
    fn extend(&mut self, prefix: &mut Vec<usize>, remaining: &[usize]) {
        if remaining.is_empty() {
            return self.complete(prefix);
        }
        for i in 0..remaining.len() {
            if self.capped {
                return;
            }
            let mut rest = remaining.to_vec();
            rest.swap(0, i);
            prefix.push(rest[0]);
            if !self.prunable(prefix, &rest[1..]) {
                self.extend(prefix, &rest[1..]);
            }
            prefix.pop();
        }
    }
    /// Evaluate a complete permutation
    fn complete(&mut self, perm: &[usize]) {
        self.cm.abut(perm, self.left_x, &mut self.xs);
        let cost = self.cm.cost(&self.xs);
        self.evaluated += 1;
        let better = match self.best {
            None => true,
            Some((best, _)) => cost < best,
        };
        if better {
            self.best = Some((cost, perm.to_vec()));
        }
        if self.evaluated >= self.max_perms {
            self.capped = true;
        }
    }
    /// Decide whether no completion of `prefix` can beat the incumbent.
    /// Attempted only with more than two instances left unplaced,
    /// and only when the prefix leaves both lanes at a common frontier.
    fn prunable(&mut self, prefix: &[usize], unplaced: &[usize]) -> bool {
        if !self.prune || unplaced.len() <= 2 {
            return false;
        }
        let best = match self.best {
            Some((best, _)) => best,
            None => return false,
        };
        let cursors = self.cm.abut(prefix, self.left_x, &mut self.xs);
        let frontier = match cursors.frontier() {
            Some(f) => f,
            None => return false,
        };
        // Stack everything unplaced at the frontier
        for &idx in unplaced {
            self.xs[idx] = frontier;
        }
        self.cm.clipped_cost(&self.xs, frontier) >= best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three instances: N, PN, P, with one net joining the N and P instances.
    fn npn() -> LayoutResult<(PlaceModel, [InstKey; 3])> {
        let mut model = PlaceModel::new();
        let n = model.add_inst(InstKind::N, 10, "n")?;
        let pn = model.add_inst(InstKind::PN, 15, "pn")?;
        let p = model.add_inst(InstKind::P, 10, "p")?;
        let pa = model.add_port(n, "d", (5, -20))?;
        let pb = model.add_port(p, "d", (5, 20))?;
        let net = model.add_net("d");
        model.add_net_port(net, pa)?;
        model.add_net_port(net, pb)?;
        Ok((model, [n, pn, p]))
    }

    #[test]
    fn test_three_region() -> LayoutResult<()> {
        let (model, [n, pn, p]) = npn()?;
        let config = PlacerConfig {
            exhaustive: false,
            ..Default::default()
        };
        let placed = Placer::place(&model, config)?;
        assert_eq!(placed.order, vec![pn, n, p]);
        assert_eq!(placed.right_full_x, DbUnits(15));
        assert_eq!(placed.loc(pn), Some(Loc { x: DbUnits(0), row: 0 }));
        assert_eq!(placed.loc(n).map(|l| l.x), Some(DbUnits(15)));
        assert_eq!(placed.loc(p).map(|l| l.x), Some(DbUnits(15)));
        // N and P land in separate lanes, ports at the same x
        assert_eq!(placed.cost, DbUnits(0));

        // The default per-region search keeps the same ordering
        let searched = Placer::place(&model, PlacerConfig::default())?;
        assert_eq!(searched.order, vec![pn, n, p]);
        assert_eq!(searched.right_full_x, DbUnits(15));
        assert_eq!(searched.cost, DbUnits(0));
        Ok(())
    }
    #[test]
    fn test_search_all_three() -> LayoutResult<()> {
        let (model, [n, pn, p]) = npn()?;
        let mut placer = Placer::new(&model, PlacerConfig::default())?;
        assert_eq!(placer.apply(&[n, pn, p], DbUnits(0))?, DbUnits(25));

        // Any order with N and P on the same side of PN costs zero.
        // The first of these visited is N, P, PN.
        let result = placer.search(&[n, pn, p], DbUnits(0))?;
        assert_eq!(result.order, vec![n, p, pn]);
        assert_eq!(result.cost, DbUnits(0));
        assert_eq!(result.perms_evaluated, 6);
        assert!(!result.capped);
        assert_eq!(placer.cost(), DbUnits(0));
        assert_eq!(placer.positions()[pn], DbUnits(10));
        Ok(())
    }
    #[test]
    fn test_empty_group() -> LayoutResult<()> {
        let (model, _) = npn()?;
        let mut placer = Placer::new(&model, PlacerConfig::default())?;
        match placer.search(&[], DbUnits(0)) {
            Err(LayoutError::EmptyGroup) => Ok(()),
            _ => panic!("Expected an empty-group error"),
        }
    }
    #[test]
    fn test_apply_permutation() -> LayoutResult<()> {
        assert_eq!(apply_permutation(&['a', 'b', 'c'], &[2, 0, 1])?, vec!['c', 'a', 'b']);
        match apply_permutation(&['a', 'b'], &[0]) {
            Err(LayoutError::PermutationLength { expected, got }) => {
                assert_eq!((expected, got), (2, 1));
            }
            _ => panic!("Expected a permutation-length error"),
        }
        assert!(apply_permutation(&['a', 'b'], &[1, 1]).is_err());
        assert!(apply_permutation(&['a', 'b'], &[0, 2]).is_err());
        Ok(())
    }
    #[test]
    fn test_zero_cap() -> LayoutResult<()> {
        let (model, _) = npn()?;
        let config = PlacerConfig {
            max_perms: 0,
            ..Default::default()
        };
        assert!(Placer::new(&model, config).is_err());
        Ok(())
    }
}
