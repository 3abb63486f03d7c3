//!
//! # Abutment & Cost Evaluation
//!
//! The placement search abuts and costs a candidate order once per permutation,
//! so everything here works over a flattened, index-based copy of the [PlaceModel]
//! and writes positions into caller-owned buffers.
//!

// Crates.io
use slotmap::SecondaryMap;

// Local imports
use crate::coords::DbUnits;
use crate::error::{LayoutError, LayoutResult};
use crate::model::{InstKey, InstKind, PlaceModel, Positions};

/// # Lane Cursors
///
/// Next free x-coordinate in each lane, after abutting some order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub p: DbUnits,
    pub n: DbUnits,
}
impl Cursors {
    /// Both cursors at `x`
    pub fn at(x: DbUnits) -> Self {
        Self { p: x, n: x }
    }
    /// The common frontier, if both lanes have reached the same x.
    /// Lower bounds are only defined here.
    pub fn frontier(&self) -> Option<DbUnits> {
        match self.p == self.n {
            true => Some(self.p),
            false => None,
        }
    }
    /// Place an instance of `kind` and `width`, returning its x-coordinate
    #[inline]
    pub fn place(&mut self, kind: InstKind, width: DbUnits) -> DbUnits {
        match kind {
            InstKind::N => {
                let x = self.n;
                self.n += width;
                x
            }
            InstKind::P => {
                let x = self.p;
                self.p += width;
                x
            }
            InstKind::PN => {
                let x = self.p.max(self.n);
                self.p = x + width;
                self.n = x + width;
                x
            }
        }
    }
}

/// One net terminal: instance index, and its (mirror-adjusted) x-offset
type Terminal = (usize, DbUnits);

///
/// # Cost Model
///
/// Index-based mirror of a [PlaceModel]'s instances and nets.
/// Instance indices follow the model's `inst_order`.
///
#[derive(Debug, Clone)]
pub struct CostModel {
    keys: Vec<InstKey>,
    kinds: Vec<InstKind>,
    widths: Vec<DbUnits>,
    index: SecondaryMap<InstKey, usize>,
    nets: Vec<Vec<Terminal>>,
}
impl CostModel {
    /// Flatten `model`
    pub fn new(model: &PlaceModel) -> LayoutResult<Self> {
        let n = model.inst_order.len();
        let mut this = Self {
            keys: Vec::with_capacity(n),
            kinds: Vec::with_capacity(n),
            widths: Vec::with_capacity(n),
            index: SecondaryMap::with_capacity(n),
            nets: Vec::with_capacity(model.net_order.len()),
        };
        for (idx, key) in model.inst_order.iter().enumerate() {
            let inst = model.inst(*key)?;
            this.keys.push(*key);
            this.kinds.push(inst.kind);
            this.widths.push(inst.width);
            this.index.insert(*key, idx);
        }
        for nkey in model.net_order.iter() {
            let net = &model.nets[*nkey];
            let mut terms = Vec::with_capacity(net.ports.len());
            for pkey in net.ports.iter() {
                let port = model.port(*pkey)?;
                terms.push((this.index(port.inst)?, model.port_ofst_x(*pkey)?));
            }
            this.nets.push(terms);
        }
        Ok(this)
    }
    /// Number of instances
    pub fn len(&self) -> usize {
        self.keys.len()
    }
    /// Boolean indication of an instance-free model
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
    /// Index of instance `key`
    pub fn index(&self, key: InstKey) -> LayoutResult<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| LayoutError::msg("Instance not in cost model"))
    }
    /// Key of instance-index `idx`
    pub fn key(&self, idx: usize) -> InstKey {
        self.keys[idx]
    }
    pub fn kind(&self, idx: usize) -> InstKind {
        self.kinds[idx]
    }
    /// Abut instance-indices `order` left to right from `left_x`, writing each x into `xs`.
    /// Instances not in `order` keep whatever `xs` already holds.
    #[inline]
    pub fn abut(&self, order: &[usize], left_x: DbUnits, xs: &mut [DbUnits]) -> Cursors {
        let mut cursors = Cursors::at(left_x);
        for &idx in order {
            xs[idx] = cursors.place(self.kinds[idx], self.widths[idx]);
        }
        cursors
    }
    /// Total bounding-box cost of every net, given instance positions `xs`
    #[inline]
    pub fn cost(&self, xs: &[DbUnits]) -> DbUnits {
        self.nets.iter().map(|net| span(net, xs, None)).sum()
    }
    /// Optimistic cost with every net endpoint at-or-right-of `frontier` clipped to it
    #[inline]
    pub fn clipped_cost(&self, xs: &[DbUnits], frontier: DbUnits) -> DbUnits {
        self.nets.iter().map(|net| span(net, xs, Some(frontier))).sum()
    }
    /// Convert position-buffer `xs` back to key-indexed [Positions]
    pub fn positions(&self, xs: &[DbUnits]) -> Positions {
        let mut positions = Positions::with_capacity(self.keys.len());
        for (idx, key) in self.keys.iter().enumerate() {
            positions.insert(*key, xs[idx]);
        }
        positions
    }
}

/// Span of one net's terminals, optionally clipped at `clip`
#[inline]
fn span(net: &[Terminal], xs: &[DbUnits], clip: Option<DbUnits>) -> DbUnits {
    let mut iter = net.iter().map(|(idx, ofst)| {
        let x = xs[*idx] + *ofst;
        match clip {
            Some(c) if x >= c => c,
            _ => x,
        }
    });
    let first = match iter.next() {
        Some(x) => x,
        None => return DbUnits(0),
    };
    let (lo, hi) = iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
    hi - lo
}

/// Abut `order` from `left_x`, returning keyed positions and the final lane cursors.
/// Instances of `model` not in `order` are left unplaced.
pub fn abut(
    model: &PlaceModel,
    order: &[InstKey],
    left_x: DbUnits,
) -> LayoutResult<(Positions, Cursors)> {
    let mut positions = Positions::with_capacity(order.len());
    let mut cursors = Cursors::at(left_x);
    for key in order.iter() {
        let inst = model.inst(*key)?;
        positions.insert(*key, cursors.place(inst.kind, inst.width));
    }
    Ok((positions, cursors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursors() {
        let mut c = Cursors::at(DbUnits(0));
        assert_eq!(c.place(InstKind::N, DbUnits(10)), DbUnits(0));
        assert_eq!(c.frontier(), None);
        assert_eq!(c.place(InstKind::P, DbUnits(4)), DbUnits(0));
        assert_eq!(c.place(InstKind::PN, DbUnits(5)), DbUnits(10));
        assert_eq!(c, Cursors::at(DbUnits(15)));
        assert_eq!(c.frontier(), Some(DbUnits(15)));
    }
    #[test]
    fn test_abut_and_cost() -> LayoutResult<()> {
        let mut model = PlaceModel::new();
        let n = model.add_inst(InstKind::N, 10, "n")?;
        let pn = model.add_inst(InstKind::PN, 15, "pn")?;
        let p = model.add_inst(InstKind::P, 10, "p")?;
        let pa = model.add_port(n, "a", (5, 0))?;
        let pb = model.add_port(p, "a", (5, 0))?;
        let net = model.add_net("x");
        model.add_net_port(net, pa)?;
        model.add_net_port(net, pb)?;

        let cm = CostModel::new(&model)?;
        let mut xs = vec![DbUnits(0); cm.len()];
        // N, PN, P
        let order = [cm.index(n)?, cm.index(pn)?, cm.index(p)?];
        let cursors = cm.abut(&order, DbUnits(0), &mut xs);
        assert_eq!(xs, vec![DbUnits(0), DbUnits(10), DbUnits(25)]);
        assert_eq!(
            cursors,
            Cursors {
                p: DbUnits(35),
                n: DbUnits(25)
            }
        );
        assert_eq!(cm.cost(&xs), DbUnits(25));
        assert_eq!(cm.clipped_cost(&xs, DbUnits(20)), DbUnits(15));

        // Keyed version agrees
        let (positions, _) = abut(&model, &[n, pn, p], DbUnits(0))?;
        assert_eq!(model.cost(&positions)?, DbUnits(25));
        assert_eq!(cm.positions(&xs), positions);
        Ok(())
    }
}
