//!
//! # Well-Tie Insertion
//!
//! Walks a placed row left to right, tracking per-lane distance since the last
//! well-tie, and inserts tie cells wherever the next instance would push that
//! distance past the configured pitch. Rows start and end within half a pitch
//! of a tie. Lane gaps ahead of full-height instances are filled with
//! exact-width tie cells.
//!

// Std-lib imports
use std::iter::once;

// Crates.io
use log::{debug, warn};

// Local imports
use crate::coords::{DbUnits, Xy};
use crate::error::LayoutResult;
use crate::model::{InstKey, InstKind, InstRole, Lane, PlaceModel};
use crate::tech::Tech;

/// # Well-Tie Port
///
/// Rail connection added to each inserted tie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiePort {
    pub name: String,
    /// Offset from the tie's origin, perpendicular to the row
    pub y: DbUnits,
}
impl TiePort {
    pub fn new(name: impl Into<String>, y: impl Into<DbUnits>) -> Self {
        Self {
            name: name.into(),
            y: y.into(),
        }
    }
}

/// # Well-Tie Insertion Result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TieResult {
    /// Augmented left-to-right order, ties included. Re-abut to get positions.
    pub order: Vec<InstKey>,
    /// Inserted ties, in insertion order
    pub inserted: Vec<InstKey>,
}

///
/// # Well-Tie Inserter
///
/// Owns the counter from which tie names are generated,
/// so that repeated passes never produce duplicate names.
///
#[derive(Debug, Clone)]
pub struct WellTieInserter {
    pitch: DbUnits,
    tie_width: DbUnits,
    /// Port added to NMOS-lane (substrate) ties
    n_port: Option<TiePort>,
    /// Port added to PMOS-lane (n-well) ties
    p_port: Option<TiePort>,
    count: usize,
}
impl WellTieInserter {
    /// Create an inserter using the well-tie pitch and width of `tech`
    pub fn new(tech: &Tech) -> Self {
        Self {
            pitch: tech.well_tie_pitch,
            tie_width: tech.well_tie_width,
            n_port: None,
            p_port: None,
            count: 0,
        }
    }
    /// Give each inserted tie a rail port. NMOS ties get `n_port`, PMOS ties `p_port`.
    pub fn with_ports(mut self, n_port: TiePort, p_port: TiePort) -> Self {
        self.n_port = Some(n_port);
        self.p_port = Some(p_port);
        self
    }
    /// Number of ties created so far
    pub fn count(&self) -> usize {
        self.count
    }
    ///
    /// Insert well-ties into `order`, a placed left-to-right row of instances in `model`.
    /// New tie instances are added to `model`.
    ///
    pub fn insert(&mut self, model: &mut PlaceModel, order: &[InstKey]) -> LayoutResult<TieResult> {
        let half = self.pitch.half();
        // Zero-width end-of-row marker, so the trailing edge gets checked like any other instance
        let end = model.add_inst_with_role(
            InstKind::PN,
            DbUnits(0),
            String::from("__row_end__"),
            InstRole::Terminator,
        )?;
        let mut row = RowState {
            order: Vec::with_capacity(order.len()),
            inserted: Vec::new(),
            sp: PerLane { n: half, p: half },
            x: PerLane::default(),
        };
        for &key in order.iter().chain(once(&end)) {
            let inst = model.inst(key)?;
            let (kind, width) = (inst.kind, inst.width);
            let threshold = match inst.role {
                InstRole::Terminator => half,
                _ => self.pitch,
            };
            if width > self.pitch {
                warn!(
                    "Instance {} (width {}) is wider than the well-tie pitch {}",
                    inst.name, width, self.pitch
                );
            }
            match kind {
                InstKind::N | InstKind::P => {
                    let lane = match kind {
                        InstKind::N => Lane::N,
                        _ => Lane::P,
                    };
                    self.check(model, &mut row, lane, width, threshold)?;
                    *row.sp.get_mut(lane) += width;
                    *row.x.get_mut(lane) += width;
                }
                InstKind::PN => {
                    let lead = match row.x.n >= row.x.p {
                        true => Lane::N,
                        false => Lane::P,
                    };
                    let lag = lead.other();
                    self.check(model, &mut row, lead, width, threshold)?;
                    // Without a lagging-lane gap to fill, the lagging lane gets its own check,
                    // and any tie it adds opens a gap on the leading lane.
                    if !self.patch(model, &mut row, lag)?
                        && self.check(model, &mut row, lag, width, threshold)?
                    {
                        self.patch(model, &mut row, lead)?;
                    }
                    let x = row.x.n.max(row.x.p) + width;
                    row.x = PerLane { n: x, p: x };
                    row.sp.n += width;
                    row.sp.p += width;
                }
            }
            if key != end {
                row.order.push(key);
            }
        }
        model.remove_inst(end)?;
        debug!("Inserted {} well-ties", row.inserted.len());
        Ok(TieResult {
            order: row.order,
            inserted: row.inserted,
        })
    }
    /// Insert a minimum-width tie in `lane` if an instance of `width` would overrun `threshold`.
    /// Returns whether a tie was inserted.
    fn check(
        &mut self,
        model: &mut PlaceModel,
        row: &mut RowState,
        lane: Lane,
        width: DbUnits,
        threshold: DbUnits,
    ) -> LayoutResult<bool> {
        let sp = row.sp.get(lane);
        if sp + width > threshold && sp != DbUnits(0) {
            self.tie(model, row, lane, self.tie_width)?;
            return Ok(true);
        }
        Ok(false)
    }
    /// Fill any gap between `lane` and the other lane with an exact-width tie.
    /// Returns whether a tie was inserted.
    fn patch(&mut self, model: &mut PlaceModel, row: &mut RowState, lane: Lane) -> LayoutResult<bool> {
        let gap = row.x.get(lane.other()) - row.x.get(lane);
        if gap > DbUnits(0) {
            self.tie(model, row, lane, gap)?;
            return Ok(true);
        }
        Ok(false)
    }
    /// Create a tie of `width` in `lane`, at the lane's current end
    fn tie(&mut self, model: &mut PlaceModel, row: &mut RowState, lane: Lane, width: DbUnits) -> LayoutResult<()> {
        let (prefix, port) = match lane {
            Lane::N => ("ntie", &self.n_port),
            Lane::P => ("ptie", &self.p_port),
        };
        let name = format!("{}{}", prefix, self.count);
        let port = port.clone();
        self.count += 1;
        let key = model.add_inst_with_role(lane.kind(), width, name, InstRole::WellTie(lane))?;
        if let Some(port) = port {
            model.add_port(key, port.name, Xy::new(width.half(), port.y))?;
        }
        row.order.push(key);
        row.inserted.push(key);
        *row.x.get_mut(lane) += width;
        *row.sp.get_mut(lane) = DbUnits(0);
        Ok(())
    }
}

/// A value per lane
#[derive(Debug, Clone, Copy, Default)]
struct PerLane {
    n: DbUnits,
    p: DbUnits,
}
impl PerLane {
    fn get(&self, lane: Lane) -> DbUnits {
        match lane {
            Lane::N => self.n,
            Lane::P => self.p,
        }
    }
    fn get_mut(&mut self, lane: Lane) -> &mut DbUnits {
        match lane {
            Lane::N => &mut self.n,
            Lane::P => &mut self.p,
        }
    }
}

/// Running state of one row walk
struct RowState {
    order: Vec<InstKey>,
    inserted: Vec<InstKey>,
    /// Distance since the last tie
    sp: PerLane,
    /// Lane end
    x: PerLane,
}
