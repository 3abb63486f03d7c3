//! # Validators
//! Integrity checks for placed rows: abutment, and well-tie spacing.
//!

// Local imports
use crate::coords::DbUnits;
use crate::cost::Cursors;
use crate::error::{LayoutError, LayoutResult};
use crate::model::{InstKey, InstRole, Lane, PlaceModel, Positions};

/// Helper-function for asserting boolean conditions, returning [LayoutResult] and enabling the question-mark operator.
pub fn assert(b: bool, msg: impl FnOnce() -> String) -> LayoutResult<()> {
    match b {
        true => Ok(()),
        false => Err(LayoutError::Validation(msg())),
    }
}

///
/// Check that `positions` abuts `order` from x = 0:
/// every lane is contiguous and non-overlapping, and each full-height
/// instance starts where both lanes meet.
///
pub fn check_abutment(model: &PlaceModel, order: &[InstKey], positions: &Positions) -> LayoutResult<()> {
    let mut cursors = Cursors::at(DbUnits(0));
    for key in order.iter() {
        let inst = model.inst(*key)?;
        let want = cursors.place(inst.kind, inst.width);
        let got = positions.get(*key).copied();
        assert(got == Some(want), || {
            format!("Instance {} at {:?}, expected abutted at {}", inst.name, got, want)
        })?;
    }
    Ok(())
}

/// One tie or instance extent along a lane
#[derive(Debug, Clone, Copy)]
struct Span {
    x: DbUnits,
    w: DbUnits,
    tie: bool,
}

///
/// Check well-tie spacing in both lanes of a placed row.
///
/// Per lane: the first tie starts within `pitch - pitch/2` of the row's left edge,
/// consecutive ties are at most `pitch` apart, and the row's right edge is within
/// `pitch/2` of the last tie. A non-empty lane therefore always has a tie.
///
pub fn check_tie_spacing(
    model: &PlaceModel,
    order: &[InstKey],
    positions: &Positions,
    pitch: DbUnits,
) -> LayoutResult<()> {
    let half = pitch.half();
    let mut lanes: [(Lane, Vec<Span>); 2] = [(Lane::N, Vec::new()), (Lane::P, Vec::new())];
    let mut row_end = DbUnits(0);
    for key in order.iter() {
        let inst = model.inst(*key)?;
        let x = *positions
            .get(*key)
            .ok_or_else(|| LayoutError::Validation(format!("Unplaced instance {}", inst.name)))?;
        row_end = row_end.max(x + inst.width);
        for (lane, spans) in lanes.iter_mut() {
            let occupied = match lane {
                Lane::N => inst.kind.has_n(),
                Lane::P => inst.kind.has_p(),
            };
            if occupied {
                let tie = inst.role == InstRole::WellTie(*lane);
                spans.push(Span { x, w: inst.width, tie });
            }
        }
    }
    for (lane, spans) in lanes.iter_mut() {
        spans.sort_by_key(|s| s.x);
        // The left edge counts as a tie ending half a pitch before the row
        let mut prev_end = -half;
        for span in spans.iter().filter(|s| s.tie) {
            let dist = span.x - prev_end;
            assert(dist <= pitch, || {
                format!("{:?}-lane well-tie at {} is {} from the last, limit {}", lane, span.x, dist, pitch)
            })?;
            prev_end = span.x + span.w;
        }
        let dist = row_end - prev_end;
        assert(dist <= half, || {
            format!("{:?}-lane row end is {} from its last well-tie, limit {}", lane, dist, half)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::abut;
    use crate::model::InstKind;

    #[test]
    fn test_abutment() -> LayoutResult<()> {
        let mut model = PlaceModel::new();
        let a = model.add_inst(InstKind::N, 10, "a")?;
        let b = model.add_inst(InstKind::PN, 10, "b")?;
        let (mut positions, _) = abut(&model, &[a, b], DbUnits(0))?;
        check_abutment(&model, &[a, b], &positions)?;
        // Overlap
        positions.insert(b, DbUnits(5));
        assert!(check_abutment(&model, &[a, b], &positions).is_err());
        // Missing
        positions.remove(b);
        assert!(check_abutment(&model, &[a, b], &positions).is_err());
        Ok(())
    }
    #[test]
    fn test_untied_row_fails() -> LayoutResult<()> {
        let mut model = PlaceModel::new();
        let a = model.add_inst(InstKind::PN, 80, "a")?;
        let (positions, _) = abut(&model, &[a], DbUnits(0))?;
        assert!(check_tie_spacing(&model, &[a], &positions, DbUnits(100)).is_err());

        // Tied on both lanes at the right edge
        let mut model = PlaceModel::new();
        let a = model.add_inst(InstKind::PN, 40, "a")?;
        let n = model.add_inst_with_role(InstKind::N, DbUnits(4), "n".into(), InstRole::WellTie(Lane::N))?;
        let p = model.add_inst_with_role(InstKind::P, DbUnits(4), "p".into(), InstRole::WellTie(Lane::P))?;
        let order = [a, n, p];
        let (positions, _) = abut(&model, &order, DbUnits(0))?;
        check_tie_spacing(&model, &order, &positions, DbUnits(100))?;
        // But not with a pitch of 50, as the ties are then 40 from the left edge, more than 25
        assert!(check_tie_spacing(&model, &order, &positions, DbUnits(50)).is_err());
        Ok(())
    }
}
