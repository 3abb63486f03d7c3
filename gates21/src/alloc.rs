//!
//! # Routing-Track Allocation
//!
//! A cell's horizontal routing tracks sit in two regions on either side of the
//! y = 0 line between the wells. PMOS-region tracks are indexed `1, 2, ...`
//! moving up from the center, NMOS-region tracks `-1, -2, ...` moving down.
//! Index zero is never a track.
//!
//! Tracks overlapping the power rails, or any reserved band, are skipped when indexing.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local imports
use crate::coords::DbUnits;
use crate::error::{LayoutError, LayoutResult};
use crate::gen::CellParams;
use crate::tech::Tech;

/// # Routing Region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Region {
    Nmos,
    Pmos,
}

/// # Horizontal Band Blockage
///
/// A band of `width`, centered at `y`, in which no track may sit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blockage {
    pub y: DbUnits,
    pub width: DbUnits,
}
impl Blockage {
    pub fn new(y: impl Into<DbUnits>, width: impl Into<DbUnits>) -> Self {
        Self {
            y: y.into(),
            width: width.into(),
        }
    }
    /// Boolean indication of whether a track of `width` at `y` comes within `space` of us
    pub fn blocks(&self, y: DbUnits, width: DbUnits, space: DbUnits) -> bool {
        // Compare doubled distances to keep half-widths exact
        (y - self.y).abs() * 2 < width + self.width + space * 2
    }
}

/// # Routing Track
///
/// One horizontal track, and the x-intervals on it already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTrack {
    pub index: isize,
    pub y: DbUnits,
    /// Occupied x-intervals, in insertion order
    taken: Vec<(DbUnits, DbUnits)>,
}
impl RouteTrack {
    fn new(index: isize, y: DbUnits) -> Self {
        Self {
            index,
            y,
            taken: Vec::new(),
        }
    }
    /// Boolean indication of whether `[lo, hi]` overlaps nothing taken
    pub fn is_clear(&self, lo: DbUnits, hi: DbUnits) -> bool {
        !self.taken.iter().any(|(tlo, thi)| *tlo < hi && *thi > lo)
    }
    /// Mark `[lo, hi]` as taken
    fn occupy(&mut self, lo: DbUnits, hi: DbUnits) {
        self.taken.push((lo, hi));
    }
}

///
/// # Track Allocator
///
/// Hands out the innermost clear track for each routed segment.
/// Segments are widened by half a wire-width on each end before checking.
///
#[derive(Debug, Clone)]
pub struct TrackAllocator {
    /// PMOS-region tracks, innermost first
    pmos: Vec<RouteTrack>,
    /// NMOS-region tracks, innermost first
    nmos: Vec<RouteTrack>,
    wire: DbUnits,
}
impl TrackAllocator {
    /// Generate the tracks for a cell built with `params`
    pub fn new(params: &CellParams, tech: &Tech) -> LayoutResult<Self> {
        let (pitch, width) = (tech.track_pitch, tech.track_width);
        if pitch <= DbUnits(0) {
            return LayoutError::invalid("Non-positive track pitch");
        }
        let mut blockages = vec![
            Blockage::new(params.vdd_y, params.vdd_width),
            Blockage::new(params.gnd_y, params.gnd_width),
        ];
        blockages.extend(params.reserved.iter().copied());
        let clear = |y: DbUnits| !blockages.iter().any(|b| b.blocks(y, width, params.metal_space));

        let mut pmos = Vec::new();
        let mut y = params.pmos_track_offset;
        while y < params.pmos_well_height {
            if clear(y) {
                pmos.push(RouteTrack::new(pmos.len() as isize + 1, y));
            }
            y += pitch;
        }
        let mut nmos = Vec::new();
        let mut y = params.nmos_track_offset;
        while y > -params.nmos_well_height {
            if clear(y) {
                nmos.push(RouteTrack::new(-(nmos.len() as isize + 1), y));
            }
            y -= pitch;
        }
        Ok(Self {
            pmos,
            nmos,
            wire: width,
        })
    }
    /// Tracks in `region`, innermost first
    pub fn tracks(&self, region: Region) -> &[RouteTrack] {
        match region {
            Region::Pmos => &self.pmos,
            Region::Nmos => &self.nmos,
        }
    }
    /// Get the track at `index`
    pub fn track(&self, index: isize) -> LayoutResult<&RouteTrack> {
        let (tracks, i) = self.locate(index)?;
        tracks
            .get(i)
            .ok_or_else(|| LayoutError::Validation(format!("No routing track {}", index)))
    }
    /// Get the y-coordinate of track `index`
    pub fn track_y(&self, index: isize) -> LayoutResult<DbUnits> {
        Ok(self.track(index)?.y)
    }
    /// Region-list and position for `index`
    fn locate(&self, index: isize) -> LayoutResult<(&Vec<RouteTrack>, usize)> {
        match index {
            0 => LayoutError::invalid("Track index 0 is illegal"),
            i if i > 0 => Ok((&self.pmos, (i - 1) as usize)),
            i => Ok((&self.nmos, (-i - 1) as usize)),
        }
    }
    /// Widen `[lo, hi]` by half a wire
    fn extent(&self, lo: DbUnits, hi: DbUnits) -> (DbUnits, DbUnits) {
        let half = self.wire.half();
        (lo.min(hi) - half, lo.max(hi) + half)
    }
    /// Find the innermost track in `region` clear from `lo` to `hi`
    pub fn find_clear(&self, lo: DbUnits, hi: DbUnits, region: Region) -> Option<isize> {
        let (lo, hi) = self.extent(lo, hi);
        self.tracks(region)
            .iter()
            .find(|t| t.is_clear(lo, hi))
            .map(|t| t.index)
    }
    /// Mark track `index` taken from `lo` to `hi`
    pub fn occupy(&mut self, index: isize, lo: DbUnits, hi: DbUnits) -> LayoutResult<()> {
        let (lo, hi) = self.extent(lo, hi);
        let i = self.locate(index)?.1;
        let tracks = match index > 0 {
            true => &mut self.pmos,
            false => &mut self.nmos,
        };
        match tracks.get_mut(i) {
            Some(t) => {
                t.occupy(lo, hi);
                Ok(())
            }
            None => LayoutError::invalid(format!("No routing track {}", index)),
        }
    }
    ///
    /// Allocate a track for a segment spanning `lo` to `hi`, and mark it taken.
    ///
    /// With a `region`, only that region's tracks are candidates.
    /// Otherwise the innermost clear track of either region wins, NMOS on ties.
    ///
    pub fn allocate(&mut self, lo: DbUnits, hi: DbUnits, region: Option<Region>) -> LayoutResult<isize> {
        let index = match region {
            Some(r) => self.find_clear(lo, hi, r).ok_or_else(|| {
                LayoutError::OutOfTracks(
                    match r {
                        Region::Nmos => "NMOS",
                        Region::Pmos => "PMOS",
                    }
                    .into(),
                )
            })?,
            None => {
                let p = self.find_clear(lo, hi, Region::Pmos);
                let n = self.find_clear(lo, hi, Region::Nmos);
                match (p, n) {
                    (Some(p), Some(n)) if p < -n => p,
                    (_, Some(n)) => n,
                    (Some(p), None) => p,
                    (None, None) => return Err(LayoutError::OutOfTracks("Any".into())),
                }
            }
        };
        self.occupy(index, lo, hi)?;
        Ok(index)
    }
}
