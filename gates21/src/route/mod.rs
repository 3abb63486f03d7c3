//!
//! # Track Routing
//!
//! A [TrackRouter] owns one straight routing track, horizontal or vertical,
//! and connects a set of ports to it. Each port gets a via (or pin) on the track,
//! kept in sorted order along the track axis, with track arcs joining
//! neighboring vias and one arc from each via down to its port.
//!

// Crates.io
use log::debug;

// Local imports
use crate::coords::{DbUnits, Dir, Xy};
use crate::error::{LayoutError, LayoutResult};
use crate::tech::{Layer, Tech};

pub mod sink;
pub mod via;
pub use sink::{ArcKey, LayoutSink, NodeKey, Record, RecordingSink, Terminal};
pub use via::{RoutePort, ViaStack};

///
/// # Track Router
///
/// Vias are kept sorted by their coordinate along the track.
/// Equal coordinates keep insertion order.
/// `cursor` is the index of the last insertion, from which the next search starts.
///
#[derive(Debug, Clone)]
pub struct TrackRouter {
    /// Direction the track runs
    pub dir: Dir,
    pub layer: Layer,
    pub width: DbUnits,
    /// Track center-line, in the axis perpendicular to `dir`
    pub center: DbUnits,
    vias: Vec<ViaStack>,
    cursor: usize,
}
impl TrackRouter {
    /// Create a new and empty [TrackRouter]
    pub fn new(dir: Dir, layer: Layer, width: impl Into<DbUnits>, center: impl Into<DbUnits>) -> Self {
        Self {
            dir,
            layer,
            width: width.into(),
            center: center.into(),
            vias: Vec::new(),
            cursor: 0,
        }
    }
    /// Create a horizontal track at `y`
    pub fn horiz(layer: Layer, width: impl Into<DbUnits>, y: impl Into<DbUnits>) -> Self {
        Self::new(Dir::Horiz, layer, width, y)
    }
    /// Create a vertical track at `x`
    pub fn vert(layer: Layer, width: impl Into<DbUnits>, x: impl Into<DbUnits>) -> Self {
        Self::new(Dir::Vert, layer, width, x)
    }
    /// Our via stacks, in track order
    pub fn vias(&self) -> &[ViaStack] {
        &self.vias
    }
    /// Connect every port in `ports`, with zero offsets.
    /// Fewer than two ports leaves nothing to connect, and creates nothing.
    pub fn connect_all<S: LayoutSink>(&mut self, sink: &mut S, tech: &Tech, ports: &[RoutePort]) -> LayoutResult<()> {
        if ports.len() < 2 {
            return Ok(());
        }
        for port in ports.iter() {
            self.connect_port(sink, tech, port)?;
        }
        Ok(())
    }
    /// Connect `port` with zero via and wire offsets
    pub fn connect_port<S: LayoutSink>(&mut self, sink: &mut S, tech: &Tech, port: &RoutePort) -> LayoutResult<()> {
        self.connect(sink, tech, port, DbUnits(0), DbUnits(0))
    }
    ///
    /// Connect `port` to the track.
    ///
    /// The via lands `via_offset` along the track from the port.
    /// A non-zero `wire_offset` adds a jog pin that far off the track center-line,
    /// between the via and the port.
    ///
    pub fn connect<S: LayoutSink>(
        &mut self,
        sink: &mut S,
        tech: &Tech,
        port: &RoutePort,
        via_offset: DbUnits,
        wire_offset: DbUnits,
    ) -> LayoutResult<()> {
        let native = self.native_layer(tech, port)?;
        let wire = match sink.widest_arc(&port.terminal()) {
            Some(w) => w,
            None => tech.default_width(native)?,
        };
        let coord = port.at[self.dir] + via_offset;

        let idx = match self.reusable(tech, coord, native) {
            Some(idx) => {
                debug!("Reusing via at {} for {}", self.vias[idx].coord, port.name);
                idx
            }
            None => self.insert(sink, tech, native, coord, wire)?,
        };
        let via = &self.vias[idx];
        let mut from = via.port2();
        if wire_offset != DbUnits(0) {
            let at = Xy::from_dir(self.dir, via.coord, self.center + wire_offset);
            let jog = sink.create_pin(native, at, Xy::new(wire, wire))?;
            let jog = Terminal::Node(jog, native);
            sink.create_arc(native, wire, from, jog.clone())?;
            from = jog;
        }
        sink.create_arc(native, wire.max(self.width), from, port.terminal())?;
        Ok(())
    }
    /// Layer on which to reach `port`: the track layer if it has it,
    /// otherwise its first layer with a via to the track layer.
    fn native_layer(&self, tech: &Tech, port: &RoutePort) -> LayoutResult<Layer> {
        let first = match port.layers.first() {
            Some(l) => *l,
            None => return Err(LayoutError::NoLayerPin(port.name.clone())),
        };
        if port.layers.contains(&self.layer) {
            return Ok(self.layer);
        }
        match port
            .layers
            .iter()
            .find(|l| tech.find_via(self.layer, **l).is_some())
        {
            Some(l) => Ok(*l),
            None => Err(LayoutError::MissingVia {
                track: self.layer.to_string(),
                port: first.to_string(),
            }),
        }
    }
    /// Find an existing via to `native` within the reuse distance of `coord`.
    /// Pins are never shared.
    fn reusable(&self, tech: &Tech, coord: DbUnits, native: Layer) -> Option<usize> {
        if native == self.layer {
            return None;
        }
        self.vias
            .iter()
            .position(|v| v.layer2 == native && (v.coord - coord).abs() < tech.via_reuse_distance)
    }
    /// Create a new via stack at `coord`, splice it into the track, and return its index
    fn insert<S: LayoutSink>(
        &mut self,
        sink: &mut S,
        tech: &Tech,
        native: Layer,
        coord: DbUnits,
        wire: DbUnits,
    ) -> LayoutResult<usize> {
        let at = Xy::from_dir(self.dir, coord, self.center);
        let size = Xy::from_dir(self.dir, wire, self.width);
        let via = ViaStack::create(sink, tech, self.layer, native, coord, at, size)?;

        // Walk from the last insertion point to the first index past all vias at-or-before `coord`
        let mut idx = self.cursor.min(self.vias.len());
        while idx > 0 && self.vias[idx - 1].coord > coord {
            idx -= 1;
        }
        while idx < self.vias.len() && self.vias[idx].coord <= coord {
            idx += 1;
        }
        // Our new neighbors are no longer directly connected
        if idx > 0 {
            if let Some(arc) = self.vias[idx - 1].right_arc.take() {
                sink.remove_arc(arc)?;
            }
        }
        self.vias.insert(idx, via);
        if idx > 0 {
            let (prev, this) = (self.vias[idx - 1].port1(), self.vias[idx].port1());
            let arc = sink.create_arc(self.layer, self.width, prev, this)?;
            self.vias[idx - 1].right_arc = Some(arc);
        }
        if idx + 1 < self.vias.len() {
            let (this, next) = (self.vias[idx].port1(), self.vias[idx + 1].port1());
            let arc = sink.create_arc(self.layer, self.width, this, next)?;
            self.vias[idx].right_arc = Some(arc);
        }
        self.cursor = idx;
        Ok(idx)
    }
}
