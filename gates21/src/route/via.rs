//!
//! # Via Stacks & Route Ports
//!

// Local imports
use super::sink::{ArcKey, LayoutSink, NodeKey, Terminal};
use crate::coords::{DbUnits, Xy};
use crate::error::LayoutResult;
use crate::tech::{Layer, Tech};

/// # Route Port
///
/// A destination for a router: an instance port at its final location,
/// and the layers on which it can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePort {
    /// Port name, typically `"{inst}.{port}"`
    pub name: String,
    pub at: Xy,
    /// Connectable layers, in preference order
    pub layers: Vec<Layer>,
}
impl RoutePort {
    pub fn new(name: impl Into<String>, at: impl Into<Xy>, layers: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            at: at.into(),
            layers,
        }
    }
    /// Our [Terminal]
    pub fn terminal(&self) -> Terminal {
        Terminal::Port(self.name.clone())
    }
}

///
/// # Via Stack
///
/// A via (or, when both layers match, a plain pin) placed on a routing track.
/// `layer1` is the track layer; `layer2` the layer of the port it serves.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaStack {
    pub node: NodeKey,
    /// Location along the track
    pub coord: DbUnits,
    /// Center location
    pub at: Xy,
    pub layer1: Layer,
    pub layer2: Layer,
    /// Track arc to our right-hand neighbor, if we have one
    pub right_arc: Option<ArcKey>,
}
impl ViaStack {
    /// Create a new [ViaStack] in `sink`, joining `layer1` and `layer2`
    pub(crate) fn create<S: LayoutSink>(
        sink: &mut S,
        tech: &Tech,
        layer1: Layer,
        layer2: Layer,
        coord: DbUnits,
        at: Xy,
        size: Xy,
    ) -> LayoutResult<Self> {
        let node = match layer1 == layer2 {
            true => sink.create_pin(layer1, at, size)?,
            false => sink.create_via(tech.via(layer1, layer2)?, at, size)?,
        };
        Ok(Self {
            node,
            coord,
            at,
            layer1,
            layer2,
            right_arc: None,
        })
    }
    /// Boolean indication of whether we are a single-layer pin
    pub fn is_pin(&self) -> bool {
        self.layer1 == self.layer2
    }
    /// Track-side terminal
    pub fn port1(&self) -> Terminal {
        Terminal::Node(self.node, self.layer1)
    }
    /// Port-side terminal
    pub fn port2(&self) -> Terminal {
        Terminal::Node(self.node, self.layer2)
    }
}
