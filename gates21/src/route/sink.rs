//!
//! # Layout Sink
//!
//! The capability through which routers create geometry.
//! Routers never hold on to a layout database; they issue pin, via, and arc
//! requests through a [LayoutSink], and keep only the returned keys.
//!

// Std-lib imports
use std::collections::BTreeMap;

// Crates.io
use log::trace;
use slotmap::{new_key_type, SlotMap};

// Local imports
use crate::coords::{DbUnits, Xy};
use crate::error::{LayoutError, LayoutResult};
use crate::tech::{Layer, ViaRule};

// Create key-types for sink-owned geometry
new_key_type! {
    /// Keys for pins and vias
    pub struct NodeKey;
    /// Keys for arcs
    pub struct ArcKey;
}

/// # Arc Terminal
///
/// One end of an arc: either a layer of a sink-created node,
/// or an instance port, named as `"{inst}.{port}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    Node(NodeKey, Layer),
    Port(String),
}

///
/// # Layout Sink
///
/// Receives every geometry-creating request made while routing.
///
pub trait LayoutSink {
    /// Create a single-layer pin centered at `at`
    fn create_pin(&mut self, layer: Layer, at: Xy, size: Xy) -> LayoutResult<NodeKey>;
    /// Create a via per `rule`, centered at `at`
    fn create_via(&mut self, rule: &ViaRule, at: Xy, size: Xy) -> LayoutResult<NodeKey>;
    /// Create an arc of `width` on `layer`, between `a` and `b`
    fn create_arc(&mut self, layer: Layer, width: DbUnits, a: Terminal, b: Terminal) -> LayoutResult<ArcKey>;
    /// Remove a previously created arc
    fn remove_arc(&mut self, arc: ArcKey) -> LayoutResult<()>;
    /// Width of the widest arc currently attached to `term`, if any
    fn widest_arc(&self, term: &Terminal) -> Option<DbUnits>;
}

/// # Sink-Created Node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Pin {
        layer: Layer,
        at: Xy,
        size: Xy,
    },
    Via {
        name: String,
        bot: Layer,
        top: Layer,
        at: Xy,
        size: Xy,
    },
}
impl Node {
    /// Center location
    pub fn at(&self) -> Xy {
        match self {
            Node::Pin { at, .. } | Node::Via { at, .. } => *at,
        }
    }
    /// Boolean indication of whether we have geometry on `layer`
    pub fn has_layer(&self, layer: Layer) -> bool {
        match self {
            Node::Pin { layer: l, .. } => *l == layer,
            Node::Via { bot, top, .. } => *bot == layer || *top == layer,
        }
    }
}

/// # Sink-Created Arc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arc {
    pub layer: Layer,
    pub width: DbUnits,
    pub ends: [Terminal; 2],
}

/// # Sink Call Record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Pin(NodeKey),
    Via(NodeKey),
    Arc(ArcKey),
    RemoveArc(ArcKey),
}

///
/// # Recording Sink
///
/// In-memory [LayoutSink]. Keeps every live node and arc, plus an ordered log of calls,
/// and answers connectivity queries over the result.
///
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub nodes: SlotMap<NodeKey, Node>,
    pub arcs: SlotMap<ArcKey, Arc>,
    /// Every call, in order. Removed arcs remain in the log.
    pub log: Vec<Record>,
}
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of live (not removed) arcs
    pub fn live_arcs(&self) -> usize {
        self.arcs.len()
    }
    /// Live arcs on `layer`
    pub fn arcs_on(&self, layer: Layer) -> impl Iterator<Item = &Arc> + '_ {
        self.arcs.values().filter(move |a| a.layer == layer)
    }
    /// Nodes with no live arc attached
    pub fn dangling(&self) -> Vec<NodeKey> {
        self.nodes
            .keys()
            .filter(|k| {
                !self.arcs.values().any(|a| {
                    a.ends
                        .iter()
                        .any(|t| matches!(t, Terminal::Node(n, _) if n == k))
                })
            })
            .collect()
    }
    ///
    /// Number of connected components among all nodes and port terminals.
    /// Each node is one vertex regardless of layer; each distinct port name is one vertex.
    ///
    pub fn components(&self) -> usize {
        let mut ids: BTreeMap<Vertex, usize> = BTreeMap::new();
        for key in self.nodes.keys() {
            let n = ids.len();
            ids.insert(Vertex::Node(key), n);
        }
        for arc in self.arcs.values() {
            for term in arc.ends.iter() {
                let v = Vertex::from(term);
                let n = ids.len();
                ids.entry(v).or_insert(n);
            }
        }
        let mut uf = UnionFind::new(ids.len());
        for arc in self.arcs.values() {
            let a = ids.get(&Vertex::from(&arc.ends[0]));
            let b = ids.get(&Vertex::from(&arc.ends[1]));
            if let (Some(a), Some(b)) = (a, b) {
                uf.union(*a, *b);
            }
        }
        uf.count()
    }
    fn node(&self, key: NodeKey) -> LayoutResult<&Node> {
        self.nodes
            .get(key)
            .ok_or_else(|| LayoutError::msg("Arc to a node not in this sink"))
    }
}
impl LayoutSink for RecordingSink {
    fn create_pin(&mut self, layer: Layer, at: Xy, size: Xy) -> LayoutResult<NodeKey> {
        let key = self.nodes.insert(Node::Pin { layer, at, size });
        trace!("Pin {:?} on {} at {:?}", key, layer, at);
        self.log.push(Record::Pin(key));
        Ok(key)
    }
    fn create_via(&mut self, rule: &ViaRule, at: Xy, size: Xy) -> LayoutResult<NodeKey> {
        let key = self.nodes.insert(Node::Via {
            name: rule.name.clone(),
            bot: rule.bot,
            top: rule.top,
            at,
            size,
        });
        trace!("Via {:?} ({}) at {:?}", key, rule.name, at);
        self.log.push(Record::Via(key));
        Ok(key)
    }
    fn create_arc(&mut self, layer: Layer, width: DbUnits, a: Terminal, b: Terminal) -> LayoutResult<ArcKey> {
        for term in [&a, &b] {
            if let Terminal::Node(key, l) = term {
                let node = self.node(*key)?;
                if *l != layer || !node.has_layer(layer) {
                    return LayoutError::invalid(format!(
                        "Arc on {} cannot attach to node {:?} on {}",
                        layer, key, l
                    ));
                }
            }
        }
        let key = self.arcs.insert(Arc {
            layer,
            width,
            ends: [a, b],
        });
        self.log.push(Record::Arc(key));
        Ok(key)
    }
    fn remove_arc(&mut self, arc: ArcKey) -> LayoutResult<()> {
        self.arcs
            .remove(arc)
            .ok_or_else(|| LayoutError::msg("Removing an arc not in this sink"))?;
        self.log.push(Record::RemoveArc(arc));
        Ok(())
    }
    fn widest_arc(&self, term: &Terminal) -> Option<DbUnits> {
        self.arcs
            .values()
            .filter(|a| a.ends.iter().any(|t| t == term))
            .map(|a| a.width)
            .max()
    }
}

/// Connectivity vertex: a node on any layer, or a named port
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Vertex {
    Node(NodeKey),
    Port(String),
}
impl From<&Terminal> for Vertex {
    fn from(t: &Terminal) -> Self {
        match t {
            Terminal::Node(k, _) => Vertex::Node(*k),
            Terminal::Port(p) => Vertex::Port(p.clone()),
        }
    }
}

/// Disjoint-set forest, for [RecordingSink::components]
struct UnionFind {
    parent: Vec<usize>,
}
impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }
    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
    fn count(&mut self) -> usize {
        (0..self.parent.len()).filter(|i| self.find(*i) == *i).count()
    }
}
