//!
//! # Placement Model
//!
//! Instances, their ports, and the nets joining them.
//! Pure data: the only behavior here is position and cost queries.
//!

// Crates.io
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SecondaryMap, SlotMap};

// Local imports
use crate::coords::{DbUnits, Xy};
use crate::enumstr::EnumStr;
use crate::error::{LayoutError, LayoutResult};

// Create key-types for each internal type stored in [SlotMap]s
new_key_type! {
    /// Keys for [Inst] entries
    pub struct InstKey;
    /// Keys for [Port] entries
    pub struct PortKey;
    /// Keys for [Net] entries
    pub struct NetKey;
}

crate::enumstr!(
    /// # Instance Kinds
    ///
    /// Which lane(s) of the row an instance occupies.
    InstKind {
        N: "N",
        P: "P",
        PN: "PN",
    }
);
impl InstKind {
    /// Parse from string `s`, failing on anything other than our string-values
    pub fn parse(s: &str) -> LayoutResult<Self> {
        Self::from_str(s).ok_or_else(|| LayoutError::UnknownKind(s.into()))
    }
    /// Boolean indication of whether we occupy the NMOS lane
    pub fn has_n(&self) -> bool {
        matches!(self, Self::N | Self::PN)
    }
    /// Boolean indication of whether we occupy the PMOS lane
    pub fn has_p(&self) -> bool {
        matches!(self, Self::P | Self::PN)
    }
}

/// # Row Lane
///
/// NMOS or PMOS half of a row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Lane {
    N,
    P,
}
impl Lane {
    /// The other lane
    pub fn other(&self) -> Self {
        match self {
            Self::N => Self::P,
            Self::P => Self::N,
        }
    }
    /// The single-lane [InstKind] occupying `self`
    pub fn kind(&self) -> InstKind {
        match self {
            Self::N => InstKind::N,
            Self::P => InstKind::P,
        }
    }
}

/// # Instance Role
///
/// Whether an [Inst] came from the caller, or was created by a later pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstRole {
    /// Caller-provided device or gate
    Device,
    /// Well-tie (or gap-patching tie) cell
    WellTie(Lane),
    /// Zero-width row-end marker, only present during well-tie insertion
    Terminator,
}

/// # Placeable Instance
#[derive(Debug, Clone)]
pub struct Inst {
    /// Instance name, the handle by which callers identify it
    pub name: String,
    pub kind: InstKind,
    pub width: DbUnits,
    pub role: InstRole,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Ports, in creation order
    pub ports: Vec<PortKey>,
}

/// # Instance Port
///
/// Connection point at fixed offset `ofst` from its instance's origin.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub inst: InstKey,
    pub ofst: Xy,
}

/// # Net
#[derive(Debug, Clone, Default)]
pub struct Net {
    pub name: String,
    pub ports: Vec<PortKey>,
}

/// # Instance Location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loc {
    pub x: DbUnits,
    /// Row index. Always zero, as placement is single-row.
    pub row: usize,
}

/// Per-instance placed x-coordinates
pub type Positions = SecondaryMap<InstKey, DbUnits>;

///
/// # Placement Model
///
/// Owns every [Inst], [Port], and [Net] for one cell.
/// Insertion order is retained in `inst_order` and `net_order`,
/// and all passes iterate in those orders.
///
#[derive(Debug, Clone, Default)]
pub struct PlaceModel {
    pub insts: SlotMap<InstKey, Inst>,
    pub ports: SlotMap<PortKey, Port>,
    pub nets: SlotMap<NetKey, Net>,
    pub inst_order: Vec<InstKey>,
    pub net_order: Vec<NetKey>,
}
impl PlaceModel {
    /// Create a new and empty [PlaceModel]
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a caller-provided instance
    pub fn add_inst(
        &mut self,
        kind: InstKind,
        width: impl Into<DbUnits>,
        name: impl Into<String>,
    ) -> LayoutResult<InstKey> {
        self.add_inst_with_role(kind, width.into(), name.into(), InstRole::Device)
    }
    /// Add an instance with an explicit [InstRole]
    pub(crate) fn add_inst_with_role(
        &mut self,
        kind: InstKind,
        width: DbUnits,
        name: String,
        role: InstRole,
    ) -> LayoutResult<InstKey> {
        // Only the row-end terminator may have zero width
        let ok = width > DbUnits(0) || (role == InstRole::Terminator && width == DbUnits(0));
        if !ok {
            return LayoutError::invalid(format!("Instance {} has width {}", name, width));
        }
        let key = self.insts.insert(Inst {
            name,
            kind,
            width,
            role,
            mirror_x: false,
            mirror_y: false,
            ports: Vec::new(),
        });
        self.inst_order.push(key);
        Ok(key)
    }
    /// Remove instance `key`. Only used to drop the well-tie terminator.
    pub(crate) fn remove_inst(&mut self, key: InstKey) -> LayoutResult<()> {
        let inst = self.insts.remove(key).ok_or_else(|| self.bad_key("instance"))?;
        for pkey in inst.ports {
            self.ports.remove(pkey);
        }
        self.inst_order.retain(|k| *k != key);
        Ok(())
    }
    /// Set the mirroring of instance `key`
    pub fn set_mirror(&mut self, key: InstKey, mirror_x: bool, mirror_y: bool) -> LayoutResult<()> {
        let inst = self.insts.get_mut(key).ok_or_else(|| LayoutError::msg("Invalid instance key"))?;
        inst.mirror_x = mirror_x;
        inst.mirror_y = mirror_y;
        Ok(())
    }
    /// Add a port named `name` to instance `inst`, at offset `ofst`.
    /// The x-offset must lie within the instance, in `0..=width`.
    pub fn add_port(
        &mut self,
        inst: InstKey,
        name: impl Into<String>,
        ofst: impl Into<Xy>,
    ) -> LayoutResult<PortKey> {
        let width = match self.insts.get(inst) {
            Some(i) => i.width,
            None => return Err(self.bad_key("instance")),
        };
        let name = name.into();
        let ofst = ofst.into();
        if ofst.x < DbUnits(0) || ofst.x > width {
            return LayoutError::invalid(format!(
                "Port {} x-offset {} outside its instance's width {}",
                name, ofst.x, width
            ));
        }
        let key = self.ports.insert(Port { name, inst, ofst });
        self.insts[inst].ports.push(key);
        Ok(key)
    }
    /// Add a new and initially empty net
    pub fn add_net(&mut self, name: impl Into<String>) -> NetKey {
        let key = self.nets.insert(Net {
            name: name.into(),
            ports: Vec::new(),
        });
        self.net_order.push(key);
        key
    }
    /// Add port `port` to net `net`
    pub fn add_net_port(&mut self, net: NetKey, port: PortKey) -> LayoutResult<()> {
        if !self.ports.contains_key(port) {
            return Err(self.bad_key("port"));
        }
        let net = self.nets.get_mut(net).ok_or_else(|| LayoutError::msg("Invalid net key"))?;
        net.ports.push(port);
        Ok(())
    }
    /// Get a reference to instance `key`
    pub fn inst(&self, key: InstKey) -> LayoutResult<&Inst> {
        self.insts.get(key).ok_or_else(|| self.bad_key("instance"))
    }
    /// Get a reference to port `key`
    pub fn port(&self, key: PortKey) -> LayoutResult<&Port> {
        self.ports.get(key).ok_or_else(|| self.bad_key("port"))
    }
    /// Find the port named `name` on instance `inst`, if it has one
    pub fn find_port(&self, inst: InstKey, name: &str) -> Option<PortKey> {
        let inst = self.insts.get(inst)?;
        inst.ports
            .iter()
            .copied()
            .find(|p| self.ports.get(*p).map(|p| p.name == name).unwrap_or(false))
    }
    /// Offset of port `key` along x from its instance's left edge, accounting for mirroring
    pub fn port_ofst_x(&self, key: PortKey) -> LayoutResult<DbUnits> {
        let port = self.port(key)?;
        let inst = self.inst(port.inst)?;
        Ok(match inst.mirror_x {
            true => inst.width - port.ofst.x,
            false => port.ofst.x,
        })
    }
    /// Absolute x-coordinate of port `key`, given placed `positions`
    pub fn port_x(&self, key: PortKey, positions: &Positions) -> LayoutResult<DbUnits> {
        let port = self.port(key)?;
        let x = positions
            .get(port.inst)
            .ok_or_else(|| LayoutError::msg(format!("Unplaced instance for port {}", port.name)))?;
        Ok(*x + self.port_ofst_x(key)?)
    }
    /// Absolute location of port `key`, given placed `positions`
    pub fn port_loc(&self, key: PortKey, positions: &Positions) -> LayoutResult<Xy> {
        let port = self.port(key)?;
        Ok(Xy {
            x: self.port_x(key, positions)?,
            y: port.ofst.y,
        })
    }
    /// Hierarchical name "inst.port" of port `key`
    pub fn port_path(&self, key: PortKey) -> LayoutResult<String> {
        let port = self.port(key)?;
        let inst = self.inst(port.inst)?;
        Ok(format!("{}.{}", inst.name, port.name))
    }
    /// Bounding-box cost of net `key` under `positions`.
    /// Zero for nets with fewer than two ports.
    pub fn net_cost(&self, key: NetKey, positions: &Positions) -> LayoutResult<DbUnits> {
        let net = self.nets.get(key).ok_or_else(|| self.bad_key("net"))?;
        let mut bounds: Option<(DbUnits, DbUnits)> = None;
        for pkey in net.ports.iter() {
            let x = self.port_x(*pkey, positions)?;
            bounds = Some(match bounds {
                None => (x, x),
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
            });
        }
        Ok(bounds.map(|(lo, hi)| hi - lo).unwrap_or_default())
    }
    /// Total cost of all nets under `positions`
    pub fn cost(&self, positions: &Positions) -> LayoutResult<DbUnits> {
        let mut total = DbUnits(0);
        for key in self.net_order.iter() {
            total += self.net_cost(*key, positions)?;
        }
        Ok(total)
    }
    /// Caller-provided instances, in insertion order
    pub fn devices(&self) -> Vec<InstKey> {
        self.inst_order
            .iter()
            .copied()
            .filter(|k| self.insts[*k].role == InstRole::Device)
            .collect()
    }
    fn bad_key(&self, what: &str) -> LayoutError {
        LayoutError::msg(format!("Invalid {} key", what))
    }
}
