//!
//! # Cell Generator
//!
//! Runs the full single-cell flow over a [PlaceModel]:
//! placement, well-tie insertion, re-abutment and validation,
//! power-rail routing, and one allocated track per multi-port net.
//!

// Std-lib imports
use std::collections::BTreeMap;

// Crates.io
use derive_builder::Builder;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Local imports
use crate::alloc::{Blockage, Region, TrackAllocator};
use crate::coords::DbUnits;
use crate::cost::abut;
use crate::error::{LayoutError, LayoutResult};
use crate::model::{InstKey, InstKind, PlaceModel, PortKey, Positions};
use crate::placer::{Placement, Placer, PlacerConfig};
use crate::route::{LayoutSink, RoutePort, TrackRouter};
use crate::ser::SerdeFile;
use crate::tech::{Layer, Tech};
use crate::validate::{check_abutment, check_tie_spacing};
use crate::welltie::{TieResult, TiePort, WellTieInserter};

/// # Cell Parameters
///
/// Per-cell-family geometry: well heights, rail placement, and routing-track layout.
/// All y-values are relative to the boundary between the wells, with PMOS above.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct CellParams {
    pub nmos_well_height: DbUnits,
    pub pmos_well_height: DbUnits,
    pub vdd_y: DbUnits,
    pub vdd_width: DbUnits,
    pub gnd_y: DbUnits,
    pub gnd_width: DbUnits,
    /// Center of the innermost PMOS-region track candidate
    pub pmos_track_offset: DbUnits,
    /// Center of the innermost NMOS-region track candidate
    pub nmos_track_offset: DbUnits,
    /// Minimum metal spacing between tracks and blockages
    #[builder(default)]
    #[serde(default)]
    pub metal_space: DbUnits,
    /// Power port and rail name
    #[builder(default = "String::from(\"vdd\")")]
    #[serde(default = "default_vdd")]
    pub vdd_name: String,
    /// Ground port and rail name
    #[builder(default = "String::from(\"gnd\")")]
    #[serde(default = "default_gnd")]
    pub gnd_name: String,
    /// Run the permutation search after the three-region heuristic
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub exhaustive: bool,
    /// Layer of the horizontal routing tracks and rails
    #[builder(default = "Layer::Metal2")]
    #[serde(default = "default_track_layer")]
    pub track_layer: Layer,
    /// Bands kept free of routing tracks
    #[builder(default)]
    #[serde(default)]
    pub reserved: Vec<Blockage>,
}
fn default_vdd() -> String {
    String::from("vdd")
}
fn default_gnd() -> String {
    String::from("gnd")
}
fn default_true() -> bool {
    true
}
fn default_track_layer() -> Layer {
    Layer::Metal2
}
impl SerdeFile for CellParams {}
impl CellParams {
    /// Create a new [CellParamsBuilder]
    pub fn builder() -> CellParamsBuilder {
        CellParamsBuilder::default()
    }
    /// Check the internal consistency of our parameters
    pub fn validate(&self) -> LayoutResult<()> {
        if self.nmos_well_height <= DbUnits(0) || self.pmos_well_height <= DbUnits(0) {
            return LayoutError::invalid("Non-positive well height");
        }
        if self.vdd_width <= DbUnits(0) || self.gnd_width <= DbUnits(0) {
            return LayoutError::invalid("Non-positive rail width");
        }
        if self.vdd_y <= DbUnits(0) || self.vdd_y >= self.pmos_well_height {
            return LayoutError::invalid("Vdd rail outside the PMOS well");
        }
        if self.gnd_y >= DbUnits(0) || self.gnd_y <= -self.nmos_well_height {
            return LayoutError::invalid("Gnd rail outside the NMOS well");
        }
        if self.vdd_name == self.gnd_name {
            return LayoutError::invalid("Vdd and gnd share a name");
        }
        Ok(())
    }
}

/// # Port Layers
///
/// Connectable layers for each instance port, by `"{inst}.{port}"` path,
/// falling back to a default list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortLayers {
    pub default: Vec<Layer>,
    #[serde(default)]
    pub by_path: BTreeMap<String, Vec<Layer>>,
}
impl PortLayers {
    /// Every port on `default`
    pub fn new(default: Vec<Layer>) -> Self {
        Self {
            default,
            by_path: BTreeMap::new(),
        }
    }
    /// Override the layers of the port at `path`
    pub fn set(&mut self, path: impl Into<String>, layers: Vec<Layer>) {
        self.by_path.insert(path.into(), layers);
    }
    /// Layers for the port at `path`
    pub fn get(&self, path: &str) -> &[Layer] {
        self.by_path.get(path).unwrap_or(&self.default)
    }
}

/// # Routed Track Summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetTrack {
    /// Net or rail name
    pub net: String,
    /// Allocated track index. `None` for the power rails.
    pub index: Option<isize>,
    pub y: DbUnits,
    /// Number of ports connected
    pub ports: usize,
}

/// # Generated Cell Summary
#[derive(Debug, Clone)]
pub struct GeneratedCell {
    /// Final placement, well-ties included
    pub placement: Placement,
    /// Well-tie insertion result
    pub ties: TieResult,
    /// Rails first, then nets in routing order
    pub tracks: Vec<NetTrack>,
}

///
/// # Cell Generator
///
#[derive(Debug, Clone)]
pub struct CellGenerator<'t> {
    tech: &'t Tech,
    params: CellParams,
}
impl<'t> CellGenerator<'t> {
    pub fn new(tech: &'t Tech, params: CellParams) -> Self {
        Self { tech, params }
    }
    ///
    /// Generate a cell from `model`, issuing all routing geometry into `sink`.
    ///
    /// Well-ties are added to `model`.
    ///
    pub fn generate<S: LayoutSink>(
        &self,
        model: &mut PlaceModel,
        ports: &PortLayers,
        sink: &mut S,
    ) -> LayoutResult<GeneratedCell> {
        self.tech.validate()?;
        self.params.validate()?;

        // Placement
        let config = PlacerConfig {
            exhaustive: self.params.exhaustive,
            ..PlacerConfig::from_tech(self.tech)
        };
        let placed = Placer::place(model, config)?;

        // Well-ties, and re-abutment
        let mut inserter = WellTieInserter::new(self.tech).with_ports(
            TiePort::new(self.params.gnd_name.clone(), self.params.gnd_y),
            TiePort::new(self.params.vdd_name.clone(), self.params.vdd_y),
        );
        let ties = inserter.insert(model, &placed.order)?;
        let (positions, _) = abut(model, &ties.order, DbUnits(0))?;
        check_abutment(model, &ties.order, &positions)?;
        let too_wide = model
            .devices()
            .iter()
            .any(|k| model.insts[*k].width > self.tech.well_tie_pitch);
        match too_wide {
            true => warn!("Skipping well-tie spacing check: instances wider than the pitch"),
            false => check_tie_spacing(model, &ties.order, &positions, self.tech.well_tie_pitch)?,
        }
        let placement = Placement {
            order: ties.order.clone(),
            right_full_x: right_full_x(model, &ties.order, &positions),
            cost: model.cost(&positions)?,
            positions,
        };
        info!(
            "Placed {} instances with {} well-ties, cost {}",
            placement.order.len(),
            ties.inserted.len(),
            placement.cost
        );

        // Rails
        let mut tracks = Vec::new();
        for (name, y, width) in [
            (&self.params.vdd_name, self.params.vdd_y, self.params.vdd_width),
            (&self.params.gnd_name, self.params.gnd_y, self.params.gnd_width),
        ] {
            let keys: Vec<PortKey> = placement
                .order
                .iter()
                .filter_map(|k| model.find_port(*k, name))
                .collect();
            let route_ports = self.route_ports(model, ports, &placement.positions, &keys)?;
            let mut router = TrackRouter::horiz(self.params.track_layer, width, y);
            router.connect_all(sink, self.tech, &route_ports)?;
            tracks.push(NetTrack {
                net: name.clone(),
                index: None,
                y,
                ports: route_ports.len(),
            });
        }

        // Signal nets
        let mut alloc = TrackAllocator::new(&self.params, self.tech)?;
        for nkey in model.net_order.iter() {
            let net = &model.nets[*nkey];
            if net.ports.len() < 2 {
                continue;
            }
            if net.name == self.params.vdd_name || net.name == self.params.gnd_name {
                debug!("Net {} is routed as a rail", net.name);
                continue;
            }
            let mut route_ports = self.route_ports(model, ports, &placement.positions, &net.ports)?;
            route_ports.sort_by_key(|p| p.at.x);
            let (lo, hi) = match (route_ports.first(), route_ports.last()) {
                (Some(first), Some(last)) => (first.at.x, last.at.x),
                _ => continue,
            };
            let index = alloc.allocate(lo, hi, net_region(model, &net.ports)?)?;
            let y = alloc.track_y(index)?;
            debug!("Net {} on track {} (y = {})", net.name, index, y);
            let mut router = TrackRouter::horiz(self.params.track_layer, self.tech.track_width, y);
            router.connect_all(sink, self.tech, &route_ports)?;
            tracks.push(NetTrack {
                net: net.name.clone(),
                index: Some(index),
                y,
                ports: route_ports.len(),
            });
        }
        Ok(GeneratedCell {
            placement,
            ties,
            tracks,
        })
    }
    /// Convert `keys` to [RoutePort]s at their placed locations
    fn route_ports(
        &self,
        model: &PlaceModel,
        ports: &PortLayers,
        positions: &Positions,
        keys: &[PortKey],
    ) -> LayoutResult<Vec<RoutePort>> {
        let mut rv = Vec::with_capacity(keys.len());
        for key in keys.iter() {
            let path = model.port_path(*key)?;
            let layers = ports.get(&path).to_vec();
            let at = model.port_loc(*key, positions)?;
            rv.push(RoutePort::new(path, at, layers));
        }
        Ok(rv)
    }
}

/// Routing region for a net: NMOS if it touches only NMOS-only instances,
/// PMOS if only PMOS-only, and either otherwise.
fn net_region(model: &PlaceModel, ports: &[PortKey]) -> LayoutResult<Option<Region>> {
    let mut kinds = Vec::with_capacity(ports.len());
    for pkey in ports.iter() {
        let port = model.port(*pkey)?;
        kinds.push(model.inst(port.inst)?.kind);
    }
    Ok(if kinds.iter().all(|k| *k == InstKind::N) {
        Some(Region::Nmos)
    } else if kinds.iter().all(|k| *k == InstKind::P) {
        Some(Region::Pmos)
    } else {
        None
    })
}

/// Right edge of the last full-height instance in `order`, or zero
fn right_full_x(model: &PlaceModel, order: &[InstKey], positions: &Positions) -> DbUnits {
    order
        .iter()
        .filter_map(|k| {
            let inst = model.insts.get(*k)?;
            match inst.kind {
                InstKind::PN => positions.get(*k).map(|x| *x + inst.width),
                _ => None,
            }
        })
        .max()
        .unwrap_or_default()
}
