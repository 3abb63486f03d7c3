//!
//! # Technology Constants
//!
//! The handful of process numbers consumed by placement and routing:
//! well-tie pitch, track geometry, per-layer default wire widths,
//! and the layer-pair-to-via table.
//!

// Crates.io
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

// Local imports
use crate::coords::DbUnits;
use crate::enumstr::EnumStr;
use crate::error::{LayoutError, LayoutResult};
use crate::ser::SerdeFile;

/// Default cap on complete permutations evaluated per placement search
pub const DEFAULT_MAX_PERMS: usize = 40_000;

crate::enumstr!(
    /// # Technology Layers
    ///
    /// Layers a port may natively sit on, or a track may run on.
    Layer {
        Poly: "poly",
        NDiff: "ndiff",
        PDiff: "pdiff",
        Metal1: "m1",
        Metal2: "m2",
        Metal3: "m3",
        Metal4: "m4",
        Metal5: "m5",
        Metal6: "m6",
    }
);

/// # Per-Layer Wiring Rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerRule {
    pub layer: Layer,
    /// Wire width used when nothing wider is already attached
    pub default_width: DbUnits,
}
impl LayerRule {
    pub fn new(layer: Layer, default_width: impl Into<DbUnits>) -> Self {
        Self {
            layer,
            default_width: default_width.into(),
        }
    }
}

/// # Via Rule
///
/// A contact joining layers `bot` and `top`.
/// Lookups are symmetric in the two layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViaRule {
    pub name: String,
    pub bot: Layer,
    pub top: Layer,
}
impl ViaRule {
    pub fn new(name: impl Into<String>, bot: Layer, top: Layer) -> Self {
        Self {
            name: name.into(),
            bot,
            top,
        }
    }
    /// Boolean indication of whether we join layers `a` and `b`, in either order
    pub fn joins(&self, a: Layer, b: Layer) -> bool {
        (self.bot == a && self.top == b) || (self.bot == b && self.top == a)
    }
}

/// # Technology
///
/// Constructed either from a configuration file (see [SerdeFile]),
/// or in code via [TechBuilder].
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct Tech {
    /// Technology Name
    pub name: String,
    /// Maximum well-tie to well-tie spacing, per polarity
    pub well_tie_pitch: DbUnits,
    /// Width of a minimum-size well-tie cell
    pub well_tie_width: DbUnits,
    /// Placement search cutoff, in complete permutations
    #[builder(default = "DEFAULT_MAX_PERMS")]
    #[serde(default = "default_max_perms")]
    pub max_placer_perms: usize,
    /// Routing track pitch
    pub track_pitch: DbUnits,
    /// Routing track width
    pub track_width: DbUnits,
    /// Existing vias closer than this (along the track) are re-used rather than duplicated
    #[builder(default = "DbUnits(1)")]
    #[serde(default = "default_reuse_distance")]
    pub via_reuse_distance: DbUnits,
    /// Per-layer wiring rules
    #[builder(default)]
    #[serde(default)]
    pub layers: Vec<LayerRule>,
    /// Via table
    #[builder(default)]
    #[serde(default)]
    pub vias: Vec<ViaRule>,
}
fn default_max_perms() -> usize {
    DEFAULT_MAX_PERMS
}
fn default_reuse_distance() -> DbUnits {
    DbUnits(1)
}
impl SerdeFile for Tech {}
impl Tech {
    /// Create a new [TechBuilder]
    pub fn builder() -> TechBuilder {
        TechBuilder::default()
    }
    /// Find the via joining layers `a` and `b`, if there is one
    pub fn find_via(&self, a: Layer, b: Layer) -> Option<&ViaRule> {
        self.vias.iter().find(|v| v.joins(a, b))
    }
    /// Get the via joining layers `a` and `b`. A missing entry is an error.
    pub fn via(&self, a: Layer, b: Layer) -> LayoutResult<&ViaRule> {
        self.find_via(a, b).ok_or_else(|| LayoutError::MissingVia {
            track: a.to_str().into(),
            port: b.to_str().into(),
        })
    }
    /// Get the default wire width for `layer`
    pub fn default_width(&self, layer: Layer) -> LayoutResult<DbUnits> {
        match self.layers.iter().find(|l| l.layer == layer) {
            Some(rule) => Ok(rule.default_width),
            None => LayoutError::invalid(format!("No wiring rule for layer {}", layer)),
        }
    }
    /// Check the internal consistency of our constants
    pub fn validate(&self) -> LayoutResult<()> {
        if self.well_tie_pitch <= DbUnits(0) {
            return LayoutError::invalid("Non-positive well-tie pitch");
        }
        if self.well_tie_width <= DbUnits(0) {
            return LayoutError::invalid("Non-positive well-tie width");
        }
        if self.well_tie_width > self.well_tie_pitch {
            return LayoutError::invalid("Well-tie wider than its own pitch");
        }
        if self.track_pitch <= DbUnits(0) || self.track_width <= DbUnits(0) {
            return LayoutError::invalid("Non-positive track pitch or width");
        }
        if self.track_width > self.track_pitch {
            return LayoutError::invalid("Track width exceeds track pitch");
        }
        if self.max_placer_perms == 0 {
            return LayoutError::invalid("Zero placer permutations");
        }
        for rule in self.layers.iter() {
            if rule.default_width <= DbUnits(0) {
                return LayoutError::invalid(format!("Non-positive width for {}", rule.layer));
            }
        }
        for via in self.vias.iter() {
            if via.bot == via.top {
                return LayoutError::invalid(format!("Via {} joins {} to itself", via.name, via.bot));
            }
        }
        Ok(())
    }
    /// Parse a layer from its string name
    pub fn layer(name: &str) -> LayoutResult<Layer> {
        Layer::from_str(name).ok_or_else(|| LayoutError::Validation(format!("Unknown layer {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::SerializationFormat;
    use crate::tests::samples::SampleTechs;

    #[test]
    fn test_via_lookup() -> LayoutResult<()> {
        let tech = SampleTechs::mocmos()?;
        assert_eq!(tech.via(Layer::Metal1, Layer::Metal2)?.name, "m1m2");
        assert_eq!(tech.via(Layer::Metal2, Layer::Metal1)?.name, "m1m2");
        assert!(tech.find_via(Layer::Metal2, Layer::Poly).is_none());
        match tech.via(Layer::Metal2, Layer::Poly) {
            Err(LayoutError::MissingVia { track, port }) => {
                assert_eq!(track, "m2");
                assert_eq!(port, "poly");
            }
            _ => panic!("Expected a missing-via error"),
        }
        Ok(())
    }
    #[test]
    fn test_builder_defaults() -> LayoutResult<()> {
        let tech = Tech::builder()
            .name("tiny")
            .well_tie_pitch(600)
            .well_tie_width(30)
            .track_pitch(70)
            .track_width(40)
            .build()
            .map_err(|e| LayoutError::msg(e.to_string()))?;
        assert_eq!(tech.max_placer_perms, DEFAULT_MAX_PERMS);
        assert_eq!(tech.via_reuse_distance, DbUnits(1));
        assert!(tech.vias.is_empty());
        tech.validate()
    }
    #[test]
    fn test_validate_rejects() -> LayoutResult<()> {
        let mut tech = SampleTechs::mocmos()?;
        tech.well_tie_width = DbUnits(10_000);
        assert!(tech.validate().is_err());
        let mut tech = SampleTechs::mocmos()?;
        tech.vias.push(ViaRule::new("bad", Layer::Metal3, Layer::Metal3));
        assert!(tech.validate().is_err());
        Ok(())
    }
    #[test]
    fn test_tech_yaml() -> LayoutResult<()> {
        let tech: Tech = SerializationFormat::Yaml.from_str(
            r#"
            name: yamltech
            well_tie_pitch: 600
            well_tie_width: 30
            track_pitch: 70
            track_width: 40
            layers:
              - layer: Metal2
                default_width: 40
            vias:
              - name: m1m2
                bot: Metal1
                top: Metal2
            "#,
        )?;
        assert_eq!(tech.name, "yamltech");
        assert_eq!(tech.max_placer_perms, DEFAULT_MAX_PERMS);
        assert_eq!(tech.default_width(Layer::Metal2)?, DbUnits(40));
        assert!(tech.default_width(Layer::Metal3).is_err());
        assert_eq!(tech.via(Layer::Metal2, Layer::Metal1)?.name, "m1m2");

        // And back again
        let s = SerializationFormat::Json.to_string(&tech)?;
        let back: Tech = SerializationFormat::Json.from_str(&s)?;
        assert_eq!(back, tech);
        Ok(())
    }
    #[test]
    fn test_layer_names() -> LayoutResult<()> {
        assert_eq!(Tech::layer("m2")?, Layer::Metal2);
        assert_eq!(Layer::NDiff.to_string(), "ndiff");
        assert!(Tech::layer("m9").is_err());
        Ok(())
    }
}
