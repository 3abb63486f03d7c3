//!
//! # Gates21 Standard-Cell Gate Layout Synthesis
//!
//! Places a gate's transistors and sub-gates in a single row, inserts well-ties,
//! and connects multi-port nets along horizontal routing tracks.
//!
//! The flow, as run by [gen::CellGenerator]:
//!
//! * [placer::Placer] orders instances to minimize summed net width,
//! * [welltie::WellTieInserter] adds substrate and n-well ties at the technology's pitch,
//! * [alloc::TrackAllocator] hands each net a track, and
//! * [route::TrackRouter] creates vias and wires through a [route::LayoutSink].
//!
//! All results are deterministic: identical inputs produce identical placements,
//! and identical sequences of sink calls.
//!

// Modules
pub mod alloc;
pub mod coords;
pub mod cost;
#[macro_use]
pub mod enumstr;
pub mod error;
pub mod gen;
pub mod model;
pub mod placer;
pub mod route;
pub mod ser;
pub mod tech;
pub mod validate;
pub mod welltie;

// Re-exports
pub use coords::{DbUnits, Dir, Int, Xy};
pub use error::{LayoutError, LayoutResult};
pub use gen::{CellGenerator, CellParams, GeneratedCell, PortLayers};
pub use model::{InstKey, InstKind, NetKey, PlaceModel, PortKey};
pub use placer::{Placement, Placer, PlacerConfig};
pub use tech::{Layer, Tech};

/// Unit Tests Module
#[cfg(test)]
mod tests;
