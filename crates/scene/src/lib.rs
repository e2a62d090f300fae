pub mod components;
pub mod dispose;
pub mod entity;
pub mod graph;
pub mod picking;
pub mod resources;

pub use dispose::{DisposeError, DisposeReport, dispose_subtree};
pub use entity::NodeId;
pub use graph::*;
pub use picking::{Intersection, PickError, Ray, intersect_objects};
pub use resources::*;
