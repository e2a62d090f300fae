pub mod center;
pub mod geojson;
pub mod projected;

pub use center::*;
pub use geojson::*;
pub use projected::*;
