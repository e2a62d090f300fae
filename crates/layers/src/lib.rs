pub mod error;
pub mod extrude;
pub mod ground;
pub mod markers;
pub mod region;
pub mod theme;

pub use error::*;
pub use ground::*;
pub use markers::*;
pub use region::*;
pub use theme::*;
