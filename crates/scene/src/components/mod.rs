pub mod sprite;
pub mod tag;
pub mod transform;

pub use sprite::*;
pub use tag::*;
pub use transform::*;
