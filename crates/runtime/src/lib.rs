pub mod frame;
pub mod render_loop;
pub mod tween;

pub use frame::*;
pub use render_loop::*;
pub use tween::*;
