pub mod camera;
pub mod controls;
pub mod draw_list;
pub mod error;
pub mod overlay;
pub mod renderer;

pub use camera::*;
pub use controls::*;
pub use draw_list::*;
pub use error::*;
pub use overlay::*;
pub use renderer::*;
