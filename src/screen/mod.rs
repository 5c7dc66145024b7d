mod input;
mod view;

pub use input::{map_key, Action};
pub use view::render;
