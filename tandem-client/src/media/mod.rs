mod canvas;
mod devices;
mod manager;
mod track;

pub use canvas::*;
pub use devices::*;
pub use manager::*;
pub use track::*;
