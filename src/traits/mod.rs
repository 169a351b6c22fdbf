pub mod capture;
pub mod processor;
pub mod surface;

pub use capture::*;
pub use processor::*;
pub use surface::*;
