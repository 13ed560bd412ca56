mod extraction;
mod upload;

pub use extraction::*;
pub use upload::*;
