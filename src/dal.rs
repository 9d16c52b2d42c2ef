pub mod busstops;
#[cfg(test)]
pub mod memory;

pub use busstops::*;
