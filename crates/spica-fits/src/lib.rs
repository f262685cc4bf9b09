pub mod errors;
pub mod model;
mod quality;

#[cfg(any(test, feature = "testing"))]
pub mod synthetic;

pub use errors::FitsError;
pub use model::{TargetPixelFile, TpfMetadata};
pub use quality::{QualityBitmask, QualityFlag};

#[cfg(test)]
mod tests;
