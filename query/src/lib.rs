pub mod assembler;
pub mod builder;
pub mod thresholds;

pub use assembler::{GraphAssembler, SearchError};
pub use builder::{BuilderConfigError, Network, NetworkBuilder};
pub use thresholds::{ThresholdError, ThresholdTable};
