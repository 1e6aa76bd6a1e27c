//! Pipeline definitions and the sequential pipeline executor.

pub mod executor;
pub mod pipeline;

pub use executor::{PipelineExecutor, RunReport, StepReport};
pub use pipeline::{PipelineDef, StepDef, WireRef};
