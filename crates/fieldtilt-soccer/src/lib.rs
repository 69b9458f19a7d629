// Library root: soccer index calculators (FTPI, PBS, role scores), their
// configuration, and the batch pipelines that run them.

pub mod config;
pub mod error;
pub mod ftpi;
pub mod pbs;
pub mod pipeline;
pub mod role_config;
pub mod roles;

pub use error::IndexError;
pub use pipeline::{run_ftpi, run_pbs, run_roles, run_roles_adjusted, PipelineOutput, RunReport};
