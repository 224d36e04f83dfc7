//! Service layer
//!
//! Services contain the runner's business logic: pulling images with
//! progress rendering, writing the job script, relaying container output
//! and driving a job through the container runtime.

pub mod execution;
pub mod pull;
pub mod relay;
pub mod script_file;

pub use execution::{JobExecutor, OutputSinks, WORKING_DIR};
pub use pull::{ProgressRenderer, pull_image};
pub use relay::relay_lines;
pub use script_file::ScriptFile;
