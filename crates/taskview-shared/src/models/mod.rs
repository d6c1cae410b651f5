mod project;
mod task;

pub use project::*;
pub use task::*;
