mod summary;
mod tasks;
mod token;

pub use summary::*;
pub use tasks::*;
pub use token::*;
