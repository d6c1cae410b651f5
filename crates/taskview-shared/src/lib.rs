pub mod api;
pub mod filter;
pub mod models;
pub mod util;

pub use filter::{DueFilter, FilterSettings, SortKey};
pub use models::*;
