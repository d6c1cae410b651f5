pub mod api;
pub mod backend;
pub mod cache;
pub mod summary;
pub mod updates;

pub use api::{ApiClient, ApiError};
pub use backend::TaskBackend;
pub use cache::TaskCache;
pub use summary::{SummaryCoordinator, SummaryPhase};
pub use updates::TaskEditor;
