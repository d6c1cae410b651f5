mod client;
mod preferences;
mod session;

pub use client::{ApiClient, ApiError};
pub use preferences::{FilterPreset, UserPreferences};
pub use session::Session;

#[cfg(test)]
pub(crate) use session::test_jwt;
