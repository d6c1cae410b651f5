pub mod summary;
pub mod todoist;
pub mod token;
