pub mod api;
pub mod classify;
pub mod delete;
pub mod report;
pub mod walker;
