pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

pub use config::Config;
pub use core::api::{GithubClient, RetryPolicy};
pub use core::walker::HierarchicalWalker;
pub use utils::{ReaperError, Result};
