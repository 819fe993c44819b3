pub mod error;

pub use error::{ReaperError, Result};
