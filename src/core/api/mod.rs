//! GitHub Enterprise API surface: the compound branch query, ref deletion,
//! and the trait seams the traversal and deletion layers run against.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GithubClient, RetryPolicy};
pub use error::{DeleteError, DeleteResult};
pub use types::{
    BranchNode, CursorTriple, EnterprisePage, OrganizationNode, Page, RepositoryNode,
};

use crate::utils::Result;
use async_trait::async_trait;

/// Outcome of one compound fetch that did not fail outright.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A page of traversal data.
    Advance(EnterprisePage),
    /// The endpoint rejected one organization because of its IP allow list
    /// but supplied enough pagination state to continue past it.
    OrgSkipped {
        organization: String,
        end_cursor: Option<String>,
    },
}

/// Source of compound traversal pages.
#[async_trait]
pub trait BranchPageSource {
    async fn fetch_page(&self, enterprise: &str, cursors: &CursorTriple) -> Result<FetchOutcome>;
}

/// Deletes branch refs one at a time.
#[async_trait]
pub trait RefDeleter {
    async fn delete_branch(
        &self,
        organization: &str,
        repository: &str,
        branch: &str,
    ) -> DeleteResult<()>;
}
