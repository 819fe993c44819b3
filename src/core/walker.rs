//! Depth-first traversal of enterprise -> organizations -> repositories ->
//! branches, driven by one compound query per iteration.
//!
//! Advancement is innermost-first: while any repository on the current page
//! has more refs, the next fetch keeps the organization and repository
//! cursors and moves only the ref cursor. When refs are exhausted the
//! repository cursor advances and the ref cursor resets; when repositories
//! are exhausted the organization cursor advances and both inner cursors
//! reset. Progress is recomputed from each page, never carried over.

use tracing::{debug, info, warn};

use crate::core::api::{BranchNode, BranchPageSource, CursorTriple, EnterprisePage, FetchOutcome};
use crate::utils::{ReaperError, Result};

/// One branch of one repository, as seen during traversal.
#[derive(Debug)]
pub struct DiscoveredBranch<'a> {
    pub organization: &'a str,
    pub repository: &'a str,
    pub default_branch: &'a str,
    pub branch: &'a BranchNode,
}

pub struct HierarchicalWalker<'a, C: BranchPageSource> {
    client: &'a C,
    enterprise: &'a str,
}

impl<'a, C: BranchPageSource> HierarchicalWalker<'a, C> {
    pub fn new(client: &'a C, enterprise: &'a str) -> Self {
        Self { client, enterprise }
    }

    /// Walks every reachable branch of the enterprise, calling `visit` once
    /// per branch. Organizations blocked by an IP allow list are skipped via
    /// the cursor the failed response still carries; everything else that the
    /// client could not recover from ends the walk with an error.
    pub async fn walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(DiscoveredBranch<'_>),
    {
        let mut cursors = CursorTriple::start();
        loop {
            match self.client.fetch_page(self.enterprise, &cursors).await? {
                FetchOutcome::OrgSkipped {
                    organization,
                    end_cursor,
                } => {
                    warn!(
                        "organization '{}' has an IP allow list enabled, unable to access it, skipping",
                        organization
                    );
                    match end_cursor {
                        Some(cursor) => cursors = CursorTriple::skip_orgs_to(cursor),
                        None => {
                            return Err(ReaperError::traversal(format!(
                                "cannot skip past blocked organization '{}': no continuation cursor",
                                organization
                            )))
                        }
                    }
                }
                FetchOutcome::Advance(page) => {
                    let progress = process_page(&page, &mut visit);
                    match next_cursors(&cursors, &progress) {
                        Some(next) => cursors = next,
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

/// Continuation cursors observed while processing one page. `refs_next`
/// follows the last repository on the page that was actually inspected,
/// mirroring how the compound query shares a single ref cursor.
struct PageProgress {
    orgs_next: Option<String>,
    repos_next: Option<String>,
    refs_next: Option<String>,
}

fn process_page<F>(page: &EnterprisePage, visit: &mut F) -> PageProgress
where
    F: FnMut(DiscoveredBranch<'_>),
{
    let mut progress = PageProgress {
        orgs_next: page.organizations.continuation(),
        repos_next: None,
        refs_next: None,
    };

    for org in &page.organizations.items {
        info!("checking repositories for organization '{}'", org.login);
        progress.repos_next = org.repositories.continuation();

        for repo in &org.repositories.items {
            // Empty repositories have no default branch and nothing worth
            // visiting; their ref page must not influence the ref cursor.
            let Some(default_branch) = repo.default_branch.as_deref() else {
                debug!(
                    "repository '{}/{}' has no default branch, skipping",
                    org.login, repo.name
                );
                continue;
            };

            info!("checking branches for repository '{}/{}'", org.login, repo.name);
            progress.refs_next = repo.refs.continuation();

            for branch in &repo.refs.items {
                debug!(
                    "checking branch '{}' in '{}/{}'",
                    branch.name, org.login, repo.name
                );
                visit(DiscoveredBranch {
                    organization: &org.login,
                    repository: &repo.name,
                    default_branch,
                    branch,
                });
            }
        }
    }

    progress
}

/// Picks the cursors for the next fetch, innermost level first. `None` means
/// the traversal is complete.
fn next_cursors(current: &CursorTriple, progress: &PageProgress) -> Option<CursorTriple> {
    if let Some(refs) = &progress.refs_next {
        return Some(CursorTriple {
            orgs: current.orgs.clone(),
            repos: current.repos.clone(),
            refs: Some(refs.clone()),
        });
    }
    if let Some(repos) = &progress.repos_next {
        return Some(CursorTriple {
            orgs: current.orgs.clone(),
            repos: Some(repos.clone()),
            refs: None,
        });
    }
    progress.orgs_next.as_ref().map(|orgs| CursorTriple {
        orgs: Some(orgs.clone()),
        repos: None,
        refs: None,
    })
}
