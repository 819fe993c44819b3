//! Result model for the compound branch query, plus its wire-format mirror.

use chrono::{DateTime, Utc};

/// Resumption tokens for the three pagination levels. `None` means the start
/// of that level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorTriple {
    pub orgs: Option<String>,
    pub repos: Option<String>,
    pub refs: Option<String>,
}

impl CursorTriple {
    pub fn start() -> Self {
        Self::default()
    }

    /// Resume organization pagination after the given cursor, with the inner
    /// levels reset to their start.
    pub fn skip_orgs_to(cursor: impl Into<String>) -> Self {
        Self {
            orgs: Some(cursor.into()),
            repos: None,
            refs: None,
        }
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub end_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next: false,
            end_cursor: None,
        }
    }

    /// Cursor addressing the page after this one, when there is one.
    pub fn continuation(&self) -> Option<String> {
        if self.has_next {
            self.end_cursor.clone()
        } else {
            None
        }
    }
}

/// Everything one compound fetch returns: a single-organization page, the
/// repository page of that organization, and a ref page per repository node.
#[derive(Debug, Clone)]
pub struct EnterprisePage {
    pub organizations: Page<OrganizationNode>,
}

#[derive(Debug, Clone)]
pub struct OrganizationNode {
    pub login: String,
    pub repositories: Page<RepositoryNode>,
}

#[derive(Debug, Clone)]
pub struct RepositoryNode {
    pub name: String,
    /// `None` for empty/uninitialized repositories, which contribute no
    /// branch candidates.
    pub default_branch: Option<String>,
    pub refs: Page<BranchNode>,
}

#[derive(Debug, Clone)]
pub struct BranchNode {
    pub name: String,
    pub author: String,
    pub committed_date: DateTime<Utc>,
    pub is_protected: bool,
}

pub(crate) mod wire {
    //! Serde mirror of the GraphQL response.

    use super::{BranchNode, EnterprisePage, OrganizationNode, Page, RepositoryNode};
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub(crate) struct Response {
        pub(crate) data: Option<Data>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct Data {
        pub(crate) enterprise: Option<Enterprise>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct Enterprise {
        pub(crate) organizations: OrgConnection,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct PageInfo {
        pub(crate) has_next_page: bool,
        pub(crate) end_cursor: Option<String>,
    }

    // The `nodes` arrays are nullable at both levels: the whole array is null
    // when an error wiped it out, and individual elements are null when one
    // node errored.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct OrgConnection {
        pub(crate) page_info: PageInfo,
        #[serde(default)]
        pub(crate) nodes: Option<Vec<Option<Org>>>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct Org {
        pub(crate) login: String,
        pub(crate) repositories: RepoConnection,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct RepoConnection {
        pub(crate) page_info: PageInfo,
        #[serde(default)]
        pub(crate) nodes: Option<Vec<Option<Repo>>>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Repo {
        pub(crate) name: String,
        pub(crate) default_branch_ref: Option<NamedRef>,
        pub(crate) refs: RefConnection,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct NamedRef {
        pub(crate) name: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct RefConnection {
        pub(crate) page_info: PageInfo,
        #[serde(default)]
        pub(crate) nodes: Option<Vec<Option<Ref>>>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Ref {
        pub(crate) name: String,
        pub(crate) target: Option<CommitTarget>,
        /// Presence means the branch has a protection rule; the rule body is
        /// irrelevant here.
        #[serde(default)]
        pub(crate) branch_protection_rule: Option<serde_json::Value>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct CommitTarget {
        pub(crate) author: Option<CommitAuthor>,
        pub(crate) committed_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct CommitAuthor {
        pub(crate) email: Option<String>,
        pub(crate) user: Option<UserRef>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct UserRef {
        pub(crate) login: String,
    }

    impl Enterprise {
        pub(crate) fn into_page(self) -> EnterprisePage {
            EnterprisePage {
                organizations: Page {
                    has_next: self.organizations.page_info.has_next_page,
                    end_cursor: self.organizations.page_info.end_cursor,
                    items: self
                        .organizations
                        .nodes
                        .unwrap_or_default()
                        .into_iter()
                        .flatten()
                        .map(OrganizationNode::from)
                        .collect(),
                },
            }
        }
    }

    impl From<Org> for OrganizationNode {
        fn from(org: Org) -> Self {
            Self {
                login: org.login,
                repositories: Page {
                    has_next: org.repositories.page_info.has_next_page,
                    end_cursor: org.repositories.page_info.end_cursor,
                    items: org
                        .repositories
                        .nodes
                        .unwrap_or_default()
                        .into_iter()
                        .flatten()
                        .map(RepositoryNode::from)
                        .collect(),
                },
            }
        }
    }

    impl From<Repo> for RepositoryNode {
        fn from(repo: Repo) -> Self {
            Self {
                name: repo.name,
                default_branch: repo.default_branch_ref.map(|r| r.name),
                refs: Page {
                    has_next: repo.refs.page_info.has_next_page,
                    end_cursor: repo.refs.page_info.end_cursor,
                    items: repo
                        .refs
                        .nodes
                        .unwrap_or_default()
                        .into_iter()
                        .flatten()
                        .filter_map(convert_ref)
                        .collect(),
                },
            }
        }
    }

    fn convert_ref(node: Ref) -> Option<BranchNode> {
        let is_protected = node.branch_protection_rule.is_some();
        let Some(target) = node.target else {
            tracing::debug!("ref \"{}\" has no commit target, skipping", node.name);
            return None;
        };
        let Some(committed_date) = target.committed_date else {
            tracing::debug!("ref \"{}\" has no commit date, skipping", node.name);
            return None;
        };

        // Account handle when the commit maps to one, raw commit email
        // otherwise.
        let author = match target.author {
            Some(author) => author
                .user
                .map(|user| user.login)
                .or(author.email)
                .unwrap_or_else(|| "unknown".to_string()),
            None => "unknown".to_string(),
        };

        Some(BranchNode {
            name: node.name,
            author,
            committed_date,
            is_protected,
        })
    }
}
