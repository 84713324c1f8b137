//! Octocrab client wrapper scoped to a specific repository.
//!
//! A fresh client is built for every detection pass from the repository's
//! token. Nothing is cached between passes, so trackers for different
//! repositories never share client state.

use octocrab::Octocrab;

use crate::types::{RepoId, RepositoryRef};

/// A GitHub API client scoped to a specific repository.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
    repo: RepoId,
}

impl OctocrabClient {
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Creates a client authenticated with the repository's bearer token.
    pub fn from_repository(repo: &RepositoryRef) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder()
            .personal_token(repo.token.expose().to_string())
            .build()?;
        Ok(Self::new(client, repo.repo.clone()))
    }

    /// Like [`OctocrabClient::from_repository`], against a non-default API root
    /// such as a GitHub Enterprise installation.
    pub fn from_repository_with_base_uri(
        repo: &RepositoryRef,
        base_uri: &str,
    ) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder()
            .base_uri(base_uri)?
            .personal_token(repo.token.expose().to_string())
            .build()?;
        Ok(Self::new(client, repo.repo.clone()))
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repo.repo
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}
