//! Async adapters over the blocking repository API.
//!
//! Every operation delegates to [`Repository`] on a blocking worker via
//! `tokio::task::spawn_blocking`, so repository I/O never stalls the async
//! executor. Dropping a returned future detaches the task rather than
//! interrupting it: an in-flight write still completes on the worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{RepositoryError, Result};
use crate::object::{Commit, Header, Object, ObjectId};
use crate::reference::Reference;
use crate::repo::Repository;

/// An async handle to a repository, cheaply cloneable.
#[derive(Clone)]
pub struct AsyncRepository {
    inner: Arc<Repository>,
}

impl AsyncRepository {
    /// Open the repository containing `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<AsyncRepository> {
        let path = path.as_ref().to_path_buf();
        let repo = run(move || Repository::open(&path)).await?;
        Ok(AsyncRepository {
            inner: Arc::new(repo),
        })
    }

    /// Initialize a repository at `path`.
    pub async fn init(path: impl AsRef<Path>, bare: bool) -> Result<AsyncRepository> {
        let path = path.as_ref().to_path_buf();
        let repo = run(move || Repository::init(&path, bare)).await?;
        Ok(AsyncRepository {
            inner: Arc::new(repo),
        })
    }

    /// The underlying blocking repository.
    pub fn blocking(&self) -> &Repository {
        &self.inner
    }

    // Path accessors read in-memory state only, so they stay synchronous.

    pub fn git_dir(&self) -> &Path {
        self.inner.git_dir()
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.inner.work_dir()
    }

    pub fn is_bare(&self) -> bool {
        self.inner.is_bare()
    }

    pub fn object_hash(&self) -> &'static str {
        self.inner.object_hash()
    }

    pub async fn head(&self) -> Result<String> {
        self.dispatch(move |repo| repo.head()).await
    }

    pub async fn config(&self) -> Result<Config> {
        self.dispatch(move |repo| repo.config()).await
    }

    pub async fn find_object(&self, id: &str) -> Result<Object> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_object(&id)).await
    }

    pub async fn find_header(&self, id: &str) -> Result<Header> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_header(&id)).await
    }

    pub async fn has_object(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.has_object(&id)).await
    }

    pub async fn find_commit(&self, id: &str) -> Result<Commit> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_commit(&id)).await
    }

    pub async fn find_blob(&self, id: &str) -> Result<Object> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_blob(&id)).await
    }

    pub async fn find_tree(&self, id: &str) -> Result<Object> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_tree(&id)).await
    }

    pub async fn find_tag(&self, id: &str) -> Result<Object> {
        let id = id.to_string();
        self.dispatch(move |repo| repo.find_tag(&id)).await
    }

    pub async fn references(&self) -> Result<Vec<Reference>> {
        self.dispatch(move |repo| repo.references()).await
    }

    pub async fn reference_names(&self) -> Result<Vec<String>> {
        self.dispatch(move |repo| repo.reference_names()).await
    }

    pub async fn find_reference(&self, name: &str) -> Result<Reference> {
        let name = name.to_string();
        self.dispatch(move |repo| repo.find_reference(&name)).await
    }

    pub async fn create_reference(
        &self,
        name: &str,
        target: &str,
        is_symbolic: bool,
        force: bool,
    ) -> Result<Reference> {
        let name = name.to_string();
        let target = target.to_string();
        self.dispatch(move |repo| repo.create_reference(&name, &target, is_symbolic, force))
            .await
    }

    pub async fn resolve_reference(&self, name: &str) -> Result<ObjectId> {
        let name = name.to_string();
        self.dispatch(move |repo| repo.resolve_reference(&name))
            .await
    }

    pub async fn rev_parse(&self, spec: &str) -> Result<ObjectId> {
        let spec = spec.to_string();
        self.dispatch(move |repo| repo.rev_parse(&spec)).await
    }

    pub async fn merge_base(&self, one: &str, two: &str) -> Result<ObjectId> {
        let one = one.to_string();
        let two = two.to_string();
        self.dispatch(move |repo| repo.merge_base(&one, &two)).await
    }

    pub async fn merge_bases(&self, one: &str, others: &[&str]) -> Result<Vec<ObjectId>> {
        let one = one.to_string();
        let others: Vec<String> = others.iter().map(|s| s.to_string()).collect();
        self.dispatch(move |repo| {
            let refs: Vec<&str> = others.iter().map(String::as_str).collect();
            repo.merge_bases(&one, &refs)
        })
        .await
    }

    pub async fn merge_base_octopus(&self, ids: &[&str]) -> Result<ObjectId> {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        self.dispatch(move |repo| {
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            repo.merge_base_octopus(&refs)
        })
        .await
    }

    pub async fn shallow_commits(&self) -> Result<Option<Vec<ObjectId>>> {
        self.dispatch(move |repo| repo.shallow_commits()).await
    }

    pub fn shallow_file(&self) -> PathBuf {
        self.inner.shallow_file()
    }

    pub async fn is_shallow(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.is_shallow())
            .await
            .unwrap_or(false)
    }

    async fn dispatch<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        run(move || f(&inner)).await
    }
}

async fn run<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| RepositoryError::Task(err.to_string()))?
}
