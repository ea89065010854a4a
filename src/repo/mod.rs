//! Repository lifecycle: initialization, discovery, and the facade over
//! the object, reference, and config stores.

mod init;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, ObjectError, RepositoryError, Result};
use crate::merge_base;
use crate::object::{Commit, HashAlgorithm, Header, Kind, Object, ObjectId, ObjectStore};
use crate::reference::{Reference, ReferenceStore};
use crate::revision;

/// A local git repository, bare or with a work tree.
///
/// All state lives on disk; the struct itself holds only paths and the
/// chosen hash algorithm, so it is cheap to construct and safe to share
/// behind an `Arc`.
#[derive(Debug)]
pub struct Repository {
    git_dir: PathBuf,
    work_dir: Option<PathBuf>,
    objects: ObjectStore,
    refs: ReferenceStore,
}

impl Repository {
    /// Initialize a repository at `path`, creating directories as needed.
    ///
    /// Idempotent: initializing over an existing repository of the same
    /// shape reopens it; asking for a different shape (bare vs non-bare)
    /// fails with a layout mismatch rather than touching anything.
    pub fn init(path: &Path, bare: bool) -> Result<Repository> {
        Repository::init_with_algorithm(path, bare, HashAlgorithm::Sha1)
    }

    /// Initialize with an explicit object hash algorithm.
    pub fn init_with_algorithm(
        path: &Path,
        bare: bool,
        algorithm: HashAlgorithm,
    ) -> Result<Repository> {
        let git_dir = if bare { path.to_path_buf() } else { path.join(".git") };

        if is_git_dir(&git_dir) {
            let existing = Repository::from_git_dir(&git_dir, None)?;
            if existing.is_bare() != bare {
                return Err(RepositoryError::LayoutMismatch(path.to_path_buf()).into());
            }
            debug!(path = %path.display(), "reopened existing repository");
            return Ok(existing);
        }

        if !bare {
            fs::create_dir_all(path).map_err(RepositoryError::Io)?;
        }
        init::create_layout(&git_dir, bare, algorithm).map_err(RepositoryError::Io)?;

        info!(path = %path.display(), bare, %algorithm, "initialized repository");
        Repository::from_git_dir(&git_dir, if bare { None } else { Some(path.to_path_buf()) })
    }

    /// Open the repository containing `path`.
    ///
    /// Walks `path` and its ancestors looking for a `.git` directory, a
    /// `.git` file with a `gitdir:` indirection, or a bare repository
    /// layout at the directory itself.
    pub fn open(path: &Path) -> Result<Repository> {
        for dir in path.ancestors() {
            let dot_git = dir.join(".git");

            if is_git_dir(&dot_git) {
                return Repository::from_git_dir(&dot_git, Some(dir.to_path_buf()));
            }

            if dot_git.is_file() {
                if let Some(git_dir) = read_gitdir_file(&dot_git)? {
                    let git_dir = if git_dir.is_absolute() {
                        git_dir
                    } else {
                        dir.join(git_dir)
                    };
                    if is_git_dir(&git_dir) {
                        return Repository::from_git_dir(&git_dir, Some(dir.to_path_buf()));
                    }
                }
            }

            if is_git_dir(dir) {
                return Repository::from_git_dir(dir, None);
            }
        }

        Err(RepositoryError::NotARepository(path.to_path_buf()).into())
    }

    fn from_git_dir(git_dir: &Path, work_dir: Option<PathBuf>) -> Result<Repository> {
        let config = load_config(git_dir)?;

        let algorithm = match config.string("extensions.objectformat").as_deref() {
            Some("sha256") => HashAlgorithm::Sha256,
            _ => HashAlgorithm::Sha1,
        };

        let bare = config
            .boolean("core.bare")
            .map_err(Error::Config)?
            .unwrap_or(false);

        // Opening a git dir directly still exposes the work tree of a
        // non-bare repository.
        let work_dir = match (work_dir, bare) {
            (_, true) => None,
            (Some(dir), false) => Some(dir),
            (None, false) => git_dir.parent().map(Path::to_path_buf),
        };

        Ok(Repository {
            git_dir: git_dir.to_path_buf(),
            work_dir,
            objects: ObjectStore::new(git_dir, algorithm),
            refs: ReferenceStore::new(git_dir),
        })
    }

    /// The repository's git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The work tree, or `None` for a bare repository.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// True when the repository has no work tree.
    pub fn is_bare(&self) -> bool {
        self.work_dir.is_none()
    }

    /// The name of the object hash algorithm in use.
    pub fn object_hash(&self) -> &'static str {
        self.objects.algorithm().name()
    }

    /// The object database.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// The reference store.
    pub fn refs(&self) -> &ReferenceStore {
        &self.refs
    }

    /// A fresh snapshot of the repository's configuration.
    pub fn config(&self) -> Result<Config> {
        load_config(&self.git_dir).map_err(Error::from)
    }

    /// What HEAD currently designates: a branch name when HEAD is
    /// symbolic and born, or a hex commit ID when detached.
    ///
    /// An unborn branch (symbolic HEAD whose target does not exist yet)
    /// reports `HeadNotSet`.
    pub fn head(&self) -> Result<String> {
        let head = self
            .refs
            .find("HEAD")
            .map_err(|_| RepositoryError::HeadNotSet)?;

        match head.target() {
            crate::reference::RefTarget::Symbolic(name) => {
                if self.refs.exists(name) {
                    Ok(name.clone())
                } else {
                    Err(RepositoryError::HeadNotSet.into())
                }
            }
            crate::reference::RefTarget::Object(id) => Ok(id.to_string()),
        }
    }

    /// True when a `shallow` file marks this history as truncated.
    pub fn is_shallow(&self) -> bool {
        self.shallow_file().is_file()
    }

    /// Path of the shallow-boundary file, whether or not it exists.
    pub fn shallow_file(&self) -> PathBuf {
        self.git_dir.join("shallow")
    }

    /// The shallow boundary commits, or `None` when history is complete.
    pub fn shallow_commits(&self) -> Result<Option<Vec<ObjectId>>> {
        let content = match fs::read_to_string(self.shallow_file()) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RepositoryError::Io(err).into()),
        };

        let mut ids = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let id = ObjectId::from_hex(line.trim()).map_err(ObjectError::InvalidId)?;
            ids.push(id);
        }

        if ids.is_empty() {
            return Ok(None);
        }
        ids.sort();
        Ok(Some(ids))
    }

    /// Look up an object by hex ID.
    pub fn find_object(&self, id: &str) -> Result<Object> {
        let id = ObjectId::from_hex(id).map_err(ObjectError::InvalidId)?;
        Ok(self.objects.read(&id)?)
    }

    /// Look up an object's kind and size by hex ID, without its payload.
    pub fn find_header(&self, id: &str) -> Result<Header> {
        let id = ObjectId::from_hex(id).map_err(ObjectError::InvalidId)?;
        Ok(self.objects.header(&id)?)
    }

    /// True if an object with this hex ID exists. The ID must still be
    /// well formed.
    pub fn has_object(&self, id: &str) -> Result<bool> {
        let id = ObjectId::from_hex(id).map_err(ObjectError::InvalidId)?;
        Ok(self.objects.has(&id))
    }

    /// Look up a blob by hex ID; any other kind of object fails.
    pub fn find_blob(&self, id: &str) -> Result<Object> {
        self.find_typed(id, Kind::Blob)
    }

    /// Look up a tree by hex ID; any other kind of object fails.
    pub fn find_tree(&self, id: &str) -> Result<Object> {
        self.find_typed(id, Kind::Tree)
    }

    /// Look up an annotated tag by hex ID; any other kind of object fails.
    pub fn find_tag(&self, id: &str) -> Result<Object> {
        self.find_typed(id, Kind::Tag)
    }

    /// Look up and parse a commit by hex ID.
    pub fn find_commit(&self, id: &str) -> Result<Commit> {
        let object = self.find_typed(id, Kind::Commit)?;
        let id = object.id().clone();
        Ok(Commit::parse(id, object.data())?)
    }

    fn find_typed(&self, id: &str, kind: Kind) -> Result<Object> {
        let id = ObjectId::from_hex(id).map_err(ObjectError::InvalidId)?;
        let object = self.objects.read(&id)?;

        if object.kind() != kind {
            return Err(ObjectError::Malformed {
                id: id.to_string(),
                reason: format!("expected a {}, found a {}", kind, object.kind()),
            }
            .into());
        }

        Ok(object)
    }

    /// Enumerate all references.
    pub fn references(&self) -> Result<Vec<Reference>> {
        Ok(self.refs.list()?)
    }

    /// The names of all references, in the same stable order as
    /// [`Repository::references`].
    pub fn reference_names(&self) -> Result<Vec<String>> {
        Ok(self
            .refs
            .list()?
            .into_iter()
            .map(|r| r.name().to_string())
            .collect())
    }

    /// Find a reference by full name.
    pub fn find_reference(&self, name: &str) -> Result<Reference> {
        Ok(self.refs.find(name)?)
    }

    /// Create a reference; see [`ReferenceStore::create`].
    pub fn create_reference(
        &self,
        name: &str,
        target: &str,
        is_symbolic: bool,
        force: bool,
    ) -> Result<Reference> {
        Ok(self.refs.create(name, target, is_symbolic, force)?)
    }

    /// Resolve a reference to the object it ultimately points at.
    pub fn resolve_reference(&self, name: &str) -> Result<ObjectId> {
        Ok(self.refs.resolve(name)?)
    }

    /// Resolve a revision specifier such as `HEAD~2` or `main^`.
    pub fn rev_parse(&self, spec: &str) -> Result<ObjectId> {
        Ok(revision::rev_parse(self, spec)?)
    }

    /// The best common ancestor of two commits.
    pub fn merge_base(&self, one: &str, two: &str) -> Result<ObjectId> {
        Ok(merge_base::merge_base(self, one, two)?)
    }

    /// All best common ancestors of `one` and every commit in `others`.
    pub fn merge_bases(&self, one: &str, others: &[&str]) -> Result<Vec<ObjectId>> {
        Ok(merge_base::merge_bases(self, one, others)?)
    }

    /// The best common ancestor across all the given commits.
    pub fn merge_base_octopus(&self, ids: &[&str]) -> Result<ObjectId> {
        Ok(merge_base::merge_base_octopus(self, ids)?)
    }
}

fn load_config(git_dir: &Path) -> std::result::Result<Config, crate::error::ConfigError> {
    Config::from_paths(&[git_dir.join("config")])
}

/// A directory is a git dir when it has the minimal skeleton: a HEAD
/// file plus objects and refs directories.
fn is_git_dir(dir: &Path) -> bool {
    dir.join("HEAD").is_file() && dir.join("objects").is_dir() && dir.join("refs").is_dir()
}

fn read_gitdir_file(path: &Path) -> Result<Option<PathBuf>> {
    let content = fs::read_to_string(path).map_err(RepositoryError::Io)?;

    Ok(content
        .strip_prefix("gitdir:")
        .map(|rest| PathBuf::from(rest.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn init_and_reopen() {
        let dir = TempDir::new().unwrap();

        let repo = Repository::init(dir.path(), false).unwrap();
        assert!(!repo.is_bare());
        assert_eq!(repo.git_dir(), dir.path().join(".git"));
        assert_eq!(repo.work_dir().unwrap(), dir.path());
        assert_eq!(repo.object_hash(), "Sha1");

        // Initializing again reopens rather than failing.
        let again = Repository::init(dir.path(), false).unwrap();
        assert_eq!(again.git_dir(), repo.git_dir());

        // Asking for the other shape is refused.
        let err = Repository::init(&dir.path().join(".git"), true).unwrap_err();
        assert!(err.to_string().contains("different layout"));
    }

    #[test]
    fn init_bare() {
        let dir = TempDir::new().unwrap();

        let repo = Repository::init(dir.path(), true).unwrap();
        assert!(repo.is_bare());
        assert_eq!(repo.git_dir(), dir.path());
        assert!(repo.work_dir().is_none());
    }

    #[test]
    fn open_discovers_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path(), false).unwrap();

        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::open(&nested).unwrap();
        assert_eq!(repo.work_dir().unwrap(), dir.path());
    }

    #[test]
    fn open_follows_gitdir_file() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        Repository::init_with_algorithm(&real, true, HashAlgorithm::Sha1).unwrap();

        let linked = dir.path().join("linked");
        fs::create_dir_all(&linked).unwrap();
        fs::write(linked.join(".git"), "gitdir: ../real\n").unwrap();

        let repo = Repository::open(&linked).unwrap();
        assert_eq!(repo.git_dir(), real);
    }

    #[test]
    fn open_plain_directory_fails() {
        let dir = TempDir::new().unwrap();

        let err = Repository::open(dir.path()).unwrap_err();
        assert!(err
            .to_string()
            .contains("does not appear to be a git repository"));
    }

    #[test]
    fn sha256_repository_round_trips() {
        let dir = TempDir::new().unwrap();

        let repo =
            Repository::init_with_algorithm(dir.path(), true, HashAlgorithm::Sha256).unwrap();
        assert_eq!(repo.object_hash(), "Sha256");

        let id = repo.objects().write(Kind::Blob, b"test content\n").unwrap();
        assert_eq!(id.to_string().len(), 64);

        // Reopening picks the algorithm up from the config.
        let reopened = Repository::open(dir.path()).unwrap();
        assert_eq!(reopened.object_hash(), "Sha256");
        assert!(reopened.has_object(&id.to_string()).unwrap());
    }

    #[test]
    fn head_states() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path(), false).unwrap();

        // Freshly initialized: HEAD points at an unborn branch.
        let err = repo.head().unwrap_err();
        assert!(err.to_string().contains("HEAD is not set"));

        let tree = repo.objects().write(Kind::Tree, b"").unwrap();
        let data = format!(
            "tree {}\nauthor A <a@b> 1 +0000\ncommitter A <a@b> 1 +0000\n\nroot\n",
            tree
        );
        let commit = repo.objects().write(Kind::Commit, data.as_bytes()).unwrap();
        repo.create_reference("refs/heads/main", &commit.to_string(), false, false)
            .unwrap();

        assert_eq!(repo.head().unwrap(), "refs/heads/main");

        // Detached HEAD reports the commit ID.
        repo.create_reference("HEAD", &commit.to_string(), false, true)
            .unwrap();
        assert_eq!(repo.head().unwrap(), commit.to_string());
    }

    #[test]
    fn find_object_rejects_malformed_ids() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path(), true).unwrap();

        let err = repo.find_object("not-hex").unwrap_err();
        assert!(err.to_string().contains("Invalid object ID"));

        let err = repo.has_object("abc").unwrap_err();
        assert!(err.to_string().contains("Invalid object ID"));
    }

    #[test]
    fn find_commit_requires_a_commit() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path(), true).unwrap();

        let blob = repo.objects().write(Kind::Blob, b"x\n").unwrap();
        let err = repo.find_commit(&blob.to_string()).unwrap_err();
        assert!(err.to_string().contains("expected a commit"));
    }

    #[test]
    fn shallow_file_parsing() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path(), true).unwrap();

        assert!(!repo.is_shallow());
        assert_eq!(repo.shallow_commits().unwrap(), None);

        let id = "3cd9329ac53613a0bfa198ae28f3af957e49573c";
        fs::write(repo.shallow_file(), format!("{}\n", id)).unwrap();

        assert!(repo.is_shallow());
        let commits = repo.shallow_commits().unwrap().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].to_string(), id);

        // An empty shallow file means no boundary.
        fs::write(repo.shallow_file(), "").unwrap();
        assert_eq!(repo.shallow_commits().unwrap(), None);
    }
}
