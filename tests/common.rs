use std::path::Path;

use tempfile::TempDir;

use gitcore::{Kind, ObjectId, Repository};

/// A disposable repository with helpers for growing a commit graph.
///
/// Commits share one empty tree and get strictly increasing committer
/// timestamps, so graph-order assertions are deterministic.
pub struct TestRepo {
    // Held so the directory outlives the repository handle.
    _dir: TempDir,
    pub repo: Repository,
    tree: ObjectId,
    clock: i64,
}

#[allow(dead_code)]
impl TestRepo {
    pub fn new() -> TestRepo {
        TestRepo::with_bareness(false)
    }

    pub fn bare() -> TestRepo {
        TestRepo::with_bareness(true)
    }

    fn with_bareness(bare: bool) -> TestRepo {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path(), bare).unwrap();
        let tree = repo.objects().write(Kind::Tree, b"").unwrap();

        TestRepo {
            _dir: dir,
            repo,
            tree,
            clock: 0,
        }
    }

    pub fn root(&self) -> &Path {
        self.repo
            .work_dir()
            .unwrap_or_else(|| self.repo.git_dir())
    }

    pub fn commit(&mut self, parents: &[&ObjectId], message: &str) -> ObjectId {
        self.clock += 1;

        let mut data = format!("tree {}\n", self.tree);
        for parent in parents {
            data.push_str(&format!("parent {}\n", parent));
        }
        data.push_str(&format!(
            "author A U Thor <author@example.com> {} +0000\n\
             committer A U Thor <author@example.com> {} +0000\n\
             \n\
             {}\n",
            self.clock, self.clock, message
        ));

        self.repo
            .objects()
            .write(Kind::Commit, data.as_bytes())
            .unwrap()
    }

    pub fn branch(&self, name: &str, id: &ObjectId) {
        self.repo
            .create_reference(&format!("refs/heads/{}", name), &id.to_string(), false, true)
            .unwrap();
    }

    /// Write an annotated tag object and a ref pointing at it.
    pub fn tag(&mut self, name: &str, target: &ObjectId) -> ObjectId {
        self.clock += 1;

        let data = format!(
            "object {}\n\
             type commit\n\
             tag {}\n\
             tagger A U Thor <author@example.com> {} +0000\n\
             \n\
             {}\n",
            target, name, self.clock, name
        );

        let tag = self
            .repo
            .objects()
            .write(Kind::Tag, data.as_bytes())
            .unwrap();
        self.repo
            .create_reference(&format!("refs/tags/{}", name), &tag.to_string(), false, true)
            .unwrap();
        tag
    }

    /// Create a root commit on `refs/heads/main` so HEAD is born.
    pub fn seed_main(&mut self) -> ObjectId {
        let root = self.commit(&[], "initial");
        self.branch("main", &root);
        root
    }
}
