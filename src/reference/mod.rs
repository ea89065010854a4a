//! Named pointers (branches, tags, HEAD) to objects or to other references.
//!
//! Loose references live one file per ref under the git dir; a `packed-refs`
//! file may hold additional direct refs. Mutation follows a compare-and-set
//! discipline: the new value is staged in a temp file and atomically
//! published, and a non-forced create fails with `AlreadyExists` when it
//! loses the race instead of corrupting state.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ReferenceError;
use crate::object::ObjectId;

/// Symbolic chains longer than this are reported as cycles.
const MAX_SYMBOLIC_DEPTH: usize = 10;

/// What a reference points at: an object directly, or another reference
/// by name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RefTarget {
    Object(ObjectId),
    Symbolic(String),
}

impl RefTarget {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, RefTarget::Symbolic(_))
    }

    /// The target object ID, for a direct reference.
    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            RefTarget::Object(id) => Some(id),
            RefTarget::Symbolic(_) => None,
        }
    }

    /// The textual form: hex ID for direct targets, ref name for symbolic ones.
    pub fn as_string(&self) -> String {
        match self {
            RefTarget::Object(id) => id.to_string(),
            RefTarget::Symbolic(name) => name.clone(),
        }
    }
}

/// A named reference and its target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reference {
    name: String,
    target: RefTarget,
}

impl Reference {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }

    pub fn is_symbolic(&self) -> bool {
        self.target.is_symbolic()
    }
}

/// Store of all references under a repository's git dir.
#[derive(Debug)]
pub struct ReferenceStore {
    git_dir: PathBuf,
}

impl ReferenceStore {
    pub(crate) fn new(git_dir: &Path) -> ReferenceStore {
        ReferenceStore {
            git_dir: git_dir.to_path_buf(),
        }
    }

    /// Find a reference by its full name (e.g. `refs/heads/main` or `HEAD`).
    pub fn find(&self, name: &str) -> Result<Reference, ReferenceError> {
        if let Some(reference) = self.read_loose(name)? {
            return Ok(reference);
        }

        for (packed_name, id) in self.packed_refs()? {
            if packed_name == name {
                return Ok(Reference {
                    name: packed_name,
                    target: RefTarget::Object(id),
                });
            }
        }

        Err(ReferenceError::NotFound(name.to_string()))
    }

    /// Resolve a reference to an object ID, following symbolic hops.
    ///
    /// A chain longer than the fixed maximum depth is reported as a cycle,
    /// never silently truncated.
    pub fn resolve(&self, name: &str) -> Result<ObjectId, ReferenceError> {
        let mut current = name.to_string();

        for _ in 0..MAX_SYMBOLIC_DEPTH {
            match self.find(&current)?.target {
                RefTarget::Object(id) => return Ok(id),
                RefTarget::Symbolic(next) => current = next,
            }
        }

        Err(ReferenceError::Cycle(name.to_string()))
    }

    /// Enumerate all references, sorted by name for a stable order.
    ///
    /// Loose refs shadow packed ones of the same name. HEAD is included
    /// when present.
    pub fn list(&self) -> Result<Vec<Reference>, ReferenceError> {
        let mut refs: BTreeMap<String, Reference> = BTreeMap::new();

        for (name, id) in self.packed_refs()? {
            refs.insert(
                name.clone(),
                Reference {
                    name,
                    target: RefTarget::Object(id),
                },
            );
        }

        let refs_dir = self.git_dir.join("refs");
        if refs_dir.is_dir() {
            self.walk_loose(&refs_dir, "refs", &mut refs)?;
        }

        if let Some(head) = self.read_loose("HEAD")? {
            refs.insert("HEAD".to_string(), head);
        }

        Ok(refs.into_values().collect())
    }

    /// True if a reference with this name exists, loose or packed.
    pub fn exists(&self, name: &str) -> bool {
        if self.git_dir.join(name).is_file() {
            return true;
        }

        self.packed_refs()
            .map(|packed| packed.iter().any(|(n, _)| n == name))
            .unwrap_or(false)
    }

    /// Create (or with `force`, replace) a reference.
    ///
    /// The name must be structurally valid. A symbolic target must itself
    /// be a valid reference name; a direct target must be a well-formed
    /// object ID string. Without `force`, an existing name fails with
    /// `AlreadyExists`, enforced atomically on the loose file so racing
    /// writers cannot both win.
    pub fn create(
        &self,
        name: &str,
        target: &str,
        is_symbolic: bool,
        force: bool,
    ) -> Result<Reference, ReferenceError> {
        validate_name(name)?;

        let parsed = if is_symbolic {
            if validate_name(target).is_err() {
                return Err(ReferenceError::InvalidTarget(target.to_string()));
            }
            RefTarget::Symbolic(target.to_string())
        } else {
            match ObjectId::from_hex(target) {
                Ok(id) => RefTarget::Object(id),
                Err(_) => return Err(ReferenceError::InvalidTarget(target.to_string())),
            }
        };

        if !force && self.exists(name) {
            return Err(ReferenceError::AlreadyExists(name.to_string()));
        }

        let path = self.git_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ReferenceError::Io)?;
        }

        let content = match &parsed {
            RefTarget::Object(id) => format!("{}\n", id),
            RefTarget::Symbolic(target_name) => format!("ref: {}\n", target_name),
        };

        let mut tmp = NamedTempFile::new_in(&self.git_dir).map_err(ReferenceError::Io)?;
        tmp.write_all(content.as_bytes())
            .map_err(ReferenceError::Io)?;

        if force {
            tmp.persist(&path).map_err(|e| ReferenceError::Io(e.error))?;
        } else {
            tmp.persist_noclobber(&path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    ReferenceError::AlreadyExists(name.to_string())
                } else {
                    ReferenceError::Io(e.error)
                }
            })?;
        }

        debug!(name, target, is_symbolic, force, "created reference");

        Ok(Reference {
            name: name.to_string(),
            target: parsed,
        })
    }

    fn read_loose(&self, name: &str) -> Result<Option<Reference>, ReferenceError> {
        let path = self.git_dir.join(name);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            // Directories along the way (e.g. refs/heads) read as errors too.
            Err(_) if path.is_dir() => return Ok(None),
            Err(err) => return Err(ReferenceError::Io(err)),
        };

        let content = content.trim_end();

        let target = if let Some(rest) = content.strip_prefix("ref: ") {
            RefTarget::Symbolic(rest.trim().to_string())
        } else {
            match ObjectId::from_hex(content) {
                Ok(id) => RefTarget::Object(id),
                Err(_) => return Err(ReferenceError::InvalidTarget(name.to_string())),
            }
        };

        Ok(Some(Reference {
            name: name.to_string(),
            target,
        }))
    }

    fn packed_refs(&self) -> Result<Vec<(String, ObjectId)>, ReferenceError> {
        let path = self.git_dir.join("packed-refs");

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ReferenceError::Io(err)),
        };

        let mut packed = Vec::new();
        for line in content.lines() {
            // '#' is the header line; '^' lines carry peeled tag targets.
            if line.starts_with('#') || line.starts_with('^') {
                continue;
            }

            if let Some((hex, name)) = line.split_once(' ') {
                if let Ok(id) = ObjectId::from_hex(hex) {
                    packed.push((name.trim().to_string(), id));
                }
            }
        }

        Ok(packed)
    }

    fn walk_loose(
        &self,
        dir: &Path,
        prefix: &str,
        out: &mut BTreeMap<String, Reference>,
    ) -> Result<(), ReferenceError> {
        for entry in fs::read_dir(dir).map_err(ReferenceError::Io)? {
            let entry = entry.map_err(ReferenceError::Io)?;
            let file_name = entry.file_name();
            let name = format!("{}/{}", prefix, file_name.to_string_lossy());

            if entry.path().is_dir() {
                self.walk_loose(&entry.path(), &name, out)?;
            } else if let Some(reference) = self.read_loose(&name)? {
                out.insert(name, reference);
            }
        }

        Ok(())
    }
}

/// Validate a reference name: `HEAD`, or a `refs/...` path whose segments
/// are non-empty, are not `.` or `..`, don't end in `.lock`, and contain
/// no control characters or other bytes git reserves.
pub(crate) fn validate_name(name: &str) -> Result<(), ReferenceError> {
    let invalid = || ReferenceError::InvalidName(name.to_string());

    if name == "HEAD" {
        return Ok(());
    }

    if name.is_empty() || !name.starts_with("refs/") {
        return Err(invalid());
    }

    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        if segment.ends_with(".lock") {
            return Err(invalid());
        }
    }

    for c in name.chars() {
        if c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\') {
            return Err(invalid());
        }
    }

    Ok(())
}
