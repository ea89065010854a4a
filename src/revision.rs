//! Revision specifier resolution.
//!
//! A specifier is a base name followed by any number of navigation
//! suffixes. The base may be a full hex object ID, `HEAD`, or a reference
//! name given in full or short form; short names disambiguate in the order
//! `refs/<name>`, `refs/tags/<name>`, `refs/heads/<name>`,
//! `refs/remotes/<name>`. Suffixes are `^` / `^N` (N-th parent, `^0` peels
//! to a commit) and `~` / `~N` (N first-parent steps; a bare `~` or `~0`
//! is the identity). Annotated tags are peeled whenever a suffix needs a
//! commit to navigate from.

use tracing::trace;

use crate::error::RevisionError;
use crate::object::{commit, Commit, Kind, ObjectId};
use crate::repo::Repository;

// Chains of tags pointing at tags are legal; cap how far we chase them.
const MAX_TAG_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Suffix {
    Caret(usize),
    Tilde(usize),
}

/// Resolve a revision specifier to an object ID.
pub fn rev_parse(repo: &Repository, spec: &str) -> Result<ObjectId, RevisionError> {
    if spec.is_empty() {
        return Err(RevisionError::parse(spec, "empty revision specifier"));
    }

    let split = spec.find(|c| c == '^' || c == '~').unwrap_or(spec.len());
    let (base, rest) = spec.split_at(split);

    let mut id = resolve_base(repo, spec, base)?;

    for suffix in parse_suffixes(spec, rest)? {
        id = apply_suffix(repo, spec, id, suffix)?;
    }

    trace!(spec, id = %id, "resolved revision");
    Ok(id)
}

fn resolve_base(repo: &Repository, spec: &str, base: &str) -> Result<ObjectId, RevisionError> {
    if base.is_empty() {
        return Err(RevisionError::parse(spec, "missing base revision"));
    }

    // A full-width hex string is taken as an object ID, never a ref name.
    if base.len() == repo.objects().algorithm().hex_len() {
        if let Ok(id) = ObjectId::from_hex(base) {
            if repo.objects().has(&id) {
                return Ok(id);
            }
            return Err(RevisionError::parse(
                spec,
                format!("object '{}' not found", base),
            ));
        }
    }

    let candidates = [
        base.to_string(),
        format!("refs/{}", base),
        format!("refs/tags/{}", base),
        format!("refs/heads/{}", base),
        format!("refs/remotes/{}", base),
    ];

    for candidate in &candidates {
        if repo.refs().exists(candidate) {
            return repo
                .refs()
                .resolve(candidate)
                .map_err(|err| RevisionError::parse(spec, err.to_string()));
        }
    }

    Err(RevisionError::parse(
        spec,
        format!("unknown revision '{}'", base),
    ))
}

fn parse_suffixes(spec: &str, rest: &str) -> Result<Vec<Suffix>, RevisionError> {
    let mut suffixes = Vec::new();
    let mut chars = rest.chars().peekable();

    while let Some(op) = chars.next() {
        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        let count: Option<usize> = if digits.is_empty() {
            None
        } else {
            Some(digits.parse().map_err(|_| {
                RevisionError::parse(spec, format!("bad count '{}'", digits))
            })?)
        };

        match op {
            // A bare caret means the first parent.
            '^' => suffixes.push(Suffix::Caret(count.unwrap_or(1))),
            // A bare tilde is the identity.
            '~' => suffixes.push(Suffix::Tilde(count.unwrap_or(0))),
            other => {
                return Err(RevisionError::parse(
                    spec,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(suffixes)
}

fn apply_suffix(
    repo: &Repository,
    spec: &str,
    id: ObjectId,
    suffix: Suffix,
) -> Result<ObjectId, RevisionError> {
    match suffix {
        Suffix::Caret(0) => peel_to_commit(repo, spec, id).map(|c| c.id().clone()),
        Suffix::Caret(n) => {
            let commit = peel_to_commit(repo, spec, id)?;
            commit.parents().get(n - 1).cloned().ok_or_else(|| {
                RevisionError::parse(
                    spec,
                    format!("commit {} has no parent {}", commit.id(), n),
                )
            })
        }
        Suffix::Tilde(n) => {
            let mut id = id;
            for _ in 0..n {
                let commit = peel_to_commit(repo, spec, id)?;
                id = commit.parents().first().cloned().ok_or_else(|| {
                    RevisionError::parse(
                        spec,
                        format!("commit {} has no parent", commit.id()),
                    )
                })?;
            }
            Ok(id)
        }
    }
}

/// Follow annotated tags until a commit is reached and parse it.
fn peel_to_commit(
    repo: &Repository,
    spec: &str,
    mut id: ObjectId,
) -> Result<Commit, RevisionError> {
    for _ in 0..MAX_TAG_DEPTH {
        let object = repo
            .objects()
            .read(&id)
            .map_err(|err| RevisionError::parse(spec, err.to_string()))?;

        match object.kind() {
            Kind::Commit => {
                return Commit::parse(id, object.data())
                    .map_err(|err| RevisionError::parse(spec, err.to_string()));
            }
            Kind::Tag => {
                id = commit::tag_target(object.data()).ok_or_else(|| {
                    RevisionError::parse(spec, format!("tag {} has no target", object.id()))
                })?;
            }
            kind => {
                return Err(RevisionError::parse(
                    spec,
                    format!("expected a commit, found a {}", kind),
                ));
            }
        }
    }

    Err(RevisionError::parse(spec, "tag chain too deep"))
}
