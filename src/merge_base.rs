//! Best-common-ancestor computation over the commit graph.
//!
//! `merge_bases` returns every common ancestor that is not itself an
//! ancestor of another common ancestor (the antichain of the intersection).
//! `merge_base` picks one deterministically: the candidate with the highest
//! committer timestamp, ties broken by ascending ID. Walks tolerate
//! truncated history: a parent pruned by a shallow clone simply ends that
//! branch of the walk.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::error::RevisionError;
use crate::object::{commit, Commit, Kind, ObjectId};
use crate::repo::Repository;

struct CachedCommit {
    parents: Vec<ObjectId>,
    committed_at: i64,
}

/// Parsed-commit cache shared by all walks in one query.
struct CommitCache<'a> {
    repo: &'a Repository,
    commits: HashMap<ObjectId, Option<CachedCommit>>,
}

impl<'a> CommitCache<'a> {
    fn new(repo: &'a Repository) -> CommitCache<'a> {
        CommitCache {
            repo,
            commits: HashMap::new(),
        }
    }

    /// Parse an input specifier: a full hex ID of a commit, or of an
    /// annotated tag that peels to one. Anything else is rejected.
    fn parse_input(&mut self, input: &str) -> Result<ObjectId, RevisionError> {
        let invalid = || RevisionError::InvalidId(input.to_string());

        let mut id = ObjectId::from_hex(input).map_err(|_| invalid())?;

        // Peel annotated tags to the commit they designate.
        for _ in 0..10 {
            let object = self.repo.objects().read(&id).map_err(|_| invalid())?;
            match object.kind() {
                Kind::Commit => {
                    self.load(&id);
                    return Ok(id);
                }
                Kind::Tag => {
                    id = commit::tag_target(object.data()).ok_or_else(invalid)?;
                }
                _ => return Err(invalid()),
            }
        }

        Err(invalid())
    }

    /// Load a commit if possible. `None` means the object is absent or
    /// unreadable, which mid-walk is treated as a history boundary.
    fn load(&mut self, id: &ObjectId) -> Option<&CachedCommit> {
        if !self.commits.contains_key(id) {
            let cached = self
                .repo
                .objects()
                .read(id)
                .ok()
                .filter(|o| o.kind() == Kind::Commit)
                .and_then(|o| Commit::parse(id.clone(), o.data()).ok())
                .map(|c| CachedCommit {
                    parents: c.parents().to_vec(),
                    committed_at: c.committer().timestamp(),
                });
            self.commits.insert(id.clone(), cached);
        }

        self.commits.get(id).and_then(|c| c.as_ref())
    }

    /// All ancestors of `start`, including `start` itself.
    fn ancestors(&mut self, start: &ObjectId) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(start.clone());
        queue.push_back(start.clone());

        while let Some(id) = queue.pop_front() {
            let parents = match self.load(&id) {
                Some(commit) => commit.parents.clone(),
                None => continue,
            };

            for parent in parents {
                if seen.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }

        seen
    }

    fn committed_at(&mut self, id: &ObjectId) -> i64 {
        self.load(id).map(|c| c.committed_at).unwrap_or(0)
    }
}

/// All best common ancestors of `one` and every commit in `others`,
/// ordered by descending committer timestamp, then ascending ID.
pub fn merge_bases(
    repo: &Repository,
    one: &str,
    others: &[&str],
) -> Result<Vec<ObjectId>, RevisionError> {
    if others.is_empty() {
        return Err(RevisionError::EmptyInput);
    }

    let mut cache = CommitCache::new(repo);

    let first = cache.parse_input(one)?;
    let mut common = cache.ancestors(&first);

    for other in others {
        let other = cache.parse_input(other)?;
        let ancestors = cache.ancestors(&other);
        common.retain(|id| ancestors.contains(id));
    }

    let candidates = antichain(&mut cache, common);

    let mut result: Vec<ObjectId> = candidates.into_iter().collect();
    result.sort_by(|a, b| {
        cache
            .committed_at(b)
            .cmp(&cache.committed_at(a))
            .then_with(|| a.cmp(b))
    });

    trace!(one, count = result.len(), "computed merge bases");
    Ok(result)
}

/// The single best common ancestor of two commits.
pub fn merge_base(repo: &Repository, one: &str, two: &str) -> Result<ObjectId, RevisionError> {
    merge_bases(repo, one, &[two])?
        .into_iter()
        .next()
        .ok_or(RevisionError::NoMergeBase)
}

/// The best common ancestor of every commit in `inputs`, computed by
/// folding pairwise merge bases.
pub fn merge_base_octopus(repo: &Repository, inputs: &[&str]) -> Result<ObjectId, RevisionError> {
    let (first, rest) = inputs.split_first().ok_or(RevisionError::EmptyInput)?;

    let mut cache = CommitCache::new(repo);
    let mut base = cache.parse_input(first)?;

    for input in rest {
        base = merge_base(repo, &base.to_string(), input)?;
    }

    Ok(base)
}

/// Drop every candidate that is an ancestor of another candidate.
///
/// One multi-source walk from all candidates' parents suffices: any
/// candidate reached that way is dominated.
fn antichain(cache: &mut CommitCache<'_>, candidates: HashSet<ObjectId>) -> HashSet<ObjectId> {
    if candidates.len() <= 1 {
        return candidates;
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();

    for id in &candidates {
        let parents = match cache.load(id) {
            Some(commit) => commit.parents.clone(),
            None => continue,
        };
        for parent in parents {
            if seen.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }

    while let Some(id) = queue.pop_front() {
        let parents = match cache.load(&id) {
            Some(commit) => commit.parents.clone(),
            None => continue,
        };
        for parent in parents {
            if seen.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }

    candidates
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect()
}
