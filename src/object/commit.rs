use std::str::{self, FromStr};

use crate::error::ObjectError;

use super::parse_utils::{header, split_once};
use super::ObjectId;

/// An `Attribution` combines a person's identity (name and e-mail address)
/// with the timestamp for a particular action.
///
/// Attributions are typically associated with commits or tags in git.
/// The `timestamp` value is in seconds relative to the Unix era.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribution {
    name: String,
    email: String,
    timestamp: i64,
    tz_offset: i16,
}

impl Attribution {
    /// Parse a name line (e.g. author, committer, tagger) into an `Attribution` struct.
    /// Returns `None` if unable to parse the line properly.
    pub fn parse(line: &[u8]) -> Option<Attribution> {
        let (name, line) = split_once(line, b'<')?;
        let name = drop_last_space(name);
        let name = str::from_utf8(name).ok()?.to_string();

        let (email, line) = split_once(line, b'>')?;
        let email = str::from_utf8(email).ok()?.to_string();

        let line = str::from_utf8(line).ok()?;
        let mut words = line.split_whitespace();

        let timestamp = match words.next() {
            Some(w) => i64::from_str(w).unwrap_or(0),
            None => 0,
        };

        let tz_offset = match words.next() {
            Some(w) => tz_from_str(w).unwrap_or(0),
            None => 0,
        };

        Some(Attribution {
            name,
            email,
            timestamp,
            tz_offset,
        })
    }

    /// Returns the person's human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the person's e-mail address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the timestamp in seconds since the Unix era.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the time zone offset in minutes relative to UTC.
    pub fn tz_offset(&self) -> i16 {
        self.tz_offset
    }
}

fn drop_last_space(s: &[u8]) -> &[u8] {
    match s.last() {
        Some(b' ') => &s[..s.len() - 1],
        _ => s,
    }
}

fn tz_from_str(s: &str) -> Option<i16> {
    if s.len() != 5 {
        return None;
    }

    let sign: i16 = match s.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };

    let hours = i16::from_str(&s[1..3]).ok()?;
    let minutes = i16::from_str(&s[3..5]).ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// A parsed commit object.
///
/// Parents appear in the order recorded in the commit; a root commit has
/// none and a merge commit has more than one. The first parent is the one
/// that `~` ancestry walks follow.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commit {
    id: ObjectId,
    tree: ObjectId,
    parents: Vec<ObjectId>,
    author: Attribution,
    committer: Attribution,
    message: String,
}

impl Commit {
    /// Parse the payload of a commit object.
    pub fn parse(id: ObjectId, data: &[u8]) -> Result<Commit, ObjectError> {
        let malformed = |reason: &str| ObjectError::Malformed {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        let (headers, message) = split_payload(data);

        for line in headers.split(|b| *b == b'\n') {
            // Continuation lines (e.g. inside gpgsig) belong to a header
            // we don't interpret.
            if line.first() == Some(&b' ') {
                continue;
            }

            if let Some(value) = header(line, b"tree") {
                tree = Some(ObjectId::from_hex(value).map_err(|_| malformed("bad tree ID"))?);
            } else if let Some(value) = header(line, b"parent") {
                parents.push(ObjectId::from_hex(value).map_err(|_| malformed("bad parent ID"))?);
            } else if let Some(value) = header(line, b"author") {
                author = Attribution::parse(value);
            } else if let Some(value) = header(line, b"committer") {
                committer = Attribution::parse(value);
            }
            // Unknown headers (encoding, gpgsig, ...) are preserved in the
            // raw object but not modeled here.
        }

        Ok(Commit {
            tree: tree.ok_or_else(|| malformed("missing tree header"))?,
            parents,
            author: author.ok_or_else(|| malformed("missing author header"))?,
            committer: committer.ok_or_else(|| malformed("missing committer header"))?,
            message: String::from_utf8_lossy(message).into_owned(),
            id,
        })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn tree(&self) -> &ObjectId {
        &self.tree
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Attribution {
        &self.author
    }

    pub fn committer(&self) -> &Attribution {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Extract the target object ID from a tag object's payload.
pub(crate) fn tag_target(data: &[u8]) -> Option<ObjectId> {
    for line in data.split(|b| *b == b'\n') {
        if let Some(value) = header(line, b"object") {
            return ObjectId::from_hex(value).ok();
        }
    }

    None
}

fn split_payload(data: &[u8]) -> (&[u8], &[u8]) {
    match data.windows(2).position(|w| w == b"\n\n") {
        Some(n) => (&data[..n], &data[n + 2..]),
        None => (data, &[]),
    }
}
