//! Represents the git concept of an "object" which is a tuple of
//! object type and binary data identified by the hash of the binary data.

use sha1::{Digest, Sha1};
use sha2::Sha256;

pub(crate) mod commit;
pub use commit::{Attribution, Commit};

mod id;
pub use id::{HashAlgorithm, ObjectId, ParseIdError};

mod kind;
pub use kind::Kind;

mod store;
pub use store::ObjectStore;

pub(crate) mod parse_utils;

/// A single immutable object read from a repository.
///
/// The store never mutates an existing object's bytes; `data` is exactly
/// the payload that was hashed to produce `id`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Object {
    id: ObjectId,
    kind: Kind,
    data: Vec<u8>,
}

impl Object {
    pub(crate) fn new(id: ObjectId, kind: Kind, data: Vec<u8>) -> Object {
        Object { id, kind, data }
    }

    /// Return the ID of the object.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Return the kind of the object.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Return the size (in bytes) of the object.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the object is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The object's payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the object, returning its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// The lightweight projection of an object obtainable without reading
/// the full payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    kind: Kind,
    size: u64,
}

impl Header {
    pub(crate) fn new(kind: Kind, size: u64) -> Header {
        Header { kind, size }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Computes an object's ID from its content, size, and type.
///
/// This is functionally equivalent to the
/// [`git hash-object`](https://git-scm.com/docs/git-hash-object) command
/// without the `-w` option that would write the object to the repo.
pub fn hash_object(algorithm: HashAlgorithm, kind: Kind, data: &[u8]) -> ObjectId {
    let raw = match algorithm {
        HashAlgorithm::Sha1 => digest::<Sha1>(kind, data),
        HashAlgorithm::Sha256 => digest::<Sha256>(kind, data),
    };

    // The hasher is guaranteed to return a digest of the right length.
    ObjectId::from_bytes(&raw).unwrap()
}

fn digest<D: Digest>(kind: Kind, data: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();

    hasher.update(kind.to_string().as_bytes());
    hasher.update(b" ");
    hasher.update(data.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(data);

    hasher.finalize().to_vec()
}
