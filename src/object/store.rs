//! The loose object database.
//!
//! Objects are stored one file per object under `objects/xx/yyyy...`,
//! zlib-deflated with a `"<kind> <size>\0"` prefix, exactly as
//! command-line git stores them. Writes are content-addressed and
//! therefore idempotent: a second write of the same bytes is a no-op.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::error::ObjectError;

use super::{hash_object, HashAlgorithm, Header, Kind, Object, ObjectId};

// A loose header is "<kind> <decimal size>\0"; anything longer is garbage.
const MAX_HEADER_LEN: usize = 32;

/// Content-addressable storage of immutable binary objects keyed by hash.
#[derive(Debug)]
pub struct ObjectStore {
    objects_dir: PathBuf,
    algorithm: HashAlgorithm,
}

impl ObjectStore {
    pub(crate) fn new(git_dir: &Path, algorithm: HashAlgorithm) -> ObjectStore {
        ObjectStore {
            objects_dir: git_dir.join("objects"),
            algorithm,
        }
    }

    /// The hash algorithm this store addresses objects with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn loose_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_string();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Check whether an object exists. Absence is a valid answer; this
    /// never fails.
    pub fn has(&self, id: &ObjectId) -> bool {
        self.loose_path(id).is_file()
    }

    /// Read an object's kind and size without inflating the full payload.
    pub fn header(&self, id: &ObjectId) -> Result<Header, ObjectError> {
        let file = self.open_loose(id)?;
        let mut decoder = ZlibDecoder::new(file);

        let mut prefix: Vec<u8> = Vec::new();
        let mut buf = [0u8; 64];

        loop {
            let n = decoder.read(&mut buf).map_err(ObjectError::Io)?;
            if n == 0 {
                return Err(self.malformed(id, "missing header terminator"));
            }

            if let Some(pos) = buf[..n].iter().position(|b| *b == 0) {
                prefix.extend_from_slice(&buf[..pos]);
                return self.parse_header(id, &prefix);
            }

            prefix.extend_from_slice(&buf[..n]);
            if prefix.len() > MAX_HEADER_LEN {
                return Err(self.malformed(id, "header too long"));
            }
        }
    }

    /// Read an object in full. The returned payload length always equals
    /// the size recorded in the object's header.
    pub fn read(&self, id: &ObjectId) -> Result<Object, ObjectError> {
        let file = self.open_loose(id)?;
        let mut decoder = ZlibDecoder::new(file);

        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw).map_err(ObjectError::Io)?;

        let nul = raw
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| self.malformed(id, "missing header terminator"))?;

        let header = self.parse_header(id, &raw[..nul])?;
        let data = raw.split_off(nul + 1);

        if data.len() as u64 != header.size() {
            return Err(self.malformed(id, "payload length disagrees with header size"));
        }

        trace!(id = %id, kind = %header.kind(), size = header.size(), "read loose object");
        Ok(Object::new(id.clone(), header.kind(), data))
    }

    /// Compute the ID the given content would be stored under.
    pub fn hash(&self, kind: Kind, data: &[u8]) -> ObjectId {
        hash_object(self.algorithm, kind, data)
    }

    /// Write an object, returning its ID.
    ///
    /// Idempotent: if the object already exists the store is untouched.
    /// Publication is write-to-temp plus atomic rename, so racing writers
    /// of the same content collapse to first-writer-wins.
    pub fn write(&self, kind: Kind, data: &[u8]) -> Result<ObjectId, ObjectError> {
        let id = self.hash(kind, data);
        let path = self.loose_path(&id);

        if path.is_file() {
            trace!(id = %id, "object already present");
            return Ok(id);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ObjectError::Io)?;
        }

        let mut tmp = NamedTempFile::new_in(&self.objects_dir).map_err(ObjectError::Io)?;
        {
            let mut encoder = ZlibEncoder::new(tmp.as_file_mut(), Compression::default());
            encoder
                .write_all(format!("{} {}\0", kind, data.len()).as_bytes())
                .map_err(ObjectError::Io)?;
            encoder.write_all(data).map_err(ObjectError::Io)?;
            encoder.finish().map_err(ObjectError::Io)?;
        }

        tmp.persist(&path).map_err(|e| ObjectError::Io(e.error))?;

        debug!(id = %id, kind = %kind, size = data.len(), "wrote loose object");
        Ok(id)
    }

    fn open_loose(&self, id: &ObjectId) -> Result<File, ObjectError> {
        File::open(self.loose_path(id)).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ObjectError::NotFound(id.to_string())
            } else {
                ObjectError::Io(err)
            }
        })
    }

    fn parse_header(&self, id: &ObjectId, prefix: &[u8]) -> Result<Header, ObjectError> {
        let space = prefix
            .iter()
            .position(|b| *b == b' ')
            .ok_or_else(|| self.malformed(id, "header has no kind/size separator"))?;

        let kind = Kind::from_bytes(&prefix[..space])
            .ok_or_else(|| self.malformed(id, "unknown object kind"))?;

        let size: u64 = std::str::from_utf8(&prefix[space + 1..])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.malformed(id, "unparseable size"))?;

        Ok(Header::new(kind, size))
    }

    fn malformed(&self, id: &ObjectId, reason: &str) -> ObjectError {
        ObjectError::Malformed {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
