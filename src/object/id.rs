use std::fmt::{self, Write};
use std::str::FromStr;

use thiserror::Error;

/// The hash function used to derive object IDs in a repository.
///
/// SHA-1 repositories use 20-byte IDs (40 hex digits); SHA-256
/// repositories use 32-byte IDs (64 hex digits).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Length of a raw digest in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    /// Length of the hex-encoded textual form.
    pub fn hex_len(self) -> usize {
        self.digest_len() * 2
    }

    /// The algorithm's display name.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "Sha1",
            HashAlgorithm::Sha256 => "Sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error which can be returned when parsing a git object ID.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseIdError {
    /// Value being parsed is empty.
    #[error("cannot parse object ID from empty string")]
    Empty,

    /// Contains an invalid digit.
    ///
    /// Among other causes, this variant will be constructed when parsing a string that
    /// contains an uppercase or non-hex letter.
    #[error("value contains invalid digit `{0}`")]
    InvalidDigit(char),

    /// ID string is neither 40 nor 64 digits long.
    #[error("expected 40 or 64 hex digits, found {0}")]
    BadLength(usize),
}

/// An object ID identifies an object within a repository.
///
/// It is stored as a 20-byte (SHA-1) or 32-byte (SHA-256) digest, and is
/// rendered as lowercase hex for textual interchange. Equality is byte
/// equality.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ObjectId {
    id: Vec<u8>,
}

impl ObjectId {
    /// Create a new ID from a raw digest.
    ///
    /// It is an error if the slice is not exactly 20 or 32 bytes long.
    pub fn from_bytes(id: &[u8]) -> Result<ObjectId, ParseIdError> {
        match id.len() {
            20 | 32 => Ok(ObjectId { id: id.to_vec() }),
            0 => Err(ParseIdError::Empty),
            n => Err(ParseIdError::BadLength(n * 2)),
        }
    }

    /// Convert a 40- or 64-character hex string to an object ID.
    ///
    /// It is an error if the value contains anything other than lowercase
    /// hex digits of the expected length.
    pub fn from_hex<T: AsRef<[u8]>>(id: T) -> Result<ObjectId, ParseIdError> {
        let hex = id.as_ref();

        match hex.len() {
            40 | 64 => {
                let nybbles = hex.chunks(2).map(|pair| -> Result<u8, ParseIdError> {
                    Ok(digit_value(pair[0])? << 4 | digit_value(pair[1])?)
                });

                let id: Result<Vec<u8>, ParseIdError> = nybbles.collect();
                Ok(ObjectId { id: id? })
            }
            0 => Err(ParseIdError::Empty),
            n => Err(ParseIdError::BadLength(n)),
        }
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.id
    }

    /// The hash algorithm this ID was produced by, inferred from its length.
    pub fn algorithm(&self) -> HashAlgorithm {
        if self.id.len() == 32 {
            HashAlgorithm::Sha256
        } else {
            HashAlgorithm::Sha1
        }
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::from_hex(s.as_bytes())
    }
}

static CHARS: &[u8] = b"0123456789abcdef";

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.id.iter() {
            f.write_char(CHARS[(byte >> 4) as usize].into())?;
            f.write_char(CHARS[(byte & 0xf) as usize].into())?;
        }

        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

fn digit_value(c: u8) -> Result<u8, ParseIdError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(ParseIdError::InvalidDigit(c as char)),
    }
}
