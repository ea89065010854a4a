//! A library for reading and writing local git repositories.
//!
//! The entry point is [`Repository`]: initialize or discover one on disk,
//! then reach its object database, references, and configuration through
//! it. [`AsyncRepository`] wraps the same operations for async callers by
//! running them on blocking workers.
//!
//! ```no_run
//! use gitcore::Repository;
//!
//! # fn main() -> gitcore::Result<()> {
//! let repo = Repository::open(std::path::Path::new("."))?;
//! let head = repo.rev_parse("HEAD")?;
//! println!("HEAD is {}", head);
//! # Ok(())
//! # }
//! ```

pub mod asynchronous;
pub mod config;
pub mod error;
pub mod merge_base;
pub mod object;
pub mod reference;
pub mod repo;
pub mod revision;

pub use asynchronous::AsyncRepository;
pub use config::Config;
pub use error::{
    ConfigError, Error, ObjectError, ReferenceError, RepositoryError, Result, RevisionError,
};
pub use object::{
    hash_object, Attribution, Commit, HashAlgorithm, Header, Kind, Object, ObjectId, ObjectStore,
    ParseIdError,
};
pub use reference::{RefTarget, Reference, ReferenceStore};
pub use repo::Repository;
