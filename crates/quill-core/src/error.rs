//! Error types for `quill-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  /// Comment content is blank after trimming.
  #[error("Comment cannot be empty")]
  EmptyComment,

  /// A required post field is blank after normalisation.
  #[error("Missing required field: {0}")]
  MissingField(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
