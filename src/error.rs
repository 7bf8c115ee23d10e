use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while repairing a QDF file.
///
/// The positional variants carry the input filename and line number so that
/// `Display` renders the full diagnostic line.
#[derive(Debug, Error)]
pub enum Error {
    /// An object header whose number is not the next expected one.
    #[error("{filename}:{lineno}: expected object {expected}")]
    ObjectOutOfOrder {
        filename: String,
        lineno: usize,
        expected: u32,
    },

    /// The line after a length-placeholder object header held something
    /// other than a bare integer.
    #[error("{filename}:{lineno}: expected integer")]
    ExpectedInteger { filename: String, lineno: usize },

    /// A cross-reference stream field was sized beyond what fits in a u64.
    /// Widths are computed from the table maxima, so this is a logic error.
    #[error("cross-reference field width {0} exceeds 8 bytes")]
    FieldWidth(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
