//! Repair of QDF-mode PDF files.
//!
//! A QDF file is a line-oriented, human-editable PDF serialization. After
//! hand edits its stream lengths, object-stream dictionaries and
//! cross-reference data no longer match the byte layout; [`repair`] rewrites
//! the file in a single forward pass so that they do again.

mod error;
pub use crate::error::{Error, Result};

mod lines;
mod object_stream;
mod parser;
mod repair;
mod writer;
mod xref;

pub use crate::repair::{repair, RepairPass};
pub use crate::xref::{Xref, XrefEntry};
