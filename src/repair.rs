use std::io::Write;
use std::mem;

use log::warn;

use crate::lines::Lines;
use crate::object_stream::ObjectStreamBuffer;
use crate::parser;
use crate::writer::{bytes_needed, write_big_endian};
use crate::xref::{Xref, XrefEntry};
use crate::{Error, Result};

/// Repairs one QDF file: reads `input`, writes the fixed file to `out`.
///
/// `filename` is used only in diagnostics.
pub fn repair<W: Write>(filename: &str, input: &[u8], out: W) -> Result<()> {
    RepairPass::new(filename, out).run(input)
}

/// Single forward pass over a QDF file.
///
/// Every input line is classified against the current state and then
/// forwarded, rewritten, suppressed or buffered. `offset` tracks the byte
/// position just past the current line in the output; `last_offset` the
/// position at which it began. Rewrites that change a line's length adjust
/// `offset` by the delta so later cross-reference entries stay exact.
pub struct RepairPass<'a, W: Write> {
    filename: &'a str,
    out: W,
    state: State,
    lineno: usize,
    offset: i64,
    last_offset: i64,
    last_obj: u32,
    xref: Xref,
    xref_offset: i64,
}

/// Per-state data lives in the variant that needs it: the open stream's
/// start offset, the pending length, the object-stream buffer in flight,
/// the packed field widths of the cross-reference stream.
enum State {
    Top,
    InObject,
    InStream { start: i64 },
    AfterStream { length: i64 },
    InLength { length: i64 },
    InOstreamDict { buffer: ObjectStreamBuffer },
    InOstreamOffsets { buffer: ObjectStreamBuffer },
    InOstreamOuter { buffer: ObjectStreamBuffer },
    InOstreamObject { buffer: ObjectStreamBuffer },
    InXrefStreamDict { f1_width: usize, f2_width: usize },
    AtXref,
    BeforeTrailer,
    InTrailer,
    Done,
}

impl<'a, W: Write> RepairPass<'a, W> {
    pub fn new(filename: &'a str, out: W) -> RepairPass<'a, W> {
        RepairPass {
            filename,
            out,
            state: State::Top,
            lineno: 0,
            offset: 0,
            last_offset: 0,
            last_obj: 0,
            xref: Xref::new(),
            xref_offset: 0,
        }
    }

    /// Consumes the whole input, line by line.
    pub fn run(mut self, input: &[u8]) -> Result<()> {
        for line in Lines::new(input) {
            self.lineno += 1;
            self.last_offset = self.offset;
            self.offset += line.len() as i64;
            self.state = match mem::replace(&mut self.state, State::Done) {
                State::Top => self.top(line)?,
                State::InObject => self.in_object(line)?,
                State::InStream { start } => self.in_stream(line, start)?,
                State::AfterStream { length } => self.after_stream(line, length)?,
                State::InLength { length } => self.in_length(line, length)?,
                State::InOstreamDict { buffer } => self.in_ostream_dict(line, buffer)?,
                State::InOstreamOffsets { buffer } => self.in_ostream_offsets(line, buffer)?,
                State::InOstreamOuter { buffer } => self.in_ostream_outer(line, buffer)?,
                State::InOstreamObject { buffer } => self.in_ostream_object(line, buffer)?,
                State::InXrefStreamDict { f1_width, f2_width } => {
                    self.in_xref_stream_dict(line, f1_width, f2_width)?
                }
                State::AtXref => self.at_xref()?,
                State::BeforeTrailer => self.before_trailer(line)?,
                State::InTrailer => self.in_trailer(line)?,
                State::Done => State::Done,
            };
        }
        Ok(())
    }

    /// Validates the next object number and records its table entry.
    fn object_open(&mut self, number: u32) -> Result<()> {
        self.last_obj += 1;
        if number != self.last_obj {
            return Err(Error::ObjectOutOfOrder {
                filename: self.filename.to_string(),
                lineno: self.lineno,
                expected: self.last_obj,
            });
        }
        self.xref.push(XrefEntry::Normal {
            offset: self.last_offset,
        });
        Ok(())
    }

    fn top(&mut self, line: &[u8]) -> Result<State> {
        let next = if let Some(number) = parser::object_header(line) {
            self.object_open(number)?;
            State::InObject
        } else if line == b"xref\n" {
            self.xref_offset = self.last_offset;
            State::AtXref
        } else {
            State::Top
        };
        self.out.write_all(line)?;
        Ok(next)
    }

    fn in_object(&mut self, line: &[u8]) -> Result<State> {
        self.out.write_all(line)?;
        if line == b"stream\n" {
            Ok(State::InStream { start: self.offset })
        } else if line == b"endobj\n" {
            Ok(State::Top)
        } else if parser::contains(line, b"/Type /ObjStm") {
            Ok(State::InOstreamDict {
                buffer: ObjectStreamBuffer::new(self.last_obj),
            })
        } else if parser::contains(line, b"/Type /XRef") {
            self.begin_xref_stream()
        } else {
            Ok(State::InObject)
        }
    }

    fn in_stream(&mut self, line: &[u8], start: i64) -> Result<State> {
        self.out.write_all(line)?;
        if line == b"endstream\n" {
            Ok(State::AfterStream {
                length: self.last_offset - start,
            })
        } else {
            Ok(State::InStream { start })
        }
    }

    fn after_stream(&mut self, line: &[u8], mut length: i64) -> Result<State> {
        let next = if line == b"%QDF: ignore_newline\n" {
            if length > 0 {
                length -= 1;
            } else {
                warn!(
                    "{}:{}: ignore_newline marker on an empty stream",
                    self.filename, self.lineno
                );
            }
            State::AfterStream { length }
        } else if let Some(number) = parser::object_header(line) {
            self.object_open(number)?;
            State::InLength { length }
        } else {
            State::AfterStream { length }
        };
        self.out.write_all(line)?;
        Ok(next)
    }

    fn in_length(&mut self, line: &[u8], length: i64) -> Result<State> {
        if !parser::integer_line(line) {
            return Err(Error::ExpectedInteger {
                filename: self.filename.to_string(),
                lineno: self.lineno,
            });
        }
        let replacement = format!("{}\n", length);
        self.offset += replacement.len() as i64 - line.len() as i64;
        self.out.write_all(replacement.as_bytes())?;
        Ok(State::Top)
    }

    fn in_ostream_dict(&mut self, line: &[u8], mut buffer: ObjectStreamBuffer) -> Result<State> {
        if line == b"stream\n" {
            Ok(State::InOstreamOffsets { buffer })
        } else {
            buffer.discard_dict_line(line);
            Ok(State::InOstreamDict { buffer })
        }
    }

    fn in_ostream_offsets(&mut self, line: &[u8], mut buffer: ObjectStreamBuffer) -> Result<State> {
        if let Some(number) = parser::ostream_marker(line) {
            self.object_open(number)?;
            buffer.begin(self.last_offset);
            buffer.keep(line);
            Ok(State::InOstreamOuter { buffer })
        } else {
            buffer.discard(line);
            Ok(State::InOstreamOffsets { buffer })
        }
    }

    fn in_ostream_outer(&mut self, line: &[u8], mut buffer: ObjectStreamBuffer) -> Result<State> {
        self.xref.replace_last(XrefEntry::Compressed {
            container: buffer.id(),
            index: buffer.next_index(),
        });
        buffer.record_offset(self.last_offset);
        buffer.keep(line);
        Ok(State::InOstreamObject { buffer })
    }

    fn in_ostream_object(&mut self, line: &[u8], mut buffer: ObjectStreamBuffer) -> Result<State> {
        buffer.keep(line);
        if let Some(number) = parser::ostream_marker(line) {
            self.object_open(number)?;
            Ok(State::InOstreamOuter { buffer })
        } else if line == b"endstream\n" {
            let length = self.last_offset - buffer.start();
            self.offset += buffer.flush(&mut self.out, length)?;
            Ok(State::InObject)
        } else {
            Ok(State::InOstreamObject { buffer })
        }
    }

    /// Latches the cross-reference stream's own offset, sizes the packed
    /// fields and emits the corrected `/Length` and `/W` lines.
    fn begin_xref_stream(&mut self) -> Result<State> {
        self.xref_offset = self.xref.last_offset();
        let f1_width = bytes_needed(self.xref_offset as u64);
        let f2_width = bytes_needed(u64::from(self.xref.max_compressed_index()));
        let entry_size = 1 + f1_width + f2_width;
        let length = self.xref.size() * entry_size;
        writeln!(self.out, "  /Length {}", length)?;
        writeln!(self.out, "  /W [ 1 {} {} ]", f1_width, f2_width)?;
        Ok(State::InXrefStreamDict { f1_width, f2_width })
    }

    fn in_xref_stream_dict(
        &mut self, line: &[u8], f1_width: usize, f2_width: usize,
    ) -> Result<State> {
        if parser::contains(line, b"/Length") || parser::contains(line, b"/W") {
            // replaced when the dictionary was entered
        } else if parser::contains(line, b"/Size") {
            writeln!(self.out, "  /Size {}", self.xref.size())?;
        } else {
            self.out.write_all(line)?;
        }
        if line == b"stream\n" {
            self.write_xref_stream(f1_width, f2_width)?;
            return Ok(State::Done);
        }
        Ok(State::InXrefStreamDict { f1_width, f2_width })
    }

    /// Packs the accumulated table into the binary stream body and closes
    /// the file. Anything left in the input is discarded.
    fn write_xref_stream(&mut self, f1_width: usize, f2_width: usize) -> Result<()> {
        write_big_endian(&mut self.out, 0, 1)?;
        write_big_endian(&mut self.out, 0, f1_width)?;
        write_big_endian(&mut self.out, 0, f2_width)?;
        for entry in &self.xref.entries {
            let (kind, f1, f2) = match *entry {
                XrefEntry::Normal { offset } => (1, offset as u64, 0),
                XrefEntry::Compressed { container, index } => {
                    (2, u64::from(container), u64::from(index))
                }
            };
            write_big_endian(&mut self.out, kind, 1)?;
            write_big_endian(&mut self.out, f1, f1_width)?;
            write_big_endian(&mut self.out, f2, f2_width)?;
        }
        write!(
            self.out,
            "\nendstream\nendobj\n\nstartxref\n{}\n%%EOF\n",
            self.xref_offset
        )?;
        Ok(())
    }

    /// Emits the rebuilt classic table in place of the stale one. The
    /// current line is the old section header and is dropped with the rest
    /// of the stale rows.
    fn at_xref(&mut self) -> Result<State> {
        writeln!(self.out, "0 {}", self.xref.size())?;
        let out = &mut self.out;
        let mut write_row = |offset: i64, generation: u32, kind: char| {
            writeln!(out, "{:>010} {:>05} {} ", offset, generation, kind)
        };
        write_row(0, 65535, 'f')?;
        for entry in &self.xref.entries {
            let offset = match *entry {
                XrefEntry::Normal { offset } => offset,
                XrefEntry::Compressed { .. } => 0,
            };
            write_row(offset, 0, 'n')?;
        }
        Ok(State::BeforeTrailer)
    }

    fn before_trailer(&mut self, line: &[u8]) -> Result<State> {
        if line == b"trailer <<\n" {
            self.out.write_all(line)?;
            Ok(State::InTrailer)
        } else {
            // stale xref rows, dropped
            Ok(State::BeforeTrailer)
        }
    }

    fn in_trailer(&mut self, line: &[u8]) -> Result<State> {
        if parser::size_line(line) {
            writeln!(self.out, "  /Size {}", self.xref.size())?;
        } else {
            self.out.write_all(line)?;
        }
        if line == b">>\n" {
            write!(self.out, "startxref\n{}\n%%EOF\n", self.xref_offset)?;
            return Ok(State::Done);
        }
        Ok(State::InTrailer)
    }
}
