use std::io::Write;

use crate::parser;
use crate::Result;

/// Accumulates one `/Type /ObjStm` object between its dictionary and its
/// `endstream`, then rewrites the dictionary and prepends the
/// `(objnum, offset)` header when flushed.
///
/// The original dictionary entries and the stale header block are dropped;
/// only their byte count matters, as a negative correction to the running
/// output offset. `/Extends` survives the rewrite.
#[derive(Debug)]
pub(crate) struct ObjectStreamBuffer {
    /// Object number of the containing stream.
    id: u32,
    /// Byte offset of the first contained-object marker line.
    start: i64,
    /// Lines kept verbatim, ending with the original `endstream` line.
    body: Vec<u8>,
    /// Start of each contained object's body, relative to `start`.
    offsets: Vec<i64>,
    /// Bytes dropped from the dictionary and the stale header block.
    discarded: i64,
    /// `/Extends` reference preserved across the rewrite.
    extends: Option<String>,
    /// Compressed-entry indices handed out so far.
    count: u32,
}

impl ObjectStreamBuffer {
    pub fn new(id: u32) -> ObjectStreamBuffer {
        ObjectStreamBuffer {
            id,
            start: 0,
            body: Vec::new(),
            offsets: Vec::new(),
            discarded: 0,
            extends: None,
            count: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    /// Marks where the kept stream body begins: the offset of the first
    /// contained-object marker line.
    pub fn begin(&mut self, offset: i64) {
        self.start = offset;
    }

    /// Hands out the next compressed-entry index.
    pub fn next_index(&mut self) -> u32 {
        let index = self.count;
        self.count += 1;
        index
    }

    /// Drops a dictionary line, keeping any `/Extends` reference alive.
    pub fn discard_dict_line(&mut self, line: &[u8]) {
        if let Some(target) = parser::extends_target(line) {
            self.extends = Some(String::from_utf8_lossy(target).into_owned());
        }
        self.discard(line);
    }

    /// Drops a line from the stale header block.
    pub fn discard(&mut self, line: &[u8]) {
        self.discarded += line.len() as i64;
    }

    /// Buffers a line of the stream body.
    pub fn keep(&mut self, line: &[u8]) {
        self.body.extend_from_slice(line);
    }

    /// Records a contained object's body start.
    pub fn record_offset(&mut self, offset: i64) {
        self.offsets.push(offset - self.start);
    }

    /// Writes the rewritten dictionary, the header pairs and the buffered
    /// body. `body_length` is the kept byte count up to `endstream`.
    ///
    /// Returns the net correction to apply to the running output offset:
    /// the new dictionary and header bytes minus the discarded ones.
    pub fn flush<W: Write>(self, out: &mut W, body_length: i64) -> Result<i64> {
        let first = self.offsets.first().copied().unwrap_or(0);

        let mut itoa_buffer = itoa::Buffer::new();
        let mut header = String::new();
        let mut number = self.id;
        for &offset in &self.offsets {
            number += 1;
            header.push_str(itoa_buffer.format(number));
            header.push(' ');
            header.push_str(itoa_buffer.format(offset - first));
            header.push('\n');
        }

        let header_len = header.len() as i64;
        let length = body_length + header_len;
        let first = first + header_len;

        let mut dict = String::new();
        dict.push_str("  /Length ");
        dict.push_str(itoa_buffer.format(length));
        dict.push_str("\n  /N ");
        dict.push_str(itoa_buffer.format(self.offsets.len()));
        dict.push_str("\n  /First ");
        dict.push_str(itoa_buffer.format(first));
        dict.push('\n');
        if let Some(extends) = &self.extends {
            dict.push_str("  /Extends ");
            dict.push_str(extends);
            dict.push('\n');
        }
        dict.push_str(">>\n");

        out.write_all(dict.as_bytes())?;
        out.write_all(b"stream\n")?;
        out.write_all(header.as_bytes())?;
        out.write_all(&self.body)?;

        Ok(dict.len() as i64 + header_len - self.discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectStreamBuffer;

    #[test]
    fn flush_rewrites_dictionary_and_header() {
        let mut buffer = ObjectStreamBuffer::new(4);
        buffer.discard_dict_line(b"  /Length 99\n");
        buffer.discard_dict_line(b"  /N 0\n");
        buffer.begin(100);
        buffer.keep(b"%% Object stream: object 5\n");
        assert_eq!(buffer.next_index(), 0);
        buffer.record_offset(127);
        buffer.keep(b"<< /A 1 >>\n");
        buffer.keep(b"%% Object stream: object 6\n");
        assert_eq!(buffer.next_index(), 1);
        buffer.record_offset(165);
        buffer.keep(b"<< /B 2 >>\n");
        buffer.keep(b"endstream\n");

        let mut out = Vec::new();
        // Kept bytes before endstream: 27 + 11 + 27 + 11 = 76.
        let adjust = buffer.flush(&mut out, 76).unwrap();

        // Header pairs: "5 0\n6 38\n" is 9 bytes, so /Length 85, /First 36.
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(
            "  /Length 85\n  /N 2\n  /First 36\n>>\nstream\n5 0\n6 38\n%% Object stream: object 5\n"
        ));
        assert!(text.ends_with("<< /B 2 >>\nendstream\n"));
        // Dictionary block (35) + header (9) minus discarded (13 + 7).
        assert_eq!(adjust, 35 + 9 - 20);
    }

    #[test]
    fn flush_preserves_extends() {
        let mut buffer = ObjectStreamBuffer::new(8);
        buffer.discard_dict_line(b"  /Extends 2 0 R\n");
        buffer.begin(0);
        buffer.keep(b"%% Object stream: object 9\n");
        buffer.next_index();
        buffer.record_offset(27);
        buffer.keep(b"null\n");
        buffer.keep(b"endstream\n");

        let mut out = Vec::new();
        buffer.flush(&mut out, 32).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  /Extends 2 0 R\n>>\n"));
    }
}
