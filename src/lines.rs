/// Iterator over the lines of a byte buffer.
///
/// Each yielded line includes its trailing `\n`; the final line may lack
/// one. Newlines are the sole delimiter, as QDF output is canonical.
pub(crate) struct Lines<'a> {
    input: &'a [u8],
}

impl<'a> Lines<'a> {
    pub fn new(input: &'a [u8]) -> Lines<'a> {
        Lines { input }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.input.is_empty() {
            return None;
        }
        let end = match self.input.iter().position(|&b| b == b'\n') {
            Some(at) => at + 1,
            None => self.input.len(),
        };
        let (line, rest) = self.input.split_at(end);
        self.input = rest;
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::Lines;

    #[test]
    fn splits_on_newline() {
        let lines: Vec<&[u8]> = Lines::new(b"a\nbb\n\nc\n").collect();
        assert_eq!(lines, [&b"a\n"[..], &b"bb\n"[..], &b"\n"[..], &b"c\n"[..]]);
    }

    #[test]
    fn final_line_without_newline() {
        let lines: Vec<&[u8]> = Lines::new(b"a\ntail").collect();
        assert_eq!(lines, [&b"a\n"[..], &b"tail"[..]]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(Lines::new(b"").count(), 0);
    }
}
