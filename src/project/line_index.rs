//! Offset bookkeeping for one file's text
//!
//! tree-sitter addresses text in UTF-8 bytes, callers address it in UTF-16 code units
//! and read results as 1-based line/column. `LineIndex` converts between all three.

/// Precomputed line starts and (for non-ASCII text) per-char offset tables
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of every line
    line_starts: Vec<usize>,
    /// `(byte_offset, utf16_offset)` at every char boundary; empty for ASCII text
    char_offsets: Vec<(usize, usize)>,
    byte_len: usize,
    utf16_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }

        let mut char_offsets = Vec::new();
        let utf16_len = if text.is_ascii() {
            text.len()
        } else {
            let mut utf16 = 0;
            char_offsets.reserve(text.len());
            for (byte, ch) in text.char_indices() {
                char_offsets.push((byte, utf16));
                utf16 += ch.len_utf16();
            }
            char_offsets.push((text.len(), utf16));
            utf16
        };

        Self {
            line_starts,
            char_offsets,
            byte_len: text.len(),
            utf16_len,
        }
    }

    /// Length of the text in UTF-16 code units
    pub fn utf16_len(&self) -> usize {
        self.utf16_len
    }

    /// Byte offset for a UTF-16 offset; `None` past the end of the text
    ///
    /// An offset that falls inside a surrogate pair maps to the start of that char.
    pub fn byte_offset(&self, utf16: usize) -> Option<usize> {
        if utf16 > self.utf16_len {
            return None;
        }
        if self.char_offsets.is_empty() {
            return Some(utf16);
        }
        let idx = match self
            .char_offsets
            .binary_search_by(|&(_, u)| u.cmp(&utf16))
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        Some(self.char_offsets[idx].0)
    }

    /// UTF-16 offset for a byte offset (clamped to the end of the text)
    pub fn utf16_offset(&self, byte: usize) -> usize {
        let byte = byte.min(self.byte_len);
        if self.char_offsets.is_empty() {
            return byte;
        }
        match self.char_offsets.binary_search_by(|&(b, _)| b.cmp(&byte)) {
            Ok(i) => self.char_offsets[i].1,
            Err(i) => self.char_offsets[i.saturating_sub(1)].1,
        }
    }

    /// 0-based line containing a byte offset
    pub fn line_of(&self, byte: usize) -> usize {
        match self.line_starts.binary_search(&byte) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// 1-based line and 1-based UTF-16 column of a byte offset
    pub fn line_col(&self, byte: usize) -> (usize, usize) {
        let byte = byte.min(self.byte_len);
        let line = self.line_of(byte);
        let start = self.line_starts[line];
        let column = self.utf16_offset(byte) - self.utf16_offset(start);
        (line + 1, column + 1)
    }

    /// Byte offset where a 0-based line starts
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.byte_len)
    }

    /// Text of the 0-based line containing `byte`, without the line terminator
    pub fn line_text<'a>(&self, text: &'a str, byte: usize) -> &'a str {
        let line = self.line_of(byte.min(self.byte_len));
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.byte_len);
        text[start..end].trim_end_matches(['\n', '\r'])
    }

    /// Leading whitespace of the line containing `byte`
    pub fn indentation_at<'a>(&self, text: &'a str, byte: usize) -> &'a str {
        let line = self.line_text(text, byte);
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_identity() {
        let index = LineIndex::new("let a = 1;\nlet b = 2;\n");
        assert_eq!(index.byte_offset(4), Some(4));
        assert_eq!(index.utf16_offset(15), 15);
        assert_eq!(index.line_col(15), (2, 5));
        assert_eq!(index.byte_offset(23), None);
    }

    #[test]
    fn test_non_ascii_offsets() {
        // "é" is 2 bytes / 1 unit, "😀" is 4 bytes / 2 units
        let text = "const é = '😀'; x";
        let index = LineIndex::new(text);
        let x_byte = text.find('x').unwrap();
        let x_utf16 = text[..x_byte].encode_utf16().count();

        assert_eq!(index.byte_offset(x_utf16), Some(x_byte));
        assert_eq!(index.utf16_offset(x_byte), x_utf16);
        assert_eq!(index.utf16_len(), text.encode_utf16().count());
        assert_eq!(index.line_col(x_byte), (1, x_utf16 + 1));
    }

    #[test]
    fn test_line_text_and_indentation() {
        let text = "function f() {\n    return 1;\r\n}\n";
        let index = LineIndex::new(text);
        let ret = text.find("return").unwrap();
        assert_eq!(index.line_text(text, ret), "    return 1;");
        assert_eq!(index.indentation_at(text, ret), "    ");
        assert_eq!(index.line_start(1), 15);
    }
}
