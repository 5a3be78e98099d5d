//! Character stream over a single statement
//!
//! The reader hands out one character at a time and supports saving and
//! restoring its position, which the dispatcher uses to back out of a token
//! that belongs to the next command on the same line.

use millforge_core::GcodeError;

/// Sub-code value meaning "no `.<n>` suffix was given"
pub const NO_SUB_CODE: u8 = 255;

/// Cursor over one G-code statement
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> StreamReader<'a> {
    /// Create a reader positioned at the start of `line`
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Next character without consuming it
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Next character, upper-cased, without consuming it
    pub fn peek_upper(&self) -> Option<char> {
        self.peek().map(|ch| ch.to_ascii_uppercase())
    }

    /// Consume and return the next character
    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Skip blanks and tabs
    pub fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.next_char();
        }
    }

    /// Skip blanks and return the next character upper-cased
    pub fn skip_spaces_to_upper(&mut self) -> Option<char> {
        self.skip_spaces();
        self.peek_upper()
    }

    /// Current byte offset, for [`reset_to`](Self::reset_to)
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restore a position previously returned by [`position`](Self::position)
    pub fn reset_to(&mut self, pos: usize) {
        self.pos = pos.min(self.line.len());
    }

    /// True when every character has been consumed
    pub fn is_end(&self) -> bool {
        self.pos >= self.line.len()
    }

    /// Unconsumed rest of the statement
    pub fn remaining(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// True when the next character starts a comment
    pub fn is_comment_start(&self) -> bool {
        matches!(self.peek(), Some('(') | Some(';'))
    }

    /// Skip one comment if the reader is positioned on one
    ///
    /// Returns the comment text without its delimiters.
    pub fn skip_comment(&mut self) -> Option<&'a str> {
        match self.peek()? {
            '(' => {
                self.next_char();
                let rest = self.remaining();
                let (text, consumed) = match rest.find(')') {
                    Some(end) => (&rest[..end], end + 1),
                    None => (rest, rest.len()),
                };
                self.pos += consumed;
                Some(text)
            }
            ';' => {
                self.next_char();
                let text = self.remaining();
                self.pos = self.line.len();
                Some(text)
            }
            _ => None,
        }
    }

    /// Skip whitespace and comments
    pub fn skip_spaces_or_comment(&mut self) {
        loop {
            self.skip_spaces();
            if self.skip_comment().is_none() {
                break;
            }
        }
    }

    /// Fail unless only whitespace or comments remain
    pub fn expect_end_of_command(&mut self) -> Result<(), GcodeError> {
        self.skip_spaces_or_comment();
        match self.peek() {
            None => Ok(()),
            Some(found) => Err(GcodeError::UnexpectedToken { found }),
        }
    }

    /// Read an unsigned integer
    ///
    /// Returns `None` without consuming anything when no digit follows.
    pub fn read_uint(&mut self) -> Option<u32> {
        let digits = self
            .remaining()
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let text = &self.remaining()[..digits];
        self.pos += digits;
        // overflow saturates so range checks downstream reject the value
        Some(text.parse().unwrap_or(u32::MAX))
    }

    /// Read a decimal number with optional sign and fraction
    ///
    /// Returns `None` and leaves the position unchanged when no number
    /// starts here.
    pub fn read_decimal(&mut self) -> Option<f64> {
        let start = self.pos;
        let bytes = self.remaining().as_bytes();
        let mut len = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            len += 1;
        }
        let int_digits = bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
        len += int_digits;
        let mut frac_digits = 0;
        if bytes.get(len) == Some(&b'.') {
            frac_digits = bytes[len + 1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if int_digits + frac_digits > 0 {
                len += 1 + frac_digits;
            }
        }
        if int_digits + frac_digits == 0 {
            return None;
        }
        let text = &self.line[start..start + len];
        self.pos += len;
        text.parse().ok()
    }

    /// Read a `.<n>` sub-code, [`NO_SUB_CODE`] when absent
    pub fn read_sub_code(&mut self) -> u8 {
        if self.peek() != Some('.') {
            return NO_SUB_CODE;
        }
        let save = self.pos;
        self.next_char();
        match self.read_uint() {
            Some(value) if value < u32::from(NO_SUB_CODE) => value as u8,
            Some(_) => NO_SUB_CODE,
            None => {
                self.reset_to(save);
                NO_SUB_CODE
            }
        }
    }

    /// Read an ASCII word (letters, digits and underscore)
    pub fn read_word(&mut self) -> &'a str {
        let len = self
            .remaining()
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        let word = &self.remaining()[..len];
        self.pos += len;
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_forms() {
        let mut rd = StreamReader::new("12.5 -.25 +3 7. x");
        assert_eq!(rd.read_decimal(), Some(12.5));
        rd.skip_spaces();
        assert_eq!(rd.read_decimal(), Some(-0.25));
        rd.skip_spaces();
        assert_eq!(rd.read_decimal(), Some(3.0));
        rd.skip_spaces();
        assert_eq!(rd.read_decimal(), Some(7.0));
        rd.skip_spaces();
        assert_eq!(rd.read_decimal(), None);
        assert_eq!(rd.peek(), Some('x'));
    }

    #[test]
    fn test_sign_without_digits_is_not_a_number() {
        let mut rd = StreamReader::new("-X");
        assert_eq!(rd.read_decimal(), None);
        assert_eq!(rd.position(), 0);
    }

    #[test]
    fn test_sub_code() {
        let mut rd = StreamReader::new(".12 X");
        assert_eq!(rd.read_sub_code(), 12);
        let mut rd = StreamReader::new(" X");
        assert_eq!(rd.read_sub_code(), NO_SUB_CODE);
        let mut rd = StreamReader::new(".X");
        assert_eq!(rd.read_sub_code(), NO_SUB_CODE);
        assert_eq!(rd.peek(), Some('.'));
    }

    #[test]
    fn test_comments_are_skipped() {
        let mut rd = StreamReader::new("  (first) (second ; x) ; rest");
        rd.skip_spaces_or_comment();
        assert!(rd.is_end());

        let mut rd = StreamReader::new("(MSG,hello)X");
        assert_eq!(rd.skip_comment(), Some("MSG,hello"));
        assert_eq!(rd.peek(), Some('X'));
    }

    #[test]
    fn test_expect_end_of_command() {
        assert!(StreamReader::new(" ; done").expect_end_of_command().is_ok());
        assert_eq!(
            StreamReader::new(" (c) Q").expect_end_of_command(),
            Err(GcodeError::UnexpectedToken { found: 'Q' })
        );
    }

    #[test]
    fn test_save_and_restore() {
        let mut rd = StreamReader::new("G38.2");
        let save = rd.position();
        assert_eq!(rd.next_char(), Some('G'));
        assert_eq!(rd.read_uint(), Some(38));
        rd.reset_to(save);
        assert_eq!(rd.remaining(), "G38.2");
    }
}
