//! Backslash escape sequences.

/// Outcome of the character that follows a backslash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeStart {
    /// Not an escape: the character stands for itself
    Literal,
    /// A complete single-character escape
    Decoded(char),
    /// The first step of a numeric escape
    Numeric(NumericEscape),
}

/// A numeric escape that is still collecting digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NumericEscape {
    radix: u32,
    remaining: u8,
    value: u32,
}

impl NumericEscape {
    const fn new(radix: u32, digits: u8, value: u32) -> Self {
        NumericEscape {
            radix,
            remaining: digits,
            value,
        }
    }

    /// Feed the next digit. Returns the decoded character once the required
    /// number of digits has been seen. A character that is not a digit of
    /// the radix counts as zero; a value that is not a Unicode scalar decodes
    /// to U+FFFD.
    pub(crate) fn push(&mut self, c: char) -> Option<char> {
        let digit = c.to_digit(self.radix).unwrap_or(0);
        self.value = self.value * self.radix + digit;
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(char::from_u32(self.value).unwrap_or(char::REPLACEMENT_CHARACTER))
        } else {
            None
        }
    }
}

/// Classify the character after a backslash.
pub(crate) fn begin(c: char) -> EscapeStart {
    match c {
        'n' => EscapeStart::Decoded('\n'),
        'r' => EscapeStart::Decoded('\r'),
        't' => EscapeStart::Decoded('\t'),
        'b' => EscapeStart::Decoded('\u{8}'),
        'f' => EscapeStart::Decoded('\u{c}'),
        'e' => EscapeStart::Decoded('\u{1b}'),
        'v' => EscapeStart::Decoded('\u{b}'),
        'a' => EscapeStart::Decoded('\u{7}'),
        // A bare octal digit is the first of three
        '0'..='7' => EscapeStart::Numeric(NumericEscape::new(8, 2, c as u32 - '0' as u32)),
        'o' | 'O' => EscapeStart::Numeric(NumericEscape::new(8, 3, 0)),
        'd' | 'D' => EscapeStart::Numeric(NumericEscape::new(10, 3, 0)),
        'x' | 'X' => EscapeStart::Numeric(NumericEscape::new(16, 2, 0)),
        'u' | 'U' => EscapeStart::Numeric(NumericEscape::new(16, 4, 0)),
        _ => EscapeStart::Literal,
    }
}
