use unicode_categories::UnicodeCategories;

/// A word token with character (code point) offsets into the source text.
///
/// Spans are half-open, `start < end`, and strictly increasing across a
/// token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The token text, borrowed from the source
    pub text: &'a str,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
}

impl Token<'_> {
    /// Number of characters in the token
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Returns true for characters that belong to a word: Unicode letters,
/// Unicode numbers and the hyphen.
pub fn is_word_char(c: char) -> bool {
    c == '-' || c.is_letter() || c.is_number()
}

/// Lazy iterator over the word tokens of a text.
///
/// Cloning the iterator restarts from the clone point, so a tokenizer taken
/// fresh from [`tokenize`] can be replayed any number of times.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    text: &'a str,
    byte_pos: usize,
    char_pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte_pos: 0,
            char_pos: 0,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.byte_pos..];
        let mut chars = rest.char_indices();

        // Skip separators
        let (word_offset, first) = loop {
            let (offset, c) = chars.next()?;
            if is_word_char(c) {
                break (offset, c);
            }
            self.char_pos += 1;
        };

        let start_byte = self.byte_pos + word_offset;
        let start_char = self.char_pos;
        let mut end_byte = start_byte + first.len_utf8();
        let mut len = 1;

        for (offset, c) in chars {
            if !is_word_char(c) {
                break;
            }
            end_byte = self.byte_pos + offset + c.len_utf8();
            len += 1;
        }

        self.byte_pos = end_byte;
        self.char_pos = start_char + len;

        Some(Token {
            text: &self.text[start_byte..end_byte],
            start: start_char,
            end: start_char + len,
        })
    }
}

impl std::iter::FusedIterator for Tokenizer<'_> {}

/// Splits text into maximal runs of letters, numbers and hyphens
pub fn tokenize(text: &str) -> Tokenizer<'_> {
    Tokenizer::new(text)
}
