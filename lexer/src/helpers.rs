pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

/// Everything that ends a word: whitespace, a symbol or an opening quote.
pub fn is_word_boundary(ch: u8) -> bool {
    ch.is_ascii_whitespace() || ch == b'"' || token::look_up_symbol(ch).is_some()
}
