/// ASCII case fold. Non-ASCII characters pass through unchanged.
pub fn to_lowercase(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// Split on ASCII whitespace (vertical tab included) and strip ASCII punctuation from every piece.
///
/// Case is preserved; callers that need case-insensitive matching lowercase
/// first (see [`normalize`]). Pieces that are pure punctuation vanish
/// instead of producing an empty token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_ascii_whitespace() || c == '\x0B')
        .map(strip_punctuation)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Lowercase then tokenize, the form used by the index and the reformulator.
pub fn normalize(text: &str) -> Vec<String> {
    tokenize(&to_lowercase(text))
}

fn strip_punctuation(piece: &str) -> String {
    piece.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}
