//! Lexical tokenizer for Indo-European scripts
//!
//! Every delimiter character is returned as a token of its own, the runs
//! between delimiters are further split at letter→digit and digit→non-digit
//! boundaries, so `"GSE12345a"` gives `["GSE", "12345", "a"]`.

/// Characters that end a token and are emitted as single-character tokens
pub const DELIMITERS: &str = " \n\r\t([^%‰°,:;?.!/)-–−=≈<>+\"“”‘’'`$®]*\u{2666}\u{2665}\u{2663}\u{2660}\u{00A0}";

/// Whether the character is a token delimiter
pub fn is_delimiter_char(c: char) -> bool {
    DELIMITERS.contains(c)
}

/// Whether a token consists of a single delimiter character
pub fn is_delimiter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_delimiter_char(c))
}

/// Split text into tokens, delimiters included, in input order
///
/// Concatenating the tokens gives back the input.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if is_delimiter_char(c) {
            if start < idx {
                split_alphanumeric(&text[start..idx], &mut tokens);
            }
            let end = idx + c.len_utf8();
            tokens.push(&text[idx..end]);
            start = end;
        }
    }
    if start < text.len() {
        split_alphanumeric(&text[start..], &mut tokens);
    }

    tokens
}

/// Tokens that carry lexical content (no delimiters, no blanks)
pub fn content_tokens(text: &str) -> impl Iterator<Item = &str> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_delimiter(t) && !t.trim().is_empty())
}

fn split_alphanumeric<'a>(run: &'a str, tokens: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut previous: Option<char> = None;

    for (idx, c) in run.char_indices() {
        if let Some(prev) = previous {
            let letter_to_digit = prev.is_ascii_alphabetic() && c.is_ascii_digit();
            let digit_to_other = prev.is_ascii_digit() && !c.is_ascii_digit();
            if letter_to_digit || digit_to_other {
                tokens.push(&run[start..idx]);
                start = idx;
            }
        }
        previous = Some(c);
    }
    tokens.push(&run[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiters_are_tokens() {
        assert_eq!(
            tokenize("Iris data (UCI)."),
            vec!["Iris", " ", "data", " ", "(", "UCI", ")", "."]
        );
    }

    #[test]
    fn test_letter_digit_split() {
        assert_eq!(tokenize("GSE12345a"), vec!["GSE", "12345", "a"]);
        assert_eq!(tokenize("3x"), vec!["3", "x"]);
        // digit after a non-ASCII letter is not split
        assert_eq!(tokenize("é1"), vec!["é1"]);
    }

    #[test]
    fn test_non_ascii_delimiters() {
        assert_eq!(tokenize("a–b"), vec!["a", "–", "b"]);
        assert_eq!(tokenize("x\u{00A0}y"), vec!["x", "\u{00A0}", "y"]);
    }

    #[test]
    fn test_concatenation_restores_input() {
        let text = "We deposited 1,024 reads (SRA: SRP001234) at 4°C - see “Table 2”.";
        assert_eq!(tokenize(text).concat(), text);
    }

    #[test]
    fn test_content_tokens() {
        let tokens: Vec<&str> = content_tokens("  The data, 42 samples.").collect();
        assert_eq!(tokens, vec!["The", "data", "42", "samples"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(!is_delimiter(""));
        assert!(is_delimiter("("));
        assert!(!is_delimiter("(("));
    }
}
