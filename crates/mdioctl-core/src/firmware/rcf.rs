//! RCF text decoding
//!
//! An RCF image is a newline-separated list of 16-character binary
//! strings, one 16-bit word per line, most significant bit first.

use std::path::Path;

use crate::error::{Error, FramingError, Result};

/// Characters per encoded word
pub const WORD_CHARS: usize = 16;

/// Decode one line into a word
pub fn decode_word(text: &str) -> Option<u16> {
    if text.len() != WORD_CHARS || !text.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u16::from_str_radix(text, 2).ok()
}

/// Decode RCF text into words
///
/// Blank lines are skipped; any other line that is not a 16-character
/// binary string is an error.
pub fn decode_words(text: &str) -> Result<Vec<u16>> {
    let mut words = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let word = decode_word(line).ok_or_else(|| FramingError::InvalidWord {
            line: index + 1,
            text: line.to_string(),
        })?;
        words.push(word);
    }
    Ok(words)
}

/// Read and decode an RCF file
pub fn read_words(path: impl AsRef<Path>) -> Result<Vec<u16>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_words(&text)
}

/// Encode words as RCF text, one line per word
pub fn encode_words(words: &[u16]) -> String {
    words.iter().map(|w| format!("{:016b}\n", w)).collect()
}

/// Check that `words` ends with `sentinel` and return the words before it
pub(crate) fn strip_sentinel(words: &[u16], sentinel: u16) -> Result<&[u16]> {
    match words.split_last() {
        Some((&last, body)) if last == sentinel => Ok(body),
        _ => Err(FramingError::MissingSentinel { expected: sentinel }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_word() {
        assert_eq!(decode_word("1000000000000110"), Some(0x8006));
        assert_eq!(decode_word("1101111011101111"), Some(0xDEEF));
        assert_eq!(decode_word("100000000000011"), None);
        assert_eq!(decode_word("100000000000011x"), None);
    }

    #[test]
    fn test_decode_words() {
        let words = decode_words("0000000000000001\r\n\n1111111111111111\n").unwrap();
        assert_eq!(words, vec![0x0001, 0xFFFF]);
        assert_eq!(encode_words(&words), "0000000000000001\n1111111111111111\n");
    }

    #[test]
    fn test_invalid_line() {
        assert!(matches!(
            decode_words("0000000000000001\nhello\n"),
            Err(Error::Framing(FramingError::InvalidWord { line: 2, .. }))
        ));
    }

    #[test]
    fn test_strip_sentinel() {
        assert_eq!(strip_sentinel(&[1, 2, 0xDEAD], 0xDEAD).unwrap(), &[1, 2]);
        assert!(strip_sentinel(&[1, 2], 0xDEAD).is_err());
        assert!(strip_sentinel(&[], 0xDEAD).is_err());
    }
}
