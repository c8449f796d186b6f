//! Fixed-size overlapping text chunker.
//!
//! Splits document text into chunks of at most `chunk_size` characters,
//! with consecutive chunks sharing `overlap` characters. Offsets are in
//! characters, not bytes, so multi-byte input never splits a code point.
//!
//! The split is deterministic and gapless: dropping the first `overlap`
//! characters of every chunk after the first reconstructs the input.

use anyhow::{bail, Result};

/// Split `text` into overlapping chunks.
///
/// Returns an empty sequence for empty input. `chunk_size == 0` or
/// `overlap >= chunk_size` is a configuration error.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        bail!("chunk_size must be > 0");
    }
    if overlap >= chunk_size {
        bail!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap,
            chunk_size
        );
    }

    if text.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drop each chunk's leading overlap and concatenate.
    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(c);
            } else {
                out.extend(c.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk("hello world", 800, 120).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(chunk("", 800, 120).unwrap().is_empty());
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let chunks = chunk(&text, 30, 10).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 10).collect();
            let head: String = pair[1].chars().take(10).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn reconstruction_exact() {
        let texts = [
            "".to_string(),
            "short".to_string(),
            "The quick brown fox jumps over the lazy dog. ".repeat(40),
            "naïve café — résumé ☕ 日本語テキスト ".repeat(30),
        ];
        for text in &texts {
            for &(size, overlap) in &[(800usize, 120usize), (50, 10), (7, 3), (2, 1)] {
                let chunks = chunk(text, size, overlap).unwrap();
                assert_eq!(
                    &reassemble(&chunks, overlap),
                    text,
                    "size={} overlap={}",
                    size,
                    overlap
                );
            }
        }
    }

    #[test]
    fn deterministic() {
        let text = "Paragraph one. Paragraph two. Paragraph three.".repeat(20);
        let a = chunk(&text, 64, 16).unwrap();
        let b = chunk(&text, 64, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(chunk("text", 0, 0).is_err());
        assert!(chunk("text", 10, 10).is_err());
        assert!(chunk("text", 10, 11).is_err());
    }

    #[test]
    fn multibyte_boundaries_do_not_panic() {
        let text = "🦀".repeat(25);
        let chunks = chunk(&text, 10, 4).unwrap();
        assert_eq!(reassemble(&chunks, 4), text);
    }
}
