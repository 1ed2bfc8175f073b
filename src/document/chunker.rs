//! Fixed-size text chunking.
//!
//! Chunk length is counted in `char`s, so a chunk never splits a code point.
//! There is no word or sentence awareness: a chunk may end mid-word.

/// Form feed, emitted by text extractors between pages.
pub const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub start_page: u32,
    pub end_page: u32,
}

/// Splits `text` into contiguous, non-overlapping pieces of at most
/// `chunk_size` chars. Concatenating the result reproduces `text`; empty
/// input yields no chunks. A `chunk_size` of zero is treated as one.
pub fn split(text: &str, chunk_size: usize) -> Vec<String> {
    spans(text, chunk_size)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

/// Like [`split`], also tagging each chunk with the 1-based pages it spans.
pub fn split_with_pages(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    let mut page = 1u32;
    let mut chunks = Vec::new();

    for (start, end) in spans(text, chunk_size) {
        let piece = &text[start..end];

        // A break as the final char closes the page; the text after it starts the next.
        let last_char = piece.char_indices().last().map(|(idx, _)| idx).unwrap_or(0);
        let body = &piece[..last_char];
        let leading = body.chars().take_while(|c| *c == PAGE_BREAK).count() as u32;

        let start_page = page + leading;
        let end_page = page + count_breaks(body);

        page += count_breaks(piece);

        chunks.push(TextChunk {
            text: piece.to_string(),
            start_page,
            end_page,
        });
    }

    chunks
}

fn count_breaks(s: &str) -> u32 {
    s.matches(PAGE_BREAK).count() as u32
}

fn spans(text: &str, chunk_size: usize) -> Vec<(usize, usize)> {
    let size = chunk_size.max(1);
    let mut spans = Vec::new();
    let mut start = 0;

    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            spans.push((start, idx));
            start = idx;
        }
    }

    if start < text.len() {
        spans.push((start, text.len()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split("", 10).is_empty());
        assert!(split_with_pages("", 10).is_empty());
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let text = "The quick brown fox jumps over the lazy dog";
        for size in 1..=50 {
            let chunks = split(text, size);
            assert_eq!(chunks.concat(), text);
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
            let expected = (text.chars().count() + size - 1) / size;
            assert_eq!(chunks.len(), expected);
        }
    }

    #[test]
    fn test_last_chunk_may_be_shorter() {
        let chunks = split("abcdefg", 3);
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(split("abcdef", 3), vec!["abc", "def"]);
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "बीमा पॉलिसी";
        let chunks = split(text, 4);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_zero_size_treated_as_one() {
        assert_eq!(split("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_page_tracking() {
        let text = "aaaa\u{c}bbbb\u{c}cc";
        let chunks = split_with_pages(text, 5);
        // "aaaa\f" | "bbbb\f" | "cc"
        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start_page, chunks[0].end_page), (1, 1));
        assert_eq!((chunks[1].start_page, chunks[1].end_page), (2, 2));
        assert_eq!((chunks[2].start_page, chunks[2].end_page), (3, 3));

        let spanning = split_with_pages(text, 8);
        // "aaaa\fbbb" | "b\fcc"
        assert_eq!((spanning[0].start_page, spanning[0].end_page), (1, 2));
        assert_eq!((spanning[1].start_page, spanning[1].end_page), (2, 3));
    }

    #[test]
    fn test_leading_page_break_starts_on_next_page() {
        let chunks = split_with_pages("aaaa\u{c}bb", 4);
        // "aaaa" | "\fbb"
        assert_eq!((chunks[0].start_page, chunks[0].end_page), (1, 1));
        assert_eq!((chunks[1].start_page, chunks[1].end_page), (2, 2));

        let blank_pages = split_with_pages("ab\u{c}\u{c}\u{c}cd", 2);
        // "ab" | "\f\f" | "\fc" | "d"
        assert_eq!((blank_pages[1].start_page, blank_pages[1].end_page), (2, 2));
        assert_eq!((blank_pages[2].start_page, blank_pages[2].end_page), (4, 4));
        assert_eq!((blank_pages[3].start_page, blank_pages[3].end_page), (4, 4));
    }

    #[test]
    fn test_text_without_breaks_is_page_one() {
        let chunks = split_with_pages("plain text body", 4);
        assert!(chunks.iter().all(|c| c.start_page == 1 && c.end_page == 1));
    }
}
