//! Sentence-based text chunking with overlap.

/// Default maximum chunk size, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap carried into the next chunk, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Splits text into sentence-aligned chunks.
///
/// Chunks hold whole sentences and are at most `chunk_size` characters,
/// except when a single sentence is longer. Each chunk after the first
/// starts with the trailing sentences of its predecessor that fit in
/// `chunk_overlap` characters. Chunking stops once the last sentence has
/// been emitted, so the tail is never repeated as a chunk of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    #[must_use]
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk `text`. Whitespace runs are collapsed to single spaces first.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let sentences = split_sentences(&normalized);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < sentences.len() {
            let mut size = 0;
            let mut end = start;
            for sentence in &sentences[start..] {
                let addition = char_len(sentence) + usize::from(end > start);
                if end > start && size + addition > self.chunk_size {
                    break;
                }
                size += addition;
                end += 1;
            }

            let current = &sentences[start..end];
            chunks.push(current.join(" "));
            if end == sentences.len() {
                break;
            }

            let overlap = self.overlap_sentences(current);
            start = (end - overlap).max(start + 1);
        }

        chunks
    }

    /// How many trailing sentences of `chunk` fit in the overlap budget.
    fn overlap_sentences(&self, chunk: &[&str]) -> usize {
        if self.chunk_overlap == 0 {
            return 0;
        }

        let mut size = 0;
        let mut count = 0;
        for (i, sentence) in chunk.iter().enumerate().rev() {
            let len = char_len(sentence) + usize::from(i + 1 < chunk.len());
            if size + len > self.chunk_overlap {
                break;
            }
            size += len;
            count += 1;
        }
        count
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split whitespace-normalized text into sentences.
///
/// A boundary is `.`, `!` or `?` followed by a space and an uppercase
/// letter. Dotted letter abbreviations (`e.g.`, `U.S.`) and personal titles
/// (`Mr.`, `Dr.`) do not end a sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next_is_space = chars.get(i + 1).is_some_and(|(_, n)| *n == ' ');
        let then_upper = chars.get(i + 2).is_some_and(|(_, n)| n.is_uppercase());
        if !next_is_space || !then_upper || is_abbreviation(&chars, i) {
            continue;
        }

        let end = pos + c.len_utf8();
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Titles that are written with a trailing dot before a name.
const TITLES: &[&str] = &["Mr", "Mrs", "Ms", "Dr", "Prof", "St"];

/// Whether the terminator at `i` closes an abbreviation rather than a sentence.
fn is_abbreviation(chars: &[(usize, char)], i: usize) -> bool {
    let at = |offset: usize| i.checked_sub(offset).map(|j| chars[j].1);
    let is_letter = |c: Option<char>| c.is_some_and(char::is_alphabetic);

    // "e.g." / "U.S.": letter, dot, letter, terminator.
    if is_letter(at(3)) && at(2) == Some('.') && is_letter(at(1)) {
        return true;
    }

    if chars[i].1 != '.' {
        return false;
    }

    // The whole word before the dot must be a known title.
    let start = chars[..i]
        .iter()
        .rposition(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(0, |j| j + 1);
    let word: String = chars[start..i].iter().map(|(_, c)| c).collect();
    TITLES.contains(&word.as_str())
}
