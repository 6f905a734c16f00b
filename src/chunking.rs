use crate::document::Document;
use crate::error::LoadError;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Window size and overlap for splitting, both in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    size: usize,
    overlap: usize,
}

impl ChunkOptions {
    /// Validate and build chunking options; requires `size > 0` and `overlap < size`
    pub fn new(size: usize, overlap: usize) -> Result<Self, LoadError> {
        if size == 0 || overlap >= size {
            return Err(LoadError::InvalidChunking { size, overlap });
        }
        Ok(ChunkOptions { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        ChunkOptions {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Represents a text chunk with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Starting character position of this chunk in the original text
    pub start_position: usize,
}

/// Split text into windows of at most `size` characters.
///
/// A window is cut at the last paragraph break, line break or whitespace it
/// contains, as long as that keeps it at least half a window long (and longer
/// than the overlap). The next window starts `overlap` characters before the
/// previous one ended, so neighbours share exactly `overlap` characters.
pub fn split_text(text: &str, options: &ChunkOptions) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let hard_end = (start + options.size).min(total);
        let end = if hard_end == total {
            total
        } else {
            let min_end = start + (options.overlap + 1).max(options.size / 2);
            find_break(&chars, min_end, hard_end).unwrap_or(hard_end)
        };

        chunks.push(TextChunk {
            text: chars[start..end].iter().collect(),
            start_position: start,
        });

        if end == total {
            break;
        }
        start = end - options.overlap;
    }

    let is_blank = |chunk: &TextChunk| chunk.text.trim().is_empty();
    while chunks.last().is_some_and(is_blank) {
        chunks.pop();
    }
    let leading = chunks.iter().take_while(|chunk| is_blank(chunk)).count();
    chunks.drain(..leading);

    chunks
}

/// Best end position in `min_end..=max_end`, preferring paragraph breaks,
/// then line breaks, then any whitespace
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    if min_end > max_end {
        return None;
    }

    let candidates = || (min_end.max(1)..=max_end).rev();

    candidates()
        .find(|&end| end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n')
        .or_else(|| candidates().find(|&end| chars[end - 1] == '\n'))
        .or_else(|| candidates().find(|&end| chars[end - 1].is_whitespace()))
}

/// Split every document into chunks, recording each chunk's `start_index`
pub fn split_documents(documents: &[Document], options: &ChunkOptions) -> Vec<Document> {
    documents
        .iter()
        .flat_map(|document| {
            split_text(&document.content, options)
                .into_iter()
                .map(move |chunk| Document {
                    content: chunk.text,
                    metadata: document.metadata.clone(),
                }
                .with_metadata("start_index", chunk.start_position))
        })
        .collect()
}
