use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::Result;

/// Reads whole log files as text and selects the lines a caller asked for.
#[derive(Clone, Default)]
pub struct LogReader;

impl LogReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the full file and decode it. BOMs are honoured; files without one
    /// are taken as UTF-8 when valid, otherwise decoded with a detected encoding.
    pub async fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(decode(&bytes))
    }
}

pub fn decode(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Split on `\n` or `\r\n`. A trailing newline yields a final empty line.
pub fn split_lines(content: &str) -> Vec<&str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Keep lines containing `filter`, ignoring case. `None` keeps everything.
pub fn filter_lines<'a>(lines: Vec<&'a str>, filter: Option<&str>) -> Vec<&'a str> {
    let Some(filter) = filter else {
        return lines;
    };
    let needle = filter.to_lowercase();
    lines
        .into_iter()
        .filter(|line| line.to_lowercase().contains(&needle))
        .collect()
}

/// Last `count` lines; `None` returns them all.
pub fn tail<'a, 'b>(lines: &'b [&'a str], count: Option<usize>) -> &'b [&'a str] {
    match count {
        Some(n) if n < lines.len() => &lines[lines.len() - n..],
        _ => lines,
    }
}
