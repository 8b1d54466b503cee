//! Byte budgets for returned log content.

pub const TRUNCATED_MARKER: &str = "[Content truncated due to size limits]\n";
pub const SKIPPED_PLACEHOLDER: &str = "[Log content skipped due to total size limits]";

/// Keep the longest suffix of `lines` whose `\n`-joined form fits in `max_bytes`.
///
/// Returns the kept lines and whether anything was dropped. Sizes are UTF-8
/// byte lengths.
pub fn truncate_to_byte_budget<'a>(lines: &[&'a str], max_bytes: usize) -> (Vec<&'a str>, bool) {
    let mut used = 0usize;
    let mut first_kept = lines.len();
    for (idx, line) in lines.iter().enumerate().rev() {
        let separator = usize::from(first_kept < lines.len());
        let next = used + line.len() + separator;
        if next > max_bytes {
            break;
        }
        used = next;
        first_kept = idx;
    }
    (lines[first_kept..].to_vec(), first_kept > 0)
}

/// Cumulative accounting for one response.
#[derive(Debug, Clone)]
pub struct ByteBudget {
    per_file: usize,
    total: usize,
    used: usize,
}

impl ByteBudget {
    pub fn new(per_file: usize, total: usize) -> Self {
        Self { per_file, total, used: 0 }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.total
    }

    /// Shape one file's selected lines into its stored content and charge it.
    pub fn admit(&mut self, lines: &[&str]) -> String {
        if self.is_exhausted() {
            return SKIPPED_PLACEHOLDER.to_string();
        }
        let joined = lines.join("\n");
        let content = if joined.len() > self.per_file {
            let (kept, _) = truncate_to_byte_budget(lines, self.per_file);
            format!("{TRUNCATED_MARKER}{}", kept.join("\n"))
        } else {
            joined
        };
        self.used += content.len();
        content
    }

    /// Charge text that bypasses shaping, e.g. an error message.
    pub fn charge(&mut self, text: &str) {
        self.used += text.len();
    }
}
