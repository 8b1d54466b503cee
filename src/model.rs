use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_LINES: i64 = 100;
pub const DEFAULT_FILE_LIMIT: i64 = 5;
pub const DEFAULT_PAGE: i64 = 1;

/// A log file discovered during one request, with its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileRef {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl LogFileRef {
    /// Base file name used as the key in the result map.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Tool arguments for `read_mcp_logs`. Absent or `null` fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadLogsRequest {
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub lines: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub file_limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
}

impl ReadLogsRequest {
    /// Lines to keep from the end of each file; `None` keeps all of them.
    pub fn tail_lines(&self) -> Option<usize> {
        let lines = self.lines.unwrap_or(DEFAULT_LINES);
        (lines > 0).then_some(lines as usize)
    }

    pub fn files_per_page(&self) -> usize {
        self.file_limit.unwrap_or(DEFAULT_FILE_LIMIT).max(1) as usize
    }

    pub fn page_number(&self) -> usize {
        self.page.unwrap_or(DEFAULT_PAGE).max(1) as usize
    }

    pub fn filter_text(&self) -> Option<&str> {
        self.filter.as_deref().filter(|f| !f.is_empty())
    }

    pub fn custom_dir(&self) -> Option<&str> {
        self.custom_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Accept any JSON number; fractions truncate toward zero.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(n) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    if n.as_u64().is_some() {
        return Ok(Some(i64::MAX));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => Ok(Some(f.trunc() as i64)),
        _ => Err(serde::de::Error::custom(format!("invalid number: {n}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub files_per_page: usize,
    pub total_files: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// Compute the page window. Returns the metadata and the `[start, end)` range
    /// of the sorted file list to read; the range is empty when the page is out
    /// of bounds.
    pub fn compute(
        page: usize,
        files_per_page: usize,
        total_files: usize,
    ) -> (Self, std::ops::Range<usize>) {
        let page = page.max(1);
        let files_per_page = files_per_page.max(1);
        let start = (page - 1).saturating_mul(files_per_page).min(total_files);
        let end = start.saturating_add(files_per_page).min(total_files);
        let pagination = Pagination {
            current_page: page,
            files_per_page,
            total_files,
            total_pages: total_files.div_ceil(files_per_page),
            has_next_page: end < total_files,
            has_previous_page: page > 1,
        };
        (pagination, start..end)
    }
}

/// Filename → content (or error/placeholder text), kept in read order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContents(Vec<(String, String)>);

impl LogContents {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the entry for `name`, keeping its first position.
    pub fn insert(&mut self, name: String, content: String) {
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = content,
            None => self.0.push((name, content)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl Serialize for LogContents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LogContents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ContentsVisitor;

        impl<'de> Visitor<'de> for ContentsVisitor {
            type Value = LogContents;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of file name to log content")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut contents = LogContents::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    contents.insert(k, v);
                }
                Ok(contents)
            }
        }

        deserializer.deserialize_map(ContentsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadLogsResult {
    pub success: bool,
    pub message: String,
    pub log_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogContents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl ReadLogsResult {
    pub fn not_found(log_directory: String) -> Self {
        Self {
            success: false,
            message: format!("No log files found in {log_directory}"),
            log_directory,
            logs: None,
            pagination: None,
        }
    }

    pub fn read(log_directory: String, logs: LogContents, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: format!("Read logs from {} file(s)", logs.len()),
            log_directory,
            logs: Some(logs),
            pagination: Some(pagination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_and_lenient_numbers() {
        let req: ReadLogsRequest = serde_json::from_value(json!({ "page": null })).unwrap();
        assert_eq!(req.tail_lines(), Some(100));
        assert_eq!(req.files_per_page(), 5);
        assert_eq!(req.page_number(), 1);
        assert!(req.filter_text().is_none());
        assert!(req.custom_dir().is_none());

        let req: ReadLogsRequest = serde_json::from_value(json!({
            "lines": 20.9,
            "filter": "",
            "customPath": "/var/log/app",
            "fileLimit": 0,
            "page": -3
        }))
        .unwrap();
        assert_eq!(req.tail_lines(), Some(20));
        assert!(req.filter_text().is_none());
        assert_eq!(req.custom_dir(), Some("/var/log/app"));
        assert_eq!(req.files_per_page(), 1);
        assert_eq!(req.page_number(), 1);
    }

    #[test]
    fn non_positive_lines_means_all() {
        let req = ReadLogsRequest { lines: Some(0), ..Default::default() };
        assert_eq!(req.tail_lines(), None);
        let req = ReadLogsRequest { lines: Some(-5), ..Default::default() };
        assert_eq!(req.tail_lines(), None);
    }

    #[test]
    fn request_rejects_non_numeric_lines() {
        let err = serde_json::from_value::<ReadLogsRequest>(json!({ "lines": "ten" }));
        assert!(err.is_err());
    }

    #[test]
    fn pagination_second_page_of_seven() {
        let (p, range) = Pagination::compute(2, 5, 7);
        assert_eq!(range, 5..7);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next_page);
        assert!(p.has_previous_page);
    }

    #[test]
    fn pagination_out_of_range_is_empty() {
        let (p, range) = Pagination::compute(4, 5, 7);
        assert!(range.is_empty());
        assert_eq!(p.total_pages, 2);

        let (p, range) = Pagination::compute(1, 5, 0);
        assert!(range.is_empty());
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_previous_page);
    }

    #[test]
    fn pagination_matches_ceil_for_many_shapes() {
        for total in 0..25usize {
            for per_page in 1..7usize {
                for page in 1..7usize {
                    let (p, range) = Pagination::compute(page, per_page, total);
                    assert_eq!(p.total_pages, (total + per_page - 1) / per_page);
                    assert_eq!(p.has_next_page, page * per_page < total);
                    assert!(range.end <= total);
                }
            }
        }
    }

    #[test]
    fn contents_serialize_in_insertion_order() {
        let mut logs = LogContents::new();
        logs.insert("z.log".into(), "late".into());
        logs.insert("a.log".into(), "early".into());
        let text = serde_json::to_string(&logs).unwrap();
        assert_eq!(text, r#"{"z.log":"late","a.log":"early"}"#);

        let back: LogContents = serde_json::from_str(&text).unwrap();
        assert_eq!(back.names(), vec!["z.log", "a.log"]);
    }

    #[test]
    fn failure_result_omits_logs_and_pagination() {
        let value = serde_json::to_value(ReadLogsResult::not_found("/tmp/x".into())).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["logDirectory"], json!("/tmp/x"));
        assert!(value["message"].as_str().unwrap().contains("/tmp/x"));
        assert!(value.get("logs").is_none());
        assert!(value.get("pagination").is_none());
    }
}
