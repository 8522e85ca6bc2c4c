use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Creates `<dir>/<stem>_<timestamp>.<ext>` (or `..._<n>.<ext>` if taken) and writes
/// `contents`. The file is synced and closed before this returns.
pub async fn write_unique(
    dir: &Path,
    stem: &str,
    ext: &str,
    at: DateTime<Local>,
    contents: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let base = format!("{}_{}", stem, at.format(TIMESTAMP_FORMAT));

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", base, ext)
        } else {
            format!("{}_{}.{}", base, attempt, ext)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                file.write_all(contents.as_bytes()).await?;
                file.flush().await?;
                file.sync_all().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn scrape_file_contents(url: &str, text: &str) -> String {
    format!("[URL]: {}\n\n{}", url, text)
}

pub fn summary_file_contents(query: &str, summary: &str) -> String {
    format!("## Query\n{}\n\n## Summary\n{}\n", query, summary)
}

pub async fn write_summary(dir: &Path, query: &str, summary: &str, at: DateTime<Local>) -> Result<PathBuf> {
    write_unique(dir, "summary", "md", at, &summary_file_contents(query, summary)).await
}

/// Resolves a bare artifact file name inside `dir`, rejecting anything that could escape it.
pub fn resolve_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..");
    valid.then(|| dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    #[tokio::test]
    async fn same_second_writes_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_unique(dir.path(), "page", "txt", fixed_time(), "one").await.unwrap();
        let b = write_unique(dir.path(), "page", "txt", fixed_time(), "two").await.unwrap();

        assert_eq!(a.file_name().unwrap(), "page_20250314_092653.txt");
        assert_eq!(b.file_name().unwrap(), "page_20250314_092653_1.txt");
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "two");
    }

    #[tokio::test]
    async fn summary_file_has_query_and_summary_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_summary(dir.path(), "What is X?", "X is Y.", fixed_time()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "summary_20250314_092653.md");
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "## Query\nWhat is X?\n\n## Summary\nX is Y.\n"
        );
    }

    #[test]
    fn scrape_header_is_url_then_blank_line() {
        assert_eq!(scrape_file_contents("https://a.b", "body"), "[URL]: https://a.b\n\nbody");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = Path::new("/data/scrapes");
        assert_eq!(resolve_in(dir, "a_1.txt"), Some(dir.join("a_1.txt")));
        assert_eq!(resolve_in(dir, "../history.json"), None);
        assert_eq!(resolve_in(dir, "sub/a.txt"), None);
        assert_eq!(resolve_in(dir, ".hidden"), None);
        assert_eq!(resolve_in(dir, ""), None);
    }
}
