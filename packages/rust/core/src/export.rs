//! Report export to a Markdown file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use waterauditor_shared::{AuditError, Report, Result};

/// File name used when none (or only a directory-like name) is given.
pub const DEFAULT_FILE_NAME: &str = "water_safety_report.md";

/// Where a report was written.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportResult {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub sha256: String,
}

/// Write the report's markdown into `dir`.
///
/// Only the final component of `file_name` is used and the extension is
/// forced to `.md`. The file is written atomically (temp file, then rename)
/// and an existing file with the same name is replaced.
#[instrument(skip_all, fields(dir = %dir.display(), request_id = %report.request_id))]
pub fn export_report(report: &Report, dir: &Path, file_name: &str) -> Result<ExportResult> {
    std::fs::create_dir_all(dir).map_err(|e| AuditError::io(dir, e))?;

    let file_name = sanitize_file_name(file_name);
    let target = dir.join(&file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, &report.markdown).map_err(|e| AuditError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| AuditError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(report.markdown.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %file_name, size = report.markdown.len(), "wrote report");
    info!(path = %target.display(), "report exported");

    Ok(ExportResult {
        path: target,
        size_bytes: report.markdown.len(),
        sha256,
    })
}

/// Reduce a user-supplied name to a bare `*.md` file name.
fn sanitize_file_name(name: &str) -> String {
    let Some(base) = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.starts_with('.'))
    else {
        return DEFAULT_FILE_NAME.to_string();
    };

    let stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base);

    format!("{stem}.md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use waterauditor_shared::RequestId;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "wa-export-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn report(markdown: &str) -> Report {
        Report {
            request_id: RequestId::new(),
            generated_at: Utc::now(),
            markdown: markdown.to_string(),
        }
    }

    #[test]
    fn writes_report_with_checksum() {
        let tmp = temp_dir();
        let result = export_report(&report("# Water Quality Report\n"), &tmp, DEFAULT_FILE_NAME).unwrap();

        assert_eq!(result.path, tmp.join(DEFAULT_FILE_NAME));
        assert_eq!(
            std::fs::read_to_string(&result.path).unwrap(),
            "# Water Quality Report\n"
        );
        assert_eq!(result.sha256.len(), 64);
        assert_eq!(result.size_bytes, 23);
    }

    #[test]
    fn creates_missing_directories() {
        let tmp = temp_dir().join("nested").join("reports");
        let result = export_report(&report("x"), &tmp, "sample").unwrap();
        assert_eq!(result.path, tmp.join("sample.md"));
        assert!(result.path.exists());
    }

    #[test]
    fn overwrites_and_leaves_no_temp_files() {
        let tmp = temp_dir();
        export_report(&report("first"), &tmp, "r.md").unwrap();
        export_report(&report("second"), &tmp, "r.md").unwrap();

        assert_eq!(std::fs::read_to_string(tmp.join("r.md")).unwrap(), "second");
        let names: Vec<_> = std::fs::read_dir(&tmp)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["r.md"]);
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("report.txt"), "report.md");
        assert_eq!(sanitize_file_name("../../etc/report"), "report.md");
        assert_eq!(sanitize_file_name("well.sample.md"), "well.sample.md");
        assert_eq!(sanitize_file_name(""), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_file_name("  "), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_file_name(".."), DEFAULT_FILE_NAME);
        assert_eq!(sanitize_file_name(".hidden"), DEFAULT_FILE_NAME);
    }

    #[test]
    fn same_report_same_checksum() {
        let a = export_report(&report("same"), &temp_dir(), "a").unwrap();
        let b = export_report(&report("same"), &temp_dir(), "b").unwrap();
        assert_eq!(a.sha256, b.sha256);
    }
}
