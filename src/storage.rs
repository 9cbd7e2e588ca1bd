// ABOUTME: Export directory layout with atomic report writes
// ABOUTME: Stores attachments under collision-free names without overwriting

use crate::{Error, ExportReport, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "memos_export.json";
pub const ATTACHMENTS_DIR: &str = "attachments";

pub struct Paths {
    pub output_dir: PathBuf,
    pub attachments_dir: PathBuf,
    pub report_path: PathBuf,
}

impl Paths {
    pub fn new(output_dir: PathBuf) -> Self {
        Paths {
            attachments_dir: output_dir.join(ATTACHMENTS_DIR),
            report_path: output_dir.join(REPORT_FILE),
            output_dir,
        }
    }

    /// Creates the output and attachments directories. Existing ones are fine.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.attachments_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Writes `content` under the first free variant of `filename` in the
    /// attachments directory and returns the report-relative path.
    pub fn store_attachment(&self, filename: &str, content: &[u8]) -> Result<String> {
        let safe = safe_file_name(filename).ok_or_else(|| {
            Error::Validation(format!("unusable attachment filename {:?}", filename))
        })?;

        let mut counter = 0u32;
        loop {
            let candidate = suffixed_name(safe, counter);
            let path = self.attachments_dir.join(&candidate);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(content) {
                        drop(file);
                        let _ = fs::remove_file(&path);
                        return Err(e.into());
                    }
                    return Ok(format!("{}/{}", ATTACHMENTS_DIR, candidate));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn save_report(&self, report: &ExportReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)
            .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        write_atomic(&self.report_path, &json)
    }
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Validation(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".part");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Last path component of a server-supplied filename, if it names a file.
pub fn safe_file_name(filename: &str) -> Option<&str> {
    let name = filename.rsplit(|c: char| c == '/' || c == '\\').next()?;
    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

/// `photo.png` with counter 2 becomes `photo_2.png`; counter 0 is the name itself.
pub fn suffixed_name(filename: &str, counter: u32) -> String {
    if counter == 0 {
        return filename.to_string();
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, counter, ext.to_string_lossy()),
        None => format!("{}_{}", stem, counter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_layout() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path().to_path_buf());
        assert_eq!(paths.attachments_dir, temp.path().join("attachments"));
        assert_eq!(paths.report_path, temp.path().join("memos_export.json"));
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path().join("nested").join("export"));
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.output_dir.is_dir());
        assert!(paths.attachments_dir.is_dir());
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("photo.png", 0), "photo.png");
        assert_eq!(suffixed_name("photo.png", 1), "photo_1.png");
        assert_eq!(suffixed_name("archive.tar.gz", 2), "archive.tar_2.gz");
        assert_eq!(suffixed_name("README", 3), "README_3");
        assert_eq!(suffixed_name(".bashrc", 1), ".bashrc_1");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("photo.png"), Some("photo.png"));
        assert_eq!(safe_file_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(safe_file_name("dir\\evil.exe"), Some("evil.exe"));
        assert_eq!(safe_file_name("uploads/"), None);
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name(""), None);
    }
}
