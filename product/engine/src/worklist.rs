use crate::{EngineError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORK_FILE: &str = "urls.txt";

/// Reads every line of the work file up front, untrimmed.
pub fn read_work_file(path: &Path) -> Result<Vec<String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::WorkFileMissing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(contents.lines().map(str::to_string).collect())
}

/// Trimmed, non-blank lines in their original order.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replaces the work file with `retained`, one per line. The new contents go
/// to a temp file next to the destination and are renamed over it, so the old
/// list stays intact until the new one is complete on disk.
pub fn rewrite_work_file(path: &Path, retained: &[String]) -> Result<()> {
    let dir = parent_dir(path)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    if !retained.is_empty() {
        tmp.write_all(retained.join("\n").as_bytes())?;
        tmp.write_all(b"\n")?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| EngineError::PersistFailed {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

fn parent_dir(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(absolute
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_work_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("urls.txt");
        match read_work_file(&path) {
            Err(EngineError::WorkFileMissing(p)) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn work_file_lines_keep_their_formatting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "a\r\n\n  b  \nc").expect("write");

        let lines = read_work_file(&path).expect("read");
        assert_eq!(lines, vec!["a", "", "  b  ", "c"]);
    }

    #[test]
    fn url_list_drops_blank_lines() {
        assert_eq!(
            parse_url_list("  https://a \n\n \t\nhttps://b\n"),
            vec!["https://a", "https://b"]
        );
        assert!(parse_url_list(" \n \n").is_empty());
    }

    #[test]
    fn rewrite_replaces_contents_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "one\ntwo\nthree\n").expect("write");

        rewrite_work_file(&path, &["  two ".to_string()]).expect("rewrite");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "  two \n");
        assert_eq!(dir_entries(dir.path()), vec!["urls.txt"]);
    }

    #[test]
    fn rewrite_with_nothing_retained_leaves_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "one\ntwo\n").expect("write");

        rewrite_work_file(&path, &[]).expect("rewrite");
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "");
    }

    #[test]
    fn failed_rewrite_keeps_previous_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory in the way makes the final rename fail.
        let path = dir.path().join("urls.txt");
        std::fs::create_dir(&path).expect("mkdir");
        std::fs::write(path.join("keep"), "x").expect("write");

        assert!(rewrite_work_file(&path, &["a".to_string()]).is_err());
        assert!(path.join("keep").exists());
        assert_eq!(dir_entries(dir.path()), vec!["urls.txt"]);
    }
}
