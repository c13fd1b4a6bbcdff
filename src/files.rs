use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AftpError, Result};

/// Picks where a downloaded file goes: `name` itself, or `"<name> (copy) <n>"`
/// for the smallest `n >= 1` that does not exist yet.
pub fn save_file_name(name: &str) -> PathBuf {
    if !Path::new(name).exists() {
        return PathBuf::from(name);
    }
    let mut suffix: u64 = 1;
    loop {
        let candidate = PathBuf::from(format!("{} (copy) {}", name, suffix));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}

/// Opens the download target for appending. Never truncates, and nothing is
/// removed again if the transfer fails halfway.
pub fn build_file_writer(path: &Path) -> Result<Box<dyn Write>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AftpError::FileOpen { path: path.to_path_buf(), source })?;
    Ok(Box::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unused_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("report.txt");
        let name = name.to_str().unwrap();
        assert_eq!(save_file_name(name), PathBuf::from(name));
        // nothing was created while probing
        assert_eq!(save_file_name(name), PathBuf::from(name));
    }

    #[test]
    fn picks_first_free_copy() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("report.txt");
        let name = name.to_str().unwrap().to_string();
        fs::write(&name, "a").unwrap();
        assert_eq!(save_file_name(&name), PathBuf::from(format!("{} (copy) 1", name)));

        fs::write(format!("{} (copy) 1", name), "b").unwrap();
        assert_eq!(save_file_name(&name), PathBuf::from(format!("{} (copy) 2", name)));
    }

    #[test]
    fn writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        fs::write(&path, "old\n").unwrap();
        {
            let mut w = build_file_writer(&path).unwrap();
            w.write_all(b"new\n").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn unopenable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out");
        let err = build_file_writer(&path).err().unwrap();
        assert!(err.to_string().starts_with("Could not open "));
        assert!(err.to_string().ends_with(" for writing"));
    }
}
