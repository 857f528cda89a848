//! Atomic file writes: write to a temp file in the same directory,
//! fsync, then rename over the destination. Protects the usage log and
//! generated project files from torn writes if the process dies
//! mid-flush.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

#[derive(Debug, Default)]
pub struct AtomicWriteResult {
    pub rename_retry_count: u32,
}

pub fn write_file_atomic(path: &Path, content: &str) -> std::io::Result<AtomicWriteResult> {
    let normalized = content.replace("\r\n", "\n");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(normalized.as_bytes())?;
    tmp.as_file().sync_all()?;

    let mut retries = 0u32;
    loop {
        match tmp.persist(path) {
            Ok(_) => break,
            Err(e) if retries < 3 => {
                retries += 1;
                tmp = e.file;
                std::thread::sleep(std::time::Duration::from_millis(20 * retries as u64));
            }
            Err(e) => return Err(e.error),
        }
    }

    Ok(AtomicWriteResult {
        rename_retry_count: retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        write_file_atomic(&path, "{\"total_tokens\": 5}").unwrap();
        let read = fs::read_to_string(&path).unwrap();
        assert_eq!(read, "{\"total_tokens\": 5}");
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        write_file_atomic(&path, "first").unwrap();
        write_file_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn normalizes_crlf_to_lf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        write_file_atomic(&path, "a\r\nb\r\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
