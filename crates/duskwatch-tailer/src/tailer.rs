//! Per-file read state: an open handle parked at EOF on attach, reopened
//! from the start whenever rotation is detected.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{TailerError, TailerResult};
use crate::identity::FileIdentity;

pub struct FileTailer {
    path: PathBuf,
    reader: BufReader<File>,
    identity: FileIdentity,
}

impl FileTailer {
    /// Open `path` and seek to its current end, so only lines appended
    /// after this call are ever surfaced.
    pub fn attach(path: impl AsRef<Path>) -> TailerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open(&path)?;
        let identity = FileIdentity::from_metadata(&stat(&path)?);
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0)).map_err(|source| TailerError::Open { path: display(&path), source })?;
        Ok(Self { path, reader, identity })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return any complete lines appended since the last call, reopening
    /// from the start first if rotation is detected.
    pub fn poll(&mut self) -> TailerResult<Vec<String>> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(_) => return Ok(Vec::new()),
        };
        let current_identity = FileIdentity::from_metadata(&metadata);
        if self.identity.rotated(&current_identity) {
            tracing::info!(path = %self.path.display(), "log rotation detected");
            let file = open(&self.path)?;
            self.reader = BufReader::new(file);
        }
        self.identity = current_identity;

        let mut lines = Vec::new();
        loop {
            let position = self
                .reader
                .stream_position()
                .map_err(|source| TailerError::Stat { path: display(&self.path), source })?;
            let mut raw = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut raw)
                .map_err(|source| TailerError::Stat { path: display(&self.path), source })?;
            if bytes_read == 0 {
                break;
            }
            if !raw.ends_with('\n') {
                // Partial line; leave it for the next poll once the writer finishes it.
                self.reader
                    .seek(SeekFrom::Start(position))
                    .map_err(|source| TailerError::Stat { path: display(&self.path), source })?;
                break;
            }
            let trimmed = raw.trim_end_matches(['\r', '\n']);
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        Ok(lines)
    }
}

fn open(path: &Path) -> TailerResult<File> {
    File::open(path).map_err(|source| TailerError::Open { path: display(path), source })
}

fn stat(path: &Path) -> TailerResult<std::fs::Metadata> {
    std::fs::metadata(path).map_err(|source| TailerError::Stat { path: display(path), source })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn only_lines_appended_after_attach_are_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"before attach\n").unwrap();

        let mut tailer = FileTailer::attach(&path).unwrap();
        assert!(tailer.poll().unwrap().is_empty());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"line one\nline two\n").unwrap();

        let lines = tailer.poll().unwrap();
        assert_eq!(lines, vec!["line one".to_string(), "line two".to_string()]);
    }

    #[test]
    fn partial_line_is_deferred_to_the_next_poll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"").unwrap();
        let mut tailer = FileTailer::attach(&path).unwrap();

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"incomplete").unwrap();
        assert!(tailer.poll().unwrap().is_empty());

        file.write_all(b" line\n").unwrap();
        assert_eq!(tailer.poll().unwrap(), vec!["incomplete line".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn rotation_resets_to_the_new_files_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, b"old\n").unwrap();
        let mut tailer = FileTailer::attach(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"fresh start\n").unwrap();

        assert_eq!(tailer.poll().unwrap(), vec!["fresh start".to_string()]);
    }
}
