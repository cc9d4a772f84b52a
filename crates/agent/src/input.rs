//! Detector input selection

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Collaborator output source: the file at `path` (a FIFO works), else stdin
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            info!("Reading collaborator output from {}", path.display());
            Ok(Box::new(BufReader::new(File::open(path)?)))
        }
        None => {
            info!("Reading collaborator output from stdin");
            Ok(Box::new(BufReader::new(io::stdin())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"timestamp_ms": 1}}"#).unwrap();

        let mut input = open_input(Some(file.path())).unwrap();
        let mut line = String::new();
        input.read_line(&mut line).unwrap();
        assert!(line.contains("timestamp_ms"));
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(open_input(Some(Path::new("/nonexistent/input.jsonl"))).is_err());
    }
}
