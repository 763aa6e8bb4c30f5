//! BLAKE3 content hashing of source files.

use blake3::Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Hash a file's contents, streaming it in 64KB chunks.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash an in-memory buffer.
///
/// Used when the file has already been read for decoding, so it is not read
/// twice.
pub fn content_hash_from_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_and_bytes_hash_agree() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let from_file = content_hash(file.path()).unwrap();
        assert_eq!(from_file, content_hash_from_bytes(&data));
        assert_eq!(from_file.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(content_hash_from_bytes(b"a"), content_hash_from_bytes(b"b"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(content_hash(Path::new("/nonexistent/lumen/file.png")).is_err());
    }
}
