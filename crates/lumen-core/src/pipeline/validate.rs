//! Cheap checks on a file before it is read in full and decoded.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Number of leading bytes needed to recognize every supported container.
const HEADER_LEN: usize = 12;

/// Validates files before decoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check that `path` exists, is within the size limit, and starts with
    /// the signature of a known image container.
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let size = std::fs::metadata(path)
            .map_err(|e| decode_error(path, format!("Cannot read metadata: {e}")))?
            .len();
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: size / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let header = read_header(path)?;
        match sniff_format(&header) {
            Some(format) => {
                tracing::trace!("{:?} looks like {}", path, format);
                Ok(())
            }
            None if header.len() < 4 => Err(decode_error(
                path,
                "File too small to be a valid image".to_string(),
            )),
            None => Err(decode_error(
                path,
                "Unrecognized image format (invalid magic bytes)".to_string(),
            )),
        }
    }
}

fn read_header(path: &Path) -> Result<Vec<u8>, PipelineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| decode_error(path, format!("Cannot open file: {e}")))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| decode_error(path, format!("Cannot read file: {e}")))?;
    Ok(header)
}

fn decode_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        message,
    }
}

/// Name the container format from a file's leading bytes.
pub fn sniff_format(header: &[u8]) -> Option<&'static str> {
    if header.len() < 4 {
        return None;
    }
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        // A truncated RIFF header may still be WebP; let the decoder decide.
        [b'R', b'I', b'F', b'F', rest @ ..] if rest.len() < 8 => Some("webp"),
        [b'B', b'M', ..] => Some("bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("tiff"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some("avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_sniff_common_formats() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpeg"));
        assert_eq!(
            sniff_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("png")
        );
        assert_eq!(
            sniff_format(&[b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P']),
            Some("webp")
        );
        assert_eq!(sniff_format(&[b'B', b'M', 0, 0]), Some("bmp"));
        assert_eq!(sniff_format(&[b'I', b'I', 0x2A, 0x00]), Some("tiff"));
        assert_eq!(sniff_format(&[b'M', b'M', 0x00, 0x2A]), Some("tiff"));
    }

    #[test]
    fn test_sniff_rejects_riff_that_is_not_webp() {
        let wav = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert_eq!(sniff_format(&wav), None);
    }

    #[test]
    fn test_sniff_rejects_bare_byte_order_marks() {
        assert_eq!(sniff_format(&[b'I', b'I', 0x00, 0x00]), None);
        assert_eq!(sniff_format(&[b'M', b'M', 0x00, 0x00]), None);
        assert_eq!(sniff_format(&[0, 0, 0, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn test_validate_missing_file() {
        let validator = Validator::new(LimitsConfig::default());
        let err = validator
            .validate(Path::new("/nonexistent/lumen/scan.png"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_validate_text_file_rejected() {
        let file = write_temp(b"just some notes, not a picture");
        let validator = Validator::new(LimitsConfig::default());
        let err = validator.validate(file.path()).unwrap_err();
        assert!(err.to_string().contains("magic bytes"));
    }

    #[test]
    fn test_validate_tiny_file_rejected() {
        let file = write_temp(&[0xFF, 0xD8]);
        let validator = Validator::new(LimitsConfig::default());
        let err = validator.validate(file.path()).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_validate_accepts_png_header() {
        let file = write_temp(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13]);
        let validator = Validator::new(LimitsConfig::default());
        assert!(validator.validate(file.path()).is_ok());
    }

    #[test]
    fn test_validate_size_limit() {
        let mut bytes = vec![0u8; 2 * 1024 * 1024];
        bytes[..4].copy_from_slice(&[0x89, b'P', b'N', b'G']);
        let file = write_temp(&bytes);
        let validator = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        let err = validator.validate(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }
}
