//! Result persistence: JSON / JSONL records and enhanced image files.

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::types::Domain;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Infer the format from an output file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }
}

/// Serializes records as JSON or JSONL.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a writer. `pretty` only affects the JSON format; JSONL is
    /// always one compact object per line.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        self.write_value(item)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch: a JSON array, or one line per item for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.write_value(items)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        let pretty = self.pretty && self.format == OutputFormat::Json;
        if pretty {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Where the enhanced version of `source` goes:
/// `{output_dir}/enhanced_{domain}_{file_name}`.
pub fn enhanced_path(output_dir: &Path, domain: Domain, source: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    output_dir.join(format!("enhanced_{}_{}", domain, file_name))
}

/// Save an enhanced image, creating the parent directory if needed. The
/// format follows the file extension.
///
/// GIF cannot hold single-channel pixels, so grayscale results bound for a
/// `.gif` path are expanded to RGB first.
pub fn save_enhanced(image: &DynamicImage, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let needs_rgb = matches!(ImageFormat::from_path(path), Ok(ImageFormat::Gif))
        && !image.color().has_color();
    if needs_rgb {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        return rgb.save(path).map_err(io::Error::other);
    }
    image.save(path).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DomainScore, EnhancementRecord, QualityMetrics};
    use image::{GrayImage, Luma};

    fn record(name: &str) -> EnhancementRecord {
        EnhancementRecord {
            file_path: PathBuf::from(format!("/in/{name}")),
            file_name: name.to_string(),
            content_hash: "00ff".to_string(),
            width: 4,
            height: 3,
            domain: Domain::Landscape,
            confidence: 0.5,
            scores: vec![DomainScore {
                domain: Domain::Landscape,
                probability: 0.5,
            }],
            enhanced_path: None,
            metrics: Some(QualityMetrics {
                psnr: 30.0,
                ssim: 0.9,
                brightness_change: Some(-2.5),
            }),
            processed_at: 0,
        }
    }

    #[test]
    fn test_write_json() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write(&record("hill.jpg")).unwrap();
        assert_eq!(writer.items_written(), 1);

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("\"file_name\":\"hill.jpg\""));
        assert!(output.contains("\"domain\":\"landscape\""));
        assert!(output.contains("\"brightness_change\":-2.5"));
    }

    #[test]
    fn test_write_jsonl_ignores_pretty() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer
            .write_all(&[record("a.png"), record("b.png")])
            .unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: EnhancementRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.file_name, "b.png");
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, true);
        writer
            .write_all(&[record("a.png"), record("b.png")])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let parsed: Vec<EnhancementRecord> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("invalid"), None);
        assert_eq!(
            OutputFormat::from_path(Path::new("out/results.jsonl")),
            Some(OutputFormat::JsonLines)
        );
        assert_eq!(OutputFormat::from_path(Path::new("results")), None);
    }

    #[test]
    fn test_enhanced_path() {
        let path = enhanced_path(
            Path::new("out"),
            Domain::Document,
            Path::new("/scans/receipt.png"),
        );
        assert_eq!(path, PathBuf::from("out/enhanced_document_receipt.png"));
    }

    #[test]
    fn test_save_enhanced_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/enhanced_document_page.png");
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([255])));
        save_enhanced(&image, &path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.to_luma8(), image.to_luma8());
    }

    #[test]
    fn test_save_grayscale_as_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enhanced_document_scan.gif");
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(6, 4, |x, _| {
            Luma([if x < 3 { 0 } else { 255 }])
        }));
        save_enhanced(&image, &path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.to_luma8(), image.to_luma8());
    }
}
