//! Text extraction from uploaded files.

use tracing::{debug, warn};

use super::error::ProcessingError;

/// Converts raw file bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the given MIME type / file name.
    fn supports(&self, file_type: &str, file_name: &str) -> bool;

    /// Extract the text content of a file.
    fn extract(
        &self,
        file_type: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, ProcessingError>;
}

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Base MIME type without parameters, lowercased.
fn essence(file_type: &str) -> String {
    file_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// UTF-8 text formats: plain text, markdown, CSV, JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    const MIME_TYPES: &'static [&'static str] = &[
        "application/json",
        "application/x-ndjson",
        "application/markdown",
    ];
    const EXTENSIONS: &'static [&'static str] = &["txt", "text", "md", "markdown", "csv", "json"];
}

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, file_type: &str, file_name: &str) -> bool {
        let mime = essence(file_type);
        if mime.starts_with("text/") || Self::MIME_TYPES.contains(&mime.as_str()) {
            return true;
        }
        extension(file_name).is_some_and(|ext| Self::EXTENSIONS.contains(&ext.as_str()))
    }

    fn extract(
        &self,
        _file_type: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, ProcessingError> {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        let text = std::str::from_utf8(data).map_err(|e| {
            ProcessingError::extraction(format!("{file_name} is not valid UTF-8 text: {e}"))
        })?;
        Ok(text.to_string())
    }
}

/// PDF text layer extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn supports(&self, file_type: &str, file_name: &str) -> bool {
        essence(file_type) == "application/pdf" || extension(file_name).as_deref() == Some("pdf")
    }

    fn extract(
        &self,
        _file_type: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, ProcessingError> {
        let document = lopdf::Document::load_mem(data)
            .map_err(|e| ProcessingError::extraction(format!("{file_name} is not a readable PDF: {e}")))?;
        if document.is_encrypted() {
            return Err(ProcessingError::extraction(format!(
                "{file_name} is encrypted"
            )));
        }

        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut text = String::new();
        let mut failed = 0usize;
        for page in &pages {
            match document.extract_text(&[*page]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    failed += 1;
                    warn!(file_name, page, error = %e, "Failed to extract page text");
                }
            }
        }

        if failed > 0 && failed == pages.len() {
            return Err(ProcessingError::extraction(format!(
                "no page of {file_name} could be read"
            )));
        }
        debug!(file_name, pages = pages.len(), failed, "Extracted PDF text");
        Ok(text)
    }
}

/// Routes each file to the first extractor that supports it.
pub struct FormatExtractor {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl FormatExtractor {
    /// Create a router over the given extractors, tried in order.
    #[must_use]
    pub fn new(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }
}

impl Default for FormatExtractor {
    fn default() -> Self {
        Self::new(vec![Box::new(PdfExtractor), Box::new(PlainTextExtractor)])
    }
}

impl TextExtractor for FormatExtractor {
    fn supports(&self, file_type: &str, file_name: &str) -> bool {
        self.extractors
            .iter()
            .any(|x| x.supports(file_type, file_name))
    }

    fn extract(
        &self,
        file_type: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<String, ProcessingError> {
        self.extractors
            .iter()
            .find(|x| x.supports(file_type, file_name))
            .ok_or_else(|| ProcessingError::UnsupportedFormat {
                file_type: file_type.to_string(),
                file_name: file_name.to_string(),
            })?
            .extract(file_type, file_name, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    fn hello_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello World!")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("save pdf");
        buf
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let text = PlainTextExtractor
            .extract("text/plain", "a.txt", b"\xEF\xBB\xBFAlpha.")
            .expect("valid text");
        assert_eq!(text, "Alpha.");
    }

    #[test]
    fn test_plain_text_rejects_invalid_utf8() {
        let err = PlainTextExtractor
            .extract("text/plain", "a.txt", &[0xff, 0xfe, 0xfd])
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Extraction(_)));
    }

    #[test]
    fn test_pdf_text_layer() {
        let text = PdfExtractor
            .extract("application/pdf", "hello.pdf", &hello_pdf())
            .expect("readable pdf");
        assert!(text.contains("Hello"), "got {text:?}");
    }

    #[test]
    fn test_pdf_garbage_is_extraction_error() {
        let err = PdfExtractor
            .extract("application/pdf", "bad.pdf", b"definitely not a pdf")
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Extraction(_)));
    }

    #[test]
    fn test_router_matches_mime_then_extension() {
        let router = FormatExtractor::default();
        assert!(router.supports("text/plain; charset=utf-8", "notes"));
        assert!(router.supports("application/octet-stream", "notes.md"));
        assert!(router.supports("application/octet-stream", "scan.PDF"));
        assert!(!router.supports("image/png", "photo.png"));
    }

    #[test]
    fn test_router_unsupported_format() {
        let err = FormatExtractor::default()
            .extract("image/png", "photo.png", &[0x89, 0x50])
            .unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedFormat { .. }));
    }
}
