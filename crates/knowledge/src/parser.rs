//! Text extraction from raw document bytes.

use docqa_core::{AppError, AppResult};
use lopdf::Document;

/// Content type classification, by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    PlainText,
}

impl ContentType {
    /// Detect content type from a filename. Anything that is not a PDF is
    /// treated as text.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::PlainText
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "text",
        }
    }
}

/// Extract plain text from document bytes.
///
/// PDFs are read page by page and joined with newlines; a page whose text
/// cannot be extracted contributes an empty string. Everything else is
/// decoded as UTF-8 with invalid sequences replaced by U+FFFD.
pub fn extract_text(content: &[u8], filename: &str) -> AppResult<String> {
    match ContentType::from_filename(filename) {
        ContentType::Pdf => extract_pdf(content, filename),
        ContentType::PlainText => Ok(String::from_utf8_lossy(content).into_owned()),
    }
}

fn extract_pdf(content: &[u8], filename: &str) -> AppResult<String> {
    let document = Document::load_mem(content)
        .map_err(|e| AppError::Extraction(format!("Failed to parse PDF {}: {}", filename, e)))?;

    let pages: Vec<String> = document
        .get_pages()
        .keys()
        .map(|&page_number| match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(
                    "No text extracted from page {} of {}: {}",
                    page_number,
                    filename,
                    e
                );
                String::new()
            }
        })
        .collect();

    tracing::debug!("Extracted {} pages from {}", pages.len(), filename);

    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_filename("report.pdf"), ContentType::Pdf);
        assert_eq!(ContentType::from_filename("REPORT.PDF"), ContentType::Pdf);
        assert_eq!(ContentType::from_filename("notes.txt"), ContentType::PlainText);
        assert_eq!(ContentType::from_filename("pdf"), ContentType::PlainText);
        assert_eq!(ContentType::from_filename(""), ContentType::PlainText);
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("héllo\nworld".as_bytes(), "a.md").unwrap();
        assert_eq!(text, "héllo\nworld");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes = [b'o', b'k', 0xff, 0xfe, b'!'];
        let text = extract_text(&bytes, "binary.dat").unwrap();
        assert_eq!(text, "ok\u{fffd}\u{fffd}!");
    }

    fn build_pdf(pages_text: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

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

        let mut kids: Vec<Object> = Vec::new();
        for text in pages_text {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages_text.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_pdf_pages_are_extracted_in_order() {
        let bytes = build_pdf(&["First page text", "Second page text"]);
        let text = extract_text(&bytes, "Scan.PDF").unwrap();

        let first = text.find("First page text").expect("first page missing");
        let second = text.find("Second page text").expect("second page missing");
        assert!(first < second);
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_error() {
        let err = extract_text(b"definitely not a pdf", "broken.pdf").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
