//! Text extraction from uploaded resume documents (PDF, DOCX).

use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use crate::analysis::{AnalysisError, Document};

/// Main body part of an OOXML word-processing package.
const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the format from the file extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(DocumentFormat::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }
}

/// Converts an uploaded document into plain text.
///
/// The extension is checked before any bytes are parsed. Parse failures
/// (including panics inside the PDF parser) become `ExtractionFailed`.
pub fn extract(document: &Document) -> Result<String, AnalysisError> {
    let format = DocumentFormat::from_filename(&document.filename)
        .ok_or_else(|| AnalysisError::UnsupportedFormat(document.filename.clone()))?;

    let text = match format {
        DocumentFormat::Pdf => extract_pdf(&document.bytes)?,
        DocumentFormat::Docx => extract_docx(&document.bytes)?,
    };

    debug!(
        "Extracted {} chars from {:?} document '{}'",
        text.len(),
        format,
        document.filename
    );
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, AnalysisError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match outcome {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(AnalysisError::ExtractionFailed(format!("invalid PDF: {e}"))),
        Err(_) => Err(AnalysisError::ExtractionFailed(
            "PDF parser aborted on malformed input".to_string(),
        )),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, AnalysisError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AnalysisError::ExtractionFailed(format!("invalid DOCX package: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| AnalysisError::ExtractionFailed(format!("missing {DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| AnalysisError::ExtractionFailed(format!("unreadable {DOCX_BODY_PART}: {e}")))?;

    document_xml_to_text(&xml)
}

/// Walks `word/document.xml` and keeps only run text, in document order.
///
/// `w:t` runs are copied, `w:tab` becomes a tab, `w:br`/`w:cr` a newline and
/// each closed `w:p` paragraph ends a line. Tab-stop definitions inside
/// `w:tabs` share the `tab` element name and are skipped.
fn document_xml_to_text(xml: &str) -> Result<String, AnalysisError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_text_run = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"tabs" => in_tab_stops = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if !in_tab_stops => text.push('\t'),
                b"br" | b"cr" | b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let run = e.unescape().map_err(|err| {
                    AnalysisError::ExtractionFailed(format!("bad text in DOCX body: {err}"))
                })?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AnalysisError::ExtractionFailed(format!(
                    "malformed DOCX XML at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn doc(filename: &str, bytes: Vec<u8>) -> Document {
        Document {
            bytes: bytes.into(),
            filename: filename.to_string(),
        }
    }

    fn build_docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// One-page PDF with the standard Helvetica font, one text line per entry.
    fn build_pdf(lines: &[&str]) -> Vec<u8> {
        let mut content = String::from("BT /F1 12 Tf 72 720 Td ");
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                content.push_str("0 -16 Td ");
            }
            content.push_str(&format!("({line}) Tj "));
        }
        content.push_str("ET");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref_at = pdf.len();
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            tail.push_str(&format!("{offset:010} 00000 n \n"));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(tail.as_bytes());
        pdf
    }

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
      <w:r><w:rPr><w:b/></w:rPr><w:t>Jane Doe</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t xml:space="preserve">Senior </w:t></w:r>
      <w:r><w:t>Engineer</w:t><w:tab/><w:t>R&amp;D</w:t></w:r>
    </w:p>
    <w:p><w:r><w:t>Rust</w:t><w:br/><w:t>Go</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_format_from_filename_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_filename("cv.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_filename("cv.Docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_filename("my.resume.pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_filename("resume.txt"), None);
        assert_eq!(DocumentFormat::from_filename("resume.doc"), None);
        assert_eq!(DocumentFormat::from_filename("pdf"), None);
    }

    #[test]
    fn test_unsupported_extension_fails_without_parsing() {
        // Valid DOCX bytes under a .txt name must still be rejected up front.
        let bytes = build_docx(&[(DOCX_BODY_PART, BODY)]);
        let err = extract(&doc("resume.txt", bytes)).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(ref name) if name == "resume.txt"));
    }

    #[test]
    fn test_docx_paragraphs_in_document_order() {
        let bytes = build_docx(&[
            ("[Content_Types].xml", "<Types/>"),
            (DOCX_BODY_PART, BODY),
        ]);
        let text = extract(&doc("Resume.DOCX", bytes)).unwrap();
        assert_eq!(text, "Jane Doe\nSenior Engineer\tR&D\nRust\nGo");
    }

    #[test]
    fn test_docx_without_body_part_fails() {
        let bytes = build_docx(&[("word/styles.xml", "<w:styles/>")]);
        let err = extract(&doc("resume.docx", bytes)).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailed(_)));
    }

    #[test]
    fn test_docx_non_zip_bytes_fail() {
        let err = extract(&doc("resume.docx", b"definitely not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailed(_)));
    }

    #[test]
    fn test_docx_broken_xml_fails() {
        let bytes = build_docx(&[(DOCX_BODY_PART, "<w:document><w:body><w:p></w:body>")]);
        let err = extract(&doc("resume.docx", bytes)).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailed(_)));
    }

    #[test]
    fn test_corrupted_pdf_fails_without_panicking() {
        let bytes = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> garbage \x00\xff\x13".to_vec();
        let err = extract(&doc("resume.pdf", bytes)).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailed(_)));
    }

    #[test]
    fn test_empty_pdf_buffer_fails() {
        let err = extract(&doc("resume.pdf", Vec::new())).unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailed(_)));
    }

    #[test]
    fn test_pdf_text_is_extracted() {
        let text = extract(&doc("cv.PDF", build_pdf(&["Senior Rust Engineer"]))).unwrap();
        assert_eq!(text, "Senior Rust Engineer");
    }

    #[test]
    fn test_pdf_lines_keep_document_order() {
        let bytes = build_pdf(&["Jane Doe", "Staff Engineer", "Tokio Axum Postgres"]);
        let text = extract(&doc("resume.pdf", bytes)).unwrap();

        let positions: Vec<usize> = ["Jane Doe", "Staff Engineer", "Tokio Axum Postgres"]
            .iter()
            .map(|line| text.find(line).unwrap_or_else(|| panic!("{line:?} missing from {text:?}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "out of order: {text:?}");
    }
}
