//! Document text extraction. PDF and DOCX only; anything else is an input
//! error reported before any side effect.

use std::io::{Cursor, Read};

use crate::errors::AppError;

/// Extracts plain text from an uploaded document, dispatching on the file
/// extension.
pub fn extract_text(file_bytes: &[u8], filename: &str) -> Result<String, AppError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".pdf") {
        pdf_text(file_bytes)
    } else if lower.ends_with(".docx") {
        docx_text(file_bytes)
    } else {
        Err(AppError::UnsupportedFormat(
            "unsupported file type; use PDF or DOCX".to_string(),
        ))
    }
}

fn pdf_text(file_bytes: &[u8]) -> Result<String, AppError> {
    let text = pdf_extract::extract_text_from_mem(file_bytes)
        .map_err(|e| AppError::Extraction(format!("PDF extraction failed: {e}")))?;
    Ok(text.trim().to_string())
}

/// DOCX is a zip container; the document body lives in `word/document.xml`.
/// Paragraph boundaries become newlines, `<w:t>` runs become text.
fn docx_text(file_bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(file_bytes))
        .map_err(|e| AppError::Extraction(format!("DOCX container unreadable: {e}")))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Extraction(format!("DOCX body missing: {e}")))?;
    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Extraction(format!("DOCX body unreadable: {e}")))?;
    Ok(strip_docx_xml(&xml))
}

/// Minimal pull of text runs out of WordprocessingML. Captures character data
/// inside `<w:t>` elements and breaks lines at paragraph ends.
fn strip_docx_xml(xml: &str) -> String {
    let mut text = String::new();
    let mut rest = xml;
    let mut in_text_run = false;

    while let Some(open) = rest.find('<') {
        if in_text_run {
            text.push_str(&rest[..open]);
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        if tag == "w:t" || tag.starts_with("w:t ") {
            in_text_run = true;
        } else {
            if in_text_run && tag == "/w:t" {
                in_text_run = false;
            }
            if tag == "/w:p" {
                text.push('\n');
            }
        }
        rest = &rest[open + close + 1..];
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(body_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let err = extract_text(b"hello", "resume.txt").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_garbage_pdf_is_extraction_error() {
        let err = extract_text(b"not a pdf", "resume.pdf").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Ada Lovelace</w:t></w:r></w:p>
            <w:p><w:r><w:t xml:space="preserve">Skills: </w:t></w:r><w:r><w:t>Rust</w:t></w:r></w:p>
            </w:body></w:document>"#;
        let bytes = docx_with_body(xml);
        let text = extract_text(&bytes, "resume.docx").unwrap();
        assert_eq!(text, "Ada Lovelace\nSkills: Rust");
    }

    #[test]
    fn test_docx_without_body_is_extraction_error() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("unrelated.xml", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }
        let err = extract_text(&buffer.into_inner(), "resume.docx").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_strip_ignores_non_text_elements() {
        let xml = "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>only this</w:t></w:r></w:p>";
        assert_eq!(strip_docx_xml(xml), "only this");
    }
}
