//! DOCX text extraction: reads `word/document.xml` out of the OOXML container
//! and flattens its text runs, one output line per paragraph.

use std::io::{Cursor, Read};

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::ingest::IngestError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Text runs, tabs, breaks and paragraph ends, in document order.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br\b[^>]*/>|<w:cr\s*/>|</w:p>")
        .expect("static regex")
});

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[a-z]+);").expect("static regex"));

/// Runs [`extract`] on the blocking pool; unzipping and the XML pass are
/// CPU-bound like PDF parsing.
pub async fn extract_blocking(bytes: Bytes) -> Result<String, IngestError> {
    tokio::task::spawn_blocking(move || extract(&bytes))
        .await
        .map_err(|e| {
            warn!("DOCX parser aborted: {e}");
            IngestError::CorruptDocument("the DOCX structure could not be parsed".to_string())
        })?
}

pub fn extract(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        IngestError::CorruptDocument(format!("not a valid DOCX container: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| {
            IngestError::CorruptDocument(format!("DOCX container has no {DOCUMENT_PART}"))
        })?
        .read_to_string(&mut xml)
        .map_err(|e| IngestError::CorruptDocument(format!("unreadable {DOCUMENT_PART}: {e}")))?;

    Ok(flatten_document_xml(&xml))
}

fn flatten_document_xml(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);
    for caps in TOKEN_RE.captures_iter(xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&decode_entities(run.as_str())),
            None => {
                let token = &caps[0];
                if token.starts_with("<w:tab") {
                    text.push('\t');
                } else {
                    text.push('\n');
                }
            }
        }
    }
    text
}

fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_become_lines() {
        let docx = fixtures::docx_with_body(
            r#"<w:p><w:r><w:t>Jane Roe</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Staff </w:t></w:r><w:r><w:t>Engineer</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract(&docx).unwrap(), "Jane Roe\nStaff Engineer\n");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let docx = fixtures::docx_with_body(
            r#"<w:p><w:r><w:t>R&amp;D</w:t><w:tab/><w:t>&lt;lead&gt;</w:t><w:br/><w:t>caf&#233; &#x2013; ok</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract(&docx).unwrap(), "R&D\t<lead>\ncafé – ok\n");
    }

    #[test]
    fn test_table_cells_are_kept() {
        let docx = fixtures::docx_with_body(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Rust</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(extract(&docx).unwrap(), "Rust\n");
    }

    #[test]
    fn test_non_zip_bytes_are_corrupt() {
        assert!(matches!(
            extract(b"PK\x03\x04 definitely not a zip"),
            Err(IngestError::CorruptDocument(_))
        ));
    }

    #[test]
    fn test_zip_without_document_part_is_corrupt() {
        use std::io::Write;
        use zip::write::{FileOptions, ZipWriter};

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("notes.txt", FileOptions::default()).unwrap();
        zip.write_all(b"hello").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = extract(&bytes).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_unknown_entity_is_left_verbatim() {
        assert_eq!(decode_entities("a &nbsp; b"), "a &nbsp; b");
    }
}
