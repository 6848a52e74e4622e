use quick_xml::events::Event;
use quick_xml::Reader;
use std::any::Any;
use std::io::{Cursor, Read};
use std::panic;
use thiserror::Error;

/// Upload formats the extractor understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("failed to read PDF: {0}")]
    Pdf(String),
    #[error("failed to read DOCX: {0}")]
    Docx(String),
    #[error("file is not valid UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Lowercased text after the last `.`; the whole name when there is no dot.
pub fn file_extension(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or("").to_lowercase()
}

/// Extract the text of an uploaded file, choosing the reader by extension.
///
/// Empty input yields empty text for every supported format.
pub fn extract_text(data: &[u8], filename: &str) -> Result<String, ExtractError> {
    let ext = file_extension(filename);
    let format = DocumentFormat::from_extension(&ext).ok_or(ExtractError::Unsupported(ext))?;
    if data.is_empty() {
        return Ok(String::new());
    }

    match format {
        DocumentFormat::Pdf => extract_pdf(data),
        DocumentFormat::Docx => extract_docx(data),
        DocumentFormat::Text => Ok(String::from_utf8(data.to_vec())?),
    }
}

// Pages are joined in document order with no separator. pdf-extract panics
// on some malformed documents (dangling font references among others), so
// a panic is reported as an ordinary read failure.
fn extract_pdf(data: &[u8]) -> Result<String, ExtractError> {
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data))
        .map_err(|payload| ExtractError::Pdf(panic_message(payload.as_ref())))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "malformed document".to_string())
}

fn extract_docx(data: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Body-level paragraphs of a WordprocessingML document, in order.
/// Paragraphs nested in tables are skipped, and so are paragraphs nested in
/// another paragraph (text boxes): the outer paragraph keeps only its own runs.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut table_depth = 0usize;
    let mut para_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:p" if table_depth == 0 => {
                    para_depth += 1;
                    if para_depth == 1 {
                        current = Some(String::new());
                    }
                }
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let outer = table_depth == 0 && para_depth == 1 && run_depth > 0;
                let control = match e.name().as_ref() {
                    b"w:p" if table_depth == 0 && para_depth == 0 => {
                        paragraphs.push(String::new());
                        None
                    }
                    b"w:tab" if outer => Some('\t'),
                    b"w:br" | b"w:cr" if outer => Some('\n'),
                    _ => None,
                };
                if let (Some(c), Some(p)) = (control, current.as_mut()) {
                    p.push(c);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:p" if table_depth == 0 => {
                    if para_depth == 1 {
                        if let Some(p) = current.take() {
                            paragraphs.push(p);
                        }
                    }
                    para_depth = para_depth.saturating_sub(1);
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text && table_depth == 0 && para_depth == 1 => {
                if let Some(p) = current.as_mut() {
                    let text = e.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                    p.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    /// A minimal PDF with one Helvetica text line per page. `fonts` is the
    /// body of each page's `/Font` resource dictionary.
    fn pdf_document(pages: &[&str], fonts: &str) -> Vec<u8> {
        let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << {fonts} >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            let stream = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            tail.push_str(&format!("{offset:010} 00000 n \n"));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));
        out.extend_from_slice(tail.as_bytes());
        out
    }

    #[test]
    fn pdf_pages_are_concatenated_in_document_order() {
        let data = pdf_document(&["Hello", "World"], "/F1 3 0 R");
        let text = extract_text(&data, "two-pages.pdf").unwrap();
        let hello = text.find("Hello").expect("first page text");
        let world = text.find("World").expect("second page text");
        assert!(hello < world, "{text:?}");
    }

    #[test]
    fn pdf_with_broken_fonts_is_a_read_error() {
        for fonts in ["/F1 99 0 R", ""] {
            let data = pdf_document(&["Hello"], fonts);
            let err = extract_text(&data, "broken.pdf").unwrap_err();
            assert!(matches!(err, ExtractError::Pdf(_)), "{fonts:?}: {err}");
        }
    }

    #[test]
    fn empty_files_yield_empty_text() {
        for name in ["a.pdf", "b.docx", "c.txt"] {
            assert_eq!(extract_text(&[], name).unwrap(), "", "{name}");
        }
    }

    #[test]
    fn unsupported_extension_names_the_extension() {
        let err = extract_text(b"MZ", "setup.EXE").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(ref ext) if ext == "exe"));
        assert_eq!(err.to_string(), "Unsupported file type: exe");
    }

    #[test]
    fn name_without_dot_uses_whole_name() {
        assert_eq!(file_extension("README"), "readme");
        assert_eq!(file_extension("notes.final.TXT"), "txt");
    }

    #[test]
    fn plain_text_is_decoded_verbatim() {
        let text = "hello\r\n  wörld\n";
        assert_eq!(extract_text(text.as_bytes(), "notes.txt").unwrap(), text);
    }

    #[test]
    fn invalid_utf8_text_is_an_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], "bad.txt").unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }

    #[test]
    fn docx_paragraphs_join_with_newline() {
        let data = docx_with_body(
            r#"<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>line</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&data, "doc.docx").unwrap(), "First line\n\nA\tB & C");
    }

    #[test]
    fn docx_skips_table_paragraphs_and_tab_stops() {
        let data = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&data, "doc.docx").unwrap(), "Intro\nOutro");
    }

    #[test]
    fn docx_text_box_keeps_outer_paragraph_runs() {
        let paragraphs = docx_paragraphs(
            r#"<w:body><w:p><w:r><w:t>Before</w:t></w:r><w:r><w:drawing><w:txbxContent><w:p><w:r><w:t>Box</w:t><w:br/></w:r></w:p></w:txbxContent></w:drawing></w:r><w:r><w:t>After</w:t></w:r></w:p><w:p><w:r><w:t>Next</w:t></w:r></w:p></w:body>"#,
        )
        .unwrap();
        assert_eq!(paragraphs, vec!["BeforeAfter", "Next"]);
    }

    #[test]
    fn corrupt_documents_report_format_errors() {
        assert!(matches!(
            extract_text(b"not a zip", "doc.docx").unwrap_err(),
            ExtractError::Docx(_)
        ));
        assert!(matches!(
            extract_text(b"not a pdf", "doc.pdf").unwrap_err(),
            ExtractError::Pdf(_)
        ));
    }
}
