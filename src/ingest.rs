//! Corpus preprocessing: cleanup, chunking, and file loading.
//!
//! The index stores plain passages; this module turns source material into
//! them. Extracted text is whitespace-collapsed, then split on sentence
//! boundaries into ~1000-character chunks with a ~200-character word
//! overlap so a fact straddling a boundary stays searchable in both
//! chunks.
//!
//! File loading is extension-driven: `.txt`/`.md` are read directly,
//! `.pdf` goes through `pdf-extract`, `.docx` is unpacked (ZIP) and its
//! `w:t` runs collected. Corpus directories are walked with glob filters
//! in deterministic order.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Target chunk size in characters.
pub const CHUNK_CHARS: usize = 1000;

/// Overlap carried between consecutive chunks, in characters.
pub const CHUNK_OVERLAP: usize = 200;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Collapse all whitespace runs to single spaces.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_whitespace = true;
        } else {
            if in_whitespace && !out.is_empty() {
                out.push(' ');
            }
            in_whitespace = false;
            out.push(c);
        }
    }
    out
}

/// Clean and chunk one document's text with the default sizes.
pub fn chunk_document(text: &str) -> Vec<String> {
    split_into_chunks(&clean_text(text), CHUNK_CHARS, CHUNK_OVERLAP)
}

/// Split text into chunks of approximately `chunk_chars` characters on
/// sentence boundaries.
///
/// When a chunk fills up, the last `overlap` characters' worth of whole
/// words is carried into the next chunk.
pub fn split_into_chunks(text: &str, chunk_chars: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if !current.is_empty() && current.len() + sentence.len() > chunk_chars {
            chunks.push(current.trim().to_string());

            // Carry trailing whole words as overlap into the next chunk.
            let words: Vec<&str> = current.split_whitespace().collect();
            let mut carried = String::new();
            for word in words.iter().rev() {
                if carried.len() + word.len() + 1 <= overlap {
                    carried = format!("{} {}", word, carried);
                } else {
                    break;
                }
            }
            current = carried;
        }
        if !current.is_empty() && !current.ends_with(' ') {
            current.push(' ');
        }
        current.push_str(&sentence);
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    chunks
}

/// Split on `.`, `!`, `?` followed by whitespace (or end of text).
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// SHA-256 fingerprint of a payload, for idempotent server-side ingest.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Load a source file's text by extension.
pub fn load_source(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        "pdf" => pdf_extract::extract_text(path)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed for {}: {}", path.display(), e)),
        "docx" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            extract_docx(&bytes)
                .with_context(|| format!("DOCX extraction failed for {}", path.display()))
        }
        other => bail!(
            "Unsupported corpus file type '{}': {}",
            other,
            path.display()
        ),
    }
}

/// Extract the `w:t` text runs from a docx archive.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let entry = archive
        .by_name("word/document.xml")
        .context("word/document.xml not found")?;

    let mut xml = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut xml)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!("word/document.xml exceeds size limit");
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("DOCX XML parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Expand configured corpus paths into concrete files.
///
/// Files are taken as-is; directories are walked and filtered by the
/// include globs. The result is sorted for deterministic ingest order.
pub fn scan_corpus(paths: &[PathBuf], include_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            bail!("Corpus path does not exist: {}", path.display());
        }
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            if include_set.is_match(relative) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Load, clean, and chunk every configured corpus file.
///
/// A file that fails to load is logged and skipped: one bad upload should
/// not keep the assistant from starting with the rest of the corpus.
pub fn load_corpus(paths: &[PathBuf], include_globs: &[String]) -> Result<Vec<String>> {
    let mut passages = Vec::new();

    for file in scan_corpus(paths, include_globs)? {
        match load_source(&file) {
            Ok(text) => {
                let chunks = chunk_document(&text);
                tracing::info!(
                    "ingested {} ({} chunks)",
                    file.display(),
                    chunks.len()
                );
                passages.extend(chunks);
            }
            Err(e) => {
                tracing::warn!("skipping {}: {e:#}", file.display());
            }
        }
    }

    Ok(passages)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(
            clean_text("one\n\ntwo   three\t four \n"),
            "one two three four"
        );
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second! Is this third? Tail without period");
        assert_eq!(
            sentences,
            vec![
                "First one.",
                "Second!",
                "Is this third?",
                "Tail without period"
            ]
        );
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        let sentences = split_sentences("Revenue was $7.5 million. Margins held.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("$7.5 million"));
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_into_chunks("A short note.", CHUNK_CHARS, CHUNK_OVERLAP);
        assert_eq!(chunks, vec!["A short note."]);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = (0..60)
            .map(|i| format!("Sentence number {} fills some space in the document.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_into_chunks(&text, 300, 60);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // A chunk may exceed the target by at most one sentence.
            assert!(chunk.len() < 300 + 80, "oversized chunk: {}", chunk.len());
        }
        // Overlap: the start of each later chunk repeats words from the
        // previous one.
        for pair in chunks.windows(2) {
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(
                pair[0].contains(first_word),
                "no overlap between consecutive chunks"
            );
        }
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_document("   \n ").is_empty());
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn test_load_source_txt_and_md() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("a.txt");
        fs::write(&txt, "plain text").unwrap();
        assert_eq!(load_source(&txt).unwrap(), "plain text");

        let md = dir.path().join("b.md");
        fs::write(&md, "# heading\nbody").unwrap();
        assert!(load_source(&md).unwrap().contains("body"));
    }

    #[test]
    fn test_load_source_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("a.bin");
        fs::write(&bin, [0u8; 4]).unwrap();
        assert!(load_source(&bin).is_err());
    }

    #[test]
    fn test_extract_docx() {
        use std::io::Write;
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer
                .write_all(
                    b"<?xml version=\"1.0\"?><w:document \
                      xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
                      <w:body><w:p><w:r><w:t>docx body text</w:t></w:r></w:p></w:body>\
                      </w:document>",
                )
                .unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(extract_docx(&buf).unwrap(), "docx body text");
    }

    #[test]
    fn test_scan_corpus_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("skip.log"), "x").unwrap();

        let files = scan_corpus(
            &[dir.path().to_path_buf()],
            &["**/*.md".to_string(), "**/*.txt".to_string()],
        )
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn test_missing_corpus_path_is_an_error() {
        let result = scan_corpus(&[PathBuf::from("/nonexistent/corpus")], &[]);
        assert!(result.is_err());
    }
}
