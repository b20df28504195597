//! Packaging of generated classes into a JAR.

use std::collections::BTreeMap;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use log::debug;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::compile::GeneratedClass;
use crate::error::Result;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MANIFEST_LINE_BYTES: usize = 72;

/// An in-memory JAR: class entries keyed by path plus manifest attributes.
#[derive(Clone, Debug)]
pub struct JarArchive {
    entries: BTreeMap<String, Vec<u8>>,
    main_class: Option<String>,
}

impl Default for JarArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl JarArchive {
    pub fn new() -> Self {
        JarArchive {
            entries: BTreeMap::new(),
            main_class: None,
        }
    }

    /// Serialize `class` and store it under `path/to/Name.class`.
    pub fn add_class(&mut self, class: &GeneratedClass) -> Result<()> {
        let bytes = class.to_bytes()?;
        self.entries.insert(class.file_name(), bytes);
        Ok(())
    }

    /// Record a `Main-Class` attribute; dotted or internal names are accepted.
    pub fn set_main_class(&mut self, name: impl Into<String>) {
        self.main_class = Some(name.into().replace('/', "."));
    }

    /// Entry paths in archive order, without the manifest.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn get_entry(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(|v| v.as_slice())
    }

    /// `META-INF/MANIFEST.MF` content: CRLF line endings, wrapped at 72 bytes.
    pub fn manifest(&self) -> Vec<u8> {
        let mut out = String::new();
        write_wrapped_line(&mut out, "Manifest-Version", "1.0");
        write_wrapped_line(&mut out, "Created-By", concat!("classgen ", env!("CARGO_PKG_VERSION")));
        if let Some(main) = &self.main_class {
            write_wrapped_line(&mut out, "Main-Class", main);
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    /// Write the archive with Deflated compression, manifest first.
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip_writer = zip::ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip_writer.start_file(MANIFEST_PATH, options)?;
        zip_writer.write_all(&self.manifest())?;
        for (name, data) in &self.entries {
            zip_writer.start_file(name.as_str(), options)?;
            zip_writer.write_all(data)?;
        }
        zip_writer.finish()?;
        debug!("wrote jar with {} classes", self.entries.len());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.write(&mut buf)?;
        Ok(buf.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file))
    }
}

/// `Key: Value` split into 72-byte lines, continuations led by one space.
fn write_wrapped_line(out: &mut String, key: &str, value: &str) {
    let full = format!("{}: {}", key, value);
    let mut rest = full.as_str();
    let mut limit = MANIFEST_LINE_BYTES;
    loop {
        let end = split_pos(rest, limit);
        out.push_str(&rest[..end]);
        out.push_str("\r\n");
        rest = &rest[end..];
        if rest.is_empty() {
            break;
        }
        out.push(' ');
        limit = MANIFEST_LINE_BYTES - 1;
    }
}

/// Largest char boundary at or below `max`, but at least one char.
fn split_pos(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut pos = max;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    if pos == 0 {
        s.chars().next().map_or(s.len(), char::len_utf8)
    } else {
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_main_class() {
        let mut jar = JarArchive::new();
        jar.set_main_class("demo/app/Main");
        let text = String::from_utf8(jar.manifest()).unwrap();
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(text.contains("Main-Class: demo.app.Main\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn long_manifest_lines_wrap() {
        let mut out = String::new();
        let value = "x".repeat(100);
        write_wrapped_line(&mut out, "Main-Class", &value);
        let lines: Vec<&str> = out.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 72);
        assert!(lines[1].starts_with(' '));
        assert_eq!(lines[0].len() + lines[1].len() - 1, "Main-Class: ".len() + 100);
    }
}
