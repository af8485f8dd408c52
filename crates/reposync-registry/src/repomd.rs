//! Decoding of the repository index, `repodata/repomd.xml`.

use std::io::{BufReader, Read};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use tracing::trace;

use crate::{
    error::{RegistryError, Result},
    xml::{attribute, xml_error},
};

/// Repo-relative path of the repository index.
pub const REPOMD_PATH: &str = "repodata/repomd.xml";

/// `type` attribute value of the package manifest entry.
pub const PRIMARY_TYPE: &str = "primary";

const DOCUMENT: &str = "repomd.xml";

/// One `<data>` entry of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// The `type` attribute (`primary`, `filelists`, `other`, ...).
    pub kind: String,
    /// Repo-relative path of the referenced metadata file.
    pub location: String,
}

impl MetadataEntry {
    pub fn is_primary(&self) -> bool {
        self.kind == PRIMARY_TYPE
    }
}

/// The metadata files listed by `repomd.xml`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    pub entries: Vec<MetadataEntry>,
}

impl RepositoryIndex {
    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary(&self) -> Option<&MetadataEntry> {
        self.entries.iter().find(|entry| entry.is_primary())
    }
}

impl<'a> IntoIterator for &'a RepositoryIndex {
    type Item = &'a MetadataEntry;
    type IntoIter = std::slice::Iter<'a, MetadataEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Default)]
struct PendingEntry {
    kind: String,
    location: Option<String>,
}

#[derive(Default)]
struct IndexParser {
    depth: usize,
    seen_root: bool,
    current: Option<PendingEntry>,
    entries: Vec<MetadataEntry>,
}

impl IndexParser {
    fn start(&mut self, e: &BytesStart) -> Result<()> {
        let name = e.local_name();
        match self.depth {
            0 => {
                if self.seen_root {
                    return Err(RegistryError::malformed(
                        DOCUMENT,
                        "more than one root element",
                    ));
                }
                if name.as_ref() != b"repomd" {
                    return Err(RegistryError::malformed(
                        DOCUMENT,
                        format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        ),
                    ));
                }
                self.seen_root = true;
            }
            1 if name.as_ref() == b"data" => {
                self.current = Some(PendingEntry {
                    kind: attribute(e, b"type", DOCUMENT)?.unwrap_or_default(),
                    location: None,
                });
            }
            2 if name.as_ref() == b"location" => {
                if let Some(current) = self.current.as_mut() {
                    current.location = attribute(e, b"href", DOCUMENT)?;
                }
            }
            _ => {}
        }
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| RegistryError::malformed(DOCUMENT, "unbalanced end tag"))?;

        if self.depth == 1 {
            if let Some(pending) = self.current.take() {
                let location = pending
                    .location
                    .filter(|location| !location.is_empty())
                    .ok_or_else(|| {
                        RegistryError::malformed(
                            DOCUMENT,
                            format!("<data type=\"{}\"> has no location", pending.kind),
                        )
                    })?;
                trace!(kind = %pending.kind, location = %location, "index entry");
                self.entries.push(MetadataEntry {
                    kind: pending.kind,
                    location,
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<RepositoryIndex> {
        if self.depth != 0 {
            return Err(RegistryError::malformed(
                DOCUMENT,
                "unexpected end of document",
            ));
        }
        if !self.seen_root {
            return Err(RegistryError::malformed(
                DOCUMENT,
                "missing <repomd> root element",
            ));
        }
        Ok(RepositoryIndex {
            entries: self.entries,
        })
    }
}

/// Decodes a repository index from `reader`.
///
/// Reading stops right after the root element closes; anything that follows is left
/// unread.
///
/// # Errors
///
/// Returns [`RegistryError::MalformedMetadata`] if the document is not well-formed, has
/// an unexpected root, or lists a `<data>` entry without a location.
///
/// # Example
///
/// ```
/// use reposync_registry::decode_index;
///
/// let xml = r#"<repomd><data type="primary"><location href="repodata/p.xml.gz"/></data></repomd>"#;
/// let index = decode_index(xml.as_bytes()).unwrap();
/// assert_eq!(index.primary().unwrap().location, "repodata/p.xml.gz");
/// ```
pub fn decode_index<R: Read>(reader: R) -> Result<RepositoryIndex> {
    let mut xml = Reader::from_reader(BufReader::new(reader));
    xml.config_mut().trim_text(true);

    let mut parser = IndexParser::default();
    let mut buf = Vec::new();

    loop {
        match xml
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(DOCUMENT, err))?
        {
            Event::Start(e) => parser.start(&e)?,
            Event::Empty(e) => {
                parser.start(&e)?;
                parser.end()?;
            }
            Event::End(_) => parser.end()?,
            Event::Eof => break,
            _ => {}
        }
        if parser.seen_root && parser.depth == 0 {
            break;
        }
        buf.clear();
    }

    parser.finish()
}
