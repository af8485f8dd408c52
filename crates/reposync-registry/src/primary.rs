//! Decoding of the gzip-compressed primary package manifest.

use std::io::{self, BufReader, Chain, Cursor, Read};

use flate2::read::MultiGzDecoder;
use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader,
};
pub use reposync_utils::hash::ChecksumType;

use crate::{
    error::{unshare_io, RegistryError, Result},
    xml::{attribute, text as unescape_text},
};

/// Leading bytes of every gzip member.
pub const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];

const DOCUMENT: &str = "primary manifest";

/// One `<package>` of the primary manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub arch: String,
    /// Repo-relative path of the package file.
    pub location: String,
    pub checksum_type: ChecksumType,
    /// Hex digest as published by the remote repository.
    pub checksum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub packages: Vec<PackageRecord>,
}

impl PackageManifest {
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Field {
    Arch,
    Checksum,
}

#[derive(Default)]
struct PendingPackage {
    arch: String,
    location: Option<String>,
    checksum_type: Option<String>,
    checksum: String,
}

impl PendingPackage {
    fn finish(self) -> Result<PackageRecord> {
        let location = self
            .location
            .filter(|location| !location.is_empty())
            .ok_or_else(|| RegistryError::malformed(DOCUMENT, "<package> has no location"))?;

        Ok(PackageRecord {
            arch: self.arch.trim().to_string(),
            location,
            checksum_type: ChecksumType::from_name(self.checksum_type.as_deref().unwrap_or("")),
            checksum: self.checksum.trim().to_string(),
        })
    }
}

type GzipSource<R> = MultiGzDecoder<Chain<Cursor<[u8; 2]>, R>>;

/// Incremental decoder over a gzip-compressed primary manifest.
///
/// Yields one [`PackageRecord`] per `<package>` element as soon as its end tag has
/// been read, so a caller can act on each package while the rest of the document is
/// still being received. Only the direct `arch`, `location` and `checksum` children
/// of a package are interpreted.
///
/// Concatenated gzip members are read as one stream. Once the root element closes the
/// rest of the compressed stream is consumed so that every member trailer is checked.
///
/// After the first error the iterator is fused and yields `None`.
pub struct ManifestReader<R: Read> {
    xml: Reader<BufReader<GzipSource<R>>>,
    buf: Vec<u8>,
    depth: usize,
    seen_root: bool,
    current: Option<PendingPackage>,
    field: Option<Field>,
    done: bool,
}

impl<R: Read> ManifestReader<R> {
    /// Wraps `reader` after checking that it starts with the gzip magic.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Decompression`] if the stream does not start with a gzip
    /// header.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                not_gzip("stream is too short to be gzip")
            } else {
                RegistryError::IoError {
                    action: format!("reading {DOCUMENT}"),
                    source: err,
                }
            }
        })?;

        if magic != GZIP_MAGIC_BYTES {
            return Err(not_gzip("invalid gzip header"));
        }

        let decoder = MultiGzDecoder::new(Cursor::new(magic).chain(reader));
        let mut xml = Reader::from_reader(BufReader::new(decoder));
        xml.config_mut().trim_text(true);

        Ok(Self {
            xml,
            buf: Vec::new(),
            depth: 0,
            seen_root: false,
            current: None,
            field: None,
            done: false,
        })
    }

    fn next_record(&mut self) -> Result<Option<PackageRecord>> {
        let mut buf = std::mem::take(&mut self.buf);
        let result = self.advance(&mut buf);
        buf.clear();
        self.buf = buf;
        result
    }

    fn advance(&mut self, buf: &mut Vec<u8>) -> Result<Option<PackageRecord>> {
        loop {
            buf.clear();
            let event = self.xml.read_event_into(buf).map_err(decode_error)?;
            match event {
                Event::Start(e) => self.start(&e)?,
                Event::Empty(e) => {
                    self.start(&e)?;
                    if let Some(record) = self.end()? {
                        return Ok(Some(record));
                    }
                }
                Event::End(_) => {
                    if let Some(record) = self.end()? {
                        return Ok(Some(record));
                    }
                }
                Event::Text(t) => self.text(&t)?,
                Event::CData(c) => {
                    let value = String::from_utf8_lossy(&c).into_owned();
                    self.append(&value);
                }
                Event::Eof => {
                    if self.depth != 0 {
                        return Err(RegistryError::malformed(
                            DOCUMENT,
                            "unexpected end of document",
                        ));
                    }
                    if !self.seen_root {
                        return Err(RegistryError::malformed(
                            DOCUMENT,
                            "missing <metadata> root element",
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }

            if self.seen_root && self.depth == 0 {
                self.drain()?;
                return Ok(None);
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        io::copy(self.xml.get_mut(), &mut io::sink())
            .map(|_| ())
            .map_err(gzip_error)
    }

    fn start(&mut self, e: &BytesStart) -> Result<()> {
        let name = e.local_name();
        match self.depth {
            0 => {
                if name.as_ref() != b"metadata" {
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
            1 if name.as_ref() == b"package" => {
                self.current = Some(PendingPackage::default());
            }
            2 => {
                if let Some(current) = self.current.as_mut() {
                    match name.as_ref() {
                        b"arch" => self.field = Some(Field::Arch),
                        b"location" => current.location = attribute(e, b"href", DOCUMENT)?,
                        b"checksum" => {
                            current.checksum_type = attribute(e, b"type", DOCUMENT)?;
                            self.field = Some(Field::Checksum);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<Option<PackageRecord>> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| RegistryError::malformed(DOCUMENT, "unbalanced end tag"))?;

        match self.depth {
            2 => self.field = None,
            1 => {
                if let Some(pending) = self.current.take() {
                    return pending.finish().map(Some);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn text(&mut self, t: &BytesText) -> Result<()> {
        if self.depth == 3 && self.field.is_some() {
            let value = unescape_text(t, DOCUMENT)?;
            self.append(&value);
        }
        Ok(())
    }

    fn append(&mut self, value: &str) {
        if self.depth != 3 {
            return;
        }
        if let (Some(field), Some(current)) = (self.field, self.current.as_mut()) {
            match field {
                Field::Arch => current.arch.push_str(value),
                Field::Checksum => current.checksum.push_str(value),
            }
        }
    }
}

impl<R: Read> Iterator for ManifestReader<R> {
    type Item = Result<PackageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn not_gzip(reason: &str) -> RegistryError {
    RegistryError::Decompression {
        document: DOCUMENT.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidData, reason.to_string()),
    }
}

fn decode_error(err: quick_xml::Error) -> RegistryError {
    match err {
        quick_xml::Error::Io(source) => gzip_error(unshare_io(source)),
        other => RegistryError::malformed(DOCUMENT, other.to_string()),
    }
}

/// Read failures raised by the gzip layer are decompression errors; everything else
/// coming from the underlying stream stays an I/O error.
fn gzip_error(source: io::Error) -> RegistryError {
    match source.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            RegistryError::Decompression {
                document: DOCUMENT.to_string(),
                source,
            }
        }
        _ => {
            RegistryError::IoError {
                action: format!("reading {DOCUMENT}"),
                source,
            }
        }
    }
}

/// Decodes a whole primary manifest from a gzip-compressed `reader`.
///
/// # Errors
///
/// Returns [`RegistryError::Decompression`] if the stream is not valid gzip and
/// [`RegistryError::MalformedMetadata`] if the decompressed document is not
/// well-formed.
pub fn decode_manifest<R: Read>(reader: R) -> Result<PackageManifest> {
    let packages = ManifestReader::new(reader)?.collect::<Result<Vec<_>>>()?;
    Ok(PackageManifest {
        packages,
    })
}
