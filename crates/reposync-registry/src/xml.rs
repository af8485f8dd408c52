use quick_xml::events::{BytesStart, BytesText};

use crate::error::{unshare_io, RegistryError, Result};

/// Maps a quick-xml failure to a registry error. Read failures stay I/O errors, all
/// others are structural.
pub(crate) fn xml_error(document: &str, err: quick_xml::Error) -> RegistryError {
    match err {
        quick_xml::Error::Io(source) => {
            RegistryError::IoError {
                action: format!("reading {document}"),
                source: unshare_io(source),
            }
        }
        other => RegistryError::malformed(document, other.to_string()),
    }
}

/// Value of the attribute whose local name is `name`, unescaped.
pub(crate) fn attribute(e: &BytesStart, name: &[u8], document: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| RegistryError::malformed(document, err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|err| xml_error(document, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) fn text(t: &BytesText, document: &str) -> Result<String> {
    t.unescape()
        .map(|value| value.into_owned())
        .map_err(|err| xml_error(document, err))
}
