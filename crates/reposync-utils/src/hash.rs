use std::{
    fmt,
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

/// Checksum algorithms that appear in repository metadata.
///
/// `Unknown` covers every algorithm name that is not recognized. It can never be
/// computed, so a value tagged with it never matches a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumType {
    Sha1,
    Sha256,
    Unknown,
}

impl ChecksumType {
    /// Maps an algorithm name from repository metadata to a [`ChecksumType`].
    ///
    /// `sha` and `sha1` both map to [`ChecksumType::Sha1`]. Any other name than
    /// `sha256` maps to [`ChecksumType::Unknown`].
    ///
    /// # Example
    ///
    /// ```
    /// use reposync_utils::hash::ChecksumType;
    ///
    /// assert_eq!(ChecksumType::from_name("sha"), ChecksumType::Sha1);
    /// assert_eq!(ChecksumType::from_name("sha256"), ChecksumType::Sha256);
    /// assert_eq!(ChecksumType::from_name("md5"), ChecksumType::Unknown);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "sha" | "sha1" => ChecksumType::Sha1,
            "sha256" => ChecksumType::Sha256,
            _ => ChecksumType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ChecksumType::Unknown)
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calculates the checksum of a file.
///
/// The file is streamed through the hasher, so it is never loaded into memory as a
/// whole. The result is a lowercase hex-encoded string.
///
/// # Arguments
///
/// * `file_path` - The path to the file to calculate the checksum for.
/// * `algorithm` - The algorithm to apply.
///
/// # Errors
///
/// * [`HashError::UnsupportedAlgorithm`] if `algorithm` is [`ChecksumType::Unknown`].
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
///
/// # Example
///
/// ```no_run
/// use reposync_utils::error::HashResult;
/// use reposync_utils::hash::{calculate_checksum, ChecksumType};
///
/// fn main() -> HashResult<()> {
///     let checksum = calculate_checksum("/path/to/file", ChecksumType::Sha256)?;
///     println!("Checksum is {}", checksum);
///     Ok(())
/// }
/// ```
pub fn calculate_checksum<P: AsRef<Path>>(
    file_path: P,
    algorithm: ChecksumType,
) -> HashResult<String> {
    let file_path = file_path.as_ref();

    let digest = match algorithm {
        ChecksumType::Sha1 => digest_file::<Sha1>(file_path),
        ChecksumType::Sha256 => digest_file::<Sha256>(file_path),
        ChecksumType::Unknown => {
            return Err(HashError::UnsupportedAlgorithm {
                path: file_path.to_path_buf(),
                algorithm: algorithm.to_string(),
            });
        }
    };

    digest.map_err(|source| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source,
        }
    })
}

fn digest_file<D>(path: &Path) -> io::Result<String>
where
    D: Digest + io::Write,
{
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = D::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
