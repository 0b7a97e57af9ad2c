//! Commit manifest encoding.

use crate::error::{CoreError, CoreResult};
use crate::types::{CommitVersion, Generation};

/// Magic bytes for manifest artifacts.
pub const MANIFEST_MAGIC: [u8; 4] = *b"SKCM";

/// Current manifest format version.
pub const MANIFEST_FORMAT: u16 = 1;

/// Artifact name prefix of manifests; the generation follows.
pub const MANIFEST_PREFIX: &str = "commit_";

/// Magic + format + version + generation + timestamp + count.
const HEADER_SIZE: usize = 4 + 2 + 8 + 8 + 8 + 4;
const FOOTER_SIZE: usize = 4;

/// Decoded contents of a manifest artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitManifest {
    /// Commit version.
    pub version: CommitVersion,
    /// Manifest generation.
    pub generation: Generation,
    /// Write time in Unix milliseconds.
    pub timestamp_millis: u64,
    /// Data artifacts referenced by the commit, excluding the manifest.
    pub files: Vec<String>,
}

impl CommitManifest {
    /// Returns the artifact name for a manifest of the given generation.
    #[must_use]
    pub fn file_name(generation: Generation) -> String {
        format!("{MANIFEST_PREFIX}{}", generation.as_u64())
    }

    /// Parses a manifest artifact name back into its generation.
    ///
    /// Returns `None` for names that are not manifests.
    #[must_use]
    pub fn parse_file_name(name: &str) -> Option<Generation> {
        let digits = name.strip_prefix(MANIFEST_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Generation::new)
    }

    /// Returns this manifest's own artifact name.
    #[must_use]
    pub fn name(&self) -> String {
        Self::file_name(self.generation)
    }

    /// Encodes the manifest to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a file name is longer than `u16::MAX` bytes or
    /// there are more than `u32::MAX` files.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + FOOTER_SIZE + self.files.len() * 16);

        buf.extend_from_slice(&MANIFEST_MAGIC);
        buf.extend_from_slice(&MANIFEST_FORMAT.to_le_bytes());
        buf.extend_from_slice(&self.version.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.generation.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.timestamp_millis.to_le_bytes());

        let count = u32::try_from(self.files.len())
            .map_err(|_| CoreError::invalid_format("too many files in commit"))?;
        buf.extend_from_slice(&count.to_le_bytes());

        for name in &self.files {
            let bytes = name.as_bytes();
            let len = u16::try_from(bytes.len())
                .map_err(|_| CoreError::invalid_format(format!("file name too long: {name}")))?;
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(bytes);
        }

        let checksum = crc32fast::hash(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }

    /// Decodes a manifest from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the magic, format, checksum or layout is invalid.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(CoreError::invalid_format("manifest too short"));
        }
        if data[0..4] != MANIFEST_MAGIC {
            return Err(CoreError::invalid_format("invalid manifest magic"));
        }

        let (body, footer) = data.split_at(data.len() - FOOTER_SIZE);
        let expected = read_u32(footer, 0);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let format = u16::from_le_bytes([body[4], body[5]]);
        if format > MANIFEST_FORMAT {
            return Err(CoreError::invalid_format(format!(
                "unsupported manifest format: {format}"
            )));
        }

        let version = CommitVersion::new(read_u64(body, 6));
        let generation = Generation::new(read_u64(body, 14));
        let timestamp_millis = read_u64(body, 22);
        let count = read_u32(body, 30) as usize;

        let mut cursor = HEADER_SIZE;
        let mut files = Vec::with_capacity(count.min(body.len() / 2));
        for _ in 0..count {
            if cursor + 2 > body.len() {
                return Err(CoreError::invalid_format("truncated file entry"));
            }
            let len = u16::from_le_bytes([body[cursor], body[cursor + 1]]) as usize;
            cursor += 2;
            if cursor + len > body.len() {
                return Err(CoreError::invalid_format("truncated file name"));
            }
            let name = std::str::from_utf8(&body[cursor..cursor + len])
                .map_err(|_| CoreError::invalid_format("file name is not utf-8"))?;
            files.push(name.to_string());
            cursor += len;
        }

        if cursor != body.len() {
            return Err(CoreError::invalid_format("trailing bytes after file list"));
        }

        Ok(Self {
            version,
            generation,
            timestamp_millis,
            files,
        })
    }
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(bytes)
}
