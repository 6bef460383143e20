//! Per-file hash metadata cached in extended attributes.
//!
//! Each regular file admitted by a scan carries its size, modification time
//! and three digests (MD5, SHA-1, SHA-256) in extended attributes. Two
//! layouts are written side by side:
//!
//! - a combined stamp, `size:N,modTime:N,md5:<b64>,sha1:<b64>,sha256:<b64>`
//! - one attribute per field, integers in decimal and digests in hex
//!
//! On load the stamp is consulted first and the per-field attributes fill in
//! whatever it did not provide. The cached size and mtime are compared with
//! a fresh `fstat` snapshot to decide whether the digests can be trusted.
//!
//! # Example
//!
//! ```
//! use dedupe::metadata::{Bits, Metadata};
//!
//! let mut meta = Metadata::default();
//! meta.decode(b"size:100,modTime:1700000000");
//! assert_eq!(meta.bits, Bits::SIZE | Bits::TIME);
//! assert!(meta.check(100, 1_700_000_000));
//! assert!(!meta.check(100, 1_700_000_001));
//! ```

pub mod attr;
pub mod bits;
pub mod codec;
pub mod names;

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub use bits::Bits;
pub use names::{AttrNames, DEFAULT_NAMESPACE};

/// Read size used while hashing.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub type Md5Sum = [u8; 16];
pub type Sha1Sum = [u8; 20];
pub type Sha256Sum = [u8; 32];

/// Cached identity of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Which of the fields below hold valid values
    pub bits: Bits,
    pub size: i64,
    /// Modification time in whole seconds
    pub time: i64,
    pub md5: Md5Sum,
    pub sha1: Sha1Sum,
    pub sha256: Sha256Sum,
}

impl Metadata {
    /// Clear every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when all five fields are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.bits.has_all(Bits::ALL)
    }

    /// Staleness check against a stat snapshot.
    ///
    /// Only the size and time fields are inspected; digests are not.
    #[must_use]
    pub fn check(&self, size: i64, time: i64) -> bool {
        self.bits.has_all(Bits::SIZE | Bits::TIME) && self.size == size && self.time == time
    }

    /// Load cached fields from `file`'s attributes.
    ///
    /// Returns whether every field was recovered. Missing or malformed
    /// attributes only leave their field unset.
    pub fn load(&mut self, file: &File, path: &Path, names: &AttrNames) -> bool {
        if let Some(raw) = attr::maybe_get(file, path, &names.stamp) {
            self.decode(&raw);
        }

        let fallbacks: [(Bits, &str, fn(&mut Self, &[u8])); 5] = [
            (Bits::SIZE, names.size.as_str(), Self::decode_size),
            (Bits::TIME, names.time.as_str(), Self::decode_time),
            (Bits::MD5, names.md5.as_str(), Self::decode_md5),
            (Bits::SHA1, names.sha1.as_str(), Self::decode_sha1),
            (Bits::SHA256, names.sha256.as_str(), Self::decode_sha256),
        ];
        for (bit, name, decode) in fallbacks {
            if self.bits.has(bit) {
                continue;
            }
            if let Some(raw) = attr::maybe_get(file, path, name) {
                decode(self, &raw);
            }
        }

        self.is_complete()
    }

    /// Parse a stamp.
    ///
    /// Keys are matched case-insensitively, unknown keys and pieces
    /// without a `:` are ignored. Returns whether every field is now set.
    pub fn decode(&mut self, input: &[u8]) -> bool {
        for piece in input.split(|&b| b == b',') {
            let Some(colon) = piece.iter().position(|&b| b == b':') else {
                continue;
            };
            let (key, value) = (&piece[..colon], &piece[colon + 1..]);

            if key.eq_ignore_ascii_case(b"size") {
                self.decode_size(value);
            } else if key.eq_ignore_ascii_case(b"modTime") {
                self.decode_time(value);
            } else if key.eq_ignore_ascii_case(b"md5") {
                self.decode_md5(value);
            } else if key.eq_ignore_ascii_case(b"sha1") {
                self.decode_sha1(value);
            } else if key.eq_ignore_ascii_case(b"sha256") {
                self.decode_sha256(value);
            }
        }
        self.is_complete()
    }

    fn decode_size(&mut self, raw: &[u8]) {
        match codec::decode_int(raw) {
            Some(value) => {
                self.size = value;
                self.bits |= Bits::SIZE;
            }
            None => warn_undecodable("size", raw),
        }
    }

    fn decode_time(&mut self, raw: &[u8]) {
        match codec::decode_int(raw) {
            Some(value) => {
                self.time = value;
                self.bits |= Bits::TIME;
            }
            None => warn_undecodable("last modified time", raw),
        }
    }

    fn decode_md5(&mut self, raw: &[u8]) {
        match codec::decode_hash(raw) {
            Some(sum) => {
                self.md5 = sum;
                self.bits |= Bits::MD5;
            }
            None => warn_undecodable("MD5 hash", raw),
        }
    }

    fn decode_sha1(&mut self, raw: &[u8]) {
        match codec::decode_hash(raw) {
            Some(sum) => {
                self.sha1 = sum;
                self.bits |= Bits::SHA1;
            }
            None => warn_undecodable("SHA1 hash", raw),
        }
    }

    fn decode_sha256(&mut self, raw: &[u8]) {
        match codec::decode_hash(raw) {
            Some(sum) => {
                self.sha256 = sum;
                self.bits |= Bits::SHA256;
            }
            None => warn_undecodable("SHA256 hash", raw),
        }
    }

    /// Render the stamp. Digests are standard base64.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Hash the whole content of `file`.
    ///
    /// The file is rewound and read once in [`CHUNK_SIZE`] chunks through
    /// all three digests. Fails if a read errors or the number of bytes
    /// read differs from `size`, which means the file changed after the
    /// snapshot was taken. On success every field is replaced.
    pub fn compute(&mut self, file: &File, path: &Path, size: i64, time: i64) -> bool {
        match hash_content(file) {
            Ok((read, md5, sha1, sha256)) => {
                if i64::try_from(read).ok() != Some(size) {
                    log::warn!(
                        "{}: file size changed while computing hash (expected {size}, read {read})",
                        path.display()
                    );
                    return false;
                }
                *self = Self {
                    bits: Bits::ALL,
                    size,
                    time,
                    md5,
                    sha1,
                    sha256,
                };
                true
            }
            Err(err) => {
                log::error!("{}: I/O error while hashing: {err}", path.display());
                false
            }
        }
    }

    /// Write the stamp and the five per-field attributes.
    ///
    /// Attributes already holding the same bytes are left alone. Failures
    /// are logged.
    pub fn save(&self, file: &File, path: &Path, names: &AttrNames) {
        attr::maybe_set(file, path, &names.stamp, self.encode().as_bytes());
        attr::maybe_set(file, path, &names.size, codec::encode_int(self.size).as_bytes());
        attr::maybe_set(file, path, &names.time, codec::encode_int(self.time).as_bytes());
        attr::maybe_set(file, path, &names.md5, codec::encode_hex(&self.md5).as_bytes());
        attr::maybe_set(file, path, &names.sha1, codec::encode_hex(&self.sha1).as_bytes());
        attr::maybe_set(file, path, &names.sha256, codec::encode_hex(&self.sha256).as_bytes());
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size:{},modTime:{},md5:{},sha1:{},sha256:{}",
            self.size,
            self.time,
            codec::encode_b64(&self.md5),
            codec::encode_b64(&self.sha1),
            codec::encode_b64(&self.sha256)
        )
    }
}

fn warn_undecodable(what: &str, raw: &[u8]) {
    log::warn!(
        "failed to decode {what} from {:?}",
        String::from_utf8_lossy(raw)
    );
}

type Digests = (u64, Md5Sum, Sha1Sum, Sha256Sum);

fn hash_content(mut file: &File) -> io::Result<Digests> {
    file.seek(SeekFrom::Start(0))?;

    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buffer[..n];
        md5.update(chunk);
        sha1.update(chunk);
        sha256.update(chunk);
        total += n as u64;
    }

    Ok((
        total,
        md5.finalize().into(),
        sha1.finalize().into(),
        sha256.finalize().into(),
    ))
}
