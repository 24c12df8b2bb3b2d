//! Content digests and digest-qualified output names.

use std::fmt;

/// Hex characters of the digest embedded in output names.
pub const DIGEST_LEN: usize = 16;

/// A 256-bit content digest (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    #[inline]
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// The truncated form used in file names.
    pub fn short(self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(DIGEST_LEN);
        hex
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Insert the digest before the extension, keeping any directory part.
///
/// ```text
/// js/app.js      → js/app-<digest>.js
/// app            → app-<digest>
/// jquery.min.js  → jquery.min-<digest>.js
/// ```
pub fn qualified_name(name: &str, digest: ContentDigest) -> String {
    let (dir, file) = match name.rfind('/') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = file.split_at(dot);
            format!("{dir}{stem}-{digest}{ext}")
        }
        _ => format!("{dir}{file}-{digest}"),
    }
}
