use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Fingerprint a set of files by path and content, returning a hex BLAKE3 digest.
///
/// Paths are hashed in the order given; callers pass a sorted list so the
/// fingerprint is stable across runs. Each entry is length-prefixed so that
/// moving bytes between adjacent files changes the digest.
///
/// # Errors
/// Returns an error if any file cannot be opened or read.
pub fn fingerprint_files(paths: &[impl AsRef<Path>]) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    for path in paths {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());

        let file = File::open(path)?;
        hasher.update(&file.metadata()?.len().to_le_bytes());
        let mut reader = BufReader::new(file);
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash a string, returning the hex-encoded BLAKE3 digest.
#[must_use]
pub fn fingerprint_str(data: &str) -> String {
    blake3::hash(data.as_bytes()).to_hex().to_string()
}
