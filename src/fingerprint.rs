/*!
 * Content fingerprints for local media files.
 *
 * The service identifies a release by a 64-bit checksum of the file size and
 * its first and last 64 KiB, so a file can be matched without uploading it.
 * This is not a cryptographic hash: files sharing size and boundary bytes
 * share a fingerprint.
 */

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::errors::{ClientError, Result};

/// Bytes summed from each end of the file
pub const CHUNK_SIZE: u64 = 64 * 1024;

/// Smallest file that can be fingerprinted
pub const MIN_FILE_SIZE: u64 = 2 * CHUNK_SIZE;

/// Fingerprint of the file at `path` as 16 lowercase hex digits
pub fn fingerprint<P: AsRef<Path>>(path: P) -> Result<String> {
    let file = File::open(path.as_ref())?;
    let size = file.metadata()?.len();
    fingerprint_reader(file, size)
}

/// Fingerprint of `size` bytes readable from `reader`
///
/// `size` is trusted: it seeds the checksum and locates the tail chunk.
pub fn fingerprint_reader<R: Read + Seek>(mut reader: R, size: u64) -> Result<String> {
    if size < MIN_FILE_SIZE {
        return Err(ClientError::HashTooSmall {
            size,
            minimum: MIN_FILE_SIZE,
        });
    }

    let mut checksum = size;
    let mut buffer = vec![0u8; CHUNK_SIZE as usize];

    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut buffer)?;
    checksum = add_words(checksum, &buffer);

    reader.seek(SeekFrom::Start(size - CHUNK_SIZE))?;
    reader.read_exact(&mut buffer)?;
    checksum = add_words(checksum, &buffer);

    Ok(format!("{:016x}", checksum))
}

/// Wrapping sum of little-endian u64 words
fn add_words(seed: u64, bytes: &[u8]) -> u64 {
    bytes.chunks_exact(8).fold(seed, |sum, word| {
        let mut le = [0u8; 8];
        le.copy_from_slice(word);
        sum.wrapping_add(u64::from_le_bytes(le))
    })
}

/// Lowercase hex MD5 of a whole file, as the service expects for subtitle lookups
pub fn md5_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 4096];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}
