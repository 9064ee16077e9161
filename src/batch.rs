/*!
 * Chunked calls for endpoints with per-request item limits.
 *
 * Chunks are issued sequentially, in input order, sharing the caller's
 * session. A failing chunk aborts the rest; effects of earlier chunks (files
 * already written, votes already cast) stay in place.
 */

use crate::errors::{ClientError, Result};

/// Useragent the service hands out for development; it only allows one item per request
pub const DEV_USERAGENT: &str = "TemporaryUserAgent";

/// Per-operation item limits imposed by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub search: usize,
    pub download: usize,
    pub preview: usize,
    pub comments: usize,
    pub guess: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            search: 20,
            download: 20,
            preview: 20,
            comments: 20,
            guess: 3,
        }
    }
}

impl BatchLimits {
    /// One item per request everywhere
    pub fn restricted() -> Self {
        Self {
            search: 1,
            download: 1,
            preview: 1,
            comments: 1,
            guess: 1,
        }
    }

    /// Limits that apply to a session opened with `useragent`
    pub fn for_useragent(useragent: &str) -> Self {
        if useragent == DEV_USERAGENT {
            Self::restricted()
        } else {
            Self::default()
        }
    }
}

/// Call `call` once per chunk of at most `chunk_size` items, concatenating results
///
/// A chunk returning `None` contributes nothing.
pub fn batch<T, R, F>(items: &[T], chunk_size: usize, mut call: F) -> Result<Vec<R>>
where
    F: FnMut(&[T]) -> Result<Option<Vec<R>>>,
{
    check_chunk_size(chunk_size)?;

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(chunk_size) {
        if let Some(part) = call(chunk)? {
            results.extend(part);
        }
    }
    Ok(results)
}

/// Same as [`batch`] over two index-aligned lists, sliced at the same offsets
pub fn batch_pairs<A, B, R, F>(left: &[A], right: &[B], chunk_size: usize, mut call: F) -> Result<Vec<R>>
where
    F: FnMut(&[A], &[B]) -> Result<Option<Vec<R>>>,
{
    check_chunk_size(chunk_size)?;
    if left.len() != right.len() {
        return Err(ClientError::InvalidInput(format!(
            "batched lists must be the same length ({} != {})",
            left.len(),
            right.len()
        )));
    }

    let mut results = Vec::with_capacity(left.len());
    for (l, r) in left.chunks(chunk_size).zip(right.chunks(chunk_size)) {
        if let Some(part) = call(l, r)? {
            results.extend(part);
        }
    }
    Ok(results)
}

fn check_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(ClientError::InvalidInput("chunk size must be at least 1".to_string()));
    }
    Ok(())
}
