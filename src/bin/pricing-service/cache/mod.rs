mod keys;
mod l1;
mod l2;
mod tiered;

pub(crate) use keys::CacheCategory;
pub(crate) use tiered::CacheTier;

use serde::{Deserialize, Serialize};

/// Versioned envelope so a schema change to `T` doesn't poison caches full
/// of the old shape — an old envelope simply fails to deserialize as the
/// new `T` and is treated as a miss rather than as corrupt data.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u16,
    data: T,
}

const ENVELOPE_VERSION: u16 = 1;

impl<T> Envelope<T> {
    fn wrap(data: &T) -> EnvelopeRef<'_, T> {
        EnvelopeRef {
            version: ENVELOPE_VERSION,
            data,
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u16,
    data: &'a T,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Loader(#[from] anyhow::Error),
}
