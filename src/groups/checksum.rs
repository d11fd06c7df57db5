//! Order- and content-sensitive fingerprint of a segment's summaries.

use md5::{Digest, Md5};

/// Hash a sequence of slot summaries (empty string for a vacant slot).
///
/// Each summary is mixed with its slot index, so substituting, moving,
/// vacating or re-occupying a slot changes the result. An empty sequence and
/// a sequence of vacant slots hash differently. Collisions are acceptable;
/// this is an equality oracle for remote caches, not a security primitive.
pub fn checksum<'a, I>(summaries: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Md5::new();
    for (index, summary) in summaries.into_iter().enumerate() {
        hasher.update((index as u64).to_le_bytes());
        hasher.update(summary.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
