//! Key hashing for backend placement.
//!
//! Two pure functions: a keyed 64-bit hash of the routing key, and the jump
//! consistent hash mapping that value onto a bucket index. Both are pinned by
//! tests because every instance in a fleet must agree on placement across
//! restarts and deploys.

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

// Fixed SipHash keys. Placement only needs a fast keyed hash that is stable
// everywhere, not a secret one.
const SEED_K0: u64 = 0;
const SEED_K1: u64 = 0x4c61_7279_426f_6174;

/// Hash a routing key to the 64-bit value fed into [`jump_hash`].
///
/// SipHash-2-4 over the raw key bytes with fixed keys. Written through
/// `Hasher::write` so the digest matches other SipHash implementations
/// byte-for-byte (the `Hash` impl for `str` appends a terminator and would
/// not).
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = SipHasher24::new_with_keys(SEED_K0, SEED_K1);
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// Map a 64-bit hash onto `0..num_buckets`.
///
/// Integer formulation of jump consistent hashing: O(log n) arithmetic, no
/// stored ring, and growing the bucket count only remaps keys into the new
/// bucket. `num_buckets` of zero yields index 0; callers reject empty node
/// lists before routing.
pub fn jump_hash(mut key: u64, num_buckets: usize) -> usize {
    if num_buckets == 0 {
        return 0;
    }
    let num_buckets = num_buckets as i64;
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < num_buckets {
        b = j;
        key = key.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(1);
        // The shifted divisor is zero roughly once per 2^31 draws; clamping
        // to 1 ends the loop on the current bucket instead of dividing by
        // zero.
        let r = (key >> 33).max(1);
        j = (b + 1) * ((1i64 << 31) / r as i64 + 1);
    }
    b as usize
}
