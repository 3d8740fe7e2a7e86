//! A fast, non-cryptographic 64-bit integrity tag.
//!
//! Used to detect version skew between a common file's two payloads before
//! paying for a full diff, and to catch corruption after decompression. This
//! is not a security primitive — collisions are possible, just unlikely
//! enough to be negligible for that purpose.
//!
//! Algorithm: seed `h = 1234567890`, then fold the input 8 bytes at a time as
//! `h = h.wrapping_mul(33).wrapping_add(word)` (word read little-endian),
//! folding any remaining tail bytes one at a time the same way.

const SEED: u64 = 1_234_567_890;

/// Hash a byte slice to a 64-bit integrity tag.
pub fn hash(data: &[u8]) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Incremental hasher for data that arrives in multiple chunks.
///
/// Produces the same result as [`hash`] when fed the concatenation of all
/// chunks passed to [`update`](Hasher::update).
#[derive(Debug, Clone)]
pub struct Hasher {
    state: u64,
    // Bytes carried over from a previous `update` call that didn't complete
    // an 8-byte word.
    carry: [u8; 8],
    carry_len: usize,
}

impl Hasher {
    /// Start a new incremental hash.
    pub fn new() -> Self {
        Self {
            state: SEED,
            carry: [0u8; 8],
            carry_len: 0,
        }
    }

    /// Fold `data` into the running hash.
    pub fn update(&mut self, mut data: &[u8]) {
        if self.carry_len > 0 {
            let need = 8 - self.carry_len;
            let take = need.min(data.len());
            self.carry[self.carry_len..self.carry_len + take].copy_from_slice(&data[..take]);
            self.carry_len += take;
            data = &data[take..];
            if self.carry_len < 8 {
                return;
            }
            let word = u64::from_le_bytes(self.carry);
            self.state = self.state.wrapping_mul(33).wrapping_add(word);
            self.carry_len = 0;
        }

        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let word = u64::from_le_bytes(chunk.try_into().unwrap());
            self.state = self.state.wrapping_mul(33).wrapping_add(word);
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            self.carry[..remainder.len()].copy_from_slice(remainder);
            self.carry_len = remainder.len();
        }
    }

    /// Finalize the hash, folding any remaining tail bytes one at a time.
    pub fn finish(mut self) -> u64 {
        for byte in self.carry[..self.carry_len].to_vec() {
            self.state = self.state.wrapping_mul(33).wrapping_add(byte as u64);
        }
        self.state
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_seed() {
        assert_eq!(hash(&[]), SEED);
    }

    #[test]
    fn chunked_updates_match_one_shot() {
        let data: Vec<u8> = (0u8..=255).cycle().take(1237).collect();
        let one_shot = hash(&data);

        let mut chunked = Hasher::new();
        for chunk in data.chunks(17) {
            chunked.update(chunk);
        }
        assert_eq!(chunked.finish(), one_shot);
    }

    #[test]
    fn single_tail_byte_is_folded() {
        let data = [0xAAu8];
        let expected = SEED.wrapping_mul(33).wrapping_add(0xAA);
        assert_eq!(hash(&data), expected);
    }

    #[test]
    fn differs_for_different_inputs() {
        assert_ne!(hash(b"hello"), hash(b"world"));
    }
}
