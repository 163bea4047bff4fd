//! Format-preserving encryption over small alphabets
//!
//! A 10-round unbalanced Feistel network whose round function is
//! HMAC-SHA256 keyed on the column sub-key, reduced modulo the half-block
//! domain size. Not a certified FF1/FF3 implementation; adequate for
//! pseudonymization over short domains.

use super::hmac_sha256;
use crate::domain::{Result, VeilError};
use crate::format::Alphabet;

const ROUNDS: u8 = 10;

/// Upper bound on cycle-walking iterations. Walking always terminates for a
/// legal plaintext because the walk traverses a permutation cycle that
/// contains it; the bound only guards against a predicate that never holds.
const MAX_WALK: u32 = 1_000_000;

/// Feistel FPE cipher bound to one key (normally a column sub-key)
pub struct FpeCipher {
    key: [u8; 32],
}

impl FpeCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypt a block; the output has the same length and alphabet
    pub fn encrypt(&self, tweak: &[u8], alphabet: Alphabet, input: &str) -> Result<String> {
        self.transform(tweak, alphabet, input, true)
    }

    /// Exact inverse of [`encrypt`](Self::encrypt) under the same tweak
    pub fn decrypt(&self, tweak: &[u8], alphabet: Alphabet, input: &str) -> Result<String> {
        self.transform(tweak, alphabet, input, false)
    }

    /// Cycle-walk until the ciphertext satisfies `legal`
    ///
    /// Used for constrained domains such as digit strings that must not
    /// start with zero. The plaintext itself must satisfy `legal`.
    pub fn encrypt_until(
        &self,
        tweak: &[u8],
        alphabet: Alphabet,
        input: &str,
        legal: impl Fn(&str) -> bool,
    ) -> Result<String> {
        let mut out = self.encrypt(tweak, alphabet, input)?;
        let mut walked = 0;
        while !legal(&out) {
            walked += 1;
            if walked > MAX_WALK {
                return Err(VeilError::ExhaustedDomain {
                    column: "<cycle-walk>".to_string(),
                    attempts: walked,
                });
            }
            out = self.encrypt(tweak, alphabet, &out)?;
        }
        Ok(out)
    }

    /// Inverse of [`encrypt_until`](Self::encrypt_until)
    pub fn decrypt_until(
        &self,
        tweak: &[u8],
        alphabet: Alphabet,
        input: &str,
        legal: impl Fn(&str) -> bool,
    ) -> Result<String> {
        let mut out = self.decrypt(tweak, alphabet, input)?;
        let mut walked = 0;
        while !legal(&out) {
            walked += 1;
            if walked > MAX_WALK {
                return Err(VeilError::ExhaustedDomain {
                    column: "<cycle-walk>".to_string(),
                    attempts: walked,
                });
            }
            out = self.decrypt(tweak, alphabet, &out)?;
        }
        Ok(out)
    }

    fn transform(
        &self,
        tweak: &[u8],
        alphabet: Alphabet,
        input: &str,
        encrypt: bool,
    ) -> Result<String> {
        if input.is_empty() {
            return Ok(String::new());
        }

        let mut indices = Vec::with_capacity(input.len());
        for c in input.chars() {
            match alphabet.index_of(c) {
                Some(i) => indices.push(i as u128),
                None => {
                    return Err(VeilError::FormatUnparseable {
                        kind: "alphabet",
                        detail: format!("character {c:?} outside FPE alphabet"),
                    })
                }
            }
        }

        // Long inputs are split into blocks small enough that a half-block
        // value fits in u128; each block is diversified by its index.
        let radix = alphabet.radix() as u128;
        let block_len = max_block_len(radix);
        for (block_idx, block) in indices.chunks_mut(block_len).enumerate() {
            self.feistel(tweak, block_idx as u8, radix, block, encrypt);
        }

        Ok(indices
            .iter()
            .map(|&i| alphabet.char_at(i as usize))
            .collect())
    }

    fn feistel(&self, tweak: &[u8], block_idx: u8, radix: u128, block: &mut [u128], encrypt: bool) {
        let n = block.len();
        if n == 1 {
            // A 1-symbol block has an empty right half, so the network would
            // be the identity. Apply a keyed non-zero rotation instead; the
            // offset depends only on key and tweak, so it inverts exactly.
            let mut offset = self.round_prf(tweak, block_idx, 0xff, &[], radix);
            if offset == 0 {
                offset = 1 % radix;
            }
            block[0] = if encrypt {
                (block[0] + offset) % radix
            } else {
                (block[0] + radix - offset) % radix
            };
            return;
        }

        let half = n.div_ceil(2);
        let mod_left = pow(radix, half);
        let mod_right = pow(radix, n - half);

        let rounds: Vec<u8> = if encrypt {
            (0..ROUNDS).collect()
        } else {
            (0..ROUNDS).rev().collect()
        };

        for round in rounds {
            let (left, right) = block.split_at_mut(half);
            // Even rounds add into the right half keyed on the left, odd
            // rounds the reverse; decryption subtracts in reverse order.
            let (target, source, modulus) = if round % 2 == 0 {
                (right, &*left, mod_right)
            } else {
                (left, &*right, mod_left)
            };
            let f = self.round_prf(tweak, block_idx, round, source, modulus);
            let value = decode(target, radix);
            let value = if encrypt {
                (value + f) % modulus
            } else {
                (value + modulus - f) % modulus
            };
            encode(value, radix, target);
        }
    }

    fn round_prf(&self, tweak: &[u8], block_idx: u8, round: u8, side: &[u128], modulus: u128) -> u128 {
        let side_bytes: Vec<u8> = side.iter().map(|&i| i as u8).collect();
        let mac = hmac_sha256(&self.key, &[tweak, &[block_idx, round], &side_bytes]);
        let wide = u128::from_be_bytes(mac[..16].try_into().expect("16 bytes"));
        wide % modulus
    }
}

/// Largest block length whose half-block domain still fits in u128
fn max_block_len(radix: u128) -> usize {
    let mut half = 0usize;
    let mut value: u128 = 1;
    while let Some(next) = value.checked_mul(radix) {
        if next > (1u128 << 120) {
            break;
        }
        value = next;
        half += 1;
    }
    half * 2
}

// Callers keep exponents within max_block_len, so this cannot overflow
fn pow(radix: u128, exp: usize) -> u128 {
    (0..exp).fold(1u128, |acc, _| acc * radix)
}

fn decode(digits: &[u128], radix: u128) -> u128 {
    digits.iter().fold(0, |acc, &d| acc * radix + d)
}

fn encode(mut value: u128, radix: u128, out: &mut [u128]) {
    for slot in out.iter_mut().rev() {
        *slot = value % radix;
        value /= radix;
    }
}
