//! AES key expansion and software block cipher (FIPS-197).
//!
//! The decryption schedule uses the layout of the equivalent inverse cipher
//! (FIPS-197 §5.3.5): round keys in reverse order with `InvMixColumns`
//! applied to every set except the first and last.

use crate::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Words per round key.
const NB: usize = 4;

const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];

const INV_SBOX: [u8; 256] = [
    0x52, 0x09, 0x6a, 0xd5, 0x30, 0x36, 0xa5, 0x38, 0xbf, 0x40, 0xa3, 0x9e, 0x81, 0xf3, 0xd7, 0xfb,
    0x7c, 0xe3, 0x39, 0x82, 0x9b, 0x2f, 0xff, 0x87, 0x34, 0x8e, 0x43, 0x44, 0xc4, 0xde, 0xe9, 0xcb,
    0x54, 0x7b, 0x94, 0x32, 0xa6, 0xc2, 0x23, 0x3d, 0xee, 0x4c, 0x95, 0x0b, 0x42, 0xfa, 0xc3, 0x4e,
    0x08, 0x2e, 0xa1, 0x66, 0x28, 0xd9, 0x24, 0xb2, 0x76, 0x5b, 0xa2, 0x49, 0x6d, 0x8b, 0xd1, 0x25,
    0x72, 0xf8, 0xf6, 0x64, 0x86, 0x68, 0x98, 0x16, 0xd4, 0xa4, 0x5c, 0xcc, 0x5d, 0x65, 0xb6, 0x92,
    0x6c, 0x70, 0x48, 0x50, 0xfd, 0xed, 0xb9, 0xda, 0x5e, 0x15, 0x46, 0x57, 0xa7, 0x8d, 0x9d, 0x84,
    0x90, 0xd8, 0xab, 0x00, 0x8c, 0xbc, 0xd3, 0x0a, 0xf7, 0xe4, 0x58, 0x05, 0xb8, 0xb3, 0x45, 0x06,
    0xd0, 0x2c, 0x1e, 0x8f, 0xca, 0x3f, 0x0f, 0x02, 0xc1, 0xaf, 0xbd, 0x03, 0x01, 0x13, 0x8a, 0x6b,
    0x3a, 0x91, 0x11, 0x41, 0x4f, 0x67, 0xdc, 0xea, 0x97, 0xf2, 0xcf, 0xce, 0xf0, 0xb4, 0xe6, 0x73,
    0x96, 0xac, 0x74, 0x22, 0xe7, 0xad, 0x35, 0x85, 0xe2, 0xf9, 0x37, 0xe8, 0x1c, 0x75, 0xdf, 0x6e,
    0x47, 0xf1, 0x1a, 0x71, 0x1d, 0x29, 0xc5, 0x89, 0x6f, 0xb7, 0x62, 0x0e, 0xaa, 0x18, 0xbe, 0x1b,
    0xfc, 0x56, 0x3e, 0x4b, 0xc6, 0xd2, 0x79, 0x20, 0x9a, 0xdb, 0xc0, 0xfe, 0x78, 0xcd, 0x5a, 0xf4,
    0x1f, 0xdd, 0xa8, 0x33, 0x88, 0x07, 0xc7, 0x31, 0xb1, 0x12, 0x10, 0x59, 0x27, 0x80, 0xec, 0x5f,
    0x60, 0x51, 0x7f, 0xa9, 0x19, 0xb5, 0x4a, 0x0d, 0x2d, 0xe5, 0x7a, 0x9f, 0x93, 0xc9, 0x9c, 0xef,
    0xa0, 0xe0, 0x3b, 0x4d, 0xae, 0x2a, 0xf5, 0xb0, 0xc8, 0xeb, 0xbb, 0x3c, 0x83, 0x53, 0x99, 0x61,
    0x17, 0x2b, 0x04, 0x7e, 0xba, 0x77, 0xd6, 0x26, 0xe1, 0x69, 0x14, 0x63, 0x55, 0x21, 0x0c, 0x7d,
];

/// Multiply by `x` in GF(2^8) modulo `x^8 + x^4 + x^3 + x + 1`.
const fn xtime(b: u8) -> u8 {
    (b << 1) ^ (((b >> 7) & 1) * 0x1b)
}

/// Multiply two field elements in GF(2^8).
const fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut p = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            p ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    p
}

fn sub_word(w: u32) -> u32 {
    let b = w.to_be_bytes();
    u32::from_be_bytes([
        SBOX[b[0] as usize],
        SBOX[b[1] as usize],
        SBOX[b[2] as usize],
        SBOX[b[3] as usize],
    ])
}

/// `InvMixColumns` applied to a single column word.
fn inv_mix_word(w: u32) -> u32 {
    let [a0, a1, a2, a3] = w.to_be_bytes();
    u32::from_be_bytes([
        gmul(a0, 14) ^ gmul(a1, 11) ^ gmul(a2, 13) ^ gmul(a3, 9),
        gmul(a0, 9) ^ gmul(a1, 14) ^ gmul(a2, 11) ^ gmul(a3, 13),
        gmul(a0, 13) ^ gmul(a1, 9) ^ gmul(a2, 14) ^ gmul(a3, 11),
        gmul(a0, 11) ^ gmul(a1, 13) ^ gmul(a2, 9) ^ gmul(a3, 14),
    ])
}

/// Number of rounds for a key length in bytes.
pub fn rounds_for_key_len(key_len: usize) -> Result<usize> {
    match key_len {
        16 => Ok(10),
        24 => Ok(12),
        32 => Ok(14),
        other => Err(Error::InvalidKeyLength(other)),
    }
}

/// Schedule length in words for a given round count.
pub fn schedule_len(rounds: usize) -> usize {
    NB * (rounds + 1)
}

/// Expanded AES key schedule.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySchedule {
    enc: Vec<u32>,
    dec: Vec<u32>,
}

impl KeySchedule {
    /// Expand a 16, 24 or 32 byte key.
    pub fn expand(key: &[u8]) -> Result<Self> {
        let rounds = rounds_for_key_len(key.len())?;
        let nk = key.len() / 4;
        let total = schedule_len(rounds);

        let mut enc = Vec::with_capacity(total);
        for chunk in key.chunks_exact(4) {
            enc.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        let mut rcon = 1u8;
        for i in nk..total {
            let mut t = enc[i - 1];
            if i % nk == 0 {
                t = sub_word(t.rotate_left(8)) ^ (u32::from(rcon) << 24);
                rcon = xtime(rcon);
            } else if nk > 6 && i % nk == 4 {
                t = sub_word(t);
            }
            enc.push(enc[i - nk] ^ t);
        }

        let mut dec = Vec::with_capacity(total);
        for i in (0..total).step_by(NB) {
            let ei = total - i - NB;
            for j in 0..NB {
                let w = enc[ei + j];
                if i > 0 && i + NB < total {
                    dec.push(inv_mix_word(w));
                } else {
                    dec.push(w);
                }
            }
        }

        Ok(Self { enc, dec })
    }

    /// Rebuild a schedule from previously expanded round-key words.
    ///
    /// Both arrays must have the same length, one of 44, 52 or 60 words.
    pub fn from_words(enc: Vec<u32>, dec: Vec<u32>) -> Result<Self> {
        let valid = [10, 12, 14].iter().any(|r| schedule_len(*r) == enc.len());
        if !valid {
            return Err(Error::InvalidLength {
                expected: schedule_len(10),
                actual: enc.len(),
            });
        }
        if dec.len() != enc.len() {
            return Err(Error::InvalidLength {
                expected: enc.len(),
                actual: dec.len(),
            });
        }
        Ok(Self { enc, dec })
    }

    /// Number of cipher rounds.
    pub fn rounds(&self) -> usize {
        self.enc.len() / NB - 1
    }

    /// Encryption round keys, `4 * (rounds + 1)` words.
    pub fn enc(&self) -> &[u32] {
        &self.enc
    }

    /// Decryption round keys for the equivalent inverse cipher.
    pub fn dec(&self) -> &[u32] {
        &self.dec
    }

    /// Encrypt one block in place.
    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let rounds = self.rounds();
        add_round_key(block, &self.enc[..NB]);
        for round in 1..rounds {
            sub_bytes(block);
            shift_rows(block);
            mix_columns(block);
            add_round_key(block, &self.enc[NB * round..NB * (round + 1)]);
        }
        sub_bytes(block);
        shift_rows(block);
        add_round_key(block, &self.enc[NB * rounds..]);
    }

    /// Decrypt one block in place.
    pub fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let rounds = self.rounds();
        add_round_key(block, &self.dec[..NB]);
        for round in 1..rounds {
            inv_sub_bytes(block);
            inv_shift_rows(block);
            inv_mix_columns(block);
            add_round_key(block, &self.dec[NB * round..NB * (round + 1)]);
        }
        inv_sub_bytes(block);
        inv_shift_rows(block);
        add_round_key(block, &self.dec[NB * rounds..]);
    }
}

impl core::fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeySchedule")
            .field("rounds", &self.rounds())
            .finish_non_exhaustive()
    }
}

fn add_round_key(state: &mut [u8; BLOCK_SIZE], words: &[u32]) {
    for (column, word) in state.chunks_exact_mut(4).zip(words) {
        for (s, k) in column.iter_mut().zip(word.to_be_bytes()) {
            *s ^= k;
        }
    }
}

fn sub_bytes(state: &mut [u8; BLOCK_SIZE]) {
    for b in state.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

fn inv_sub_bytes(state: &mut [u8; BLOCK_SIZE]) {
    for b in state.iter_mut() {
        *b = INV_SBOX[*b as usize];
    }
}

// State is column-major: byte (row r, column c) lives at index r + 4c.
fn shift_rows(state: &mut [u8; BLOCK_SIZE]) {
    let old = *state;
    for r in 1..4 {
        for c in 0..4 {
            state[r + 4 * c] = old[r + 4 * ((c + r) % 4)];
        }
    }
}

fn inv_shift_rows(state: &mut [u8; BLOCK_SIZE]) {
    let old = *state;
    for r in 1..4 {
        for c in 0..4 {
            state[r + 4 * c] = old[r + 4 * ((c + 4 - r) % 4)];
        }
    }
}

fn mix_columns(state: &mut [u8; BLOCK_SIZE]) {
    for column in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [column[0], column[1], column[2], column[3]];
        column[0] = xtime(a0) ^ (xtime(a1) ^ a1) ^ a2 ^ a3;
        column[1] = a0 ^ xtime(a1) ^ (xtime(a2) ^ a2) ^ a3;
        column[2] = a0 ^ a1 ^ xtime(a2) ^ (xtime(a3) ^ a3);
        column[3] = (xtime(a0) ^ a0) ^ a1 ^ a2 ^ xtime(a3);
    }
}

fn inv_mix_columns(state: &mut [u8; BLOCK_SIZE]) {
    for column in state.chunks_exact_mut(4) {
        let mixed = inv_mix_word(u32::from_be_bytes([
            column[0], column[1], column[2], column[3],
        ]));
        column.copy_from_slice(&mixed.to_be_bytes());
    }
}
