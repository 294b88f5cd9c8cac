//! AES-CTR 会话实现
//!
//! 计数器块布局：nonce 放在 16 字节块的开头，其余字节补零。
//! 第 k 个数据块使用的计数器 = 初始计数器（作为 128 位大端整数）+ k，
//! 溢出时按 128 位回绕，与 `ctr::Ctr128BE` 自身的递增方式完全一致。
//!
//! 因此任意字节区间都可以只从其所在块开始解密，无需处理之前的数据。

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

use crate::error::SeekCryptError;

/// AES 分组大小（字节）
pub const BLOCK_SIZE: usize = 16;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl KeySize {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }

    pub fn len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// 解包得到的对称密钥，离开作用域时自动清零。
pub struct AesCtrKey {
    size: KeySize,
    bytes: Zeroizing<Vec<u8>>,
}

impl AesCtrKey {
    pub fn new(bytes: Zeroizing<Vec<u8>>) -> Result<Self, SeekCryptError> {
        let size = KeySize::from_len(bytes.len()).ok_or_else(|| {
            SeekCryptError::KeyUnwrap(format!(
                "unsupported symmetric key length: {} bytes",
                bytes.len()
            ))
        })?;

        Ok(Self { size, bytes })
    }

    pub fn size(&self) -> KeySize {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for AesCtrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCtrKey")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// 由 nonce 构造逻辑偏移 0 对应的初始计数器块。
pub fn initial_counter(nonce: &[u8]) -> Result<[u8; BLOCK_SIZE], SeekCryptError> {
    if nonce.len() > BLOCK_SIZE {
        return Err(SeekCryptError::HeaderFormat(format!(
            "nonce of {} bytes does not fit a {BLOCK_SIZE}-byte counter block",
            nonce.len()
        )));
    }

    let mut counter = [0u8; BLOCK_SIZE];
    counter[..nonce.len()].copy_from_slice(nonce);
    Ok(counter)
}

/// 第 `block_index` 个数据块的计数器值。
pub fn counter_for_block(initial: &[u8; BLOCK_SIZE], block_index: u64) -> [u8; BLOCK_SIZE] {
    u128::from_be_bytes(*initial)
        .wrapping_add(u128::from(block_index))
        .to_be_bytes()
}

enum CtrCipher {
    Aes128(Aes128Ctr),
    Aes192(Aes192Ctr),
    Aes256(Aes256Ctr),
}

/// 已用密钥和计数器初始化的 CTR 会话。
///
/// 新建时，下一个 keystream 字节对应 `block_index` 块的第一个字节；
/// 之后随 `apply_keystream` 顺序前进。`current_block()` 只用于判断
/// 刚建好的会话能否直接服务下一次读取，并不会让顺序读取省去重建。
pub struct CtrSession {
    block_index: u64,
    consumed: u64,
    cipher: CtrCipher,
}

impl CtrSession {
    pub fn new(
        key: &AesCtrKey,
        initial: &[u8; BLOCK_SIZE],
        block_index: u64,
    ) -> Result<Self, SeekCryptError> {
        let counter = counter_for_block(initial, block_index);
        let invalid = |_| SeekCryptError::KeyUnwrap("invalid key length".to_string());

        let cipher = match key.size() {
            KeySize::Aes128 => CtrCipher::Aes128(
                Aes128Ctr::new_from_slices(key.as_bytes(), &counter).map_err(invalid)?,
            ),
            KeySize::Aes192 => CtrCipher::Aes192(
                Aes192Ctr::new_from_slices(key.as_bytes(), &counter).map_err(invalid)?,
            ),
            KeySize::Aes256 => CtrCipher::Aes256(
                Aes256Ctr::new_from_slices(key.as_bytes(), &counter).map_err(invalid)?,
            ),
        };

        Ok(Self {
            block_index,
            consumed: 0,
            cipher,
        })
    }

    /// 会话建立时对应的块号
    pub fn block_index(&self) -> u64 {
        self.block_index
    }

    /// keystream 当前所在的块号；停在块中间时为 `None`。
    pub fn current_block(&self) -> Option<u64> {
        if self.consumed % BLOCK_SIZE as u64 == 0 {
            self.block_index.checked_add(self.consumed / BLOCK_SIZE as u64)
        } else {
            None
        }
    }

    /// 顺序地对 `buf` 应用 keystream（加密与解密相同）。
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        match &mut self.cipher {
            CtrCipher::Aes128(c) => c.apply_keystream(buf),
            CtrCipher::Aes192(c) => c.apply_keystream(buf),
            CtrCipher::Aes256(c) => c.apply_keystream(buf),
        }
        self.consumed += buf.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctr::cipher::StreamCipherSeek;

    fn key256() -> AesCtrKey {
        AesCtrKey::new(Zeroizing::new((0u8..32).collect())).unwrap()
    }

    #[test]
    fn initial_counter_pads_nonce_with_zeros() {
        let counter = initial_counter(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(&counter[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&counter[8..], &[0u8; 8]);
    }

    #[test]
    fn oversized_nonce_is_rejected() {
        let err = initial_counter(&[0u8; 17]).unwrap_err();
        assert!(matches!(err, SeekCryptError::HeaderFormat(_)));
    }

    #[test]
    fn counter_addition_carries_into_nonce_bytes() {
        let mut initial = [0u8; BLOCK_SIZE];
        initial[15] = 0xff;
        let next = counter_for_block(&initial, 1);
        assert_eq!(next[14], 1);
        assert_eq!(next[15], 0);

        let wrapped = counter_for_block(&[0xff; BLOCK_SIZE], 1);
        assert_eq!(wrapped, [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn session_at_block_matches_seeked_keystream() {
        let key = key256();
        let mut initial = initial_counter(&[9u8; 8]).unwrap();
        initial[15] = 0xfe;

        for block in [0u64, 1, 2, 7, 300] {
            let mut reference =
                Aes256Ctr::new_from_slices(key.as_bytes(), &initial).unwrap();
            reference.seek(block * BLOCK_SIZE as u64);
            let mut expected = [0u8; 48];
            reference.apply_keystream(&mut expected);

            let mut session = CtrSession::new(&key, &initial, block).unwrap();
            let mut actual = [0u8; 48];
            session.apply_keystream(&mut actual);

            assert_eq!(actual, expected, "block {block}");
            assert_eq!(session.block_index(), block);
        }
    }

    #[test]
    fn current_block_tracks_consumed_keystream() {
        let key = key256();
        let initial = initial_counter(&[1u8; 8]).unwrap();
        let mut session = CtrSession::new(&key, &initial, 4).unwrap();
        assert_eq!(session.current_block(), Some(4));

        session.apply_keystream(&mut [0u8; 5]);
        assert_eq!(session.current_block(), None);

        session.apply_keystream(&mut [0u8; 27]);
        assert_eq!(session.current_block(), Some(6));
        assert_eq!(session.block_index(), 4);
    }

    #[test]
    fn key_sizes_follow_key_length() {
        for (len, size) in [(16, KeySize::Aes128), (24, KeySize::Aes192), (32, KeySize::Aes256)] {
            let key = AesCtrKey::new(Zeroizing::new(vec![7u8; len])).unwrap();
            assert_eq!(key.size(), size);
            assert_eq!(size.len(), len);
        }

        let err = AesCtrKey::new(Zeroizing::new(vec![0u8; 20])).unwrap_err();
        assert!(matches!(err, SeekCryptError::KeyUnwrap(_)));
    }
}
