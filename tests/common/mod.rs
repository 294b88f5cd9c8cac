#![allow(dead_code)]

use std::io::Cursor;

use seekcrypt::{
    AesCtrKey, KeyUnwrap, KeyWrap, SeekCryptError, SeekableCipherStream, encrypt_with_material,
};
use zeroize::Zeroizing;

pub const KEY: [u8; 32] = [0x11; 32];
pub const NONCE: [u8; 8] = [0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7];

const WRAP_TAG: &[u8; 4] = b"WRAP";

/// 测试用的包裹实现：`WRAP | mask | key ^ mask`。
///
/// mask 不同即视为“私钥不匹配”，比 RSA 快得多。
pub struct MaskWrap {
    pub mask: u8,
}

impl KeyWrap for MaskWrap {
    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, SeekCryptError> {
        let mut wrapped = WRAP_TAG.to_vec();
        wrapped.push(self.mask);
        wrapped.extend(key.iter().map(|b| b ^ self.mask));
        Ok(wrapped)
    }
}

impl KeyUnwrap for MaskWrap {
    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, SeekCryptError> {
        let body = wrapped
            .strip_prefix(WRAP_TAG.as_slice())
            .ok_or_else(|| SeekCryptError::KeyUnwrap("not a mask-wrapped key".to_string()))?;

        match body.split_first() {
            Some((&mask, key)) if mask == self.mask => {
                Ok(Zeroizing::new(key.iter().map(|b| b ^ mask).collect()))
            }
            _ => Err(SeekCryptError::KeyUnwrap("wrong private key".to_string())),
        }
    }
}

pub fn owner() -> MaskWrap {
    MaskWrap { mask: 0x5a }
}

/// 确定性的明文样本
pub fn plaintext(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

pub fn encrypt_with(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Vec<u8> {
    let wrapped = owner().wrap_key(key).expect("wrap key");
    let key = AesCtrKey::new(Zeroizing::new(key.to_vec())).expect("key length");

    let mut out = Vec::new();
    encrypt_with_material(plaintext, &mut out, 7, &wrapped, nonce, &key).expect("encrypt");
    out
}

pub fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    encrypt_with(plaintext, &KEY, &NONCE)
}

pub fn open(bytes: Vec<u8>) -> SeekableCipherStream<Cursor<Vec<u8>>> {
    SeekableCipherStream::open(Cursor::new(bytes), &owner()).expect("open stream")
}
