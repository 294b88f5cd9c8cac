//! 可随机访问的 CTR 解密流。
//!
//! 文件由明文 Header、RSA 包裹的对称密钥、nonce 和 AES-CTR 密文组成，
//! `SeekableCipherStream` 在其上提供任意区间的 seek / read。

mod decrypt;
mod encrypt;

pub mod algorithm;
pub mod algorithms;
pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod source;

pub use algorithm::CipherMode;
pub use algorithms::aes_ctr::{AesCtrKey, BLOCK_SIZE, KeySize};
pub use crypto::{KeyUnwrap, KeyWrap, RsaOaepUnwrapper, RsaOaepWrapper};
pub use decrypt::{decrypt_range, open_file, read_range};
pub use encrypt::{DEFAULT_CHUNK_SIZE, EncryptOptions, encrypt_stream, encrypt_with_material};
pub use error::SeekCryptError;
pub use format::header::Header;
pub use format::stream::SeekableCipherStream;
pub use source::{SeekableFile, SeekableSource};

use std::path::Path;

pub fn encrypt<K: KeyWrap + ?Sized>(
    input: &Path,
    output: &Path,
    wrapper: &K,
    options: &EncryptOptions,
) -> std::io::Result<u64> {
    encrypt::encrypt_file(input, output, wrapper, options)
}

pub fn decrypt<K: KeyUnwrap + ?Sized>(
    input: &Path,
    output: &Path,
    unwrapper: &K,
) -> std::io::Result<u64> {
    decrypt::decrypt_file(input, output, unwrapper)
}
