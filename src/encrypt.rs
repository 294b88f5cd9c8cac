//! 加密流程实现（写出方）
//!
//! 本模块负责生成可被 `SeekableCipherStream` 读取的文件。
//!
//! 加密流程（严格顺序）：
//! 1. 生成随机对称密钥与 nonce
//! 2. 用公钥包裹对称密钥
//! 3. 写入 Header 文本行、包裹密钥、nonce
//! 4. 从逻辑块 0 开始用 AES-CTR 流式加密数据
//!
//! 注意：
//! - 密文不带认证标签，完整性需由外部保证
//! - 同一密钥下 nonce 绝不能复用

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use rand::{RngCore, rngs::OsRng};
use tracing::debug;
use zeroize::Zeroizing;

use crate::algorithm::CipherMode;
use crate::algorithms::aes_ctr::{self, AesCtrKey, CtrSession, KeySize};
use crate::crypto::KeyWrap;
use crate::error::SeekCryptError;
use crate::format::header::{DEFAULT_KEY_ID, DEFAULT_NONCE_SIZE, Header, MAX_WRAPPED_KEY_SIZE};
use crate::fs::atomic::write_atomic;
use crate::source::read_full;

/// 每次加密处理的明文大小：64 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct EncryptOptions {
    pub key_id: i32,
    pub key_size: KeySize,
    pub nonce_size: usize,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            key_id: DEFAULT_KEY_ID,
            key_size: KeySize::Aes256,
            nonce_size: DEFAULT_NONCE_SIZE,
        }
    }
}

/// 生成随机密钥与 nonce 并加密整个输入流，返回明文字节数。
pub fn encrypt_stream<R, W, K>(
    reader: R,
    writer: W,
    wrapper: &K,
    options: &EncryptOptions,
) -> Result<u64, SeekCryptError>
where
    R: Read,
    W: Write,
    K: KeyWrap + ?Sized,
{
    let mut key_bytes = Zeroizing::new(vec![0u8; options.key_size.len()]);
    OsRng.fill_bytes(&mut key_bytes);

    let mut nonce = vec![0u8; options.nonce_size];
    OsRng.fill_bytes(&mut nonce);

    let wrapped_key = wrapper.wrap_key(&key_bytes)?;
    let key = AesCtrKey::new(key_bytes)?;

    encrypt_with_material(reader, writer, options.key_id, &wrapped_key, &nonce, &key)
}

/// 使用给定的密钥材料加密，结果完全确定。
pub fn encrypt_with_material<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    key_id: i32,
    wrapped_key: &[u8],
    nonce: &[u8],
    key: &AesCtrKey,
) -> Result<u64, SeekCryptError> {
    if wrapped_key.len() > MAX_WRAPPED_KEY_SIZE {
        return Err(SeekCryptError::KeyWrap(format!(
            "wrapped key of {} bytes exceeds {MAX_WRAPPED_KEY_SIZE}",
            wrapped_key.len()
        )));
    }

    let initial = aes_ctr::initial_counter(nonce)?;

    // ---------- 写入 Header ----------
    let header = Header::new(key_id, wrapped_key.len(), nonce.len(), CipherMode::Ctr);
    header.write(&mut writer)?;
    writer.write_all(wrapped_key)?;
    writer.write_all(nonce)?;

    // ---------- CTR 加密 ----------
    let mut session = CtrSession::new(key, &initial, 0)?;
    let mut buffer = Zeroizing::new(vec![0u8; DEFAULT_CHUNK_SIZE]);
    let mut total = 0u64;

    loop {
        let n = read_full(&mut reader, &mut buffer)?;
        if n == 0 {
            break;
        }

        session.apply_keystream(&mut buffer[..n]);
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;

    debug!(
        key_id,
        data_start = header.data_start_offset(),
        plaintext_len = total,
        "encrypted stream"
    );

    Ok(total)
}

/// 加密文件，输出以原子方式写入。
pub fn encrypt_file<K: KeyWrap + ?Sized>(
    input_path: &Path,
    output_path: &Path,
    wrapper: &K,
    options: &EncryptOptions,
) -> std::io::Result<u64> {
    let reader = BufReader::new(File::open(input_path)?);

    write_atomic(output_path, |writer| {
        Ok(encrypt_stream(reader, writer, wrapper, options)?)
    })
}
