//! 明文 Header 实现
//!
//! Header 布局（必须逐字节兼容）：
//!
//! ```text
//! <key_id>|<wrapped_key_size>|<nonce_size>|b'<cipher_mode>'\n
//! <wrapped_key_size 字节的包裹密钥>
//! <nonce_size 字节的 nonce>
//! <密文>
//! ```
//!
//! - 第一行为 ASCII 文本，字段以 `|` 分隔，以单个换行结束
//! - cipher_mode 可能带有 `b'...'` 之类的字节串修饰，解析时去除
//! - 密文从 `data_start_offset()` 开始
//!
//! Header 在构造解密流时解析一次，之后不可变。

use std::io::{Read, Seek, SeekFrom, Write};

use crate::algorithm::CipherMode;
use crate::algorithms::aes_ctr::BLOCK_SIZE;
use crate::error::SeekCryptError;
use crate::source::read_full;

/// Header 文本行的最大长度（不含换行）
pub const MAX_HEADER_LINE: usize = 4096;

/// 包裹密钥的最大长度。RSA-16384 的密文也只有 2048 字节。
pub const MAX_WRAPPED_KEY_SIZE: usize = 16 * 1024;

pub const DEFAULT_NONCE_SIZE: usize = 8;

pub const DEFAULT_KEY_ID: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// 包裹密钥变体编号，目前只解析不使用
    pub key_id: i32,
    pub wrapped_key_size: usize,
    pub nonce_size: usize,
    /// 去除修饰后的模式标识
    pub cipher_mode: String,
    /// 文本行字节数 + 1（换行）
    pub line_len: usize,
}

impl Header {
    /// 创建新的 Header，通常在加密时调用。
    pub fn new(key_id: i32, wrapped_key_size: usize, nonce_size: usize, mode: CipherMode) -> Self {
        let line = format_line(key_id, wrapped_key_size, nonce_size, mode.tag());
        Self {
            key_id,
            wrapped_key_size,
            nonce_size,
            cipher_mode: mode.tag().to_string(),
            line_len: line.len() + 1,
        }
    }

    /// 解析不含换行的 Header 文本行。
    pub fn parse_line(line: &str) -> Result<Self, SeekCryptError> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 4 {
            return Err(SeekCryptError::HeaderFormat(format!(
                "expected 4 '|'-separated fields, found {}",
                parts.len()
            )));
        }

        let key_id = parse_field::<i32>(parts[0], "key id")?;
        let wrapped_key_size = parse_field::<usize>(parts[1], "wrapped key size")?;
        let nonce_size = parse_field::<usize>(parts[2], "nonce size")?;
        let cipher_mode = strip_byte_string(parts[3]).to_string();

        if wrapped_key_size > MAX_WRAPPED_KEY_SIZE {
            return Err(SeekCryptError::HeaderFormat(format!(
                "wrapped key size {wrapped_key_size} exceeds {MAX_WRAPPED_KEY_SIZE}"
            )));
        }

        if nonce_size > BLOCK_SIZE {
            return Err(SeekCryptError::HeaderFormat(format!(
                "nonce size {nonce_size} exceeds the {BLOCK_SIZE}-byte counter block"
            )));
        }

        if cipher_mode.is_empty() {
            return Err(SeekCryptError::HeaderFormat("empty cipher mode".to_string()));
        }

        Ok(Self {
            key_id,
            wrapped_key_size,
            nonce_size,
            cipher_mode,
            line_len: line.len() + 1,
        })
    }

    /// 从输入源开头读取并解析 Header 文本行。
    ///
    /// 会先 seek 到 0；返回后源的位置不确定。
    pub fn read<S: Read + Seek + ?Sized>(source: &mut S) -> Result<Self, SeekCryptError> {
        source.seek(SeekFrom::Start(0))?;

        let mut line = Vec::with_capacity(64);
        let mut chunk = [0u8; 256];

        loop {
            let n = read_full(source, &mut chunk)?;
            if let Some(i) = chunk[..n].iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&chunk[..i]);
                break;
            }

            line.extend_from_slice(&chunk[..n]);

            if n < chunk.len() {
                let reason = if line.is_empty() {
                    "missing header line"
                } else {
                    "header line is not newline-terminated"
                };
                return Err(SeekCryptError::HeaderFormat(reason.to_string()));
            }

            if line.len() > MAX_HEADER_LINE {
                break;
            }
        }

        if line.len() > MAX_HEADER_LINE {
            return Err(SeekCryptError::HeaderFormat(format!(
                "header line longer than {MAX_HEADER_LINE} bytes"
            )));
        }

        let line = std::str::from_utf8(&line)
            .map_err(|_| SeekCryptError::HeaderFormat("header line is not UTF-8".to_string()))?;

        Self::parse_line(line)
    }

    /// 写出规范形式的 Header 文本行（含换行）。
    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let line = format_line(
            self.key_id,
            self.wrapped_key_size,
            self.nonce_size,
            &self.cipher_mode,
        );
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// 校验声明的模式，只接受 CTR。
    pub fn mode(&self) -> Result<CipherMode, SeekCryptError> {
        CipherMode::parse(&self.cipher_mode)
    }

    /// 密文在底层源中的起始偏移。
    pub fn data_start_offset(&self) -> u64 {
        (self.line_len + self.wrapped_key_size + self.nonce_size) as u64
    }
}

/// 紧跟 Header 文本行的二进制材料。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMaterial {
    pub wrapped_key: Vec<u8>,
    pub nonce: Vec<u8>,
}

impl HeaderMaterial {
    /// 重新 seek 到 0，跳过文本行后读取包裹密钥和 nonce。
    ///
    /// 返回后源位于 `data_start_offset()`。
    pub fn read<S: Read + Seek + ?Sized>(
        source: &mut S,
        header: &Header,
    ) -> Result<Self, SeekCryptError> {
        source.seek(SeekFrom::Start(0))?;

        read_field(source, header.line_len, "header line")?;
        let wrapped_key = read_field(source, header.wrapped_key_size, "wrapped key")?;
        let nonce = read_field(source, header.nonce_size, "nonce")?;

        Ok(Self { wrapped_key, nonce })
    }
}

fn read_field<S: Read + ?Sized>(
    source: &mut S,
    len: usize,
    field: &'static str,
) -> Result<Vec<u8>, SeekCryptError> {
    let mut buf = vec![0u8; len];
    let actual = read_full(source, &mut buf)?;
    if actual < len {
        return Err(SeekCryptError::TruncatedHeader {
            field,
            expected: len,
            actual,
        });
    }
    Ok(buf)
}

fn format_line(key_id: i32, wrapped_key_size: usize, nonce_size: usize, tag: &str) -> String {
    format!("{key_id}|{wrapped_key_size}|{nonce_size}|b'{tag}'")
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, SeekCryptError> {
    raw.trim().parse::<T>().map_err(|_| {
        SeekCryptError::HeaderFormat(format!("{name} is not a valid number: {raw:?}"))
    })
}

/// 去除 `b'...'`、`b"..."`、`'...'`、`"..."` 修饰。
fn strip_byte_string(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unprefixed = match trimmed.strip_prefix('b') {
        Some(rest) if rest.starts_with('\'') || rest.starts_with('"') => rest,
        _ => trimmed,
    };
    unprefixed.trim_matches(|c| c == '\'' || c == '"')
}
