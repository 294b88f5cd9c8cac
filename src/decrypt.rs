//! 文件级解密流程
//!
//! 本模块基于 `SeekableCipherStream` 提供两种用法：
//! - 整个文件顺序解密到输出文件
//! - 只解密任意逻辑区间
//!
//! 注意：
//! - Header 解析失败、密钥解包失败、模式不支持时立即报错
//! - 区间超出明文长度时只返回实际可用的字节

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::crypto::KeyUnwrap;
use crate::error::SeekCryptError;
use crate::format::stream::SeekableCipherStream;
use crate::fs::atomic::write_atomic;
use crate::source::SeekableFile;

/// 打开加密文件，返回可随机访问的解密流。
pub fn open_file<K: KeyUnwrap + ?Sized>(
    path: &Path,
    unwrapper: &K,
) -> Result<SeekableCipherStream<SeekableFile>, SeekCryptError> {
    let source = SeekableFile::open(path)?;
    SeekableCipherStream::open(source, unwrapper)
}

/// 解密整个文件，输出以原子方式写入，返回明文字节数。
pub fn decrypt_file<K: KeyUnwrap + ?Sized>(
    input_path: &Path,
    output_path: &Path,
    unwrapper: &K,
) -> io::Result<u64> {
    let mut stream = open_file(input_path, unwrapper)?;

    let written = write_atomic(output_path, |writer| io::copy(&mut stream, writer))?;

    debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        written,
        "decrypted file"
    );

    Ok(written)
}

/// 解密逻辑区间 `[offset, offset + length)`。
pub fn decrypt_range<K: KeyUnwrap + ?Sized>(
    input_path: &Path,
    offset: u64,
    length: u64,
    unwrapper: &K,
) -> io::Result<Vec<u8>> {
    let mut stream = open_file(input_path, unwrapper)?;
    read_range(&mut stream, offset, length)
}

/// 从已打开的流中读取逻辑区间。
pub fn read_range<R: Read + Seek>(
    stream: &mut R,
    offset: u64,
    length: u64,
) -> io::Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(offset))?;

    let mut out = Vec::new();
    stream.by_ref().take(length).read_to_end(&mut out)?;
    Ok(out)
}
