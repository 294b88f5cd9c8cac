//! 可随机访问的解密流
//!
//! 本模块负责在 CTR 密文之上提供普通的 seek / read 语义。
//!
//! 职责范围：
//! - 构造时解析 Header、解包对称密钥、构造初始计数器
//! - 将逻辑位置映射为底层源位置（逻辑位置 = 底层位置 - data_start）
//! - 每次读取只抓取覆盖请求区间的块对齐范围，解密后裁剪到请求的精确区间
//!
//! 设计前提与约束：
//! - 逻辑位置不单独保存，始终由底层源位置推导
//! - 第 k 块的 keystream 只依赖 `初始计数器 + k`，
//!   因此单次读取的开销为 O(length + 2 * BLOCK_SIZE)，与流的总大小无关
//! - 不保证线程安全：seek / read 都会修改会话状态和底层源游标
//! - 不做完整性校验（CTR 没有认证标签）

use std::io::{self, Read, Seek, SeekFrom};

use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::algorithms::aes_ctr::{self, AesCtrKey, BLOCK_SIZE, CtrSession};
use crate::crypto::KeyUnwrap;
use crate::error::SeekCryptError;
use crate::format::header::{Header, HeaderMaterial};
use crate::source::{SeekableSource, read_full};

const BLOCK: u64 = BLOCK_SIZE as u64;

/// 解密流
///
/// 对外暴露与底层源相同的能力集：`Read`、`Seek`、`SeekableSource`。
pub struct SeekableCipherStream<S: SeekableSource> {
    source: S,
    header: Header,
    data_start: u64,
    key: AesCtrKey,
    initial_counter: [u8; BLOCK_SIZE],
    session: CtrSession,
}

impl<S: SeekableSource> SeekableCipherStream<S> {
    /// 打开解密流
    ///
    /// - source: 任意位置的底层源，构造时会先 seek 到 0
    /// - unwrapper: 持有私钥的解包句柄，只调用一次
    ///
    /// 返回后逻辑位置为 0。
    pub fn open<K: KeyUnwrap + ?Sized>(
        mut source: S,
        unwrapper: &K,
    ) -> Result<Self, SeekCryptError> {
        let header = Header::read(&mut source)?;
        header.mode()?;

        let data_start = header.data_start_offset();
        let material = HeaderMaterial::read(&mut source, &header)?;
        let initial_counter = aes_ctr::initial_counter(&material.nonce)?;

        let key = AesCtrKey::new(unwrapper.unwrap_key(&material.wrapped_key)?)?;
        let session = CtrSession::new(&key, &initial_counter, 0)?;

        debug!(
            source = %source.source(),
            key_id = header.key_id,
            wrapped_key_size = header.wrapped_key_size,
            nonce_size = header.nonce_size,
            cipher_mode = %header.cipher_mode,
            key_size = ?key.size(),
            data_start,
            "opened seekable cipher stream"
        );

        Ok(Self {
            source,
            header,
            data_start,
            key,
            initial_counter,
            session,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// 密文在底层源中的起始偏移
    pub fn data_start_offset(&self) -> u64 {
        self.data_start
    }

    /// 明文总长度
    pub fn length(&mut self) -> io::Result<u64> {
        Ok(self.source.length()?.saturating_sub(self.data_start))
    }

    /// 当前逻辑位置
    pub fn position(&mut self) -> io::Result<u64> {
        let underlying = self.source.stream_position()?;
        underlying.checked_sub(self.data_start).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "underlying source is positioned inside the header",
            )
        })
    }

    /// seek 到逻辑位置。不检查是否超出 `length()`。
    pub fn seek_to(&mut self, position: u64) -> io::Result<()> {
        let underlying = position
            .checked_add(self.data_start)
            .ok_or_else(|| overflow("seek position"))?;
        self.source.seek(SeekFrom::Start(underlying))?;
        self.rekey(position / BLOCK)?;
        Ok(())
    }

    /// 跳过 `n` 字节，总是返回 `n`。
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let position = self.position()?;
        let target = position.checked_add(n).ok_or_else(|| overflow("skip target"))?;
        self.seek_to(target)?;
        Ok(n)
    }

    /// 读取单个字节，流结束时返回 `None`。
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read_at_position(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// 从当前逻辑位置解密 `buf.len()` 字节
    ///
    /// 读取流程：
    /// 1. 计算覆盖请求区间的块对齐范围 `[start, end)`，末尾多取一块
    /// 2. 从底层源读取该范围的密文
    /// 3. 从 `start` 所在块的计数器开始顺序应用 keystream
    /// 4. 丢弃前 `prepended` 和后 `appended` 字节，其余拷入 `buf`
    /// 5. 将底层源重新定位到本次读取结束处
    ///
    /// 返回实际读取的字节数；底层源提前结束时返回较少字节，0 表示流结束。
    pub fn read_at_position(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let length = buf.len() as u64;
        let current = self.position()?;
        let request_end = current
            .checked_add(length)
            .ok_or_else(|| overflow("read range"))?;

        let start_block = current / BLOCK;
        let start = start_block * BLOCK;
        let end_block = request_end / BLOCK + 1;
        let end = end_block
            .checked_mul(BLOCK)
            .ok_or_else(|| overflow("read range"))?;

        let prepended = (current - start) as usize;
        let appended = (end - request_end) as usize;
        let total = prepended + buf.len() + appended;

        trace!(
            current,
            length,
            start_block,
            end_block,
            prepended,
            appended,
            "decrypting block range"
        );

        self.source.seek(SeekFrom::Start(start + self.data_start))?;

        let mut scratch = Zeroizing::new(vec![0u8; total]);
        let fetched = match read_full(&mut self.source, &mut scratch) {
            Ok(n) => n,
            Err(e) => {
                // 逻辑位置由底层源推导，失败时必须回到读取前的位置
                let _ = self.source.seek(SeekFrom::Start(current + self.data_start));
                return Err(e);
            }
        };
        scratch.truncate(fetched);

        self.rekey(start_block)?;
        self.session.apply_keystream(&mut scratch);

        let available = fetched.saturating_sub(prepended).min(buf.len());
        if available > 0 {
            buf[..available].copy_from_slice(&scratch[prepended..prepended + available]);
        }

        if available < buf.len() {
            warn!(
                source = %self.source.source(),
                requested = buf.len(),
                available,
                "read truncated at end of stream"
            );
        }

        self.source
            .seek(SeekFrom::Start(current + available as u64 + self.data_start))?;

        Ok(available)
    }

    pub fn eof(&mut self) -> io::Result<bool> {
        self.source.eof()
    }

    /// 底层源标识
    pub fn source(&self) -> String {
        self.source.source()
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// 关闭底层源，之后实例不可再用。
    pub fn close(self) -> io::Result<()> {
        self.source.close()
    }

    /// 确保会话计数器等于 `初始计数器 + block_index`。
    ///
    /// 只有 `seek_to` 之后紧接的读取能复用会话；顺序读取总会多消耗一块
    /// keystream，因此下一次读取必然重建。
    fn rekey(&mut self, block_index: u64) -> io::Result<()> {
        if self.session.current_block() == Some(block_index) {
            return Ok(());
        }

        trace!(block_index, "re-keying counter session");
        self.session = CtrSession::new(&self.key, &self.initial_counter, block_index)?;
        Ok(())
    }
}

impl<S: SeekableSource> Read for SeekableCipherStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_at_position(buf)
    }
}

impl<S: SeekableSource> Seek for SeekableCipherStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.length()?.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position()?.checked_add_signed(delta),
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        self.seek_to(target)?;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        self.position()
    }
}

impl<S: SeekableSource> SeekableSource for SeekableCipherStream<S> {
    fn source(&self) -> String {
        self.source.source()
    }

    fn length(&mut self) -> io::Result<u64> {
        SeekableCipherStream::length(self)
    }

    fn eof(&mut self) -> io::Result<bool> {
        self.source.eof()
    }

    fn close(self) -> io::Result<()> {
        self.source.close()
    }
}

fn overflow(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("{what} overflows u64"))
}
