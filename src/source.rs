//! 可随机访问的字节源
//!
//! `SeekableSource` 在 `Read + Seek` 之上补充：
//! - 源标识（文件路径等）
//! - 总长度查询
//! - EOF 判断
//! - 关闭
//!
//! 解密流本身也实现该 trait，因此可以像普通字节源一样继续组合。

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub trait SeekableSource: Read + Seek {
    /// 源标识，仅用于日志与错误信息。
    fn source(&self) -> String;

    /// 总字节数。默认实现会 seek 到末尾再恢复原位置。
    fn length(&mut self) -> io::Result<u64> {
        let position = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if position != end {
            self.seek(SeekFrom::Start(position))?;
        }
        Ok(end)
    }

    fn eof(&mut self) -> io::Result<bool> {
        let position = self.stream_position()?;
        Ok(position >= self.length()?)
    }

    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// 带路径的只读文件源。
#[derive(Debug)]
pub struct SeekableFile {
    file: File,
    path: PathBuf,
}

impl SeekableFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SeekableFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for SeekableFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl SeekableSource for SeekableFile {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl<T: AsRef<[u8]>> SeekableSource for Cursor<T> {
    fn source(&self) -> String {
        "<memory>".to_string()
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }
}

impl<T: SeekableSource + ?Sized> SeekableSource for Box<T> {
    fn source(&self) -> String {
        (**self).source()
    }

    fn length(&mut self) -> io::Result<u64> {
        (**self).length()
    }

    fn eof(&mut self) -> io::Result<bool> {
        (**self).eof()
    }
}

impl<T: SeekableSource + ?Sized> SeekableSource for &mut T {
    fn source(&self) -> String {
        (**self).source()
    }

    fn length(&mut self) -> io::Result<u64> {
        (**self).length()
    }

    fn eof(&mut self) -> io::Result<bool> {
        (**self).eof()
    }
}

/// 尽量读满 `buf`，仅在 EOF 时返回更少的字节数。
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
