//! 文件格式：明文 Header + CTR 密文。

pub mod header;
pub mod stream;
