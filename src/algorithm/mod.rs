//! 对称加密模式模块。
//!
//! 统一管理 Header 中声明的 cipher mode 标识，具体实现见 `algorithms` 子模块。
//! 目前仅支持计数器模式（CTR）；其他模式在构造阶段直接拒绝，不做静默降级。

use crate::error::SeekCryptError;

/// 支持的对称加密模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Ctr,
}

impl CipherMode {
    pub const CTR_TAG: &'static str = "CTR";

    /// Header 中写出的模式标识（不含 `b'...'` 修饰）。
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ctr => Self::CTR_TAG,
        }
    }

    /// 解析已去除修饰的模式标识，大小写不敏感。
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case(Self::CTR_TAG) {
            Some(Self::Ctr)
        } else {
            None
        }
    }

    pub fn parse(tag: &str) -> Result<Self, SeekCryptError> {
        Self::from_tag(tag).ok_or_else(|| SeekCryptError::UnsupportedMode(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctr_tag_is_case_insensitive() {
        assert_eq!(CipherMode::from_tag("CTR"), Some(CipherMode::Ctr));
        assert_eq!(CipherMode::from_tag("ctr"), Some(CipherMode::Ctr));
        assert_eq!(CipherMode::Ctr.tag(), "CTR");
    }

    #[test]
    fn other_modes_are_rejected() {
        for tag in ["CBC", "GCM", "ECB", ""] {
            let err = CipherMode::parse(tag).unwrap_err();
            assert!(matches!(err, SeekCryptError::UnsupportedMode(ref t) if t == tag));
        }
    }
}
