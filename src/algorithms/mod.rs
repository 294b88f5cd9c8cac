//! 对称算法实现。

pub mod aes_ctr;
