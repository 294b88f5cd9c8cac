pub mod wrap;

pub use wrap::{KeyUnwrap, KeyWrap, RsaOaepUnwrapper, RsaOaepWrapper};
