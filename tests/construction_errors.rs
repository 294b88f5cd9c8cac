mod common;

use std::io::{self, Cursor};

use seekcrypt::{KeyUnwrap, SeekCryptError, SeekableCipherStream};
use zeroize::Zeroizing;

use common::{MaskWrap, encrypt, owner, plaintext};

fn open_err(bytes: Vec<u8>, unwrapper: &dyn KeyUnwrap) -> SeekCryptError {
    match SeekableCipherStream::open(Cursor::new(bytes), unwrapper) {
        Ok(_) => panic!("expected construction to fail"),
        Err(e) => e,
    }
}

/// 在合法文件的基础上替换 Header 文本行
fn with_header_line(line: &str) -> Vec<u8> {
    let bytes = encrypt(&plaintext(32));
    let newline = bytes.iter().position(|&b| b == b'\n').unwrap();

    let mut out = line.as_bytes().to_vec();
    out.push(b'\n');
    out.extend_from_slice(&bytes[newline + 1..]);
    out
}

#[test]
fn non_numeric_header_field_is_a_format_error() {
    let err = open_err(with_header_line("7|thirty-seven|8|b'CTR'"), &owner());
    assert!(matches!(err, SeekCryptError::HeaderFormat(_)), "{err}");
}

#[test]
fn missing_header_line_is_a_format_error() {
    let err = open_err(Vec::new(), &owner());
    assert!(matches!(err, SeekCryptError::HeaderFormat(_)), "{err}");

    let err = open_err(b"no newline here".to_vec(), &owner());
    assert!(matches!(err, SeekCryptError::HeaderFormat(_)), "{err}");
}

#[test]
fn wrong_private_key_fails_to_unwrap() {
    let err = open_err(encrypt(&plaintext(32)), &MaskWrap { mask: 0x01 });
    assert!(matches!(err, SeekCryptError::KeyUnwrap(_)), "{err}");
}

#[test]
fn non_ctr_mode_is_rejected() {
    let err = open_err(with_header_line("7|37|8|b'CBC'"), &owner());
    assert!(matches!(err, SeekCryptError::UnsupportedMode(ref m) if m == "CBC"), "{err}");
}

#[test]
fn lowercase_ctr_tag_is_accepted() {
    let bytes = with_header_line("7|37|8|'ctr'");
    assert!(SeekableCipherStream::open(Cursor::new(bytes), &owner()).is_ok());
}

#[test]
fn declared_sizes_beyond_source_are_truncated_header() {
    let mut bytes = b"0|37|8|b'CTR'\n".to_vec();
    bytes.extend_from_slice(&[0u8; 40]);

    let err = open_err(bytes, &owner());
    assert!(
        matches!(
            err,
            SeekCryptError::TruncatedHeader {
                field: "nonce",
                expected: 8,
                actual: 3,
            }
        ),
        "{err}"
    );
}

#[test]
fn unusable_symmetric_key_length_fails_to_unwrap() {
    struct ShortKey;

    impl KeyUnwrap for ShortKey {
        fn unwrap_key(&self, _wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, SeekCryptError> {
            Ok(Zeroizing::new(vec![0u8; 20]))
        }
    }

    let err = open_err(encrypt(&plaintext(32)), &ShortKey);
    assert!(matches!(err, SeekCryptError::KeyUnwrap(_)), "{err}");
}

#[test]
fn errors_convert_to_io_errors() {
    let err: io::Error = SeekCryptError::UnsupportedMode("GCM".to_string()).into();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
    let err: io::Error = SeekCryptError::from(inner).into();
    assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
}
