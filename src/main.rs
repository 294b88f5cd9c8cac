//! seekcrypt 命令行入口
//!
//! 用法：
//!   seekcrypt encrypt <input> <output> --public-key <key>
//!   seekcrypt decrypt <input> <output> --private-key <key>
//!   seekcrypt cat <input> --private-key <key> [--offset N] [--length N]
//!   seekcrypt info <input>
//!   seekcrypt keygen <private-out> <public-out> [--bits N]
//!
//! 密钥文件可以是 PEM 或 DER（PKCS#8 私钥 / SubjectPublicKeyInfo 公钥）。
//! 实际逻辑都委托给库。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use tracing::Level;

use seekcrypt::format::header::DEFAULT_NONCE_SIZE;
use seekcrypt::source::SeekableFile;
use seekcrypt::{
    EncryptOptions, Header, KeySize, RsaOaepUnwrapper, RsaOaepWrapper, SeekableCipherStream,
    read_range,
};

#[derive(Parser)]
#[command(name = "seekcrypt", version, about = "Seekable AES-CTR decryption with RSA-wrapped keys")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a file for the holder of a private key
    Encrypt {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        public_key: PathBuf,
        #[arg(long, default_value_t = 0)]
        key_id: i32,
        #[arg(long, default_value_t = DEFAULT_NONCE_SIZE)]
        nonce_size: usize,
        /// AES key length in bits: 128, 192 or 256
        #[arg(long, default_value_t = 256)]
        key_bits: usize,
    },
    /// Decrypt a whole file
    Decrypt {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        private_key: PathBuf,
    },
    /// Decrypt a byte range to stdout
    Cat {
        input: PathBuf,
        #[arg(long)]
        private_key: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Bytes to print; defaults to the rest of the stream
        #[arg(long)]
        length: Option<u64>,
    },
    /// Print header fields without decrypting
    Info { input: PathBuf },
    /// Generate an RSA key pair (PKCS#8 / SPKI PEM)
    Keygen {
        private_out: PathBuf,
        public_out: PathBuf,
        #[arg(long, default_value_t = 2048)]
        bits: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Encrypt {
            input,
            output,
            public_key,
            key_id,
            nonce_size,
            key_bits,
        } => {
            let wrapper = load_public_key(&public_key)?;
            let key_size = KeySize::from_len(key_bits / 8)
                .filter(|_| key_bits % 8 == 0)
                .with_context(|| format!("unsupported AES key length: {key_bits} bits"))?;
            let options = EncryptOptions {
                key_id,
                key_size,
                nonce_size,
            };

            let written = seekcrypt::encrypt(&input, &output, &wrapper, &options)
                .with_context(|| format!("encrypting {}", input.display()))?;
            tracing::info!(written, "encrypted {}", output.display());
        }
        Command::Decrypt {
            input,
            output,
            private_key,
        } => {
            let unwrapper = load_private_key(&private_key)?;
            let written = seekcrypt::decrypt(&input, &output, &unwrapper)
                .with_context(|| format!("decrypting {}", input.display()))?;
            tracing::info!(written, "decrypted {}", output.display());
        }
        Command::Cat {
            input,
            private_key,
            offset,
            length,
        } => {
            let unwrapper = load_private_key(&private_key)?;
            let source = SeekableFile::open(&input)
                .with_context(|| format!("opening {}", input.display()))?;
            let mut stream = SeekableCipherStream::open(source, &unwrapper)?;

            let length = match length {
                Some(length) => length,
                None => stream.length()?.saturating_sub(offset),
            };

            let bytes = read_range(&mut stream, offset, length)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
        Command::Info { input } => {
            let mut source = SeekableFile::open(&input)
                .with_context(|| format!("opening {}", input.display()))?;
            let header = Header::read(&mut source)?;
            let total = fs::metadata(&input)?.len();

            println!("key id:           {}", header.key_id);
            println!("wrapped key size: {}", header.wrapped_key_size);
            println!("nonce size:       {}", header.nonce_size);
            println!("cipher mode:      {}", header.cipher_mode);
            println!("data start:       {}", header.data_start_offset());
            println!(
                "plaintext length: {}",
                total.saturating_sub(header.data_start_offset())
            );
        }
        Command::Keygen {
            private_out,
            public_out,
            bits,
        } => {
            if bits < 1024 {
                bail!("refusing to generate an RSA key shorter than 1024 bits");
            }

            let private_key = RsaPrivateKey::new(&mut OsRng, bits)?;
            let private_pem = private_key.to_pkcs8_pem(LineEnding::LF)?;
            let public_pem = private_key.to_public_key().to_public_key_pem(LineEnding::LF)?;

            fs::write(&private_out, private_pem.as_bytes())
                .with_context(|| format!("writing {}", private_out.display()))?;
            fs::write(&public_out, public_pem.as_bytes())
                .with_context(|| format!("writing {}", public_out.display()))?;
        }
    }

    Ok(())
}

fn load_private_key(path: &Path) -> Result<RsaOaepUnwrapper> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let unwrapper = match std::str::from_utf8(&bytes) {
        Ok(pem) if pem.trim_start().starts_with("-----BEGIN") => {
            RsaOaepUnwrapper::from_pkcs8_pem(pem)?
        }
        _ => RsaOaepUnwrapper::from_pkcs8_der(&bytes)?,
    };
    Ok(unwrapper)
}

fn load_public_key(path: &Path) -> Result<RsaOaepWrapper> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let wrapper = match std::str::from_utf8(&bytes) {
        Ok(pem) if pem.trim_start().starts_with("-----BEGIN") => {
            RsaOaepWrapper::from_public_key_pem(pem)?
        }
        _ => RsaOaepWrapper::from_public_key_der(&bytes)?,
    };
    Ok(wrapper)
}
