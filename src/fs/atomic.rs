//! 原子写入工具。
//!
//! 解密 / 加密输出先写入同目录下的临时文件，全部成功并落盘后再 rename 到目标路径，
//! 写入失败时目标文件保持原样。

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 原子写文件，返回 `write_fn` 的结果。
pub fn write_atomic<T, F>(target: &Path, write_fn: F) -> io::Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<T>,
{
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp_path = tmp_path_for(parent, target);
    let result = write_tmp(&tmp_path, write_fn);

    let value = match result {
        Ok(value) => value,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
    };

    if target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(&tmp_path, target)?;

    debug!(target = %target.display(), "atomic write committed");
    Ok(value)
}

fn write_tmp<T, F>(tmp_path: &Path, write_fn: F) -> io::Result<T>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<T>,
{
    let mut writer = BufWriter::new(File::create(tmp_path)?);
    let value = write_fn(&mut writer)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(value)
}

fn tmp_path_for(parent: &Path, target: &Path) -> PathBuf {
    let base_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("seekcrypt-output");

    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);

    parent.join(format!(".{base_name}.{}-{counter}.tmp", std::process::id()))
}
