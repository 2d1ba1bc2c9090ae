//! Program file loading.
//!
//! Files are read in 1 MiB chunks with a progress callback roughly every
//! 5 MiB, then decoded once: a UTF-8 or UTF-16 byte order mark decides the
//! encoding, anything else is read as UTF-8 with replacement characters.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use camscope_engine::ProgressSink;

const CHUNK_SIZE: usize = 1 << 20;
const REPORT_EVERY: u64 = 5 << 20;

/// Read and decode a program. `Ok(None)` means the sink cancelled the read.
pub fn read_program<P: ProgressSink>(path: &Path, progress: &mut P) -> Result<Option<String>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut since_report = 0u64;
    loop {
        let n = file
            .read(&mut chunk)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        since_report += n as u64;
        if since_report >= REPORT_EVERY {
            since_report = 0;
            let percent = if total > 0 {
                bytes.len() as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            if progress.report(percent.min(100.0), "Reading File") {
                return Ok(None);
            }
        }
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read program file");
    Ok(Some(decode(&bytes)))
}

/// Decode program bytes, honouring a byte order mark.
pub fn decode(bytes: &[u8]) -> String {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    let mut text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if bytes.len() % 2 == 1 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}
