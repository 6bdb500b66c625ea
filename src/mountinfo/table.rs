use std::io::BufRead;
use std::path::{Path, PathBuf};

use super::parser::{MountInfo, parse_mount_info_line};
use super::{Error, Result};
use crate::fsutil;

/// An owned mountinfo entry with the fields the discovery code cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Major:Minor device identifier.
    pub major_minor: String,
    /// Root of the mount within the filesystem.
    pub root: PathBuf,
    /// Mount point with octal escapes (`\040` etc.) decoded.
    pub mount_point: PathBuf,
    /// Filesystem type (e.g., `ext4`, `cgroup2`).
    pub fs_type: String,
    /// Source of the mount.
    pub source: String,
    /// Superblock options, split on `,`.
    pub super_options: Vec<String>,
}

impl From<MountInfo<'_>> for MountEntry {
    fn from(info: MountInfo<'_>) -> Self {
        Self {
            major_minor: info.major_minor.to_owned(),
            root: PathBuf::from(unescape_octal(info.root)),
            mount_point: PathBuf::from(unescape_octal(info.mount_point)),
            fs_type: info.fs_type.to_owned(),
            source: unescape_octal(info.source),
            super_options: info
                .super_options
                .split(',')
                .filter(|opt| !opt.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Reads every entry of the given mountinfo file, in file order.
///
/// # Errors
///
/// - [`Error::File`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if any non-empty line fails to parse.
pub fn read_mounts(path: impl AsRef<Path>) -> Result<Vec<MountEntry>> {
    let path = path.as_ref();
    let reader = fsutil::open_file_reader(path)?;
    read_mounts_from_reader(reader, path)
}

pub(crate) fn read_mounts_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
) -> Result<Vec<MountEntry>> {
    let mut line = String::with_capacity(256);
    let mut mounts = Vec::new();
    let mut line_number = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        line_number += 1;
        if !line.trim().is_empty() {
            let info = parse_mount_info_line(line.as_str()).map_err(|source| Error::Parse {
                path: origin.to_path_buf(),
                line: line_number,
                source,
            })?;
            mounts.push(MountEntry::from(info));
        }
        line.clear();
    }

    log::trace!("read {} mounts from `{}`", mounts.len(), origin.display());
    Ok(mounts)
}

/// Decodes the `\ooo` escapes the kernel uses for space, tab, newline and backslash.
fn unescape_octal(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_owned();
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(decoded) = u8::try_from(value) {
                    out.push(decoded);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
