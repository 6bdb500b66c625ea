//! Host machine identity, handed to container handlers.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

mod error;

pub use error::{Error, Result};

use crate::fsutil;

/// Fallback used when the host root does not carry an `/etc/hostname`.
const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// The 128-bit machine id from `/etc/machine-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineID([u8; 16]);

impl MachineID {
    pub fn new(src: [u8; 16]) -> Self {
        Self(src)
    }
}

impl FromStr for MachineID {
    type Err = Error;

    /// Parses the 32 hex digit form used by `machine-id(5)`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(Error::InvalidMachineID(s.to_owned()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidMachineID(s.to_owned()))?;
        }

        Ok(MachineID::new(bytes))
    }
}

impl fmt::Display for MachineID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl serde::Serialize for MachineID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Identity of the host the monitor runs on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MachineInfo {
    pub machine_id: MachineID,
    pub hostname: String,
}

/// Capability to look up the host's [`MachineInfo`].
pub trait MachineInfoFactory: fmt::Debug + Send + Sync {
    fn machine_info(&self) -> Result<MachineInfo>;
}

/// Reads machine information from a host root filesystem, e.g. `/` or `/rootfs`.
#[derive(Debug, Clone)]
pub struct RootfsMachineInfoFactory {
    rootfs: PathBuf,
}

impl RootfsMachineInfoFactory {
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
        }
    }
}

impl MachineInfoFactory for RootfsMachineInfoFactory {
    fn machine_info(&self) -> Result<MachineInfo> {
        let machine_id = fsutil::read_trimmed(self.rootfs.join("etc/machine-id"))?.parse()?;
        let hostname = fsutil::read_trimmed(self.rootfs.join("etc/hostname"))
            .or_else(|_| fsutil::read_trimmed(KERNEL_HOSTNAME_PATH))?;
        log::debug!("Hostname: {}", &hostname);

        Ok(MachineInfo {
            machine_id,
            hostname,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_machine_id() {
        let id: MachineID = RAW_ID.parse().unwrap();
        let mut raw = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
        assert_eq!(id, MachineID::new([raw, raw].concat().try_into().unwrap()));
        raw[0] = 0;
        assert_ne!(id, MachineID::new([raw, raw].concat().try_into().unwrap()));
        assert_eq!(id.to_string(), RAW_ID);
    }

    #[test]
    fn test_parse_invalid_machine_id() {
        assert!("abc".parse::<MachineID>().is_err());
        assert!("zz23456789abcdef0123456789abcdef".parse::<MachineID>().is_err());
        assert!("ü123456789abcdef0123456789abcde".parse::<MachineID>().is_err());
    }

    #[test]
    fn test_rootfs_machine_info() {
        let rootfs = tempfile::tempdir().unwrap();
        std::fs::create_dir(rootfs.path().join("etc")).unwrap();
        std::fs::write(rootfs.path().join("etc/machine-id"), format!("{RAW_ID}\n")).unwrap();
        std::fs::write(rootfs.path().join("etc/hostname"), "node-1\n").unwrap();

        let info = RootfsMachineInfoFactory::new(rootfs.path())
            .machine_info()
            .unwrap();
        assert_eq!(info.machine_id.to_string(), RAW_ID);
        assert_eq!(info.hostname, "node-1");
    }

    #[test]
    fn test_rootfs_machine_info_missing_machine_id() {
        let rootfs = tempfile::tempdir().unwrap();
        let err = RootfsMachineInfoFactory::new(rootfs.path())
            .machine_info()
            .unwrap_err();
        assert!(matches!(err, Error::File(_)));
    }
}
