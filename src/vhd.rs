//! VHD footer parsing and Marketplace compliance checks.
//!
//! Fixed VHDs end with a 512-byte footer. All multi-byte fields are
//! big-endian. The fields this module reads:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 8 | Cookie, always `conectix` |
//! | 8 | 4 | Features |
//! | 12 | 4 | Format version, `0x00010000` |
//! | 16 | 8 | Data offset, `0xFFFFFFFFFFFFFFFF` for fixed disks |
//! | 40 | 8 | Original size |
//! | 48 | 8 | Current size |
//! | 60 | 4 | Disk type, 2 = fixed, 3 = dynamic, 4 = differencing |
//! | 64 | 4 | Checksum, ones complement of the byte sum with this field zeroed |
//!
//! Azure Marketplace images additionally require a fixed disk whose virtual
//! size is 1 MiB-aligned and between 1 GiB and 1023 GiB.

use crate::error::{Error, Result};
use crate::generators::ValidationReport;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Footer length in bytes.
pub const FOOTER_SIZE: u64 = 512;

const COOKIE: &[u8; 8] = b"conectix";
const FORMAT_VERSION: u32 = 0x0001_0000;
const FIXED_DATA_OFFSET: u64 = 0xFFFF_FFFF_FFFF_FFFF;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;
const MIN_VIRTUAL_SIZE: u64 = GIB;
const MAX_VIRTUAL_SIZE: u64 = 1023 * GIB;

/// VHD disk type from the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskType {
    Fixed,
    Dynamic,
    Differencing,
    Unknown(u32),
}

impl DiskType {
    fn from_raw(raw: u32) -> Self {
        match raw {
            2 => Self::Fixed,
            3 => Self::Dynamic,
            4 => Self::Differencing,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Dynamic => "dynamic",
            Self::Differencing => "differencing",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Decoded VHD footer fields.
#[derive(Debug, Clone)]
pub struct VhdFooter {
    pub cookie_valid: bool,
    pub features: u32,
    pub format_version: u32,
    pub data_offset: u64,
    pub original_size: u64,
    pub current_size: u64,
    pub disk_type: DiskType,
    pub checksum: u32,
    pub computed_checksum: u32,
}

impl VhdFooter {
    /// Decode a raw 512-byte footer.
    pub fn parse(raw: &[u8; 512]) -> Self {
        let u32_at = |offset: usize| {
            u32::from_be_bytes([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]])
        };
        let u64_at = |offset: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&raw[offset..offset + 8]);
            u64::from_be_bytes(bytes)
        };

        Self {
            cookie_valid: &raw[0..8] == COOKIE,
            features: u32_at(8),
            format_version: u32_at(12),
            data_offset: u64_at(16),
            original_size: u64_at(40),
            current_size: u64_at(48),
            disk_type: DiskType::from_raw(u32_at(60)),
            checksum: u32_at(64),
            computed_checksum: compute_checksum(raw),
        }
    }

    /// Read the footer from the last 512 bytes of a file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::vhd_read(path, format!("cannot open file: {}", e)))?;
        let len = file
            .metadata()
            .map_err(|e| Error::vhd_read(path, format!("cannot stat file: {}", e)))?
            .len();
        if len < FOOTER_SIZE {
            return Err(Error::VhdTooSmall(path.to_path_buf()));
        }

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))
            .map_err(|e| Error::vhd_read(path, format!("cannot seek to footer: {}", e)))?;
        let mut raw = [0u8; 512];
        file.read_exact(&mut raw)
            .map_err(|e| Error::vhd_read(path, format!("cannot read footer: {}", e)))?;

        Ok(Self::parse(&raw))
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum == self.computed_checksum
    }

    /// Run the Marketplace compliance checks against the decoded footer.
    pub fn compliance_report(&self) -> ValidationReport {
        let mut report = ValidationReport::ok();

        if !self.cookie_valid {
            report.error("footer cookie is not 'conectix'; this is not a VHD");
            return report;
        }
        if self.format_version != FORMAT_VERSION {
            report.error(format!(
                "unsupported format version {:#010x} (expected {:#010x})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if !self.checksum_valid() {
            report.error(format!(
                "footer checksum {:#010x} does not match computed {:#010x}",
                self.checksum, self.computed_checksum
            ));
        }

        if self.disk_type != DiskType::Fixed {
            report.error(format!(
                "disk type is {}; Azure requires fixed VHDs",
                self.disk_type.as_str()
            ));
        } else if self.data_offset != FIXED_DATA_OFFSET {
            report.warn("fixed disk has a non-sentinel data offset");
        }

        if self.current_size % MIB != 0 {
            report.error(format!(
                "virtual size {} bytes is not 1 MiB aligned",
                self.current_size
            ));
        }
        if self.current_size < MIN_VIRTUAL_SIZE {
            report.error(format!(
                "virtual size {} bytes is below the 1 GiB minimum",
                self.current_size
            ));
        }
        if self.current_size > MAX_VIRTUAL_SIZE {
            report.error(format!(
                "virtual size {} bytes exceeds the 1023 GiB maximum",
                self.current_size
            ));
        }

        if self.original_size != self.current_size {
            report.warn(format!(
                "original size {} differs from current size {}; the disk was resized",
                self.original_size, self.current_size
            ));
        }

        report
    }
}

/// Footer checksum: ones complement of the byte sum with the checksum field
/// treated as zero.
pub fn compute_checksum(raw: &[u8; 512]) -> u32 {
    let mut sum: u32 = 0;
    for (i, byte) in raw.iter().enumerate() {
        if (64..68).contains(&i) {
            continue;
        }
        sum = sum.wrapping_add(u32::from(*byte));
    }
    !sum
}

/// Validate the VHD at `path` against the Marketplace rules.
pub fn validate_file(path: &Path) -> Result<(VhdFooter, ValidationReport)> {
    let footer = VhdFooter::read_from(path)?;
    let report = footer.compliance_report();
    Ok((footer, report))
}
