use std::fmt::Display;

/// An error encountered while loading a ROM image.
///
/// Returned by [Nes::load_rom][crate::Nes::load_rom] and [Cartridge::from_ines][crate::Cartridge::from_ines].
/// Once one of these is returned the console holds no cartridge at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The image does not start with `NES\x1A`
    InvalidMagic,
    /// The image is shorter than its header says it should be
    Truncated {
        /// Number of bytes the header requires
        expected: usize,
        /// Number of bytes actually provided
        actual: usize,
    },
    /// The header names a mapper this crate does not implement
    UnsupportedMapper(u16),
    /// The header declares zero banks of PRG ROM
    MissingPrgRom,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::InvalidMagic => write!(f, "not an iNES image (bad magic bytes)"),
            LoadError::Truncated { expected, actual } => write!(
                f,
                "ROM image is truncated: expected {} bytes, got {}",
                expected, actual
            ),
            LoadError::UnsupportedMapper(n) => write!(f, "unsupported mapper {}", n),
            LoadError::MissingPrgRom => write!(f, "ROM image declares no PRG ROM"),
        }
    }
}

impl std::error::Error for LoadError {}
