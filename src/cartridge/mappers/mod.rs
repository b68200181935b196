//! Implementations of various mappers used by NES cartridges.
//! See [Mapper][super::Mapper].
mod axrom;
pub use axrom::AxRom;
mod cnrom;
pub use cnrom::CnRom;
mod nrom;
pub use nrom::NRom;
mod pxrom;
pub use pxrom::PxRom;
mod sxrom;
pub use sxrom::SxRom;
mod txrom;
pub use txrom::TxRom;
mod uxrom;
pub use uxrom::UxRom;
