//! Error types for translation and format configuration.

use core::fmt;

use crate::Level;

/// Errors that can end a translation.
///
/// Every variant is terminal for the call that produced it. None is retried and none
/// carries a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationError {
    /// The virtual address could not be copied in from the caller.
    InputTransferFailed,
    /// The entry at this level is not present.
    LevelNotPresent { level: Level },
    /// The entry at this level has reserved or format bits set.
    LevelMalformed { level: Level },
    /// The leaf slot is populated but does not map a resident page.
    PageNotPresent,
    /// The physical address could not be copied out to the caller.
    OutputTransferFailed,
}

impl TranslationError {
    /// Returns the level the walk failed at, if the failure came from the walk.
    pub const fn level(self) -> Option<Level> {
        match self {
            Self::LevelNotPresent { level } | Self::LevelMalformed { level } => Some(level),
            Self::PageNotPresent => Some(Level::Pte),
            Self::InputTransferFailed | Self::OutputTransferFailed => None,
        }
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputTransferFailed => f.write_str("failed to copy virtual address from caller"),
            Self::LevelNotPresent { level } => write!(f, "{} entry not present", level),
            Self::LevelMalformed { level } => write!(f, "{} entry malformed", level),
            Self::PageNotPresent => f.write_str("page not present in memory"),
            Self::OutputTransferFailed => f.write_str("failed to copy physical address to caller"),
        }
    }
}

impl core::error::Error for TranslationError {}

/// A boundary copy between the caller's memory and the walker failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferError;

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("transfer across caller boundary failed")
    }
}

impl core::error::Error for TransferError {}

/// Errors that can occur when describing a custom table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The page offset field has zero width.
    ZeroOffset,
    /// The root or the leaf level was folded; both must own a table.
    FoldedLevel { level: Level },
    /// The index and offset fields together exceed 64 bits.
    AddressTooWide { bits: u32 },
    /// The frame mask overlaps the page offset bits.
    MisalignedFrameMask,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroOffset => f.write_str("page offset must be at least one bit wide"),
            Self::FoldedLevel { level } => write!(f, "{} level cannot be folded", level),
            Self::AddressTooWide { bits } => {
                write!(f, "format spans {} address bits, more than 64", bits)
            }
            Self::MisalignedFrameMask => f.write_str("frame mask overlaps the page offset"),
        }
    }
}

impl core::error::Error for FormatError {}
