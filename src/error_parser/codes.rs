//! On-chain error code tables
//!
//! `PatronProgramError` mirrors the custom error enum declared by the Patron
//! program (Anchor assigns codes from 6000). `AnchorFrameworkError` covers the
//! framework codes the program's instructions can raise before reaching
//! program logic.

use std::fmt;

/// First code Anchor assigns to a program's own `#[error_code]` enum
pub const CUSTOM_ERROR_OFFSET: u32 = 6000;

/// Custom errors declared by the Patron program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatronProgramError {
    SwapNotActive,
    Unauthorized,
    InvalidAmount,
    TokensLocked,
    SwapExpired,
    InsufficientFunds,
    InvalidRole,
    RewardsAlreadyClaimed,
}

impl PatronProgramError {
    pub const ALL: [PatronProgramError; 8] = [
        Self::SwapNotActive,
        Self::Unauthorized,
        Self::InvalidAmount,
        Self::TokensLocked,
        Self::SwapExpired,
        Self::InsufficientFunds,
        Self::InvalidRole,
        Self::RewardsAlreadyClaimed,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        code.checked_sub(CUSTOM_ERROR_OFFSET)
            .and_then(|index| Self::ALL.get(index as usize).copied())
    }

    pub fn code(self) -> u32 {
        CUSTOM_ERROR_OFFSET + self as u32
    }

    /// Variant name as declared in the program IDL
    pub fn name(self) -> &'static str {
        match self {
            Self::SwapNotActive => "SwapNotActive",
            Self::Unauthorized => "Unauthorized",
            Self::InvalidAmount => "InvalidAmount",
            Self::TokensLocked => "TokensLocked",
            Self::SwapExpired => "SwapExpired",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::InvalidRole => "InvalidRole",
            Self::RewardsAlreadyClaimed => "RewardsAlreadyClaimed",
        }
    }

    /// Message declared by the program author
    pub fn message(self) -> &'static str {
        match self {
            Self::SwapNotActive => "Swap is not active",
            Self::Unauthorized => "Unauthorized access",
            Self::InvalidAmount => "Invalid amount",
            Self::TokensLocked => "Tokens are still locked",
            Self::SwapExpired => "Swap has expired",
            Self::InsufficientFunds => "Insufficient funds",
            Self::InvalidRole => "Invalid role for this operation",
            Self::RewardsAlreadyClaimed => "Rewards have already been claimed",
        }
    }
}

impl fmt::Display for PatronProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Anchor framework errors seen in practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorFrameworkError {
    InstructionFallbackNotFound,
    ConstraintMut,
    ConstraintHasOne,
    ConstraintSigner,
    ConstraintSeeds,
    AccountDiscriminatorMismatch,
    AccountNotInitialized,
    AccountNotEnoughKeys,
    AccountNotSigner,
}

impl AnchorFrameworkError {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            101 => Self::InstructionFallbackNotFound,
            2000 => Self::ConstraintMut,
            2001 => Self::ConstraintHasOne,
            2002 => Self::ConstraintSigner,
            2006 => Self::ConstraintSeeds,
            3002 => Self::AccountDiscriminatorMismatch,
            3005 => Self::AccountNotEnoughKeys,
            3010 => Self::AccountNotSigner,
            3012 => Self::AccountNotInitialized,
            _ => return None,
        })
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::InstructionFallbackNotFound => "Unknown instruction for this program",
            Self::ConstraintMut => "A required account is not writable",
            Self::ConstraintHasOne => "Account does not belong to this user",
            Self::ConstraintSigner => "A required signature is missing",
            Self::ConstraintSeeds => "Account address does not match the expected seeds",
            Self::AccountDiscriminatorMismatch => "Account has an unexpected type",
            Self::AccountNotEnoughKeys => "Not enough accounts were provided",
            Self::AccountNotSigner => "A required signature is missing",
            Self::AccountNotInitialized => "Account not initialized",
        }
    }
}

/// Message for any known code, program table first
pub fn lookup(code: u32) -> Option<&'static str> {
    PatronProgramError::from_code(code)
        .map(PatronProgramError::message)
        .or_else(|| AnchorFrameworkError::from_code(code).map(AnchorFrameworkError::message))
}
