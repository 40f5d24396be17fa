use thiserror::Error;

/// First custom error code, matching Anchor's `ERROR_CODE_OFFSET`.
pub const ERROR_CODE_OFFSET: u32 = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WishError {
    // 6000: the deployed program's `UnauthorizedDeletion`.
    #[error("only the wish creator can delete it")]
    Unauthorized,
    #[error("supplied address does not match the derived wish address")]
    AddressMismatch,
    #[error("a wish already exists at this address")]
    AlreadyExists,
    #[error("no wish exists at this address")]
    NotFound,
    #[error("title does not fit in a wish account")]
    TitleTooLong,
    #[error("signer cannot cover the wish account deposit")]
    InsufficientFunds,
    #[error("account data is not a wish record")]
    WrongAccountType,
    #[error("wish record length prefix does not match its data")]
    CorruptRecord,
    #[error("no bump produces an off-curve wish address")]
    NoViableBump,
}

/// How a caller should react to a [`WishError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller mistake; surface it, never retry.
    Validation,
    /// Wrong signer; retry only as the rightful owner.
    Authorization,
    /// May be a duplicate submission that already succeeded.
    StateConflict,
    /// Fatal until the signer is funded.
    Resource,
}

const ALL: [WishError; 9] = [
    WishError::Unauthorized,
    WishError::AddressMismatch,
    WishError::AlreadyExists,
    WishError::NotFound,
    WishError::TitleTooLong,
    WishError::InsufficientFunds,
    WishError::WrongAccountType,
    WishError::CorruptRecord,
    WishError::NoViableBump,
];

impl WishError {
    /// Custom program error code as reported by the ledger.
    pub fn code(self) -> u32 {
        ERROR_CODE_OFFSET + self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let index = code.checked_sub(ERROR_CODE_OFFSET)?;
        ALL.get(index as usize).copied()
    }

    pub fn class(self) -> ErrorClass {
        match self {
            WishError::AddressMismatch
            | WishError::TitleTooLong
            | WishError::WrongAccountType
            | WishError::CorruptRecord
            | WishError::NoViableBump => ErrorClass::Validation,
            WishError::Unauthorized => ErrorClass::Authorization,
            WishError::AlreadyExists | WishError::NotFound => ErrorClass::StateConflict,
            WishError::InsufficientFunds => ErrorClass::Resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_declaration_order() {
        assert_eq!(WishError::Unauthorized.code(), 6000);
        assert_eq!(WishError::AlreadyExists.code(), 6002);
        assert_eq!(WishError::NoViableBump.code(), 6008);
        for err in ALL {
            assert_eq!(WishError::from_code(err.code()), Some(err));
        }
        assert_eq!(WishError::from_code(5999), None);
        assert_eq!(WishError::from_code(6009), None);
    }

    #[test]
    fn conflicts_are_not_validation_errors() {
        assert_eq!(WishError::AlreadyExists.class(), ErrorClass::StateConflict);
        assert_eq!(WishError::NotFound.class(), ErrorClass::StateConflict);
        assert_eq!(WishError::InsufficientFunds.class(), ErrorClass::Resource);
        assert_eq!(WishError::CorruptRecord.class(), ErrorClass::Validation);
    }
}
