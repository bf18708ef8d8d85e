// SPDX-License-Identifier: MIT OR Apache-2.0

/// Result of checking the signatures of a meta or document.
///
/// Checks are expensive, the outcome is stored next to the checked value and only recomputed
/// when the value changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not checked yet or changed since the last check.
    #[default]
    Unverified,

    /// Signatures are correct.
    Valid,

    /// Signatures are missing, inconsistent or do not verify.
    Invalid,
}

impl Status {
    pub fn is_valid(&self) -> bool {
        matches!(self, Status::Valid)
    }
}
