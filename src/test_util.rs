//! Shared fixtures for unit tests

use crate::{Amount, Currency, IouState, Party, PublicKey};

pub(crate) fn party(name: &str) -> Party {
    Party::new(name, PublicKey::new(format!("{}-key", name.to_lowercase())))
}

pub(crate) fn alice() -> Party {
    party("Alice")
}

pub(crate) fn bob() -> Party {
    party("Bob")
}

pub(crate) fn charlie() -> Party {
    party("Charlie")
}

pub(crate) fn mallory() -> Party {
    party("Mallory")
}

pub(crate) fn gbp(quantity: u64) -> Amount {
    Amount::new(quantity, Currency::new("GBP"))
}

pub(crate) fn usd(quantity: u64) -> Amount {
    Amount::new(quantity, Currency::new("USD"))
}

pub(crate) fn iou(amount: Amount, lender: Party, borrower: Party) -> IouState {
    IouState::new(amount, lender, borrower)
}
