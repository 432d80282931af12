//! This crate validates proposed state transitions of an IOU: one party owes
//! another a monetary amount, repayable over time.
//! It includes modules for the data model, the IOU state, the transaction
//! validator, flows around the external ledger platform, and configuration.

pub mod types; // Amounts, identities, commands, transactions and errors.
pub mod state; // The IOU state model and an in-memory vault.
pub mod validation; // Issue, Transfer and Settle rules.
pub mod flow; // Transaction assembly and the issue flow.
pub mod config; // Defines and loads configuration.

#[cfg(test)]
pub(crate) mod test_util;

// Re-export commonly used types for easier access.
pub use types::*;
pub use state::IouState;
pub use validation::{Validator, validate};
