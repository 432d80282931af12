//! Transaction Validation Module
//!
//! This module decides whether a proposed IOU transaction is admissible.
//! Dispatches on the declared command and applies the Issue, Transfer or
//! Settle rule set, reporting the first violated rule.

mod validator;


pub use validator::{Validator, validate};
