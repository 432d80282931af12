//! Flow Module
//!
//! This module assembles IOU transactions and drives them through the
//! external ledger platform. The platform is never looked up implicitly:
//! signature collection and finality are injected as generic parameters.
//!
//! # Components
//! - Builders for Issue, Transfer and Settle transactions
//! - `IssueFlow`: issue a new IOU and commit it
//! - `IssueResponder`: the counterparty's acceptance check
//! - `SettleFlow`: repay an IOU, partially or in full

mod builder;
mod issue;
mod settle;

pub use issue::{
    Finalizer,
    IssueFlow,
    IssueResponder,
    ResponderCollector,
    SignatureCollector,
};
pub use settle::SettleFlow;
