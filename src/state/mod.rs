//! State Module
//!
//! This module defines the IOU state model and an in-memory vault that
//! tracks the latest unconsumed version of each IOU.

mod iou;
mod vault;

pub use iou::IouState;
pub use vault::Vault;
