use crate::{
    Command, ContractError, ContractState, IouState, LinearId, ProposedTransaction, PublicKey,
    RuleViolation, StateSide, ValidationResult,
};
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Validator for transactions over [`IouState`].
///
/// Stateless: every call looks only at the transaction it is given, so a
/// single instance can be shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a proposed transaction
    /// Returns Ok(()) if valid, Err(ContractError) if invalid or malformed
    pub fn validate(&self, tx: &ProposedTransaction) -> ValidationResult {
        debug!("Validating transaction {}", tx.id);

        let result = self.verify(tx);
        match &result {
            Ok(()) => debug!("Transaction {} validation successful", tx.id),
            Err(ContractError::Rejected(violation)) => {
                warn!("Transaction {} rejected: {}", tx.id, violation)
            }
            Err(e) => error!("Transaction {} is malformed: {}", tx.id, e),
        }
        result
    }

    fn verify(&self, tx: &ProposedTransaction) -> ValidationResult {
        match self.require_single_command(tx)? {
            Command::Issue => self.verify_issue(tx),
            Command::Transfer => self.verify_transfer(tx),
            Command::Settle => self.verify_settle(tx),
        }
    }

    /// Exactly one distinct command kind must be present
    fn require_single_command(&self, tx: &ProposedTransaction) -> Result<Command, ContractError> {
        let kinds: BTreeSet<Command> = tx.commands.iter().copied().collect();
        match kinds.first() {
            Some(command) if kinds.len() == 1 => Ok(*command),
            _ => Err(RuleViolation::MalformedCommand { found: kinds.len() }.into()),
        }
    }

    /// Issue: create a brand-new IOU
    fn verify_issue(&self, tx: &ProposedTransaction) -> ValidationResult {
        debug!("Applying Issue rules to transaction {}", tx.id);

        if tx.outputs.len() != 1 {
            return Err(RuleViolation::WrongOutputCount {
                found: tx.outputs.len(),
            }
            .into());
        }
        if !tx.inputs.is_empty() {
            return Err(RuleViolation::UnexpectedInputs {
                found: tx.inputs.len(),
            }
            .into());
        }

        let output = iou_at(&tx.outputs, StateSide::Output, 0)?;
        if !output.amount.is_positive() {
            return Err(RuleViolation::NonPositiveAmount.into());
        }

        let [lender, borrower] = output.participants();
        if lender == borrower {
            return Err(RuleViolation::SelfDealing.into());
        }

        check_signers(Command::Issue, output.participant_keys(), &tx.signers)
    }

    /// Transfer: reassign the lender, everything else unchanged
    fn verify_transfer(&self, tx: &ProposedTransaction) -> ValidationResult {
        debug!("Applying Transfer rules to transaction {}", tx.id);

        if tx.inputs.len() != 1 || tx.outputs.len() != 1 {
            return Err(RuleViolation::WrongArity {
                inputs: tx.inputs.len(),
                outputs: tx.outputs.len(),
            }
            .into());
        }

        let input = iou_at(&tx.inputs, StateSide::Input, 0)?;
        let output = iou_at(&tx.outputs, StateSide::Output, 0)?;

        let [old_lender, _] = input.participants();
        let [new_lender, borrower] = output.participants();
        if old_lender == new_lender {
            return Err(RuleViolation::LenderUnchanged.into());
        }

        // Normalise the one field allowed to differ before comparing.
        if input.with_lender(old_lender.clone()) != output.with_lender(old_lender.clone()) {
            return Err(RuleViolation::UnauthorizedFieldChange.into());
        }

        let required = [old_lender, new_lender, borrower]
            .into_iter()
            .map(|party| party.owning_key.clone())
            .collect();
        check_signers(Command::Transfer, required, &tx.signers)
    }

    /// Settle: repay one IOU, partially (with a successor) or fully (without)
    fn verify_settle(&self, tx: &ProposedTransaction) -> ValidationResult {
        debug!("Applying Settle rules to transaction {}", tx.id);

        // States of other contracts (e.g. the cash paying the IOU down) take
        // no part in the grouping.
        let instruments: BTreeSet<&LinearId> = tx
            .inputs
            .iter()
            .chain(tx.outputs.iter())
            .filter_map(ContractState::as_iou)
            .map(|state| &state.linear_id)
            .collect();
        if instruments.len() > 1 {
            return Err(RuleViolation::MultipleInstrumentsInOneSettlement {
                found: instruments.len(),
            }
            .into());
        }

        if tx.inputs.is_empty() {
            return Err(RuleViolation::NoInputs.into());
        }

        Ok(())
    }
}

/// Validate `tx` with a fresh [`Validator`]
pub fn validate(tx: &ProposedTransaction) -> ValidationResult {
    Validator::new().validate(tx)
}

fn iou_at(
    states: &[ContractState],
    side: StateSide,
    index: usize,
) -> Result<&IouState, ContractError> {
    let state = &states[index];
    state.as_iou().ok_or_else(|| ContractError::TypeMismatch {
        side,
        index,
        found: state.kind().to_string(),
    })
}

/// The signer set must equal `required` exactly, neither subset nor superset
fn check_signers(
    command: Command,
    required: BTreeSet<PublicKey>,
    actual: &BTreeSet<PublicKey>,
) -> ValidationResult {
    if required == *actual {
        return Ok(());
    }

    Err(RuleViolation::SignerMismatch {
        command,
        missing: required.difference(actual).cloned().collect(),
        unexpected: actual.difference(&required).cloned().collect(),
    }
    .into())
}
