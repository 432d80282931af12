//! Transaction assembly helpers.
//!
//! These only shape a transaction; they do not validate it.

use crate::{Amount, AmountError, Command, IouState, Party, ProposedTransaction};

impl ProposedTransaction {
    /// Issue `state`, signed by both participants
    pub fn issue(state: IouState) -> Self {
        let signers = state.participant_keys();
        Self::new(vec![], vec![state.into()], Command::Issue, signers)
    }

    /// Move `input` to `new_lender`, signed by old lender, new lender and borrower
    pub fn transfer(input: IouState, new_lender: Party) -> Self {
        let output = input.with_lender(new_lender.clone());
        let mut signers = input.participant_keys();
        signers.insert(new_lender.owning_key);
        Self::new(vec![input.into()], vec![output.into()], Command::Transfer, signers)
    }

    /// Repay `payment` against `input`.
    ///
    /// A payment that reaches the outstanding amount settles the IOU in full
    /// and produces no successor state.
    pub fn settle(input: IouState, payment: &Amount) -> Result<Self, AmountError> {
        let next = input.pay(payment)?;
        let outputs = if next.is_fully_paid() {
            vec![]
        } else {
            vec![next.into()]
        };
        let signers = input.participant_keys();
        Ok(Self::new(vec![input.into()], outputs, Command::Settle, signers))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        test_util::{alice, bob, charlie, gbp, iou, usd},
        validation::validate,
        AmountError, Command, ProposedTransaction,
    };
    use std::collections::BTreeSet;

    #[test]
    fn test_issue_builder_produces_valid_transaction() {
        let tx = ProposedTransaction::issue(iou(gbp(50), alice(), bob()));

        assert_eq!(tx.commands, vec![Command::Issue]);
        assert!(tx.inputs.is_empty());
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(
            tx.signers,
            BTreeSet::from([alice().owning_key, bob().owning_key])
        );
        assert_eq!(validate(&tx), Ok(()));
    }

    #[test]
    fn test_transfer_builder_produces_valid_transaction() {
        let tx = ProposedTransaction::transfer(iou(gbp(50), alice(), bob()), charlie());

        assert_eq!(tx.signers.len(), 3);
        assert_eq!(tx.iou_outputs().next().unwrap().lender, charlie());
        assert_eq!(validate(&tx), Ok(()));
    }

    #[test]
    fn test_settle_builder_partial_payment_keeps_successor() {
        let input = iou(gbp(50), alice(), bob());
        let tx = ProposedTransaction::settle(input.clone(), &gbp(20)).unwrap();

        let successor = tx.iou_outputs().next().unwrap();
        assert_eq!(successor.paid, gbp(20));
        assert_eq!(successor.linear_id, input.linear_id);
        assert_eq!(validate(&tx), Ok(()));
    }

    #[test]
    fn test_settle_builder_full_payment_has_no_output() {
        let tx = ProposedTransaction::settle(iou(gbp(50), alice(), bob()), &gbp(50)).unwrap();

        assert!(tx.outputs.is_empty());
        assert_eq!(validate(&tx), Ok(()));
    }

    #[test]
    fn test_settle_builder_rejects_other_currency() {
        let result = ProposedTransaction::settle(iou(gbp(50), alice(), bob()), &usd(50));
        assert!(matches!(result, Err(AmountError::CurrencyMismatch { .. })));
    }
}
