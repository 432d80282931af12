use crate::{Amount, AmountError, LinearId, Party, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One immutable version of an IOU.
///
/// A borrower owes a lender `amount`, of which `paid` has been repaid so far.
/// Paying down or transferring an IOU never mutates an instance: it produces
/// a new version sharing the same `linear_id`.
///
/// Construction does not enforce a positive amount; that is a rule of the
/// Issue command and is checked by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IouState {
    pub amount: Amount,
    pub lender: Party,
    pub borrower: Party,
    pub paid: Amount,
    pub linear_id: LinearId,
}

impl IouState {
    /// Create a fresh IOU with nothing paid and a new linear id
    pub fn new(amount: Amount, lender: Party, borrower: Party) -> Self {
        let paid = Amount::zero(amount.token.clone());
        Self {
            amount,
            lender,
            borrower,
            paid,
            linear_id: LinearId::default(),
        }
    }

    /// The parties with standing in this state, always `[lender, borrower]`
    pub fn participants(&self) -> [&Party; 2] {
        [&self.lender, &self.borrower]
    }

    /// Owning keys of both participants
    pub fn participant_keys(&self) -> BTreeSet<PublicKey> {
        self.participants()
            .into_iter()
            .map(|party| party.owning_key.clone())
            .collect()
    }

    /// Return the next version with `amount_to_pay` added to `paid`
    pub fn pay(&self, amount_to_pay: &Amount) -> Result<Self, AmountError> {
        let paid = self.paid.plus(amount_to_pay)?;
        Ok(Self {
            paid,
            ..self.clone()
        })
    }

    /// Copy of this state with a different lender
    pub fn with_lender(&self, lender: Party) -> Self {
        Self {
            lender,
            ..self.clone()
        }
    }

    /// What the borrower still owes
    pub fn outstanding(&self) -> Result<Amount, AmountError> {
        self.amount.saturating_minus(&self.paid)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid.token == self.amount.token && self.paid.quantity >= self.amount.quantity
    }

    /// Whether either participant's owning key is one of `our_keys`
    pub fn is_relevant(&self, our_keys: &BTreeSet<PublicKey>) -> bool {
        self.participants()
            .iter()
            .any(|party| our_keys.contains(&party.owning_key))
    }
}

impl fmt::Display for IouState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IOU({}): {} owes {} {} and has paid {} so far.",
            self.linear_id, self.borrower, self.lender, self.amount, self.paid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{alice, bob, charlie, gbp, iou, usd};

    #[test]
    fn test_new_defaults_paid_to_zero_in_same_currency() {
        let state = IouState::new(usd(10), alice(), bob());
        assert_eq!(state.paid, usd(0));
    }

    #[test]
    fn test_participants_order_is_lender_then_borrower() {
        let state = iou(gbp(10), alice(), bob());
        let [first, second] = state.participants();
        assert_eq!(first, &alice());
        assert_eq!(second, &bob());
    }

    #[test]
    fn test_pay_adds_to_paid_and_keeps_other_fields() {
        let state = iou(gbp(100), alice(), bob());
        let paid = state.pay(&gbp(30)).unwrap();

        assert_eq!(paid.paid, gbp(30));
        assert_eq!(paid.amount, state.amount);
        assert_eq!(paid.lender, state.lender);
        assert_eq!(paid.borrower, state.borrower);
        assert_eq!(paid.linear_id, state.linear_id);

        let paid_again = paid.pay(&gbp(20)).unwrap();
        assert_eq!(paid_again.paid, gbp(50));
    }

    #[test]
    fn test_pay_zero_is_identity() {
        let state = iou(gbp(100), alice(), bob());
        assert_eq!(state.pay(&gbp(0)).unwrap(), state);
    }

    #[test]
    fn test_pay_currency_mismatch() {
        let state = iou(gbp(100), alice(), bob());
        assert!(matches!(
            state.pay(&usd(5)),
            Err(AmountError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_with_lender_changes_only_lender() {
        let state = iou(gbp(100), alice(), bob());
        let moved = state.with_lender(charlie());
        assert_eq!(moved.lender, charlie());
        assert_eq!(moved.with_lender(alice()), state);
    }

    #[test]
    fn test_outstanding_and_fully_paid() {
        let state = iou(gbp(100), alice(), bob()).pay(&gbp(60)).unwrap();
        assert_eq!(state.outstanding().unwrap(), gbp(40));
        assert!(!state.is_fully_paid());

        let settled = state.pay(&gbp(40)).unwrap();
        assert_eq!(settled.outstanding().unwrap(), gbp(0));
        assert!(settled.is_fully_paid());
    }

    #[test]
    fn test_is_relevant() {
        let state = iou(gbp(100), alice(), bob());
        let ours = BTreeSet::from([bob().owning_key]);
        let theirs = BTreeSet::from([charlie().owning_key]);
        assert!(state.is_relevant(&ours));
        assert!(!state.is_relevant(&theirs));
        assert!(!state.is_relevant(&BTreeSet::new()));
    }

    #[test]
    fn test_display() {
        let state = iou(gbp(100), alice(), bob());
        assert_eq!(
            state.to_string(),
            format!(
                "IOU({}): Bob owes Alice 100 GBP and has paid 0 GBP so far.",
                state.linear_id
            )
        );
    }
}
