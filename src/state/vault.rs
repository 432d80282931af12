use crate::{
    flow::Finalizer, validation::validate, ContractState, FinalityRecord, FlowError, IouState,
    LinearId, ProposedTransaction, PublicKey,
};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Latest unconsumed version of each IOU, keyed by linear id.
///
/// Cloning shares the underlying map. Nothing is persisted and concurrent
/// spends of the same IOU are not arbitrated here.
#[derive(Clone, Default)]
pub struct Vault {
    states: Arc<RwLock<BTreeMap<LinearId, IouState>>>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, linear_id: &LinearId) -> Option<IouState> {
        let states = self.states.read().await;
        states.get(linear_id).cloned()
    }

    pub async fn unconsumed(&self) -> Vec<IouState> {
        let states = self.states.read().await;
        states.values().cloned().collect()
    }

    /// Unconsumed IOUs in which one of `our_keys` is a participant
    pub async fn relevant_to(&self, our_keys: &BTreeSet<PublicKey>) -> Vec<IouState> {
        let states = self.states.read().await;
        states
            .values()
            .filter(|state| state.is_relevant(our_keys))
            .cloned()
            .collect()
    }

    /// Apply a committed transaction: drop its inputs, keep its outputs.
    /// Returns the IOUs the transaction produced.
    pub async fn record(&self, tx: &ProposedTransaction) -> Vec<IouState> {
        let mut states = self.states.write().await;
        apply(&mut states, tx)
    }
}

impl Finalizer for Vault {
    async fn finalise(&self, tx: &ProposedTransaction) -> Result<FinalityRecord, FlowError> {
        validate(tx)?;

        let mut states = self.states.write().await;
        if let Some(stale) = stale_input(&states, tx) {
            return Err(FlowError::Finality {
                tx: tx.id,
                reason: format!("input {} is not the latest recorded version", stale),
            });
        }

        let outputs = apply(&mut states, tx);
        Ok(FinalityRecord {
            tx_id: tx.id,
            committed_at: Utc::now(),
            outputs,
        })
    }
}

/// First consumed IOU whose recorded version differs from the one consumed.
/// IOUs the vault has never seen are not stale.
fn stale_input<'a>(
    states: &BTreeMap<LinearId, IouState>,
    tx: &'a ProposedTransaction,
) -> Option<&'a LinearId> {
    tx.inputs
        .iter()
        .filter_map(ContractState::as_iou)
        .find(|input| matches!(states.get(&input.linear_id), Some(current) if current != *input))
        .map(|input| &input.linear_id)
}

fn apply(states: &mut BTreeMap<LinearId, IouState>, tx: &ProposedTransaction) -> Vec<IouState> {
    for input in tx.inputs.iter().filter_map(ContractState::as_iou) {
        let is_current = states.get(&input.linear_id).map(|current| current == input);
        match is_current {
            Some(true) => {
                states.remove(&input.linear_id);
            }
            Some(false) => warn!(
                "Transaction {} consumes an outdated version of {}, keeping the recorded one",
                tx.id, input.linear_id
            ),
            None => {}
        }
    }

    let outputs: Vec<IouState> = tx.iou_outputs().cloned().collect();
    for output in &outputs {
        states.insert(output.linear_id.clone(), output.clone());
    }

    info!(
        "Vault recorded transaction {}: {} consumed, {} produced",
        tx.id,
        tx.inputs.len(),
        outputs.len()
    );
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_util::{alice, bob, charlie, gbp, iou},
        ContractError,
    };

    #[tokio::test]
    async fn test_lifecycle_issue_transfer_settle() {
        let vault = Vault::new();
        let state = iou(gbp(100), alice(), bob());
        let id = state.linear_id.clone();

        vault
            .finalise(&ProposedTransaction::issue(state.clone()))
            .await
            .unwrap();
        assert_eq!(vault.get(&id).await, Some(state.clone()));

        vault
            .finalise(&ProposedTransaction::transfer(state.clone(), charlie()))
            .await
            .unwrap();
        let transferred = vault.get(&id).await.unwrap();
        assert_eq!(transferred.lender, charlie());

        let partial = ProposedTransaction::settle(transferred.clone(), &gbp(60)).unwrap();
        vault.finalise(&partial).await.unwrap();
        assert_eq!(vault.get(&id).await.unwrap().paid, gbp(60));

        let remaining = vault.get(&id).await.unwrap();
        let full = ProposedTransaction::settle(remaining, &gbp(40)).unwrap();
        let record = vault.finalise(&full).await.unwrap();
        assert!(record.outputs.is_empty());
        assert_eq!(vault.get(&id).await, None);
    }

    #[tokio::test]
    async fn test_finalise_rejects_invalid_transaction() {
        let vault = Vault::new();
        let mut tx = ProposedTransaction::issue(iou(gbp(100), alice(), bob()));
        tx.signers.remove(&bob().owning_key);

        let err = vault.finalise(&tx).await.unwrap_err();

        assert!(matches!(err, FlowError::Contract(ContractError::Rejected(_))));
        assert!(vault.unconsumed().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_keeps_newer_version_when_old_one_is_consumed() {
        let vault = Vault::new();
        let original = iou(gbp(100), alice(), bob());
        let id = original.linear_id.clone();
        vault.record(&ProposedTransaction::issue(original.clone())).await;

        let paid_down = ProposedTransaction::settle(original.clone(), &gbp(30)).unwrap();
        vault.record(&paid_down).await;
        let current = vault.get(&id).await.unwrap();

        let outdated = ProposedTransaction::settle(original, &gbp(100)).unwrap();
        let produced = vault.record(&outdated).await;

        assert!(produced.is_empty());
        assert_eq!(vault.get(&id).await, Some(current));
    }

    #[tokio::test]
    async fn test_finalise_rejects_outdated_input() {
        let vault = Vault::new();
        let original = iou(gbp(100), alice(), bob());
        let id = original.linear_id.clone();
        vault
            .finalise(&ProposedTransaction::issue(original.clone()))
            .await
            .unwrap();
        vault
            .finalise(&ProposedTransaction::settle(original.clone(), &gbp(30)).unwrap())
            .await
            .unwrap();

        let outdated = ProposedTransaction::transfer(original, charlie());
        let err = vault.finalise(&outdated).await.unwrap_err();

        assert!(matches!(err, FlowError::Finality { tx, .. } if tx == outdated.id));
        assert_eq!(vault.get(&id).await.unwrap().paid, gbp(30));
        assert_eq!(vault.get(&id).await.unwrap().lender, alice());
    }

    #[tokio::test]
    async fn test_relevant_to_filters_by_participant_key() {
        let vault = Vault::new();
        let ours = iou(gbp(10), alice(), bob());
        let theirs = iou(gbp(10), charlie(), bob());
        vault.record(&ProposedTransaction::issue(ours.clone())).await;
        vault.record(&ProposedTransaction::issue(theirs)).await;

        let relevant = vault
            .relevant_to(&BTreeSet::from([alice().owning_key]))
            .await;

        assert_eq!(relevant, vec![ours]);
        assert_eq!(vault.unconsumed().await.len(), 2);
    }
}
