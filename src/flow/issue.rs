use crate::{
    validation::validate, Command, FinalityRecord, FlowError, IouState, Party,
    ProposedTransaction, PublicKey,
};
use std::collections::BTreeSet;
use std::future::Future;
use tracing::{debug, info, warn};

/// Gathers counterparty signatures for a transaction.
///
/// Implementations return the keys that signed; keys outside `missing`
/// are ignored by the caller.
pub trait SignatureCollector: Send + Sync {
    fn collect(
        &self,
        tx: &ProposedTransaction,
        missing: &BTreeSet<PublicKey>,
    ) -> impl Future<Output = Result<BTreeSet<PublicKey>, FlowError>> + Send;
}

/// Commits a fully signed transaction to the ledger (notarisation and
/// recording both happen behind this seam).
pub trait Finalizer: Send + Sync {
    fn finalise(
        &self,
        tx: &ProposedTransaction,
    ) -> impl Future<Output = Result<FinalityRecord, FlowError>> + Send;
}

/// Issues a new IOU on behalf of `our_identity`
pub struct IssueFlow<C, F> {
    our_identity: Party,
    collector: C,
    finalizer: F,
}

impl<C: SignatureCollector, F: Finalizer> IssueFlow<C, F> {
    pub fn new(our_identity: Party, collector: C, finalizer: F) -> Self {
        Self {
            our_identity,
            collector,
            finalizer,
        }
    }

    /// Run the flow for `state`
    ///
    /// # Steps
    /// 1. Build the issue transaction (signers: both participants)
    /// 2. Validate it locally
    /// 3. Sign with our key and collect the remaining signatures
    /// 4. Hand the transaction to the finalizer
    pub async fn call(&self, state: IouState) -> Result<FinalityRecord, FlowError> {
        let tx = ProposedTransaction::issue(state);
        info!("Built issue transaction {}", tx.id);

        validate(&tx)?;

        let our_key = &self.our_identity.owning_key;
        if !tx.signers.contains(our_key) {
            return Err(FlowError::NotAParticipant(self.our_identity.name.clone()));
        }

        let mut signed = BTreeSet::from([our_key.clone()]);
        let missing: BTreeSet<PublicKey> = tx.signers.difference(&signed).cloned().collect();
        if !missing.is_empty() {
            let collected = self.collector.collect(&tx, &missing).await?;
            signed.extend(collected.into_iter().filter(|key| missing.contains(key)));
        }

        let unsigned: Vec<PublicKey> = tx.signers.difference(&signed).cloned().collect();
        if !unsigned.is_empty() {
            warn!("Transaction {} is missing {} signatures", tx.id, unsigned.len());
            return Err(FlowError::MissingSignatures {
                tx: tx.id,
                missing: unsigned,
            });
        }
        info!("Collected all signatures for transaction {}", tx.id);

        let record = self.finalizer.finalise(&tx).await?;
        info!(
            "Transaction {} finalised at {}",
            record.tx_id, record.committed_at
        );
        Ok(record)
    }
}

/// Counterparty side of the issue flow
#[derive(Debug, Clone)]
pub struct IssueResponder {
    our_identity: Party,
}

impl IssueResponder {
    pub fn new(our_identity: Party) -> Self {
        Self { our_identity }
    }

    pub fn identity(&self) -> &Party {
        &self.our_identity
    }

    /// Decide whether to sign `tx`: it must be a valid issuance naming us
    pub fn check_transaction(&self, tx: &ProposedTransaction) -> Result<(), FlowError> {
        validate(tx)?;

        if tx.commands.iter().any(|command| *command != Command::Issue) {
            return Err(FlowError::UnexpectedCommand {
                expected: Command::Issue,
            });
        }

        let ours = BTreeSet::from([self.our_identity.owning_key.clone()]);
        if !tx.is_relevant_to(&ours) {
            return Err(FlowError::NotAParticipant(self.our_identity.name.clone()));
        }

        Ok(())
    }
}

/// Collects signatures from responders running in the same process
#[derive(Debug, Clone, Default)]
pub struct ResponderCollector {
    responders: Vec<IssueResponder>,
}

impl ResponderCollector {
    pub fn new(responders: Vec<IssueResponder>) -> Self {
        Self { responders }
    }
}

impl SignatureCollector for ResponderCollector {
    async fn collect(
        &self,
        tx: &ProposedTransaction,
        missing: &BTreeSet<PublicKey>,
    ) -> Result<BTreeSet<PublicKey>, FlowError> {
        let mut signed = BTreeSet::new();

        for responder in &self.responders {
            let key = &responder.identity().owning_key;
            if !missing.contains(key) {
                continue;
            }

            responder
                .check_transaction(tx)
                .map_err(|e| FlowError::SignatureRefused {
                    party: responder.identity().name.clone(),
                    tx: tx.id,
                    reason: e.to_string(),
                })?;

            debug!("{} signed transaction {}", responder.identity(), tx.id);
            signed.insert(key.clone());
        }

        Ok(signed)
    }
}
