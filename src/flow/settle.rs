use crate::{
    flow::Finalizer, validation::validate, Amount, FinalityRecord, FlowError, IouState, Party,
    ProposedTransaction,
};
use tracing::info;

/// Repays an IOU on behalf of its borrower
pub struct SettleFlow<F> {
    our_identity: Party,
    finalizer: F,
}

impl<F: Finalizer> SettleFlow<F> {
    pub fn new(our_identity: Party, finalizer: F) -> Self {
        Self {
            our_identity,
            finalizer,
        }
    }

    /// Pay `payment` against `input` and commit the result.
    ///
    /// A payment reaching the outstanding amount ends the IOU; anything less
    /// leaves a successor version with `paid` increased.
    pub async fn call(
        &self,
        input: IouState,
        payment: &Amount,
    ) -> Result<FinalityRecord, FlowError> {
        if input.borrower != self.our_identity {
            return Err(FlowError::NotBorrower(self.our_identity.name.clone()));
        }

        let tx = ProposedTransaction::settle(input, payment)?;
        info!("Built settle transaction {} paying {}", tx.id, payment);

        validate(&tx)?;

        let record = self.finalizer.finalise(&tx).await?;
        info!(
            "Transaction {} finalised at {}",
            record.tx_id, record.committed_at
        );
        Ok(record)
    }
}
