use crate::state::IouState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use uuid::Uuid;

/// Currency token an [`Amount`] is denominated in (e.g. "GBP")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-negative quantity of a currency token.
///
/// Amounts are only comparable and combinable when their tokens match.
/// `partial_cmp` returns `None` across tokens, and [`Amount::plus`] fails
/// with [`AmountError::CurrencyMismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub quantity: u64,
    pub token: Currency,
}

impl Amount {
    pub fn new(quantity: u64, token: Currency) -> Self {
        Self { quantity, token }
    }

    /// Zero in the given token
    pub fn zero(token: Currency) -> Self {
        Self::new(0, token)
    }

    pub fn is_positive(&self) -> bool {
        self.quantity > 0
    }

    /// Add two amounts of the same token
    pub fn plus(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.require_same_token(other)?;
        let quantity = self
            .quantity
            .checked_add(other.quantity)
            .ok_or(AmountError::Overflow)?;
        Ok(Amount::new(quantity, self.token.clone()))
    }

    /// Subtract `other`, clamping at zero
    pub fn saturating_minus(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.require_same_token(other)?;
        Ok(Amount::new(
            self.quantity.saturating_sub(other.quantity),
            self.token.clone(),
        ))
    }

    fn require_same_token(&self, other: &Amount) -> Result<(), AmountError> {
        if self.token != other.token {
            return Err(AmountError::CurrencyMismatch {
                expected: self.token.clone(),
                got: other.token.clone(),
            });
        }
        Ok(())
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.token != other.token {
            return None;
        }
        Some(self.quantity.cmp(&other.quantity))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.token)
    }
}

/// Identifier of a signing key. Signature verification happens outside
/// this crate; only membership of keys is checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A network identity with exactly one owning key.
///
/// Two parties are equal iff their owning keys are equal; the name is
/// informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub owning_key: PublicKey,
}

impl Party {
    pub fn new(name: impl Into<String>, owning_key: PublicKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.owning_key == other.owning_key
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owning_key.hash(state);
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Threads every version of one logical IOU through its history.
///
/// Identity is the UUID alone; `external_id` is a caller-supplied label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearId {
    #[serde(default)]
    pub external_id: Option<String>,
    pub id: Uuid,
}

impl LinearId {
    pub fn new(external_id: Option<String>) -> Self {
        Self {
            external_id,
            id: Uuid::new_v4(),
        }
    }
}

impl Default for LinearId {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PartialEq for LinearId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LinearId {}

impl Hash for LinearId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for LinearId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinearId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for LinearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.external_id {
            Some(external) => write!(f, "{}_{}", external, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Intent declared by a transaction; selects the rule set applied to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Command {
    Issue,
    Transfer,
    Settle,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Issue => "Issue",
            Command::Transfer => "Transfer",
            Command::Settle => "Settle",
        };
        f.write_str(name)
    }
}

/// A state carried by a transaction.
///
/// Transactions assembled by other contracts may carry states this crate
/// does not understand; those arrive as `Other` and are rejected with
/// [`ContractError::TypeMismatch`] wherever an IOU is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state")]
pub enum ContractState {
    Iou(IouState),
    Other {
        contract: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl ContractState {
    pub fn as_iou(&self) -> Option<&IouState> {
        match self {
            ContractState::Iou(state) => Some(state),
            ContractState::Other { .. } => None,
        }
    }

    /// Short name of the state's kind, for diagnostics
    pub fn kind(&self) -> &str {
        match self {
            ContractState::Iou(_) => "IOU",
            ContractState::Other { contract, .. } => contract,
        }
    }
}

impl From<IouState> for ContractState {
    fn from(state: IouState) -> Self {
        ContractState::Iou(state)
    }
}

/// Identifier for a proposed transaction, used for logging and bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(Uuid);

impl TxId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candidate transaction submitted for validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedTransaction {
    #[serde(default)]
    pub id: TxId,
    #[serde(default)]
    pub inputs: Vec<ContractState>,
    #[serde(default)]
    pub outputs: Vec<ContractState>,
    pub commands: Vec<Command>,
    #[serde(default)]
    pub signers: BTreeSet<PublicKey>,
}

impl ProposedTransaction {
    pub fn new(
        inputs: Vec<ContractState>,
        outputs: Vec<ContractState>,
        command: Command,
        signers: BTreeSet<PublicKey>,
    ) -> Self {
        Self {
            id: TxId::new(),
            inputs,
            outputs,
            commands: vec![command],
            signers,
        }
    }

    /// Whether any IOU consumed or created by this transaction involves one of `our_keys`
    pub fn is_relevant_to(&self, our_keys: &BTreeSet<PublicKey>) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .filter_map(ContractState::as_iou)
            .any(|state| state.is_relevant(our_keys))
    }

    /// IOU outputs, skipping states of other contracts
    pub fn iou_outputs(&self) -> impl Iterator<Item = &IouState> + '_ {
        self.outputs.iter().filter_map(ContractState::as_iou)
    }
}

/// Evidence that a transaction was committed by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalityRecord {
    pub tx_id: TxId,
    pub committed_at: DateTime<Utc>,
    pub outputs: Vec<IouState>,
}

/// Which side of a transaction a state sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateSide {
    Input,
    Output,
}

impl fmt::Display for StateSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSide::Input => f.write_str("input"),
            StateSide::Output => f.write_str("output"),
        }
    }
}

/// Misuse of amount arithmetic. These are programming errors, never a
/// validation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("amount overflow")]
    Overflow,
}

/// A business rule the transaction failed. The transaction is rejected;
/// nothing is wrong with the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("Required a single IOU command, found {found} distinct command kinds.")]
    MalformedCommand { found: usize },

    #[error("Only one output state should be created when issuing an IOU (found {found}).")]
    WrongOutputCount { found: usize },

    #[error("An IOU transfer transaction should consume one input and create one output (found {inputs} inputs, {outputs} outputs).")]
    WrongArity { inputs: usize, outputs: usize },

    #[error("No inputs should be consumed when issuing an IOU (found {found}).")]
    UnexpectedInputs { found: usize },

    #[error("A newly issued IOU must have a positive amount.")]
    NonPositiveAmount,

    #[error("The lender and borrower cannot be the same identity.")]
    SelfDealing,

    #[error(
        "{command} signers do not match the required set (missing: [{}], unexpected: [{}]).",
        join_keys(.missing),
        join_keys(.unexpected)
    )]
    SignerMismatch {
        command: Command,
        missing: Vec<PublicKey>,
        unexpected: Vec<PublicKey>,
    },

    #[error("The lender property must change in a transfer.")]
    LenderUnchanged,

    #[error("Only the lender property may change.")]
    UnauthorizedFieldChange,

    #[error("A settlement must involve exactly one IOU (found {found}).")]
    MultipleInstrumentsInOneSettlement { found: usize },

    #[error("There must be one input IOU.")]
    NoInputs,
}

/// Error returned by the validator.
///
/// `Rejected` is the ordinary "transaction is invalid" outcome.
/// `TypeMismatch` means the caller handed over a state of the wrong
/// contract where an IOU was required.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("transaction rejected: {0}")]
    Rejected(#[from] RuleViolation),

    #[error("{side} state {index} is a {found} state, expected an IOU")]
    TypeMismatch {
        side: StateSide,
        index: usize,
        found: String,
    },
}

impl ContractError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ContractError::Rejected(_))
    }

    pub fn violation(&self) -> Option<&RuleViolation> {
        match self {
            ContractError::Rejected(violation) => Some(violation),
            ContractError::TypeMismatch { .. } => None,
        }
    }
}

/// `Ok(())` is a valid transaction, `Err(Rejected(_))` an invalid one
pub type ValidationResult = Result<(), ContractError>;

/// Errors raised while running a flow around the contract
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("{0} is not a participant of the transaction")]
    NotAParticipant(String),

    #[error("{0} is not the borrower of the IOU")]
    NotBorrower(String),

    #[error("expected a single {expected} command")]
    UnexpectedCommand { expected: Command },

    #[error("transaction {tx} is missing signatures from [{}]", join_keys(.missing))]
    MissingSignatures { tx: TxId, missing: Vec<PublicKey> },

    #[error("{party} refused to sign transaction {tx}: {reason}")]
    SignatureRefused {
        party: String,
        tx: TxId,
        reason: String,
    },

    #[error("finality failed for transaction {tx}: {reason}")]
    Finality { tx: TxId, reason: String },
}

pub(crate) fn join_keys(keys: &[PublicKey]) -> String {
    keys.iter()
        .map(PublicKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
