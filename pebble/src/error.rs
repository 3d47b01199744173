use crate::*;
use std::time::Duration;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("pebble: {operation} requires phase {expected}, but the election is in phase {actual}")]
    Phase {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },

    #[error("pebble: choice index {index} is out of range for {choices} choices")]
    InvalidChoice { index: usize, choices: usize },

    #[error("pebble: credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("pebble: no ballot has been cast by this voter")]
    NoBallot,

    #[error("pebble: a ballot for this credential is already on the broadcast log: {0}")]
    AlreadyVoted(BallotId),

    #[error("pebble: vdf error: {0}")]
    Vdf(#[from] VdfError),

    #[error("pebble: {0}")]
    Decryption(#[from] DecryptionError),

    #[error("pebble: secrets error: {0}")]
    Storage(#[from] StorageError),

    #[error("pebble: broadcast error: {0}")]
    Transport(#[from] TransportError),

    #[error("pebble: unknown voting method: {0}")]
    UnknownVotingMethod(String),

    #[error("pebble: invalid election parameters: {0}")]
    InvalidParams(String),

    #[error("pebble: invalid configuration value for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("pebble: invalid hexidecimal")]
    BadHex,

    #[error("pebble: wrong length")]
    BadLength,

    #[error("pebble: CBOR error deserializing record: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("pebble: JSON error deserializing record: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}

/// Failures of the anonymous credential capability
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CredentialError {
    #[error("credential system has not been set up")]
    NotSetUp,

    #[error("anonymity set of {size} exceeds the configured maximum of {max}")]
    AnonymitySetTooLarge { size: usize, max: usize },

    #[error("anonymity set is empty")]
    EmptyAnonymitySet,

    #[error("identity is not on the eligibility list")]
    NotEligible,

    #[error("malformed secret credential")]
    MalformedSecret,

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("invalid group element")]
    InvalidPoint,

    #[error("membership proof does not verify")]
    InvalidProof,

    #[error("binding proof does not verify")]
    InvalidBinding,
}

/// Failures of the verifiable delay function capability
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VdfError {
    #[error("difficulty {difficulty} exceeds the maximum of {max}")]
    DifficultyTooHigh { difficulty: u64, max: u64 },

    #[error("invalid puzzle: {0}")]
    InvalidPuzzle(String),

    #[error("solving was cancelled")]
    Cancelled,

    #[error("solving did not finish within {0:?}")]
    Timeout(Duration),

    #[error("solution does not verify")]
    Unverifiable,

    #[error("solver worker exited without a result")]
    WorkerFailed,
}

/// A time-locked ciphertext could not be opened with the given key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("time-locked ballot could not be decrypted")]
pub struct DecryptionError;

/// Errors raised by a secrets collaborator
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("missing secret: {0}")]
    Missing(&'static str),

    #[error("secret store backend failure: {0}")]
    Backend(String),
}

/// Errors raised by a broadcast collaborator
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("{record} rejected: the election is in phase {phase}")]
    OutOfPhase { record: &'static str, phase: Phase },

    #[error("broadcast channel unavailable: {0}")]
    Unavailable(String),
}

/// Reasons an artifact on the broadcast log was left out of the count
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("pebble validation: credential proof rejected: {0}")]
    InvalidCredential(CredentialError),

    #[error("pebble validation: registrant already holds the credential at log position {first}")]
    DuplicateRegistration { first: usize },

    #[error("pebble validation: tag {0} already registered")]
    DuplicateCredential(PseudonymousTag),

    #[error("pebble validation: tag {0} does not belong to any valid credential")]
    UnknownTag(PseudonymousTag),

    #[error("pebble validation: ballot binding rejected: {0}")]
    InvalidBinding(CredentialError),

    #[error("pebble validation: another ballot under the same tag was counted: {kept}")]
    DuplicateTag { kept: BallotId },

    #[error("pebble validation: no decryption was revealed for this ballot")]
    MissingDecryption,

    #[error("pebble validation: vdf solution rejected: {0}")]
    InvalidVdfSolution(VdfError),

    #[error("pebble validation: ballot decryption failed")]
    DecryptionFailed,

    #[error("pebble validation: decrypted choice {choice} is out of range for {choices} choices")]
    ChoiceOutOfRange { choice: u32, choices: usize },
}
