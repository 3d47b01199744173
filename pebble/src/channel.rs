use crate::*;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An append-only public log shared by every participant.
///
/// Appends are atomic. Reads return the full sequence of a record type in log order.
pub trait BroadcastChannel {
    fn post_credential(&self, message: CredentialMessage) -> Result<(), TransportError>;

    fn post_signed_ballot(&self, ballot: SignedBallot) -> Result<(), TransportError>;

    fn post_ballot_decryption(&self, message: DecryptionMessage) -> Result<(), TransportError>;

    fn get_credentials(&self) -> Result<Vec<CredentialMessage>, TransportError>;

    fn get_signed_ballots(&self) -> Result<Vec<SignedBallot>, TransportError>;

    fn get_ballot_decryptions(&self) -> Result<Vec<DecryptionMessage>, TransportError>;
}

/// Everything on a broadcast log at one moment
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    pub credentials: Vec<CredentialMessage>,
    pub ballots: Vec<SignedBallot>,
    pub decryptions: Vec<DecryptionMessage>,
}

#[derive(Clone)]
struct PhaseGate {
    params: Arc<ElectionParams>,
    clock: Arc<dyn Clock>,
}

impl PhaseGate {
    fn check(&self, record: &'static str, required: Phase) -> Result<(), TransportError> {
        let phase = self.params.phase(self.clock.as_ref());
        if phase != required {
            return Err(TransportError::OutOfPhase { record, phase });
        }
        Ok(())
    }
}

/// A simple broadcast log held in memory. Clones share the same log.
#[derive(Clone, Default)]
pub struct MemBroadcast {
    log: Arc<RwLock<LogSnapshot>>,
    gate: Option<PhaseGate>,
}

impl MemBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that refuses records posted outside their phase, like a public board
    /// enforcing the schedule
    pub fn with_phase_gate(params: Arc<ElectionParams>, clock: Arc<dyn Clock>) -> Self {
        MemBroadcast {
            log: Arc::default(),
            gate: Some(PhaseGate { params, clock }),
        }
    }

    /// A copy of the whole log
    pub fn snapshot(&self) -> Result<LogSnapshot, TransportError> {
        Ok(self.read()?.clone())
    }

    fn check(&self, record: &'static str, required: Phase) -> Result<(), TransportError> {
        match &self.gate {
            Some(gate) => gate.check(record, required),
            None => Ok(()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<LogSnapshot>, TransportError> {
        self.log
            .read()
            .map_err(|_| TransportError::Unavailable("broadcast log lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<LogSnapshot>, TransportError> {
        self.log
            .write()
            .map_err(|_| TransportError::Unavailable("broadcast log lock poisoned".to_owned()))
    }
}

impl BroadcastChannel for MemBroadcast {
    fn post_credential(&self, message: CredentialMessage) -> Result<(), TransportError> {
        self.check("credential", Phase::CredGen)?;
        self.write()?.credentials.push(message);
        Ok(())
    }

    fn post_signed_ballot(&self, ballot: SignedBallot) -> Result<(), TransportError> {
        self.check("ballot", Phase::Cast)?;
        self.write()?.ballots.push(ballot);
        Ok(())
    }

    fn post_ballot_decryption(&self, message: DecryptionMessage) -> Result<(), TransportError> {
        self.check("decryption", Phase::Tally)?;
        self.write()?.decryptions.push(message);
        Ok(())
    }

    fn get_credentials(&self) -> Result<Vec<CredentialMessage>, TransportError> {
        Ok(self.read()?.credentials.clone())
    }

    fn get_signed_ballots(&self) -> Result<Vec<SignedBallot>, TransportError> {
        Ok(self.read()?.ballots.clone())
    }

    fn get_ballot_decryptions(&self) -> Result<Vec<DecryptionMessage>, TransportError> {
        Ok(self.read()?.decryptions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn credential(byte: u8) -> CredentialMessage {
        CredentialMessage {
            proof: vec![byte],
            tag: PseudonymousTag([byte; 32]),
        }
    }

    #[test]
    fn clones_share_one_ordered_log() {
        let board = MemBroadcast::new();
        let other = board.clone();

        board.post_credential(credential(1)).unwrap();
        other.post_credential(credential(2)).unwrap();
        board.post_credential(credential(3)).unwrap();

        let tags: Vec<u8> = other
            .get_credentials()
            .unwrap()
            .iter()
            .map(|c| c.tag.0[0])
            .collect();
        assert_eq!(tags, vec![1, 2, 3]);
        assert!(board.get_signed_ballots().unwrap().is_empty());
        assert_eq!(board.snapshot().unwrap().credentials.len(), 3);
    }

    #[test]
    fn phase_gate_rejects_out_of_phase_records() {
        let start = Utc::now();
        let list: EligibilityList = vec![IdentityCommitment([1; 32])].into_iter().collect();
        let params = ElectionParams::new(
            Arc::new(list),
            start + Duration::seconds(20),
            start + Duration::seconds(40),
            start + Duration::seconds(60),
            "plurality",
            vec!["a".into(), "b".into()],
        )
        .unwrap();

        let clock = ManualClock::new(start);
        let board = MemBroadcast::with_phase_gate(Arc::new(params), Arc::new(clock.clone()));

        board.post_credential(credential(1)).unwrap();

        clock.advance(Duration::seconds(30));
        assert!(matches!(
            board.post_credential(credential(2)),
            Err(TransportError::OutOfPhase {
                record: "credential",
                phase: Phase::Cast
            })
        ));
        assert_eq!(board.get_credentials().unwrap().len(), 1);
    }
}
