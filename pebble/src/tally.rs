use crate::*;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// A credential message that was left out of the anonymity set
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExcludedCredential {
    /// Position in the credential log
    pub index: usize,
    pub tag: PseudonymousTag,
    pub reason: ValidationError,
}

/// A ballot that was not counted
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExcludedBallot {
    pub ballot: BallotId,
    pub tag: PseudonymousTag,
    pub reason: ValidationError,
}

/// Result of tallying the broadcast log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TallyOutcome {
    pub result: TallyResult,

    /// Set while reveals may still be posted
    pub provisional: bool,

    /// Ballots that made it into `result`, in log order
    pub counted_ballots: Vec<BallotId>,

    pub excluded_credentials: Vec<ExcludedCredential>,
    pub excluded_ballots: Vec<ExcludedBallot>,
}

/// Everything a tally needs apart from the log itself
pub struct Tallier<'a> {
    pub params: &'a ElectionParams,
    pub credentials: &'a dyn CredentialSystem,
    pub vdf: &'a dyn Vdf,
    pub method: &'a dyn VotingMethod,
}

impl<'a> Tallier<'a> {
    /// Count a log snapshot.
    ///
    /// Invalid artifacts never abort the count, they are excluded with a reason.
    pub fn tally(&self, log: &LogSnapshot, provisional: bool) -> TallyOutcome {
        let mut excluded_credentials = Vec::new();
        let mut excluded_ballots = Vec::new();

        let valid_tags = self.valid_tags(&log.credentials, &mut excluded_credentials);

        // First valid ballot per tag, in log order
        let mut kept: HashMap<PseudonymousTag, BallotId> = HashMap::new();
        let mut candidates: Vec<(BallotId, &SignedBallot)> = Vec::new();
        for ballot in &log.ballots {
            let id = ballot.id();
            let rejected = if let Err(e) = ballot.verify_binding(self.params, self.credentials) {
                Some(ValidationError::InvalidBinding(e))
            } else if !valid_tags.contains(&ballot.tag) {
                Some(ValidationError::UnknownTag(ballot.tag))
            } else if let Some(first) = kept.get(&ballot.tag) {
                Some(ValidationError::DuplicateTag { kept: *first })
            } else {
                None
            };

            match rejected {
                Some(reason) => {
                    warn!("excluding ballot {}: {}", id, reason);
                    excluded_ballots.push(ExcludedBallot {
                        ballot: id,
                        tag: ballot.tag,
                        reason,
                    });
                }
                None => {
                    kept.insert(ballot.tag, id);
                    candidates.push((id, ballot));
                }
            }
        }

        let mut reveals: HashMap<BallotId, Vec<&VdfSolution>> = HashMap::new();
        for message in &log.decryptions {
            reveals
                .entry(message.ballot)
                .or_default()
                .push(&message.solution);
        }

        let mut votes = Vec::with_capacity(candidates.len());
        let mut counted_ballots = Vec::with_capacity(candidates.len());
        for (id, ballot) in candidates {
            match self.open(ballot, reveals.get(&id).map(Vec::as_slice).unwrap_or(&[])) {
                Ok(choice) => {
                    debug!("counting ballot {}", id);
                    votes.push(choice);
                    counted_ballots.push(id);
                }
                Err(reason) => {
                    warn!("excluding ballot {}: {}", id, reason);
                    excluded_ballots.push(ExcludedBallot {
                        ballot: id,
                        tag: ballot.tag,
                        reason,
                    });
                }
            }
        }

        TallyOutcome {
            result: self.method.tally(&self.params.choices, &votes),
            provisional,
            counted_ballots,
            excluded_credentials,
            excluded_ballots,
        }
    }

    /// Tags of the credentials that form the anonymity set
    fn valid_tags(
        &self,
        credentials: &[CredentialMessage],
        excluded: &mut Vec<ExcludedCredential>,
    ) -> HashSet<PseudonymousTag> {
        let mut tags = HashSet::new();
        let mut registrants: HashMap<RegistrantLink, usize> = HashMap::new();

        for (index, message) in credentials.iter().enumerate() {
            let reason = match self.credentials.verify(self.params, message) {
                Err(e) => Some(ValidationError::InvalidCredential(e)),
                Ok(verified) => match verified
                    .registrant
                    .and_then(|r| registrants.get(&r).copied())
                {
                    Some(first) => Some(ValidationError::DuplicateRegistration { first }),
                    None if tags.contains(&verified.tag) => {
                        Some(ValidationError::DuplicateCredential(verified.tag))
                    }
                    None => {
                        if let Some(registrant) = verified.registrant {
                            registrants.insert(registrant, index);
                        }
                        tags.insert(verified.tag);
                        None
                    }
                },
            };

            if let Some(reason) = reason {
                warn!("excluding credential {}: {}", index, reason);
                excluded.push(ExcludedCredential {
                    index,
                    tag: message.tag,
                    reason,
                });
            }
        }

        tags
    }

    /// The choice from the first reveal that opens the ballot
    fn open(
        &self,
        ballot: &SignedBallot,
        solutions: &[&VdfSolution],
    ) -> Result<u32, ValidationError> {
        let mut last_error = ValidationError::MissingDecryption;
        for solution in solutions {
            match ballot.open(self.vdf, solution, self.params.choices.len()) {
                Ok(choice) => return Ok(choice),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}
