use crate::*;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Immutable configuration of a single election.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ElectionParams {
    pub id: Uuid,

    /// Identities allowed to register a credential.
    ///
    /// Shared with every engine and credential check, never copied.
    pub eligibility_list: Arc<EligibilityList>,

    /// End of credential generation, start of casting
    pub cast_start: DateTime<Utc>,

    /// End of casting, start of the reveal window
    pub tally_start: DateTime<Utc>,

    /// End of the reveal window. Tallies computed after this point are final.
    pub tally_end: DateTime<Utc>,

    /// Identifier of the counting method, see [`voting_method`](crate::voting_method)
    pub voting_method: String,

    /// Choice labels, indexed by the choice index carried in ballots
    pub choices: Vec<String>,
}

impl ElectionParams {
    /// Create and validate a new set of election parameters
    pub fn new(
        eligibility_list: Arc<EligibilityList>,
        cast_start: DateTime<Utc>,
        tally_start: DateTime<Utc>,
        tally_end: DateTime<Utc>,
        voting_method: &str,
        choices: Vec<String>,
    ) -> Result<Self, Error> {
        let params = ElectionParams {
            id: Uuid::new_v4(),
            eligibility_list,
            cast_start,
            tally_start,
            tally_end,
            voting_method: voting_method.to_owned(),
            choices,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters describe a runnable election
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.cast_start < self.tally_start && self.tally_start < self.tally_end) {
            return Err(Error::InvalidParams(
                "phase boundaries must satisfy cast_start < tally_start < tally_end".to_owned(),
            ));
        }
        if self.choices.is_empty() {
            return Err(Error::InvalidParams("no choices".to_owned()));
        }
        let mut seen = HashSet::with_capacity(self.choices.len());
        for choice in &self.choices {
            if !seen.insert(choice.as_str()) {
                return Err(Error::InvalidParams(format!("duplicate choice {:?}", choice)));
            }
        }
        if self.eligibility_list.is_empty() {
            return Err(Error::InvalidParams("eligibility list is empty".to_owned()));
        }

        // Make sure the counting method exists before anyone votes
        voting_method(&self.voting_method)?;

        Ok(())
    }

    /// The phase the election is in at time `t`
    pub fn phase_at(&self, t: DateTime<Utc>) -> Phase {
        if t < self.cast_start {
            Phase::CredGen
        } else if t < self.tally_start {
            Phase::Cast
        } else if t < self.tally_end {
            Phase::Tally
        } else {
            Phase::Closed
        }
    }

    /// The phase the election is in according to `clock`
    pub fn phase(&self, clock: &dyn Clock) -> Phase {
        self.phase_at(clock.now())
    }

    /// Time left between `now` and the start of the reveal window (zero once it has started)
    pub fn time_until_tally(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.tally_start - now)
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(0))
    }
}
