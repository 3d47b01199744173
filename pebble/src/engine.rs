use crate::*;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// One participant's view of an election.
///
/// A voter drives the protocol through [`post_credential`](Election::post_credential),
/// [`vote`](Election::vote) and [`reveal_ballot_decryption`](Election::reveal_ballot_decryption).
/// Anyone can compute a [`tally`](Election::tally) from the broadcast log.
/// Every operation checks the election phase against the clock first.
pub struct Election<B: BroadcastChannel, S: SecretsManager> {
    params: Arc<ElectionParams>,
    credentials: Arc<dyn CredentialSystem>,
    vdf: Arc<dyn Vdf>,
    method: Box<dyn VotingMethod>,
    channel: B,
    secrets: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<B: BroadcastChannel, S: SecretsManager> Election<B, S> {
    pub fn new(
        params: Arc<ElectionParams>,
        credentials: Arc<dyn CredentialSystem>,
        vdf: Arc<dyn Vdf>,
        channel: B,
        secrets: S,
    ) -> Result<Self, Error> {
        params.validate()?;
        let method = voting_method(&params.voting_method)?;

        Ok(Election {
            params,
            credentials,
            vdf,
            method,
            channel,
            secrets,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Count with a custom method instead of the one named in the parameters
    pub fn with_voting_method(mut self, method: Box<dyn VotingMethod>) -> Self {
        self.method = method;
        self
    }

    pub fn params(&self) -> &ElectionParams {
        &self.params
    }

    pub fn channel(&self) -> &B {
        &self.channel
    }

    pub fn secrets(&self) -> &S {
        &self.secrets
    }

    pub fn secrets_mut(&mut self) -> &mut S {
        &mut self.secrets
    }

    /// The current phase according to the engine's clock
    pub fn phase(&self) -> Phase {
        self.params.phase(self.clock.as_ref())
    }

    fn require_phase(&self, operation: &'static str, expected: Phase) -> Result<(), Error> {
        let actual = self.phase();
        if actual != expected {
            return Err(Error::Phase {
                operation,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Register an anonymous credential for this voter
    pub fn post_credential(&mut self) -> Result<CredentialMessage, Error> {
        self.require_phase("post_credential", Phase::CredGen)?;

        let private_key = self.secrets.private_key()?;
        let secret = self.secrets.secret_credential(self.credentials.as_ref())?;
        let message = self.credentials.issue(&self.params, &private_key, &secret)?;

        self.channel.post_credential(message.clone())?;
        info!("posted credential for tag {}", message.tag);

        Ok(message)
    }

    /// Cast a time-locked ballot for `choice`
    pub fn vote(&mut self, choice: usize) -> Result<SignedBallot, Error> {
        self.require_phase("vote", Phase::Cast)?;

        if choice >= self.params.choices.len() {
            return Err(Error::InvalidChoice {
                index: choice,
                choices: self.params.choices.len(),
            });
        }

        let secret = self.secrets.secret_credential(self.credentials.as_ref())?;
        let tag = self.credentials.pseudonymous_tag(&secret)?;

        // Only the first ballot under a tag is ever counted. Tags are public, so a
        // ballot without a valid binding proof says nothing about this voter.
        if let Some(existing) = self.channel.get_signed_ballots()?.iter().find(|ballot| {
            ballot.tag == tag
                && ballot
                    .verify_binding(&self.params, self.credentials.as_ref())
                    .is_ok()
        }) {
            return Err(Error::AlreadyVoted(existing.id()));
        }
        if self.secrets.ballot()?.is_some() {
            warn!("replacing a stored ballot that never reached the broadcast log");
        }

        let difficulty = self.difficulty();
        debug!("locking ballot with difficulty {}", difficulty);
        let ballot = SignedBallot::cast(
            &self.params,
            self.credentials.as_ref(),
            self.vdf.as_ref(),
            &secret,
            choice as u32,
            difficulty,
        )?;

        self.secrets.set_ballot(ballot.clone())?;
        self.channel.post_signed_ballot(ballot.clone())?;
        info!("cast ballot {}", ballot.id());

        Ok(ballot)
    }

    fn difficulty(&self) -> u64 {
        let difficulty = match self.config.difficulty {
            DifficultyPolicy::UntilTallyStart => self
                .vdf
                .difficulty_for(self.params.time_until_tally(self.clock.now())),
            DifficultyPolicy::Fixed(difficulty) => difficulty,
        };
        difficulty.max(1).min(self.vdf.max_difficulty())
    }

    /// Start solving the stored ballot's puzzle in the background
    pub fn begin_solving(&self) -> Result<SolveHandle, Error> {
        let ballot = self.secrets.ballot()?.ok_or(Error::NoBallot)?;
        debug!(
            "solving puzzle of ballot {} in the background",
            ballot.id()
        );
        Ok(solve_in_background(self.vdf.clone(), ballot.puzzle))
    }

    /// Wait for a background solve and keep its solution for the reveal
    pub fn finish_solving(
        &mut self,
        handle: SolveHandle,
        timeout: Option<Duration>,
    ) -> Result<VdfSolution, Error> {
        let puzzle = handle.puzzle().clone();
        let solution = handle.wait(timeout)?;
        self.vdf.verify(&puzzle, &solution)?;

        let ballot = self.secrets.ballot()?.ok_or(Error::NoBallot)?;
        if ballot.puzzle != puzzle {
            return Err(Error::Vdf(VdfError::InvalidPuzzle(
                "solution belongs to another ballot".to_owned(),
            )));
        }

        self.secrets.set_vdf_solution(solution.clone())?;
        Ok(solution)
    }

    /// Publish the VDF solution that opens this voter's ballot.
    ///
    /// Blocks until the puzzle is solved, unless a solution is already stored.
    pub fn reveal_ballot_decryption(&mut self) -> Result<DecryptionMessage, Error> {
        self.require_phase("reveal_ballot_decryption", Phase::Tally)?;

        let ballot = self.secrets.ballot()?.ok_or(Error::NoBallot)?;
        let solution = match self.secrets.vdf_solution()? {
            Some(solution) if self.vdf.is_valid(&ballot.puzzle, &solution) => {
                debug!("using stored vdf solution");
                solution
            }
            _ => {
                info!(
                    "solving vdf puzzle with difficulty {}",
                    ballot.puzzle.difficulty
                );
                let handle = solve_in_background(self.vdf.clone(), ballot.puzzle.clone());
                let solution = handle.wait(Some(self.config.solve_timeout))?;
                self.vdf.verify(&ballot.puzzle, &solution)?;
                self.secrets.set_vdf_solution(solution.clone())?;
                solution
            }
        };

        // Never publish a reveal that does not open the ballot
        ballot
            .open(self.vdf.as_ref(), &solution, self.params.choices.len())
            .map_err(|e| match e {
                ValidationError::InvalidVdfSolution(e) => Error::Vdf(e),
                _ => Error::Decryption(DecryptionError),
            })?;

        let message = DecryptionMessage {
            ballot: ballot.id(),
            solution,
        };
        self.channel.post_ballot_decryption(message.clone())?;
        info!("revealed ballot {}", message.ballot);

        Ok(message)
    }

    /// Count the broadcast log. Results are provisional until the reveal window closes.
    pub fn tally(&self) -> Result<TallyOutcome, Error> {
        let phase = self.phase();
        if phase < Phase::Tally {
            return Err(Error::Phase {
                operation: "tally",
                expected: Phase::Tally,
                actual: phase,
            });
        }

        let log = LogSnapshot {
            credentials: self.channel.get_credentials()?,
            ballots: self.channel.get_signed_ballots()?,
            decryptions: self.channel.get_ballot_decryptions()?,
        };

        let tallier = Tallier {
            params: &self.params,
            credentials: self.credentials.as_ref(),
            vdf: self.vdf.as_ref(),
            method: self.method.as_ref(),
        };
        let outcome = tallier.tally(&log, phase == Phase::Tally);

        info!(
            "tallied {} of {} ballots ({} excluded){}",
            outcome.counted_ballots.len(),
            log.ballots.len(),
            outcome.excluded_ballots.len(),
            if outcome.provisional { ", provisional" } else { "" }
        );

        Ok(outcome)
    }
}
