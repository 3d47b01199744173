use super::*;
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;

const CHOICES: [&str; 3] = ["Toby Wilkinson", "Ava McLean", "Oliver Rogers"];

struct Harness {
    params: Arc<ElectionParams>,
    credentials: Arc<dyn CredentialSystem>,
    vdf: Arc<dyn Vdf>,
    board: MemBroadcast,
    clock: ManualClock,
    keys: Vec<PrivateKey>,
}

impl Harness {
    fn new(voters: usize) -> Self {
        let credentials = RingCredentials::with_anonymity_set(16).unwrap();
        let keys: Vec<PrivateKey> = (0..voters).map(|_| generate_private_key()).collect();
        let list: EligibilityList = keys
            .iter()
            .map(|key| credentials.identity_commitment(key))
            .collect();

        let now = Utc::now();
        let params = ElectionParams::new(
            Arc::new(list),
            now + Duration::seconds(20),
            now + Duration::seconds(40),
            now + Duration::seconds(60),
            "Plurality",
            CHOICES.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap();

        Harness {
            params: Arc::new(params),
            credentials: Arc::new(credentials),
            vdf: Arc::new(PietrzakVdf::new(10_000, 1_000, 512).unwrap()),
            board: MemBroadcast::new(),
            clock: ManualClock::new(now),
            keys,
        }
    }

    fn engine(&self, voter: usize) -> Election<MemBroadcast, MemSecrets> {
        self.engine_with(voter, MemSecrets::new(&self.keys[voter]))
    }

    fn engine_with(&self, voter: usize, secrets: MemSecrets) -> Election<MemBroadcast, MemSecrets> {
        assert!(voter < self.keys.len());
        let config = EngineConfig {
            difficulty: DifficultyPolicy::Fixed(64),
            ..Default::default()
        };
        Election::new(
            self.params.clone(),
            self.credentials.clone(),
            self.vdf.clone(),
            self.board.clone(),
            secrets,
        )
        .unwrap()
        .with_clock(Arc::new(self.clock.clone()))
        .with_config(config)
    }

    fn to_cast(&self) {
        self.clock.set(self.params.cast_start);
    }

    fn to_tally(&self) {
        self.clock.set(self.params.tally_start);
    }

    fn to_closed(&self) {
        self.clock.set(self.params.tally_end);
    }
}

#[test]
fn end_to_end_election() {
    let harness = Harness::new(10);
    let mut voters: Vec<_> = (0..10).map(|i| harness.engine(i)).collect();

    // Everyone registers
    for voter in voters.iter_mut() {
        assert_eq!(voter.phase(), Phase::CredGen);
        voter.post_credential().unwrap();
    }
    assert_eq!(harness.board.get_credentials().unwrap().len(), 10);

    // One voter votes for a random option
    harness.to_cast();
    let choice = rand::thread_rng().gen_range(0, CHOICES.len());
    voters[0].vote(choice).unwrap();

    // The ballot is revealed once the tally window opens
    harness.to_tally();
    let reveal = voters[0].reveal_ballot_decryption().unwrap();
    assert_eq!(
        reveal.ballot,
        harness.board.get_signed_ballots().unwrap()[0].id()
    );

    let outcome = voters[5].tally().unwrap();
    assert!(outcome.provisional);
    assert!(outcome.excluded_ballots.is_empty());
    assert!(outcome.excluded_credentials.is_empty());
    assert_eq!(outcome.result.num_votes, 1);
    for (index, name) in CHOICES.iter().enumerate() {
        let expected = if index == choice { 1 } else { 0 };
        assert_eq!(outcome.result.totals[*name], expected);
    }
    assert_eq!(outcome.result.winners, vec![CHOICES[choice].to_string()]);

    // After the reveal window closes the same count is final
    harness.to_closed();
    let closed = voters[9].tally().unwrap();
    assert!(!closed.provisional);
    assert_eq!(closed.result, outcome.result);
}

#[test]
fn operations_are_phase_gated() {
    let harness = Harness::new(2);
    let mut voter = harness.engine(0);

    // Nothing can be voted, revealed or tallied during credential generation
    assert!(matches!(
        voter.vote(0),
        Err(Error::Phase {
            expected: Phase::Cast,
            actual: Phase::CredGen,
            ..
        })
    ));
    assert!(matches!(
        voter.reveal_ballot_decryption(),
        Err(Error::Phase { .. })
    ));
    assert!(matches!(voter.tally(), Err(Error::Phase { .. })));

    harness.to_cast();
    assert!(matches!(
        voter.post_credential(),
        Err(Error::Phase {
            expected: Phase::CredGen,
            actual: Phase::Cast,
            ..
        })
    ));
    assert!(matches!(voter.tally(), Err(Error::Phase { .. })));

    harness.to_tally();
    assert!(matches!(voter.vote(1), Err(Error::Phase { .. })));

    harness.to_closed();
    assert!(matches!(
        voter.reveal_ballot_decryption(),
        Err(Error::Phase {
            expected: Phase::Tally,
            actual: Phase::Closed,
            ..
        })
    ));

    // Rejected operations never touch the log
    assert_eq!(harness.board.snapshot().unwrap(), LogSnapshot::default());
}

#[test]
fn invalid_choice_and_missing_ballot() {
    let harness = Harness::new(1);
    let mut voter = harness.engine(0);
    voter.post_credential().unwrap();

    harness.to_cast();
    assert!(matches!(
        voter.vote(3),
        Err(Error::InvalidChoice {
            index: 3,
            choices: 3
        })
    ));
    assert!(harness.board.get_signed_ballots().unwrap().is_empty());

    harness.to_tally();
    assert!(matches!(
        voter.reveal_ballot_decryption(),
        Err(Error::NoBallot)
    ));
}

#[test]
fn ineligible_voter_cannot_register() {
    let harness = Harness::new(2);
    let outsider = generate_private_key();
    let mut voter = Election::new(
        harness.params.clone(),
        harness.credentials.clone(),
        harness.vdf.clone(),
        harness.board.clone(),
        MemSecrets::new(&outsider),
    )
    .unwrap()
    .with_clock(Arc::new(harness.clock.clone()));

    assert!(matches!(
        voter.post_credential(),
        Err(Error::Credential(CredentialError::NotEligible))
    ));
    assert!(harness.board.get_credentials().unwrap().is_empty());
}

#[test]
fn a_second_ballot_is_refused() {
    let harness = Harness::new(2);
    let mut voter = harness.engine(0);
    voter.post_credential().unwrap();

    harness.to_cast();
    let first = voter.vote(1).unwrap();
    assert!(matches!(
        voter.vote(2),
        Err(Error::AlreadyVoted(id)) if id == first.id()
    ));
    assert_eq!(harness.board.get_signed_ballots().unwrap().len(), 1);
}

#[test]
fn a_ballot_reusing_someone_elses_tag_does_not_block_them() {
    let harness = Harness::new(2);
    let mut voter = harness.engine(0);
    let registered = voter.post_credential().unwrap();

    // Anyone can copy a public tag onto a ballot they cast themselves
    harness.to_cast();
    let mut forged = SignedBallot::cast(
        &harness.params,
        harness.credentials.as_ref(),
        harness.vdf.as_ref(),
        &harness.credentials.generate_secret_credential(),
        0,
        64,
    )
    .unwrap();
    forged.tag = registered.tag;
    harness.board.post_signed_ballot(forged.clone()).unwrap();

    let ballot = voter.vote(1).unwrap();
    assert_eq!(ballot.tag, registered.tag);

    harness.to_tally();
    voter.reveal_ballot_decryption().unwrap();

    let outcome = voter.tally().unwrap();
    assert_eq!(outcome.counted_ballots, vec![ballot.id()]);
    assert_eq!(outcome.result.totals[CHOICES[1]], 1);
    assert_eq!(outcome.excluded_ballots.len(), 1);
    assert_eq!(outcome.excluded_ballots[0].ballot, forged.id());
    assert!(matches!(
        outcome.excluded_ballots[0].reason,
        ValidationError::InvalidBinding(_)
    ));
}

#[test]
fn a_stored_ballot_missing_from_the_log_is_replaced() {
    let harness = Harness::new(1);
    let secret = harness.credentials.generate_secret_credential();
    let secrets = MemSecrets::new(&harness.keys[0]).with_secret_credential(secret.clone());
    let mut voter = harness.engine_with(0, secrets);
    voter.post_credential().unwrap();

    // A ballot that was stored but never made it to the board
    harness.to_cast();
    let lost = SignedBallot::cast(
        &harness.params,
        harness.credentials.as_ref(),
        harness.vdf.as_ref(),
        &secret,
        2,
        64,
    )
    .unwrap();
    voter.secrets_mut().set_ballot(lost.clone()).unwrap();

    let ballot = voter.vote(0).unwrap();
    assert_ne!(ballot.id(), lost.id());
    assert_eq!(voter.secrets().ballot().unwrap(), Some(ballot.clone()));
    assert_eq!(harness.board.get_signed_ballots().unwrap(), vec![ballot]);
}

#[test]
fn duplicate_ballots_under_one_tag() {
    let harness = Harness::new(2);
    let secret = harness.credentials.generate_secret_credential();
    let secrets = MemSecrets::new(&harness.keys[0]).with_secret_credential(secret.clone());
    let mut voter = harness.engine_with(0, secrets);
    voter.post_credential().unwrap();

    harness.to_cast();
    let counted = voter.vote(0).unwrap();

    // A copy of the credential posts a competing ballot straight to the log
    let competing = SignedBallot::cast(
        &harness.params,
        harness.credentials.as_ref(),
        harness.vdf.as_ref(),
        &secret,
        2,
        64,
    )
    .unwrap();
    harness.board.post_signed_ballot(competing.clone()).unwrap();

    harness.to_tally();
    voter.reveal_ballot_decryption().unwrap();
    let solution = harness
        .vdf
        .solve(&competing.puzzle, &CancelToken::new())
        .unwrap();
    harness
        .board
        .post_ballot_decryption(DecryptionMessage {
            ballot: competing.id(),
            solution,
        })
        .unwrap();

    let outcome = voter.tally().unwrap();
    assert_eq!(outcome.counted_ballots, vec![counted.id()]);
    assert_eq!(outcome.result.totals[CHOICES[0]], 1);
    assert_eq!(outcome.result.totals[CHOICES[2]], 0);
    assert_eq!(
        outcome.excluded_ballots,
        vec![ExcludedBallot {
            ballot: competing.id(),
            tag: competing.tag,
            reason: ValidationError::DuplicateTag { kept: counted.id() },
        }]
    );
}

#[test]
fn double_registration_counts_once() {
    let harness = Harness::new(3);
    let mut first = harness.engine(0);
    let mut second = harness.engine(0);
    let mut honest = harness.engine(1);

    first.post_credential().unwrap();
    let extra = second.post_credential().unwrap();
    honest.post_credential().unwrap();

    harness.to_cast();
    first.vote(0).unwrap();
    let sneaky = second.vote(0).unwrap();
    honest.vote(1).unwrap();

    harness.to_tally();
    first.reveal_ballot_decryption().unwrap();
    second.reveal_ballot_decryption().unwrap();
    honest.reveal_ballot_decryption().unwrap();

    let outcome = honest.tally().unwrap();
    assert_eq!(
        outcome.excluded_credentials,
        vec![ExcludedCredential {
            index: 1,
            tag: extra.tag,
            reason: ValidationError::DuplicateRegistration { first: 0 },
        }]
    );
    assert_eq!(outcome.excluded_ballots.len(), 1);
    assert_eq!(outcome.excluded_ballots[0].ballot, sneaky.id());
    assert_eq!(
        outcome.excluded_ballots[0].reason,
        ValidationError::UnknownTag(sneaky.tag)
    );
    assert_eq!(outcome.result.totals[CHOICES[0]], 1);
    assert_eq!(outcome.result.totals[CHOICES[1]], 1);
}

#[test]
fn unrevealed_ballots_are_reported() {
    let harness = Harness::new(2);
    let mut revealing = harness.engine(0);
    let mut silent = harness.engine(1);
    revealing.post_credential().unwrap();
    silent.post_credential().unwrap();

    harness.to_cast();
    revealing.vote(2).unwrap();
    let unrevealed = silent.vote(0).unwrap();

    harness.to_tally();
    revealing.reveal_ballot_decryption().unwrap();

    let outcome = silent.tally().unwrap();
    assert_eq!(outcome.result.num_votes, 1);
    assert_eq!(outcome.result.totals[CHOICES[2]], 1);
    assert_eq!(
        outcome.excluded_ballots,
        vec![ExcludedBallot {
            ballot: unrevealed.id(),
            tag: unrevealed.tag,
            reason: ValidationError::MissingDecryption,
        }]
    );
}

#[test]
fn solving_ahead_of_the_reveal() {
    let harness = Harness::new(1);
    let mut voter = harness.engine(0);
    voter.post_credential().unwrap();

    harness.to_cast();
    let ballot = voter.vote(1).unwrap();

    let handle = voter.begin_solving().unwrap();
    let solution = voter
        .finish_solving(handle, Some(std::time::Duration::from_secs(60)))
        .unwrap();
    assert_eq!(voter.secrets().vdf_solution().unwrap(), Some(solution.clone()));

    harness.to_tally();
    let reveal = voter.reveal_ballot_decryption().unwrap();
    assert_eq!(reveal.ballot, ballot.id());
    assert_eq!(reveal.solution, solution);
    assert_eq!(voter.tally().unwrap().result.totals[CHOICES[1]], 1);
}

#[test]
fn difficulty_follows_the_time_left() {
    let harness = Harness::new(1);
    let mut voter = harness.engine(0).with_config(EngineConfig::default());
    voter.post_credential().unwrap();

    // 1 000 squarings per second, 5 seconds before the tally starts
    harness.clock.set(harness.params.tally_start - Duration::seconds(5));
    let ballot = voter.vote(0).unwrap();
    assert_eq!(ballot.puzzle.difficulty, 5_000);
}

#[test]
fn gated_board_agrees_with_the_engine() {
    let harness = Harness::new(1);
    let board =
        MemBroadcast::with_phase_gate(harness.params.clone(), Arc::new(harness.clock.clone()));
    let mut voter = Election::new(
        harness.params.clone(),
        harness.credentials.clone(),
        harness.vdf.clone(),
        board.clone(),
        MemSecrets::new(&harness.keys[0]),
    )
    .unwrap()
    .with_clock(Arc::new(harness.clock.clone()));

    let message = voter.post_credential().unwrap();

    harness.to_cast();
    assert!(matches!(
        board.post_credential(message),
        Err(TransportError::OutOfPhase { .. })
    ));
    assert_eq!(board.get_credentials().unwrap().len(), 1);
}

/// The least popular choices win
struct LeastPopular;

impl VotingMethod for LeastPopular {
    fn name(&self) -> &str {
        "least-popular"
    }

    fn tally(&self, choices: &[String], votes: &[u32]) -> TallyResult {
        let mut result = Plurality.tally(choices, votes);
        let fewest = result.totals.values().copied().min().unwrap_or(0);
        result.method = self.name().to_owned();
        result.winners = result
            .totals
            .iter()
            .filter(|(_, count)| **count == fewest)
            .map(|(choice, _)| choice.clone())
            .collect();
        result
    }
}

#[test]
fn counting_with_a_custom_method() {
    let harness = Harness::new(2);
    let mut first = harness.engine(0).with_voting_method(Box::new(LeastPopular));
    let mut second = harness.engine(1);
    first.post_credential().unwrap();
    second.post_credential().unwrap();

    harness.to_cast();
    first.vote(0).unwrap();
    second.vote(1).unwrap();

    harness.to_tally();
    first.reveal_ballot_decryption().unwrap();
    second.reveal_ballot_decryption().unwrap();

    let custom = first.tally().unwrap();
    assert_eq!(custom.result.method, "least-popular");
    assert_eq!(custom.result.winners, vec![CHOICES[2].to_string()]);

    // The parameters still name plurality for everyone else
    let standard = second.tally().unwrap();
    assert_eq!(standard.result.method, "plurality");
    assert_eq!(
        standard.result.winners,
        vec![CHOICES[0].to_string(), CHOICES[1].to_string()]
    );
    assert_eq!(custom.result.totals, standard.result.totals);
}
