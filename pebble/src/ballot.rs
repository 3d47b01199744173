use crate::*;
use rand::RngCore;
use uuid::Uuid;

hex_id!(
    /// Content address of a signed ballot: SHA-256 of its canonical CBOR encoding
    BallotId
);

/// A time-locked ballot, posted during the cast phase.
///
/// The choice stays sealed until someone solves `puzzle`. The binding proof ties
/// the whole ballot to the holder of the secret credential behind `tag`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedBallot {
    pub puzzle: VdfPuzzle,

    #[serde(with = "HexForm::<Vec<u8>>")]
    pub ciphertext: Vec<u8>,

    pub tag: PseudonymousTag,

    #[serde(with = "HexForm::<Vec<u8>>")]
    pub binding_proof: Vec<u8>,
}

impl Record for SignedBallot {}

/// The part of a ballot covered by its binding proof
#[derive(Serialize)]
struct BindingStatement<'a> {
    election: &'a Uuid,
    puzzle: &'a VdfPuzzle,
    ciphertext: &'a [u8],
    tag: &'a PseudonymousTag,
}

impl SignedBallot {
    /// Seal `choice` for the election and prove ownership of the voter's tag
    pub fn cast(
        params: &ElectionParams,
        credentials: &dyn CredentialSystem,
        vdf: &dyn Vdf,
        secret: &SecretCredential,
        choice: u32,
        difficulty: u64,
    ) -> Result<Self, Error> {
        if choice as usize >= params.choices.len() {
            return Err(Error::InvalidChoice {
                index: choice as usize,
                choices: params.choices.len(),
            });
        }

        let tag = credentials.pseudonymous_tag(secret)?;

        // Fresh randomness so two ballots from one voter never share a puzzle
        let mut nonce = [0u8; 32];
        let mut csprng = rand::rngs::OsRng {};
        csprng.fill_bytes(&mut nonce);
        let seed = sha256(&[&params.id.as_bytes()[..], &tag.as_bytes()[..], &nonce[..]]);

        let (puzzle, key) = vdf.lock(&seed, difficulty)?;
        let ciphertext = encrypt_choice(&key, choice, tag.as_bytes());

        let statement = binding_statement(&params.id, &puzzle, &ciphertext, &tag);
        let binding_proof = credentials.prove_binding(secret, &statement)?;

        Ok(SignedBallot {
            puzzle,
            ciphertext,
            tag,
            binding_proof,
        })
    }

    pub fn id(&self) -> BallotId {
        BallotId(sha256(&[&self.as_bytes()[..]]))
    }

    /// Bytes the binding proof is computed over
    pub fn binding_statement(&self, params: &ElectionParams) -> Vec<u8> {
        binding_statement(&params.id, &self.puzzle, &self.ciphertext, &self.tag)
    }

    /// Check that the holder of `tag` produced this ballot for this election
    pub fn verify_binding(
        &self,
        params: &ElectionParams,
        credentials: &dyn CredentialSystem,
    ) -> Result<(), CredentialError> {
        credentials.verify_binding(
            &self.tag,
            &self.binding_statement(params),
            &self.binding_proof,
        )
    }

    /// Unlock the ballot with a VDF solution and recover the choice index
    pub fn open(
        &self,
        vdf: &dyn Vdf,
        solution: &VdfSolution,
        num_choices: usize,
    ) -> Result<u32, ValidationError> {
        let key = vdf
            .unlock(&self.puzzle, solution)
            .map_err(ValidationError::InvalidVdfSolution)?;

        let choice = decrypt_choice(&key, &self.ciphertext, self.tag.as_bytes())
            .map_err(|_| ValidationError::DecryptionFailed)?;

        if choice as usize >= num_choices {
            return Err(ValidationError::ChoiceOutOfRange {
                choice,
                choices: num_choices,
            });
        }

        Ok(choice)
    }
}

fn binding_statement(
    election: &Uuid,
    puzzle: &VdfPuzzle,
    ciphertext: &[u8],
    tag: &PseudonymousTag,
) -> Vec<u8> {
    let statement = BindingStatement {
        election,
        puzzle,
        ciphertext,
        tag,
    };
    serde_cbor::to_vec(&statement).expect("pebble: unexpected error serializing ballot statement")
}

/// Reveal of the VDF solution for one ballot, posted during the tally phase
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecryptionMessage {
    pub ballot: BallotId,
    pub solution: VdfSolution,
}

impl Record for DecryptionMessage {}
