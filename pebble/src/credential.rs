use crate::*;

hex_id!(
    /// Public pseudonym derived deterministically from a secret credential.
    ///
    /// The same secret always yields the same tag, different secrets yield unlinkable tags.
    PseudonymousTag
);

hex_id!(
    /// Value that is equal for two credential messages produced by the same
    /// eligible identity, without revealing which identity that is
    RegistrantLink
);

/// A voter-private credential. Never transmitted.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SecretCredential(#[serde(with = "hex_array")] [u8; 32]);

impl SecretCredential {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SecretCredential(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SecretCredential(..)")
    }
}

/// Anonymous registration posted during the credential generation phase.
///
/// `proof` is opaque to the engine: it is produced and checked by the credential
/// system in use, and shows that some eligibility-list entry authorised `tag`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialMessage {
    #[serde(with = "HexForm::<Vec<u8>>")]
    pub proof: Vec<u8>,
    pub tag: PseudonymousTag,
}

impl Record for CredentialMessage {}

/// Output of a successful credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub tag: PseudonymousTag,

    /// Present when the backend can link repeated registrations by one identity
    pub registrant: Option<RegistrantLink>,
}

/// Anonymous credential capability.
///
/// Backends decide how membership is proven. The engine only relies on the
/// contract below, so any proof system that provides it can be swapped in.
pub trait CredentialSystem: Send + Sync {
    /// Human readable backend name
    fn name(&self) -> &str;

    /// One-time setup of shared parameters, sized to the anonymity set
    fn setup_circuit(&mut self, anonymity_set_size: usize) -> Result<(), CredentialError>;

    /// Public commitment to register on the eligibility list for `private_key`
    fn identity_commitment(&self, private_key: &PrivateKey) -> IdentityCommitment;

    /// A fresh random secret credential
    fn generate_secret_credential(&self) -> SecretCredential;

    /// A secret credential recomputable from `private_key`, for voters who cannot keep state
    fn derive_secret_credential(
        &self,
        private_key: &PrivateKey,
    ) -> Result<SecretCredential, CredentialError>;

    /// The public pseudonym for `secret`
    fn pseudonymous_tag(&self, secret: &SecretCredential)
        -> Result<PseudonymousTag, CredentialError>;

    /// Prove that the holder of `private_key` is eligible and authorises the tag of `secret`
    fn issue(
        &self,
        params: &ElectionParams,
        private_key: &PrivateKey,
        secret: &SecretCredential,
    ) -> Result<CredentialMessage, CredentialError>;

    /// Check a credential message against the election's eligibility list
    fn verify(
        &self,
        params: &ElectionParams,
        message: &CredentialMessage,
    ) -> Result<VerifiedCredential, CredentialError>;

    /// Prove knowledge of the secret behind a tag, bound to `statement`
    fn prove_binding(
        &self,
        secret: &SecretCredential,
        statement: &[u8],
    ) -> Result<Vec<u8>, CredentialError>;

    /// Check a binding proof produced by [`prove_binding`](CredentialSystem::prove_binding)
    fn verify_binding(
        &self,
        tag: &PseudonymousTag,
        statement: &[u8],
        proof: &[u8],
    ) -> Result<(), CredentialError>;
}
