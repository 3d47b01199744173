use crate::*;

/// Per-voter private storage
pub trait SecretsManager {
    /// The voter's long-term identity key
    fn private_key(&self) -> Result<PrivateKey, StorageError>;

    /// The voter's secret credential, created through `credentials` on first use
    fn secret_credential(
        &mut self,
        credentials: &dyn CredentialSystem,
    ) -> Result<SecretCredential, StorageError>;

    /// The last ballot this voter cast
    fn ballot(&self) -> Result<Option<SignedBallot>, StorageError>;

    fn set_ballot(&mut self, ballot: SignedBallot) -> Result<(), StorageError>;

    /// A verified solution for the stored ballot's puzzle
    fn vdf_solution(&self) -> Result<Option<VdfSolution>, StorageError>;

    fn set_vdf_solution(&mut self, solution: VdfSolution) -> Result<(), StorageError>;
}

/// Secrets held in memory for the lifetime of the process
#[derive(Default)]
pub struct MemSecrets {
    private_key: Option<[u8; 32]>,
    secret_credential: Option<SecretCredential>,
    ballot: Option<SignedBallot>,
    vdf_solution: Option<VdfSolution>,
}

impl MemSecrets {
    pub fn new(private_key: &PrivateKey) -> Self {
        MemSecrets {
            private_key: Some(private_key.to_bytes()),
            ..Default::default()
        }
    }

    /// Use a known secret credential instead of generating one
    pub fn with_secret_credential(mut self, secret: SecretCredential) -> Self {
        self.secret_credential = Some(secret);
        self
    }
}

impl SecretsManager for MemSecrets {
    fn private_key(&self) -> Result<PrivateKey, StorageError> {
        let bytes = self.private_key.ok_or(StorageError::Missing("private key"))?;
        PrivateKey::from_bytes(&bytes).map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn secret_credential(
        &mut self,
        credentials: &dyn CredentialSystem,
    ) -> Result<SecretCredential, StorageError> {
        let secret = self
            .secret_credential
            .get_or_insert_with(|| credentials.generate_secret_credential());
        Ok(secret.clone())
    }

    fn ballot(&self) -> Result<Option<SignedBallot>, StorageError> {
        Ok(self.ballot.clone())
    }

    fn set_ballot(&mut self, ballot: SignedBallot) -> Result<(), StorageError> {
        self.ballot = Some(ballot);
        Ok(())
    }

    fn vdf_solution(&self) -> Result<Option<VdfSolution>, StorageError> {
        Ok(self.vdf_solution.clone())
    }

    fn set_vdf_solution(&mut self, solution: VdfSolution) -> Result<(), StorageError> {
        self.vdf_solution = Some(solution);
        Ok(())
    }
}
