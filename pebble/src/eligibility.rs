use indexmap::IndexMap;

hex_id!(
    /// Public commitment to an eligible identity, as produced by
    /// [`CredentialSystem::identity_commitment`](crate::CredentialSystem::identity_commitment)
    IdentityCommitment
);

hex_id!(
    /// Application specific data attached to an eligibility entry (all zeroes when unused)
    EligibilityMarker
);

impl Default for EligibilityMarker {
    fn default() -> Self {
        EligibilityMarker([0; 32])
    }
}

/// The registry of identities allowed to take part in an election.
///
/// Entries keep their insertion order, which is also the order of the anonymity
/// ring used by credential proofs. The list is built once by the election
/// administrator and never changes after the election starts.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EligibilityList {
    entries: IndexMap<IdentityCommitment, EligibilityMarker>,
}

impl EligibilityList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity. Returns false (and leaves the list untouched) if it is already present.
    pub fn add(&mut self, commitment: IdentityCommitment, marker: EligibilityMarker) -> bool {
        if self.entries.contains_key(&commitment) {
            return false;
        }
        self.entries.insert(commitment, marker);
        true
    }

    pub fn contains(&self, commitment: &IdentityCommitment) -> bool {
        self.entries.contains_key(commitment)
    }

    pub fn marker(&self, commitment: &IdentityCommitment) -> Option<&EligibilityMarker> {
        self.entries.get(commitment)
    }

    /// Position of an identity in the list
    pub fn position(&self, commitment: &IdentityCommitment) -> Option<usize> {
        self.entries.get_full(commitment).map(|(index, _, _)| index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn commitments(&self) -> impl Iterator<Item = &IdentityCommitment> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityCommitment, &EligibilityMarker)> {
        self.entries.iter()
    }
}

impl std::iter::FromIterator<IdentityCommitment> for EligibilityList {
    fn from_iter<I: IntoIterator<Item = IdentityCommitment>>(iter: I) -> Self {
        let mut list = EligibilityList::new();
        for commitment in iter {
            list.add(commitment, EligibilityMarker::default());
        }
        list
    }
}
