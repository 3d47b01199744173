//! Linkable ring signature credentials over the Ristretto group.
//!
//! A credential message is an LSAG ring signature over the whole eligibility
//! list. It shows that one of the listed identities authorised the message's
//! pseudonymous tag, without revealing which one. The signature's key image is
//! the same for every message signed by one identity, which lets the tally drop
//! repeated registrations.
//!
//! Tags are `s·J` for the secret credential `s` and an independent generator `J`.
//! Ballots are bound to a tag with a Schnorr proof of knowledge of `s`.

use crate::*;
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use hkdf::Hkdf;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use std::convert::TryInto;

const IDENTITY_DOMAIN: &[u8] = b"pebble identity v1";
const TAG_DOMAIN: &[u8] = b"pebble tag generator v1";
const LINK_DOMAIN: &[u8] = b"pebble link base v1";
const RING_DOMAIN: &[u8] = b"pebble ring challenge v1";
const BINDING_DOMAIN: &[u8] = b"pebble binding challenge v1";
const STATEMENT_DOMAIN: &[u8] = b"pebble credential statement v1";

#[derive(Serialize, Deserialize)]
struct RingProof {
    challenge: [u8; 32],
    responses: Vec<[u8; 32]>,
    link: [u8; 32],
}

/// Members of the anonymity ring with their link bases, plus a digest binding
/// every challenge to this exact ring
struct Ring {
    members: Vec<RistrettoPoint>,
    bases: Vec<RistrettoPoint>,
    digest: Vec<u8>,
}

/// Ring-signature credential backend
#[derive(Default, Debug, Clone)]
pub struct RingCredentials {
    max_ring_size: Option<usize>,
}

impl RingCredentials {
    /// A backend that still needs [`setup_circuit`](CredentialSystem::setup_circuit)
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend set up for anonymity sets of up to `size` identities
    pub fn with_anonymity_set(size: usize) -> Result<Self, CredentialError> {
        let mut system = Self::new();
        system.setup_circuit(size)?;
        Ok(system)
    }

    fn ring(&self, list: &EligibilityList) -> Result<Ring, CredentialError> {
        let max = self.max_ring_size.ok_or(CredentialError::NotSetUp)?;
        if list.is_empty() {
            return Err(CredentialError::EmptyAnonymitySet);
        }
        if list.len() > max {
            return Err(CredentialError::AnonymitySetTooLarge {
                size: list.len(),
                max,
            });
        }

        let mut members = Vec::with_capacity(list.len());
        let mut bases = Vec::with_capacity(list.len());
        let mut hasher = Sha512::new();
        hasher.update(RING_DOMAIN);
        for commitment in list.commitments() {
            let point = decompress(commitment.as_bytes())?;
            hasher.update(commitment.as_bytes());
            bases.push(link_base(commitment.as_bytes()));
            members.push(point);
        }

        Ok(Ring {
            members,
            bases,
            digest: hasher.finalize().to_vec(),
        })
    }
}

impl CredentialSystem for RingCredentials {
    fn name(&self) -> &str {
        "lsag-ristretto"
    }

    fn setup_circuit(&mut self, anonymity_set_size: usize) -> Result<(), CredentialError> {
        if anonymity_set_size == 0 {
            return Err(CredentialError::EmptyAnonymitySet);
        }
        self.max_ring_size = Some(anonymity_set_size);
        Ok(())
    }

    fn identity_commitment(&self, private_key: &PrivateKey) -> IdentityCommitment {
        let point = &identity_scalar(private_key) * &RISTRETTO_BASEPOINT_TABLE;
        IdentityCommitment(point.compress().to_bytes())
    }

    fn generate_secret_credential(&self) -> SecretCredential {
        let mut csprng = rand::rngs::OsRng {};
        SecretCredential::from_bytes(Scalar::random(&mut csprng).to_bytes())
    }

    fn derive_secret_credential(
        &self,
        private_key: &PrivateKey,
    ) -> Result<SecretCredential, CredentialError> {
        use rand_chacha::rand_core::SeedableRng;
        use rand_chacha::ChaCha20Rng;

        let h = Hkdf::<Sha256>::new(None, private_key.as_bytes());
        let mut seed = [0u8; 32];
        h.expand(b"pebble_secret_credential", &mut seed)
            .map_err(|_| CredentialError::MalformedSecret)?;

        let mut rng = ChaCha20Rng::from_seed(seed);
        Ok(SecretCredential::from_bytes(
            Scalar::random(&mut rng).to_bytes(),
        ))
    }

    fn pseudonymous_tag(
        &self,
        secret: &SecretCredential,
    ) -> Result<PseudonymousTag, CredentialError> {
        let s = secret_scalar(secret)?;
        Ok(PseudonymousTag((s * tag_generator()).compress().to_bytes()))
    }

    fn issue(
        &self,
        params: &ElectionParams,
        private_key: &PrivateKey,
        secret: &SecretCredential,
    ) -> Result<CredentialMessage, CredentialError> {
        let ring = self.ring(&params.eligibility_list)?;

        let k = identity_scalar(private_key);
        let commitment = self.identity_commitment(private_key);
        let signer = params
            .eligibility_list
            .position(&commitment)
            .ok_or(CredentialError::NotEligible)?;

        let tag = self.pseudonymous_tag(secret)?;
        let statement = credential_statement(params, &tag);

        let mut csprng = rand::rngs::OsRng {};
        let proof = sign_ring(&ring, signer, &k, &statement, &mut csprng);
        let proof =
            serde_cbor::to_vec(&proof).map_err(|e| CredentialError::MalformedProof(e.to_string()))?;

        Ok(CredentialMessage { proof, tag })
    }

    fn verify(
        &self,
        params: &ElectionParams,
        message: &CredentialMessage,
    ) -> Result<VerifiedCredential, CredentialError> {
        let proof: RingProof = serde_cbor::from_slice(&message.proof)
            .map_err(|e| CredentialError::MalformedProof(e.to_string()))?;
        let ring = self.ring(&params.eligibility_list)?;

        if proof.responses.len() != ring.members.len() {
            return Err(CredentialError::InvalidProof);
        }

        // The tag has to be a usable group element for the binding proofs later on
        decompress(message.tag.as_bytes())?;

        let link = decompress(&proof.link)?;
        if link == RistrettoPoint::identity() {
            return Err(CredentialError::InvalidProof);
        }

        let statement = credential_statement(params, &message.tag);
        let c0 = canonical_scalar(proof.challenge)?;
        let mut c = c0;
        for (i, response) in proof.responses.iter().enumerate() {
            let s = canonical_scalar(*response)?;
            let l = &s * &RISTRETTO_BASEPOINT_TABLE + c * ring.members[i];
            let r = s * ring.bases[i] + c * link;
            c = ring_challenge(&ring.digest, &statement, &proof.link, &l, &r);
        }

        if c != c0 {
            return Err(CredentialError::InvalidProof);
        }

        Ok(VerifiedCredential {
            tag: message.tag,
            registrant: Some(RegistrantLink(proof.link)),
        })
    }

    fn prove_binding(
        &self,
        secret: &SecretCredential,
        statement: &[u8],
    ) -> Result<Vec<u8>, CredentialError> {
        let s = secret_scalar(secret)?;
        let j = tag_generator();
        let tag = (s * j).compress();

        let mut csprng = rand::rngs::OsRng {};
        let nonce = Scalar::random(&mut csprng);
        let commitment = (nonce * j).compress();
        let e = binding_challenge(tag.as_bytes(), commitment.as_bytes(), statement);
        let z = nonce + e * s;

        let mut proof = Vec::with_capacity(64);
        proof.extend_from_slice(commitment.as_bytes());
        proof.extend_from_slice(z.as_bytes());
        Ok(proof)
    }

    fn verify_binding(
        &self,
        tag: &PseudonymousTag,
        statement: &[u8],
        proof: &[u8],
    ) -> Result<(), CredentialError> {
        let malformed = || {
            CredentialError::MalformedProof(format!(
                "binding proof has {} bytes, expected 64",
                proof.len()
            ))
        };
        if proof.len() != 64 {
            return Err(malformed());
        }
        let commitment_bytes: [u8; 32] = proof[..32].try_into().map_err(|_| malformed())?;
        let z_bytes: [u8; 32] = proof[32..].try_into().map_err(|_| malformed())?;

        let commitment = decompress(&commitment_bytes)?;
        let z = canonical_scalar(z_bytes)?;
        let tag_point = decompress(tag.as_bytes())?;

        let e = binding_challenge(tag.as_bytes(), &commitment_bytes, statement);
        if z * tag_generator() == commitment + e * tag_point {
            Ok(())
        } else {
            Err(CredentialError::InvalidBinding)
        }
    }
}

fn sign_ring<R: RngCore + CryptoRng>(
    ring: &Ring,
    signer: usize,
    k: &Scalar,
    statement: &[u8],
    rng: &mut R,
) -> RingProof {
    let n = ring.members.len();
    let link = k * ring.bases[signer];
    let link_bytes = link.compress().to_bytes();

    let mut c = vec![Scalar::zero(); n];
    let mut s = vec![Scalar::zero(); n];

    let alpha = Scalar::random(rng);
    c[(signer + 1) % n] = ring_challenge(
        &ring.digest,
        statement,
        &link_bytes,
        &(&alpha * &RISTRETTO_BASEPOINT_TABLE),
        &(alpha * ring.bases[signer]),
    );

    let mut i = (signer + 1) % n;
    while i != signer {
        s[i] = Scalar::random(rng);
        let l = &s[i] * &RISTRETTO_BASEPOINT_TABLE + c[i] * ring.members[i];
        let r = s[i] * ring.bases[i] + c[i] * link;
        c[(i + 1) % n] = ring_challenge(&ring.digest, statement, &link_bytes, &l, &r);
        i = (i + 1) % n;
    }
    s[signer] = alpha - c[signer] * k;

    RingProof {
        challenge: c[0].to_bytes(),
        responses: s.iter().map(|s| s.to_bytes()).collect(),
        link: link_bytes,
    }
}

fn identity_scalar(private_key: &PrivateKey) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(IDENTITY_DOMAIN);
    hasher.update(private_key.as_bytes());
    Scalar::from_hash(hasher)
}

fn secret_scalar(secret: &SecretCredential) -> Result<Scalar, CredentialError> {
    match Scalar::from_canonical_bytes(*secret.as_bytes()) {
        Some(s) if s != Scalar::zero() => Ok(s),
        _ => Err(CredentialError::MalformedSecret),
    }
}

fn canonical_scalar(bytes: [u8; 32]) -> Result<Scalar, CredentialError> {
    Scalar::from_canonical_bytes(bytes)
        .ok_or_else(|| CredentialError::MalformedProof("non-canonical scalar".to_owned()))
}

fn decompress(bytes: &[u8; 32]) -> Result<RistrettoPoint, CredentialError> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or(CredentialError::InvalidPoint)
}

fn tag_generator() -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(TAG_DOMAIN)
}

fn link_base(member: &[u8; 32]) -> RistrettoPoint {
    let mut input = Vec::with_capacity(LINK_DOMAIN.len() + 32);
    input.extend_from_slice(LINK_DOMAIN);
    input.extend_from_slice(member);
    RistrettoPoint::hash_from_bytes::<Sha512>(&input)
}

/// The message a credential proof signs: the election and the authorised tag
fn credential_statement(params: &ElectionParams, tag: &PseudonymousTag) -> Vec<u8> {
    let mut statement = Vec::with_capacity(STATEMENT_DOMAIN.len() + 16 + 32);
    statement.extend_from_slice(STATEMENT_DOMAIN);
    statement.extend_from_slice(params.id.as_bytes());
    statement.extend_from_slice(tag.as_bytes());
    statement
}

fn ring_challenge(
    ring_digest: &[u8],
    statement: &[u8],
    link: &[u8; 32],
    l: &RistrettoPoint,
    r: &RistrettoPoint,
) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(RING_DOMAIN);
    hasher.update(ring_digest);
    hasher.update(statement);
    hasher.update(link);
    hasher.update(l.compress().as_bytes());
    hasher.update(r.compress().as_bytes());
    Scalar::from_hash(hasher)
}

fn binding_challenge(tag: &[u8; 32], commitment: &[u8; 32], statement: &[u8]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(BINDING_DOMAIN);
    hasher.update(tag);
    hasher.update(commitment);
    hasher.update(statement);
    Scalar::from_hash(hasher)
}
