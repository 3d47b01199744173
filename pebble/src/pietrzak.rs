//! Repeated squaring in an RSA group, with Pietrzak's halving proof.
//!
//! Every puzzle carries its own modulus. The voter who locks a ballot knows the
//! factorisation and computes `x^(2^T)` through the group order, everyone else
//! has to perform `T` sequential squarings. Solvers publish the result with a
//! proof of `log2(T)` group elements that anybody can check with a few
//! exponentiations.

use crate::*;
use num_bigint_dig::{BigUint, RandPrime};
use num_traits::{One, Zero};
use sha2::{Digest, Sha256, Sha512};
use std::time::Duration;

const BASE_DOMAIN: &[u8] = b"pebble vdf base v1";
const CHALLENGE_DOMAIN: &[u8] = b"pebble vdf challenge v1";
const SEED_DOMAIN: &[u8] = b"pebble vdf seed v1";

/// How many squarings run between two looks at the cancel token
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Smallest modulus accepted
pub const MIN_MODULUS_BITS: usize = 256;

/// RSA-group time-lock VDF with a Pietrzak proof
#[derive(Debug, Clone)]
pub struct PietrzakVdf {
    max_difficulty: u64,

    /// Squarings per second on the reference machine
    difficulty_conversion: u64,

    modulus_bits: usize,
}

impl Default for PietrzakVdf {
    fn default() -> Self {
        PietrzakVdf {
            max_difficulty: 1_000_000,
            difficulty_conversion: 10_000,
            modulus_bits: 2048,
        }
    }
}

impl PietrzakVdf {
    pub fn new(
        max_difficulty: u64,
        difficulty_conversion: u64,
        modulus_bits: usize,
    ) -> Result<Self, Error> {
        if max_difficulty == 0 {
            return Err(Error::InvalidParams(
                "vdf max difficulty must be positive".to_owned(),
            ));
        }
        if modulus_bits < MIN_MODULUS_BITS {
            return Err(Error::InvalidParams(format!(
                "vdf modulus must have at least {} bits",
                MIN_MODULUS_BITS
            )));
        }
        Ok(PietrzakVdf {
            max_difficulty,
            difficulty_conversion,
            modulus_bits,
        })
    }

    pub fn from_config(config: &VdfConfig) -> Result<Self, Error> {
        Self::new(
            config.max_difficulty,
            config.difficulty_conversion,
            config.modulus_bits,
        )
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    fn check_difficulty(&self, difficulty: u64) -> Result<(), VdfError> {
        if difficulty == 0 {
            return Err(VdfError::InvalidPuzzle("difficulty must be positive".to_owned()));
        }
        if difficulty > self.max_difficulty {
            return Err(VdfError::DifficultyTooHigh {
                difficulty,
                max: self.max_difficulty,
            });
        }
        Ok(())
    }

    /// The group a puzzle lives in, after checking the puzzle is one this backend accepts
    fn group(&self, puzzle: &VdfPuzzle) -> Result<Group, VdfError> {
        self.check_difficulty(puzzle.difficulty)?;

        let n = BigUint::from_bytes_be(&puzzle.modulus);
        if n.bits() != self.modulus_bits {
            return Err(VdfError::InvalidPuzzle(format!(
                "modulus has {} bits, expected {}",
                n.bits(),
                self.modulus_bits
            )));
        }
        if puzzle.modulus.last().map_or(true, |byte| byte & 1 == 0) {
            return Err(VdfError::InvalidPuzzle("modulus is even".to_owned()));
        }

        Ok(Group::new(n))
    }

    fn generate_modulus(&self) -> (BigUint, BigUint) {
        let mut rng = rand::rngs::OsRng {};
        let p_bits = self.modulus_bits / 2;
        let q_bits = self.modulus_bits - p_bits;
        loop {
            let p: BigUint = rng.gen_prime(p_bits);
            let q: BigUint = rng.gen_prime(q_bits);
            if p == q {
                continue;
            }
            let n = &p * &q;
            if n.bits() == self.modulus_bits {
                let phi = (&p - BigUint::one()) * (&q - BigUint::one());
                return (n, phi);
            }
        }
    }
}

impl Vdf for PietrzakVdf {
    fn name(&self) -> &str {
        "pietrzak-rsa"
    }

    fn max_difficulty(&self) -> u64 {
        self.max_difficulty
    }

    fn difficulty_for(&self, window: Duration) -> u64 {
        let steps = window.as_millis() * self.difficulty_conversion as u128 / 1000;
        steps.max(1).min(self.max_difficulty as u128) as u64
    }

    fn lock(&self, input: &[u8], difficulty: u64) -> Result<(VdfPuzzle, TimeLockKey), VdfError> {
        self.check_difficulty(difficulty)?;

        let (n, phi) = self.generate_modulus();
        let puzzle = VdfPuzzle {
            modulus: n.to_bytes_be(),
            input: sha256(&[SEED_DOMAIN, input]),
            difficulty,
        };

        // Shortcut through the group order: x^(2^T) = x^(2^T mod phi)
        let group = Group::new(n);
        let x = group.base(&puzzle.input);
        let exponent = BigUint::from(2u32).modpow(&BigUint::from(difficulty), &phi);
        let y = x.modpow(&exponent, &group.n);

        let key = derive_key(&puzzle, &group.encode(&y));
        Ok((puzzle, key))
    }

    fn solve(&self, puzzle: &VdfPuzzle, cancel: &CancelToken) -> Result<VdfSolution, VdfError> {
        let group = self.group(puzzle)?;
        let t = puzzle.difficulty;
        let x = group.base(&puzzle.input);

        // The first halving round needs the value at this step of the chain
        let mid_step = t - t / 2;
        let mut mid = None;
        let mut y = x.clone();
        for step in 1..=t {
            if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(VdfError::Cancelled);
            }
            y = group.square(&y);
            if step == mid_step {
                mid = Some(y.clone());
            }
        }

        let proof = group.prove(x, y.clone(), t, mid, cancel)?;
        Ok(VdfSolution::new(group.encode(&y), proof))
    }

    fn verify(&self, puzzle: &VdfPuzzle, solution: &VdfSolution) -> Result<(), VdfError> {
        let group = self.group(puzzle)?;
        let mut x = group.base(&puzzle.input);
        let mut y = group.decode(solution.output())?;
        let mut t = puzzle.difficulty;
        let mut proof = solution.proof().iter();

        while t > 0 {
            if t % 2 == 1 {
                x = group.square(&x);
                t -= 1;
                continue;
            }
            let mu = group.decode(proof.next().ok_or(VdfError::Unverifiable)?)?;
            let r = group.challenge(&x, &y, &mu, t);
            x = (x.modpow(&r, &group.n) * &mu) % &group.n;
            y = (mu.modpow(&r, &group.n) * &y) % &group.n;
            t /= 2;
        }

        if proof.next().is_some() || x != y {
            return Err(VdfError::Unverifiable);
        }
        Ok(())
    }
}

/// The multiplicative group modulo one puzzle's modulus
struct Group {
    n: BigUint,

    /// Byte length every element is encoded with
    len: usize,
}

impl Group {
    fn new(n: BigUint) -> Self {
        let len = (n.bits() + 7) / 8;
        Group { n, len }
    }

    fn encode(&self, value: &BigUint) -> Vec<u8> {
        let bytes = value.to_bytes_be();
        let mut out = vec![0u8; self.len.saturating_sub(bytes.len())];
        out.extend(bytes);
        out
    }

    fn decode(&self, bytes: &[u8]) -> Result<BigUint, VdfError> {
        if bytes.len() != self.len {
            return Err(VdfError::Unverifiable);
        }
        let value = BigUint::from_bytes_be(bytes);
        if value.is_zero() || value >= self.n {
            return Err(VdfError::Unverifiable);
        }
        Ok(value)
    }

    /// Starting element, expanded from the puzzle seed
    fn base(&self, seed: &[u8; 32]) -> BigUint {
        let mut bytes = Vec::with_capacity(self.len + 64);
        let mut counter: u32 = 0;
        while bytes.len() < self.len + 16 {
            let mut hasher = Sha512::new();
            hasher.update(BASE_DOMAIN);
            hasher.update(seed);
            hasher.update(&counter.to_be_bytes());
            bytes.extend_from_slice(&hasher.finalize());
            counter += 1;
        }

        let x = BigUint::from_bytes_be(&bytes) % &self.n;
        if x < BigUint::from(2u32) {
            x + BigUint::from(2u32)
        } else {
            x
        }
    }

    fn square(&self, value: &BigUint) -> BigUint {
        (value * value) % &self.n
    }

    fn repeated_square(
        &self,
        value: &BigUint,
        steps: u64,
        cancel: &CancelToken,
    ) -> Result<BigUint, VdfError> {
        let mut value = value.clone();
        for step in 1..=steps {
            if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(VdfError::Cancelled);
            }
            value = self.square(&value);
        }
        Ok(value)
    }

    /// Fiat-Shamir challenge for one halving round
    fn challenge(&self, x: &BigUint, y: &BigUint, mu: &BigUint, t: u64) -> BigUint {
        let mut hasher = Sha256::new();
        hasher.update(CHALLENGE_DOMAIN);
        hasher.update(&self.encode(x));
        hasher.update(&self.encode(y));
        hasher.update(&self.encode(mu));
        hasher.update(&t.to_be_bytes());
        let digest = hasher.finalize();
        BigUint::from_bytes_be(&digest[..16])
    }

    /// Halving proof for `y = x^(2^t)`. `mid` is the chain value for the first round.
    fn prove(
        &self,
        mut x: BigUint,
        mut y: BigUint,
        mut t: u64,
        mut mid: Option<BigUint>,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<u8>>, VdfError> {
        let mut proof = Vec::new();
        while t > 0 {
            if t % 2 == 1 {
                x = self.square(&x);
                t -= 1;
                continue;
            }
            let half = t / 2;
            let mu = match mid.take() {
                Some(mu) => mu,
                None => self.repeated_square(&x, half, cancel)?,
            };
            let r = self.challenge(&x, &y, &mu, t);
            x = (x.modpow(&r, &self.n) * &mu) % &self.n;
            y = (mu.modpow(&r, &self.n) * &y) % &self.n;
            proof.push(self.encode(&mu));
            t = half;
        }
        Ok(proof)
    }
}
