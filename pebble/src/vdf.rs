use crate::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A time-lock puzzle attached to a ballot.
///
/// The puzzle is public. Solving it takes `difficulty` sequential steps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VdfPuzzle {
    /// Big-endian group modulus
    #[serde(with = "HexForm::<Vec<u8>>")]
    pub modulus: Vec<u8>,

    /// Seed the starting group element is derived from
    #[serde(with = "hex_array")]
    pub input: [u8; 32],

    /// Number of sequential steps
    pub difficulty: u64,
}

/// Result of solving a [`VdfPuzzle`], with a proof that it was computed correctly.
///
/// Solutions are only constructed by a VDF backend. A solution read back from the
/// broadcast log carries no guarantee until it passes [`Vdf::verify`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VdfSolution {
    #[serde(with = "HexForm::<Vec<u8>>")]
    output: Vec<u8>,

    #[serde(with = "hex_list")]
    proof: Vec<Vec<u8>>,
}

impl VdfSolution {
    pub(crate) fn new(output: Vec<u8>, proof: Vec<Vec<u8>>) -> Self {
        VdfSolution { output, proof }
    }

    /// The final group element
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Intermediate values making up the proof
    pub fn proof(&self) -> &[Vec<u8>] {
        &self.proof
    }
}

/// Verifiable delay function capability
pub trait Vdf: Send + Sync {
    fn name(&self) -> &str;

    /// Highest difficulty this backend will lock, solve or verify
    fn max_difficulty(&self) -> u64;

    /// The difficulty that takes roughly `window` to solve, clamped to `1..=max_difficulty`
    fn difficulty_for(&self, window: Duration) -> u64;

    /// Create a puzzle for `input` and the symmetric key its solution will unlock.
    ///
    /// The caller gets the key immediately. Everyone else has to solve the puzzle.
    fn lock(&self, input: &[u8], difficulty: u64) -> Result<(VdfPuzzle, TimeLockKey), VdfError>;

    /// Sequentially solve `puzzle`, giving up as soon as `cancel` fires
    fn solve(&self, puzzle: &VdfPuzzle, cancel: &CancelToken) -> Result<VdfSolution, VdfError>;

    /// Check a claimed solution. Costs far less than solving.
    fn verify(&self, puzzle: &VdfPuzzle, solution: &VdfSolution) -> Result<(), VdfError>;

    fn is_valid(&self, puzzle: &VdfPuzzle, solution: &VdfSolution) -> bool {
        self.verify(puzzle, solution).is_ok()
    }

    /// Verify `solution` and derive the key it unlocks
    fn unlock(&self, puzzle: &VdfPuzzle, solution: &VdfSolution) -> Result<TimeLockKey, VdfError> {
        self.verify(puzzle, solution)?;
        Ok(derive_key(puzzle, solution.output()))
    }
}

/// Cooperative cancellation flag shared with a solver
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A VDF solve running on its own thread.
///
/// Dropping the handle cancels the solve.
pub struct SolveHandle {
    puzzle: VdfPuzzle,
    cancel: CancelToken,
    receiver: mpsc::Receiver<Result<VdfSolution, VdfError>>,
}

/// Start solving `puzzle` on a background thread
pub fn solve_in_background(vdf: Arc<dyn Vdf>, puzzle: VdfPuzzle) -> SolveHandle {
    let cancel = CancelToken::new();
    let (sender, receiver) = mpsc::channel();

    let worker_puzzle = puzzle.clone();
    let worker_cancel = cancel.clone();
    thread::spawn(move || {
        let result = vdf.solve(&worker_puzzle, &worker_cancel);

        // The handle may be gone already, nobody is waiting in that case
        let _ = sender.send(result);
    });

    SolveHandle {
        puzzle,
        cancel,
        receiver,
    }
}

impl SolveHandle {
    pub fn puzzle(&self) -> &VdfPuzzle {
        &self.puzzle
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The result, if the solver has finished
    pub fn try_result(&self) -> Option<Result<VdfSolution, VdfError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(VdfError::WorkerFailed)),
        }
    }

    /// Block until the solver finishes. With a timeout, the solve is cancelled when it expires.
    pub fn wait(self, timeout: Option<Duration>) -> Result<VdfSolution, VdfError> {
        match timeout {
            None => self.receiver.recv().unwrap_or(Err(VdfError::WorkerFailed)),
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    self.cancel.cancel();
                    Err(VdfError::Timeout(timeout))
                }
                Err(RecvTimeoutError::Disconnected) => Err(VdfError::WorkerFailed),
            },
        }
    }
}

impl Drop for SolveHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_tokens_are_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn solution_json_is_hex() {
        let solution = VdfSolution::new(vec![0xab, 0xcd], vec![vec![1], vec![2, 3]]);
        let json = serde_json::to_value(&solution).unwrap();
        assert_eq!(json["output"], "abcd");
        assert_eq!(json["proof"][1], "0203");

        let back: VdfSolution = serde_json::from_value(json).unwrap();
        assert_eq!(back, solution);
    }
}
