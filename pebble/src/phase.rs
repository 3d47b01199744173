use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Phases of an election, in the order they occur.
///
/// The phase is never stored. It is recomputed from the clock and the election's
/// boundary timestamps every time it is needed, see
/// [`ElectionParams::phase_at`](crate::ElectionParams::phase_at).
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    /// Voters post anonymous credentials
    CredGen = 1,
    /// Voters post time-locked ballots
    Cast = 2,
    /// Voters reveal VDF solutions, tallies are provisional
    Tally = 3,
    /// Nothing more may be posted, tallies are final
    Closed = 4,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Phase::CredGen => "cred_gen",
            Phase::Cast => "cast",
            Phase::Tally => "tally",
            Phase::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock time
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        ManualClock {
            inner: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let now = self.now();
        self.set(now + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.inner.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
