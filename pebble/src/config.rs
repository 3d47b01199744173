use crate::*;
use std::env::var;
use std::str::FromStr;
use std::time::Duration;

/// Parameters of the built-in VDF backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VdfConfig {
    pub max_difficulty: u64,

    /// Squarings per second assumed when turning a time window into a difficulty
    pub difficulty_conversion: u64,

    pub modulus_bits: usize,
}

impl Default for VdfConfig {
    fn default() -> Self {
        VdfConfig {
            max_difficulty: 1_000_000,
            difficulty_conversion: 10_000,
            modulus_bits: 2048,
        }
    }
}

/// How the difficulty of a new ballot's puzzle is chosen
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPolicy {
    /// Enough work to keep the ballot sealed until the reveal window opens
    UntilTallyStart,

    /// The same difficulty for every ballot in the election
    Fixed(u64),
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        DifficultyPolicy::UntilTallyStart
    }
}

/// Engine configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub vdf: VdfConfig,
    pub difficulty: DifficultyPolicy,

    /// Upper bound on a blocking solve during reveal
    pub solve_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            vdf: VdfConfig::default(),
            difficulty: DifficultyPolicy::default(),
            solve_timeout: Duration::from_secs(600),
        }
    }
}

impl EngineConfig {
    /// Read the configuration from `PEBBLE_*` environment variables, falling back to the defaults
    pub fn from_env() -> Result<Self, Error> {
        let defaults = EngineConfig::default();

        let max_difficulty = match var("PEBBLE_VDF_MAX_DIFFICULTY") {
            Ok(val) => parse("PEBBLE_VDF_MAX_DIFFICULTY", &val)?,
            Err(_e) => defaults.vdf.max_difficulty,
        };

        let difficulty_conversion = match var("PEBBLE_VDF_DIFFICULTY_CONVERSION") {
            Ok(val) => parse("PEBBLE_VDF_DIFFICULTY_CONVERSION", &val)?,
            Err(_e) => defaults.vdf.difficulty_conversion,
        };

        let modulus_bits = match var("PEBBLE_VDF_MODULUS_BITS") {
            Ok(val) => parse("PEBBLE_VDF_MODULUS_BITS", &val)?,
            Err(_e) => defaults.vdf.modulus_bits,
        };

        let difficulty = match var("PEBBLE_FIXED_DIFFICULTY") {
            Ok(val) => DifficultyPolicy::Fixed(parse("PEBBLE_FIXED_DIFFICULTY", &val)?),
            Err(_e) => defaults.difficulty,
        };

        let solve_timeout = match var("PEBBLE_SOLVE_TIMEOUT_SECS") {
            Ok(val) => Duration::from_secs(parse("PEBBLE_SOLVE_TIMEOUT_SECS", &val)?),
            Err(_e) => defaults.solve_timeout,
        };

        Ok(EngineConfig {
            vdf: VdfConfig {
                max_difficulty,
                difficulty_conversion,
                modulus_bits,
            },
            difficulty,
            solve_timeout,
        })
    }
}

fn parse<T>(key: &'static str, val: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| Error::Config {
        key,
        reason: e.to_string(),
    })
}
