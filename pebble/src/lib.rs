#[macro_use]
extern crate serde;

#[macro_use]
mod serde_hex;

mod ballot;
mod channel;
mod config;
mod credential;
mod eligibility;
mod engine;
mod error;
mod method;
mod params;
mod phase;
mod pietrzak;
mod ring;
mod secrets;
mod tally;
mod timelock;
mod util;
mod vdf;

pub use ballot::*;
pub use channel::*;
pub use config::*;
pub use credential::*;
pub use eligibility::*;
pub use engine::*;
pub use error::*;
pub use method::*;
pub use params::*;
pub use phase::*;
pub use pietrzak::*;
pub use ring::*;
pub use secrets::*;
pub use serde_hex::*;
pub use tally::*;
pub use timelock::*;
pub use util::*;
pub use vdf::*;

#[cfg(test)]
mod tests;
