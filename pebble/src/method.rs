use crate::*;
use indexmap::IndexMap;

/// A counting method, selected by name in the election parameters.
///
/// Implementations must be deterministic and must not depend on the order of `votes`.
pub trait VotingMethod: Send + Sync {
    fn name(&self) -> &str;

    /// Count `votes`, each an index into `choices`
    fn tally(&self, choices: &[String], votes: &[u32]) -> TallyResult;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RankedChoice {
    pub choice: String,

    /// Zero-based. Tied choices share a rank.
    pub rank: usize,

    pub votes: u64,
}

/// Output of a voting method
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    pub method: String,
    pub num_votes: usize,

    /// Votes per choice, in choice order, zeros included
    pub totals: IndexMap<String, u64>,

    /// Choices from most to fewest votes
    pub ranking: Vec<RankedChoice>,

    /// All choices tied for first place, empty when nobody voted
    pub winners: Vec<String>,
}

/// First-past-the-post counting
#[derive(Default, Debug, Clone, Copy)]
pub struct Plurality;

impl VotingMethod for Plurality {
    fn name(&self) -> &str {
        "plurality"
    }

    fn tally(&self, choices: &[String], votes: &[u32]) -> TallyResult {
        use tallystick::plurality::DefaultPluralityTally;
        let mut tally = DefaultPluralityTally::new(1);

        for vote in votes {
            let index = *vote as usize;
            if index < choices.len() {
                tally.add(index);
            }
        }

        let mut counts = vec![0u64; choices.len()];
        for (index, total) in tally.totals() {
            counts[index] = total;
        }

        let totals: IndexMap<String, u64> = choices
            .iter()
            .cloned()
            .zip(counts.iter().copied())
            .collect();

        let mut order: Vec<usize> = (0..choices.len()).collect();
        order.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
        let ranking = order
            .iter()
            .map(|&index| RankedChoice {
                choice: choices[index].clone(),
                rank: counts.iter().filter(|&&c| c > counts[index]).count(),
                votes: counts[index],
            })
            .collect();

        let max = counts.iter().copied().max().unwrap_or(0);
        let winners = if max == 0 {
            vec![]
        } else {
            choices
                .iter()
                .zip(counts.iter())
                .filter(|(_, count)| **count == max)
                .map(|(choice, _)| choice.clone())
                .collect()
        };

        TallyResult {
            method: self.name().to_owned(),
            num_votes: counts.iter().sum::<u64>() as usize,
            totals,
            ranking,
            winners,
        }
    }
}

/// Look up a voting method by its (case-insensitive) name
pub fn voting_method(name: &str) -> Result<Box<dyn VotingMethod>, Error> {
    match name.to_ascii_lowercase().as_str() {
        "plurality" => Ok(Box::new(Plurality)),
        _ => Err(Error::UnknownVotingMethod(name.to_owned())),
    }
}
