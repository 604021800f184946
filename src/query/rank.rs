//! Candidate ordering.
//!
//! Scores within [`SCORE_EPSILON`] of each other are treated as tied. Ties are
//! resolved by clustering the score-sorted list and re-sorting on
//! `(cluster, tie key)`, which keeps the comparator a total order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{CandidateKind, QueryCandidate};

/// Scores closer than this are tied.
pub const SCORE_EPSILON: f64 = 1e-8;

/// How candidates are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankPolicy {
    /// Descending score; ties put Full first.
    #[default]
    Belief,
    /// Action, then Object, then Full; descending score within each group.
    Count,
    /// Random order.
    Unranked,
}

/// How tied Action and Object candidates are ordered under [`RankPolicy::Belief`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// One coin flip per sort decides whether Action or Object candidates lead.
    #[default]
    Random,
    /// Alphabetical by question text.
    ByName,
}

/// Orders candidate lists. Owns the RNG used for tie-breaks and shuffling.
#[derive(Debug, Clone)]
pub struct QueryRanker {
    policy: RankPolicy,
    tie_break: TieBreak,
    rng: StdRng,
}

impl QueryRanker {
    pub fn new(policy: RankPolicy, tie_break: TieBreak, rng: StdRng) -> Self {
        Self {
            policy,
            tie_break,
            rng,
        }
    }

    /// Ranker with a deterministic RNG.
    pub fn seeded(policy: RankPolicy, tie_break: TieBreak, seed: u64) -> Self {
        Self::new(policy, tie_break, StdRng::seed_from_u64(seed))
    }

    pub fn policy(&self) -> RankPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RankPolicy) {
        self.policy = policy;
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Order `candidates` in place under the configured policy.
    pub fn rank(&mut self, candidates: &mut Vec<QueryCandidate>) {
        self.rank_with(self.policy, candidates);
    }

    /// Order `candidates` in place under an explicit policy.
    pub fn rank_with(&mut self, policy: RankPolicy, candidates: &mut Vec<QueryCandidate>) {
        match policy {
            RankPolicy::Belief => self.rank_by_belief(candidates),
            RankPolicy::Count => rank_by_count(candidates),
            RankPolicy::Unranked => candidates.shuffle(&mut self.rng),
        }
        tracing::debug!(
            ?policy,
            candidates = candidates.len(),
            "candidates ranked"
        );
    }

    fn rank_by_belief(&mut self, candidates: &mut Vec<QueryCandidate>) {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        let clusters = epsilon_clusters(candidates, |_, _| true);

        let action_first = match self.tie_break {
            TieBreak::Random => self.rng.gen_bool(0.5),
            TieBreak::ByName => true,
        };
        let by_name = self.tie_break == TieBreak::ByName;

        let mut keyed: Vec<(usize, u8, String, QueryCandidate)> = candidates
            .drain(..)
            .zip(clusters)
            .map(|(c, cluster)| {
                let rank = match (c.kind(), by_name, action_first) {
                    (CandidateKind::Full, _, _) => 0,
                    (_, true, _) => 1,
                    (CandidateKind::Action, false, true) | (CandidateKind::Object, false, false) => 1,
                    _ => 2,
                };
                let name = if by_name && !c.is_full() {
                    c.question()
                } else {
                    String::new()
                };
                (cluster, rank, name, c)
            })
            .collect();
        keyed.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        candidates.extend(keyed.into_iter().map(|(_, _, _, c)| c));
    }
}

fn group(kind: CandidateKind) -> u8 {
    match kind {
        CandidateKind::Action => 0,
        CandidateKind::Object => 1,
        CandidateKind::Full => 2,
    }
}

fn rank_by_count(candidates: &mut Vec<QueryCandidate>) {
    let mut keyed: Vec<(usize, QueryCandidate)> = candidates.drain(..).enumerate().collect();
    keyed.sort_by(|(_, a), (_, b)| {
        group(a.kind())
            .cmp(&group(b.kind()))
            .then(b.score.total_cmp(&a.score))
    });

    let sorted: Vec<QueryCandidate> = keyed.iter().map(|(_, c)| c.clone()).collect();
    let clusters = epsilon_clusters(&sorted, |a, b| a.kind() == b.kind());

    let mut keyed: Vec<(usize, usize, QueryCandidate)> = keyed
        .into_iter()
        .zip(clusters)
        .map(|((pos, c), cluster)| (cluster, pos, c))
        .collect();
    keyed.sort_by_key(|&(cluster, pos, _)| (cluster, pos));
    candidates.extend(keyed.into_iter().map(|(_, _, c)| c));
}

/// Assign cluster numbers to a score-sorted list. A new cluster starts when a
/// score falls more than [`SCORE_EPSILON`] below the cluster's first score or
/// when `same_group` rejects the pair.
fn epsilon_clusters(
    sorted: &[QueryCandidate],
    same_group: impl Fn(&QueryCandidate, &QueryCandidate) -> bool,
) -> Vec<usize> {
    let mut clusters = Vec::with_capacity(sorted.len());
    let mut cluster = 0;
    let mut anchor: Option<&QueryCandidate> = None;
    for c in sorted {
        match anchor {
            Some(a) if same_group(a, c) && (a.score - c.score).abs() <= SCORE_EPSILON => {}
            Some(_) => {
                cluster += 1;
                anchor = Some(c);
            }
            None => anchor = Some(c),
        }
        clusters.push(cluster);
    }
    clusters
}
