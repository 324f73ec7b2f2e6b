//! Leaderboard derivation.
//!
//! The participant records are the canonical score store; leaderboard
//! arrays in events are always derived here by a stable sort on demand.
//! Ranks are 1-based, ordered by score descending with nickname ascending
//! as the tiebreak. Rank change is previous rank minus new rank, so a
//! positive delta means the player rose.

use std::collections::HashMap;

use crate::protocol::{LeaderboardEntry, TeamStanding};
use crate::room::registry::ParticipantRegistry;

/// Computes the current standings against each participant's
/// `previous_rank` snapshot.
pub fn compute(registry: &ParticipantRegistry) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<&crate::room::registry::Participant> = registry.list().collect();
    rows.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.nickname.cmp(&b.nickname))
    });

    rows.iter()
        .enumerate()
        .map(|(index, participant)| {
            let rank = index + 1;
            let rank_change = participant
                .previous_rank
                .map_or(0, |previous| previous as i64 - rank as i64);
            LeaderboardEntry {
                nickname: participant.nickname.clone(),
                score: participant.score,
                rank,
                rank_change,
                streak: participant.streak,
                team: participant.team.clone(),
            }
        })
        .collect()
}

/// Stores the ranks of `board` back into the registry as the baseline for
/// the next question's rank-change deltas. Called exactly once per
/// transition into Reveal.
pub fn snapshot_ranks(registry: &mut ParticipantRegistry, board: &[LeaderboardEntry]) {
    let ranks: HashMap<&str, usize> = board
        .iter()
        .map(|entry| (entry.nickname.as_str(), entry.rank))
        .collect();
    let nicknames: Vec<String> = registry.list().map(|p| p.nickname.clone()).collect();
    for nickname in nicknames {
        if let Some(rank) = ranks.get(nickname.as_str()) {
            if let Some(participant) = registry.get_mut(&nickname) {
                participant.previous_rank = Some(*rank);
            }
        }
    }
}

/// Team standings: sum of member scores, score descending, team name
/// ascending as tiebreak.
pub fn team_standings(registry: &ParticipantRegistry) -> Vec<TeamStanding> {
    let mut standings: Vec<TeamStanding> = registry
        .teams()
        .into_iter()
        .map(|(team, members)| TeamStanding {
            team: team.to_string(),
            score: members.iter().map(|p| p.score).sum(),
            members: members.len(),
        })
        .collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.team.cmp(&b.team)));
    standings
}
