//! Per-room participant registry.
//!
//! One record per nickname, kept in insertion order. Records survive
//! disconnects; only room destruction or a reset removes game progress.
//! At most one live connection per record: a second join under the same
//! nickname displaces the first (last-one-wins takeover).

use std::collections::{BTreeMap, HashMap};

use crate::protocol::{ConnectionId, ParticipantInfo, PowerUp};

/// One-shot power-ups still available to a player this game.
#[derive(Debug, Clone, Copy)]
pub struct PowerUpInventory {
    pub double_points: bool,
    pub fifty_fifty: bool,
}

impl Default for PowerUpInventory {
    fn default() -> Self {
        Self {
            double_points: true,
            fifty_fifty: true,
        }
    }
}

impl PowerUpInventory {
    pub fn has(&self, power_up: PowerUp) -> bool {
        match power_up {
            PowerUp::DoublePoints => self.double_points,
            PowerUp::FiftyFifty => self.fifty_fifty,
        }
    }

    /// Returns false if the power-up was already consumed.
    pub fn consume(&mut self, power_up: PowerUp) -> bool {
        let slot = match power_up {
            PowerUp::DoublePoints => &mut self.double_points,
            PowerUp::FiftyFifty => &mut self.fifty_fifty,
        };
        std::mem::replace(slot, false)
    }
}

/// A scoring participant.
#[derive(Debug)]
pub struct Participant {
    pub nickname: String,
    pub avatar: String,
    pub team: Option<String>,
    pub score: u32,
    /// Consecutive correct answers ending at the most recent question.
    pub streak: u32,
    pub power_ups: PowerUpInventory,
    /// Multiplier applied to the current question's answer; reset to 1.0
    /// at every question start.
    pub multiplier: f64,
    /// Rank as of the last transition into Reveal; used for rank-change
    /// deltas.
    pub previous_rank: Option<usize>,
    /// Live connection currently serving this participant, if any.
    pub conn: Option<ConnectionId>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Participant {
    fn new(nickname: String, avatar: String, team: Option<String>, conn: ConnectionId) -> Self {
        Self {
            nickname,
            avatar,
            team,
            score: 0,
            streak: 0,
            power_ups: PowerUpInventory::default(),
            multiplier: 1.0,
            previous_rank: None,
            conn: Some(conn),
            joined_at: chrono::Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
            team: self.team.clone(),
            connected: self.is_connected(),
            joined_at: self.joined_at,
        }
    }
}

/// Outcome of an upsert.
#[derive(Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First join under this nickname.
    New,
    /// The nickname existed with no live connection; record re-attached.
    Reconnected,
    /// The nickname had a live connection; it must be kicked and closed.
    Displaced { old_conn: ConnectionId },
}

/// Maps nickname -> participant record, preserving insertion order.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    by_nickname: HashMap<String, Participant>,
    /// Join order; drives roster listings and stable iteration.
    order: Vec<String>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or re-attaches the record for `nickname`.
    ///
    /// On rejoin the avatar and team are refreshed from the new `JOIN`
    /// (clients treat them as profile fields), but score, streak, and
    /// power-up consumption always carry over.
    pub fn upsert(
        &mut self,
        nickname: &str,
        avatar: String,
        team: Option<String>,
        conn: ConnectionId,
    ) -> UpsertOutcome {
        if let Some(existing) = self.by_nickname.get_mut(nickname) {
            let old_conn = existing.conn.replace(conn);
            existing.avatar = avatar;
            existing.team = team;
            return match old_conn {
                Some(old_conn) => UpsertOutcome::Displaced { old_conn },
                None => UpsertOutcome::Reconnected,
            };
        }

        self.by_nickname.insert(
            nickname.to_string(),
            Participant::new(nickname.to_string(), avatar, team, conn),
        );
        self.order.push(nickname.to_string());
        UpsertOutcome::New
    }

    /// Marks the participant served by `conn` as disconnected and returns
    /// its nickname. A close from a superseded connection matches nothing
    /// (the record already points at the newer connection) and is a no-op.
    pub fn detach(&mut self, conn: ConnectionId) -> Option<String> {
        let participant = self
            .by_nickname
            .values_mut()
            .find(|p| p.conn == Some(conn))?;
        participant.conn = None;
        Some(participant.nickname.clone())
    }

    /// Removes the record entirely (explicit kick, not disconnect).
    pub fn remove(&mut self, nickname: &str) -> Option<Participant> {
        let participant = self.by_nickname.remove(nickname)?;
        self.order.retain(|n| n != nickname);
        Some(participant)
    }

    pub fn get(&self, nickname: &str) -> Option<&Participant> {
        self.by_nickname.get(nickname)
    }

    pub fn get_mut(&mut self, nickname: &str) -> Option<&mut Participant> {
        self.by_nickname.get_mut(nickname)
    }

    /// Nickname of the participant currently served by `conn`.
    pub fn nickname_for(&self, conn: ConnectionId) -> Option<&str> {
        self.by_nickname
            .values()
            .find(|p| p.conn == Some(conn))
            .map(|p| p.nickname.as_str())
    }

    /// Participants in join order.
    pub fn list(&self) -> impl Iterator<Item = &Participant> {
        self.order
            .iter()
            .filter_map(move |nickname| self.by_nickname.get(nickname))
    }

    pub fn roster(&self) -> Vec<ParticipantInfo> {
        self.list().map(Participant::info).collect()
    }

    pub fn len(&self) -> usize {
        self.by_nickname.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nickname.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.by_nickname
            .values()
            .filter(|p| p.is_connected())
            .count()
    }

    /// Resets every multiplier to 1.0 (question start).
    pub fn reset_multipliers(&mut self) {
        for participant in self.by_nickname.values_mut() {
            participant.multiplier = 1.0;
        }
    }

    /// Clears game progress for a replay: scores, streaks, power-up
    /// consumption, multipliers, and rank history. Connections, avatars,
    /// and team tags are kept.
    pub fn reset_for_replay(&mut self) {
        for participant in self.by_nickname.values_mut() {
            participant.score = 0;
            participant.streak = 0;
            participant.power_ups = PowerUpInventory::default();
            participant.multiplier = 1.0;
            participant.previous_rank = None;
        }
    }

    /// Participants grouped by team, teams sorted by name. Untagged
    /// participants are not part of any team.
    pub fn teams(&self) -> BTreeMap<&str, Vec<&Participant>> {
        let mut teams: BTreeMap<&str, Vec<&Participant>> = BTreeMap::new();
        for participant in self.list() {
            if let Some(team) = participant.team.as_deref() {
                teams.entry(team).or_default().push(participant);
            }
        }
        teams
    }
}
