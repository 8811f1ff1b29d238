//! Local mirror of every player in the game.
//!
//! The player on this device is modeled separately as [`SelfPlayer`]; every
//! other participant lives in an id-keyed map. The self id is never used as
//! a key in that map.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::protocol::{PlayerId, PlayerInfo, Team};

/// The player on this device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfPlayer {
    pub id: Option<PlayerId>,
    pub session_token: Option<String>,
    pub name: String,
    pub team: Team,
    pub is_ready: bool,
}

/// A remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherPlayer {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub is_ready: bool,
    pub connected: bool,
}

impl OtherPlayer {
    /// A freshly joined player: unassigned, not ready, connected.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: Team::Unassigned,
            is_ready: false,
            connected: true,
        }
    }
}

impl From<PlayerInfo> for OtherPlayer {
    fn from(info: PlayerInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            team: info.team,
            is_ready: info.is_ready,
            connected: info.connected,
        }
    }
}

/// One row of the ordered player listing handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: Option<PlayerId>,
    pub name: String,
    pub team: Team,
    pub is_ready: bool,
    pub connected: bool,
    pub is_self: bool,
}

/// Immutable view of the roster, published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSnapshot {
    /// Self first, then everyone else sorted by name.
    pub players: Vec<RosterEntry>,
}

impl RosterSnapshot {
    /// Entries on `team`, in listing order.
    pub fn team(&self, team: Team) -> impl Iterator<Item = &RosterEntry> {
        self.players.iter().filter(move |p| p.team == team)
    }
}

#[derive(Debug, Default)]
pub struct Roster {
    me: SelfPlayer,
    others: HashMap<PlayerId, OtherPlayer>,
}

impl Roster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            me: SelfPlayer {
                name: name.into(),
                ..SelfPlayer::default()
            },
            others: HashMap::new(),
        }
    }

    pub fn me(&self) -> &SelfPlayer {
        &self.me
    }

    pub fn other(&self, id: &str) -> Option<&OtherPlayer> {
        self.others.get(id)
    }

    pub fn others_len(&self) -> usize {
        self.others.len()
    }

    fn is_self(&self, id: &str) -> bool {
        self.me.id.as_deref() == Some(id)
    }

    // ── Self player ─────────────────────────────────────────────────

    /// Assign the server-issued id. A remote entry under the same id is
    /// folded away so the self id never appears in the map.
    pub fn set_player_id(&mut self, id: impl Into<PlayerId>) {
        let id = id.into();
        self.others.remove(&id);
        self.me.id = Some(id);
    }

    pub fn set_session_token(&mut self, token: impl Into<String>) {
        self.me.session_token = Some(token.into());
    }

    pub fn clear_session_data(&mut self) {
        self.me.id = None;
        self.me.session_token = None;
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.me.name = name.into();
    }

    pub fn set_self_ready(&mut self, is_ready: bool) {
        self.me.is_ready = is_ready;
    }

    /// Set the self team as announced by a resume handshake.
    pub fn set_self_team(&mut self, team: Team) {
        if self.me.team != team {
            self.me.is_ready = false;
        }
        self.me.team = team;
    }

    // ── Other players ───────────────────────────────────────────────

    /// Replace every remote player with `players`, skipping self.
    pub fn set_players(&mut self, players: impl IntoIterator<Item = OtherPlayer>) {
        let others = players
            .into_iter()
            .filter(|p| !self.is_self(&p.id))
            .map(|p| (p.id.clone(), p))
            .collect();
        self.others = others;
    }

    /// Insert (or replace) a remote player. Returns `false` for the self id.
    pub fn add_player(&mut self, player: OtherPlayer) -> bool {
        if self.is_self(&player.id) {
            debug!(player_id = %player.id, "ignoring add of self as remote player");
            return false;
        }
        self.others.insert(player.id.clone(), player);
        true
    }

    pub fn remove_player(&mut self, id: &str) -> Option<OtherPlayer> {
        self.others.remove(id)
    }

    /// Change a player's team. The ready flag is always cleared.
    ///
    /// Returns `false` if the id is unknown.
    pub fn set_player_team(&mut self, id: &str, team: Team) -> bool {
        if self.is_self(id) {
            self.me.team = team;
            self.me.is_ready = false;
            return true;
        }
        match self.others.get_mut(id) {
            Some(player) => {
                player.team = team;
                player.is_ready = false;
                true
            }
            None => {
                debug!(player_id = %id, "team change for unknown player");
                false
            }
        }
    }

    /// Returns `false` if the id is unknown.
    pub fn set_player_ready(&mut self, id: &str, is_ready: bool) -> bool {
        if self.is_self(id) {
            self.me.is_ready = is_ready;
            return true;
        }
        match self.others.get_mut(id) {
            Some(player) => {
                player.is_ready = is_ready;
                true
            }
            None => {
                debug!(player_id = %id, "ready change for unknown player");
                false
            }
        }
    }

    /// Returns `false` if the id is unknown or belongs to self.
    pub fn set_player_connected(&mut self, id: &str, connected: bool) -> bool {
        match self.others.get_mut(id) {
            Some(player) => {
                player.connected = connected;
                true
            }
            None => {
                debug!(player_id = %id, connected, "connection change for unknown player");
                false
            }
        }
    }

    /// Returns `false` if the id is unknown.
    pub fn rename_player(&mut self, id: &str, name: impl Into<String>) -> bool {
        if self.is_self(id) {
            self.me.name = name.into();
            return true;
        }
        match self.others.get_mut(id) {
            Some(player) => {
                player.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Return everyone to the lobby defaults and drop remote players that
    /// are not in `retained`.
    pub fn reset_player_teams<'a>(&mut self, retained: impl IntoIterator<Item = &'a str>) {
        let retained: HashSet<&str> = retained.into_iter().collect();
        self.others.retain(|id, _| retained.contains(id.as_str()));
        self.reset_all_teams();
    }

    /// Like [`reset_player_teams`](Self::reset_player_teams) but keeps every
    /// remote player.
    pub fn reset_all_teams(&mut self) {
        self.me.team = Team::Unassigned;
        self.me.is_ready = false;
        for player in self.others.values_mut() {
            player.team = Team::Unassigned;
            player.is_ready = false;
        }
    }

    /// Name of self or a known remote player. `None` is a normal outcome.
    pub fn get_player_name(&self, id: &str) -> Option<&str> {
        if self.is_self(id) {
            return Some(&self.me.name);
        }
        self.others.get(id).map(|p| p.name.as_str())
    }

    /// Self first, then the others ordered by name (ties broken by id).
    pub fn ordered(&self) -> Vec<RosterEntry> {
        let mut others: Vec<&OtherPlayer> = self.others.values().collect();
        others.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let me = RosterEntry {
            id: self.me.id.clone(),
            name: self.me.name.clone(),
            team: self.me.team,
            is_ready: self.me.is_ready,
            connected: true,
            is_self: true,
        };
        std::iter::once(me)
            .chain(others.into_iter().map(|p| RosterEntry {
                id: Some(p.id.clone()),
                name: p.name.clone(),
                team: p.team,
                is_ready: p.is_ready,
                connected: p.connected,
                is_self: false,
            }))
            .collect()
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            players: self.ordered(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn roster_with_self() -> Roster {
        let mut roster = Roster::new("Me");
        roster.set_player_id("me");
        roster
    }

    fn names(roster: &Roster) -> Vec<String> {
        roster.ordered().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn self_never_enters_the_map() {
        let mut roster = roster_with_self();
        assert!(!roster.add_player(OtherPlayer::new("me", "Impostor")));
        roster.add_player(OtherPlayer::new("b", "Bob"));
        roster.set_players(vec![
            OtherPlayer::new("me", "Me"),
            OtherPlayer::new("c", "Cy"),
        ]);
        roster.remove_player("zz");

        assert!(roster.other("me").is_none());
        assert_eq!(roster.others_len(), 1);
        assert_eq!(names(&roster), vec!["Me", "Cy"]);
    }

    #[test]
    fn late_id_assignment_folds_remote_entry() {
        let mut roster = Roster::new("Me");
        roster.add_player(OtherPlayer::new("me", "Me"));
        roster.set_player_id("me");
        assert!(roster.other("me").is_none());
    }

    #[test]
    fn listing_is_self_first_then_sorted_by_name() {
        let mut roster = roster_with_self();
        roster.set_player_name("Zed");
        for (id, name) in [("3", "carol"), ("1", "Bob"), ("2", "Alice"), ("4", "alice")] {
            roster.add_player(OtherPlayer::new(id, name));
        }
        let listing = roster.ordered();
        assert!(listing[0].is_self);
        assert_eq!(names(&roster), vec!["Zed", "Alice", "Bob", "alice", "carol"]);
    }

    #[test]
    fn listing_order_does_not_depend_on_arrival() {
        let mut a = roster_with_self();
        let mut b = roster_with_self();
        let players = [("1", "Dana"), ("2", "Dana"), ("3", "Eve")];
        for (id, name) in players {
            a.add_player(OtherPlayer::new(id, name));
        }
        for (id, name) in players.iter().rev() {
            b.add_player(OtherPlayer::new(*id, *name));
        }
        assert_eq!(a.ordered(), b.ordered());
    }

    #[test]
    fn team_change_always_clears_ready() {
        let mut roster = roster_with_self();
        roster.add_player(OtherPlayer::new("b", "Bob"));
        roster.set_player_ready("b", true);
        roster.set_self_ready(true);

        assert!(roster.set_player_team("b", Team::Red));
        assert!(roster.set_player_team("me", Team::Blue));

        let bob = roster.other("b").unwrap();
        assert_eq!(bob.team, Team::Red);
        assert!(!bob.is_ready);
        assert_eq!(roster.me().team, Team::Blue);
        assert!(!roster.me().is_ready);

        // Same team again still demotes.
        roster.set_player_ready("b", true);
        roster.set_player_team("b", Team::Red);
        assert!(!roster.other("b").unwrap().is_ready);
    }

    #[test]
    fn unknown_ids_are_benign() {
        let mut roster = roster_with_self();
        assert!(!roster.set_player_team("ghost", Team::Red));
        assert!(!roster.set_player_ready("ghost", true));
        assert!(!roster.set_player_connected("ghost", false));
        assert!(roster.get_player_name("ghost").is_none());
        assert_eq!(roster.others_len(), 0);
    }

    #[test]
    fn get_player_name_covers_self_and_others() {
        let mut roster = roster_with_self();
        roster.add_player(OtherPlayer::new("b", "Bob"));
        assert_eq!(roster.get_player_name("me"), Some("Me"));
        assert_eq!(roster.get_player_name("b"), Some("Bob"));
    }

    #[test]
    fn reset_player_teams_drops_unretained_players() {
        let mut roster = roster_with_self();
        roster.set_player_team("me", Team::Red);
        for (id, name) in [("a", "Ann"), ("b", "Bob"), ("c", "Cy")] {
            roster.add_player(OtherPlayer::new(id, name));
            roster.set_player_team(id, Team::Blue);
            roster.set_player_ready(id, true);
        }

        roster.reset_player_teams(["a", "c"]);

        assert_eq!(roster.others_len(), 2);
        assert!(roster.other("b").is_none());
        for entry in roster.ordered() {
            assert_eq!(entry.team, Team::Unassigned);
            assert!(!entry.is_ready);
        }
    }

    #[test]
    fn connection_flag_tracks_remote_players() {
        let mut roster = roster_with_self();
        roster.add_player(OtherPlayer::new("b", "Bob"));
        assert!(roster.set_player_connected("b", false));
        assert!(!roster.other("b").unwrap().connected);
        assert!(roster.set_player_connected("b", true));
        assert!(roster.other("b").unwrap().connected);
    }

    #[test]
    fn snapshot_filters_by_team() {
        let mut roster = roster_with_self();
        roster.add_player(OtherPlayer::new("b", "Bob"));
        roster.set_player_team("b", Team::Red);
        let snapshot = roster.snapshot();
        let red: Vec<_> = snapshot.team(Team::Red).map(|e| e.name.as_str()).collect();
        assert_eq!(red, vec!["Bob"]);
    }
}
