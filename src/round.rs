//! Round lifecycle, turn assignment, scores and the word queue.
//!
//! The machine never moves on its own: every transition is the reaction to a
//! server message. Handlers return a [`CountdownCue`] telling the caller what
//! the countdown should do, so this module stays free of timers.
//!
//! ```text
//! InLobby ──game_state_changed──▶ InProgress ──round_setup + round_started──▶ InRound
//!    ▲                              ▲   ▲                                  │   ▲
//!    │                              │   └──────────── round_ended ─────────┘   │
//!    │                              │                              round_paused│round_resumed
//!    │                              │                                      ▼   │
//!    └────── game_reset ────── Ended ◀──────────── game_ended ──────── RoundPaused
//! ```

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::protocol::{
    GameState, PlayerId, ReconnectAckPayload, Team, Word, DEFAULT_ROUND_SECONDS,
};

/// What the countdown should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownCue {
    /// Leave it alone.
    None,
    /// Restart from this many seconds.
    Start(u32),
    /// Stop. With a value, show that many seconds; without, keep the
    /// captured remaining time.
    Pause(Option<u32>),
    /// Resume, optionally from an authoritative number of seconds.
    Resume(Option<u32>),
    /// Stop and restore the configured duration.
    Reset,
}

/// Immutable view of the round state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub game_state: GameState,
    pub red_score: u32,
    pub blue_score: u32,
    pub current_team: Option<Team>,
    pub guesser_id: Option<PlayerId>,
    pub hint_giver_id: Option<PlayerId>,
    pub duration_seconds: u32,
    pub current_word: Option<Word>,
    pub words_remaining: usize,
    pub winner: Option<Team>,
}

impl RoundSnapshot {
    /// The team sitting out the current turn.
    pub fn waiting_team(&self) -> Option<Team> {
        self.current_team.map(Team::opponent)
    }
}

impl Default for RoundSnapshot {
    fn default() -> Self {
        RoundStateMachine::new().snapshot()
    }
}

#[derive(Debug)]
pub struct RoundStateMachine {
    game_state: GameState,
    red_score: u32,
    blue_score: u32,
    current_team: Option<Team>,
    guesser_id: Option<PlayerId>,
    hint_giver_id: Option<PlayerId>,
    duration_seconds: u32,
    words: VecDeque<Word>,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStateMachine {
    pub fn new() -> Self {
        Self {
            game_state: GameState::InLobby,
            red_score: 0,
            blue_score: 0,
            current_team: None,
            guesser_id: None,
            hint_giver_id: None,
            duration_seconds: DEFAULT_ROUND_SECONDS,
            words: VecDeque::new(),
        }
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.red_score, self.blue_score)
    }

    pub fn current_team(&self) -> Option<Team> {
        self.current_team
    }

    pub fn guesser_id(&self) -> Option<&str> {
        self.guesser_id.as_deref()
    }

    pub fn hint_giver_id(&self) -> Option<&str> {
        self.hint_giver_id.as_deref()
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn current_word(&self) -> Option<&Word> {
        self.words.front()
    }

    pub fn words_remaining(&self) -> usize {
        self.words.len()
    }

    /// Leading team once the game has ended; `None` before that or on a tie.
    pub fn winner(&self) -> Option<Team> {
        if self.game_state != GameState::Ended {
            return None;
        }
        match self.red_score.cmp(&self.blue_score) {
            std::cmp::Ordering::Greater => Some(Team::Red),
            std::cmp::Ordering::Less => Some(Team::Blue),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            game_state: self.game_state,
            red_score: self.red_score,
            blue_score: self.blue_score,
            current_team: self.current_team,
            guesser_id: self.guesser_id.clone(),
            hint_giver_id: self.hint_giver_id.clone(),
            duration_seconds: self.duration_seconds,
            current_word: self.words.front().cloned(),
            words_remaining: self.words.len(),
            winner: self.winner(),
        }
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Authoritative phase announcement. Accepted from any phase so the
    /// client can always resynchronize.
    pub fn on_game_state_changed(&mut self, state: GameState) -> CountdownCue {
        let previous = self.game_state;
        self.game_state = state;
        debug!(?previous, ?state, "game state changed");

        let round_over = state == GameState::InProgress
            && matches!(previous, GameState::InRound | GameState::RoundPaused);
        if !state.has_turn() || round_over {
            self.clear_turn();
        }
        match state {
            GameState::InRound if previous == GameState::RoundPaused => CountdownCue::Resume(None),
            GameState::InRound if previous != GameState::InRound => {
                CountdownCue::Start(self.duration_seconds)
            }
            GameState::InRound => CountdownCue::None,
            GameState::RoundPaused => CountdownCue::Pause(None),
            GameState::InLobby | GameState::InProgress | GameState::Ended => {
                if previous == GameState::InRound || previous == GameState::RoundPaused {
                    CountdownCue::Reset
                } else {
                    CountdownCue::None
                }
            }
        }
    }

    /// Store the turn assignment for the upcoming round.
    ///
    /// A setup arriving in the lobby starts the game: the server announces
    /// the first round without a separate phase change. Returns `false`
    /// while a round is running or after the game has ended.
    pub fn on_round_setup(
        &mut self,
        team: Team,
        guesser_id: PlayerId,
        hint_giver_id: PlayerId,
        duration: u32,
        words: Vec<Word>,
    ) -> bool {
        match self.game_state {
            GameState::InProgress => {}
            GameState::InLobby => {
                debug!("round_setup in lobby, game in progress");
                self.game_state = GameState::InProgress;
            }
            GameState::InRound | GameState::RoundPaused | GameState::Ended => {
                warn!(state = ?self.game_state, "ignoring round_setup outside of an active game");
                return false;
            }
        }
        self.current_team = Some(team);
        self.guesser_id = Some(guesser_id);
        self.hint_giver_id = Some(hint_giver_id);
        self.duration_seconds = duration;
        self.words = words.into();
        true
    }

    pub fn on_round_started(&mut self) -> CountdownCue {
        if self.game_state != GameState::InProgress {
            warn!(state = ?self.game_state, "ignoring round_started");
            return CountdownCue::None;
        }
        self.game_state = GameState::InRound;
        CountdownCue::Start(self.duration_seconds)
    }

    pub fn on_round_paused(&mut self, remaining_seconds: u32) -> CountdownCue {
        if self.game_state != GameState::InRound {
            warn!(state = ?self.game_state, "ignoring round_paused");
            return CountdownCue::None;
        }
        self.game_state = GameState::RoundPaused;
        CountdownCue::Pause(Some(remaining_seconds))
    }

    pub fn on_round_resumed(&mut self, remaining_seconds: Option<u32>) -> CountdownCue {
        if self.game_state != GameState::RoundPaused {
            warn!(state = ?self.game_state, "ignoring round_resumed");
            return CountdownCue::None;
        }
        self.game_state = GameState::InRound;
        CountdownCue::Resume(remaining_seconds)
    }

    /// Back to between-rounds. Scores are kept, turn fields cleared.
    pub fn on_round_ended(&mut self) -> CountdownCue {
        if !matches!(self.game_state, GameState::InRound | GameState::RoundPaused) {
            warn!(state = ?self.game_state, "ignoring round_ended");
            return CountdownCue::None;
        }
        self.game_state = GameState::InProgress;
        self.clear_turn();
        CountdownCue::Reset
    }

    /// Final scores; the game stays `Ended` until a reset.
    pub fn on_game_ended(&mut self, red_score: u32, blue_score: u32) -> CountdownCue {
        if !self.game_state.has_turn() {
            warn!(state = ?self.game_state, "ignoring game_ended");
            return CountdownCue::None;
        }
        self.game_state = GameState::Ended;
        self.apply_scores(red_score, blue_score);
        self.clear_turn();
        CountdownCue::Reset
    }

    /// Zero everything and return to the lobby.
    ///
    /// Returns `None` if the reset was ignored because a game is running.
    pub fn on_game_reset(&mut self) -> Option<CountdownCue> {
        if !matches!(self.game_state, GameState::Ended | GameState::InLobby) {
            warn!(state = ?self.game_state, "ignoring game_reset while a game is running");
            return None;
        }
        self.game_state = GameState::InLobby;
        self.red_score = 0;
        self.blue_score = 0;
        self.duration_seconds = DEFAULT_ROUND_SECONDS;
        self.clear_turn();
        Some(CountdownCue::Reset)
    }

    /// Confirmed guess: take the server's scores and move to the next word.
    pub fn on_word_guessed(&mut self, red_score: u32, blue_score: u32) {
        if self.game_state == GameState::Ended {
            warn!("ignoring word_guessed after the game ended");
            return;
        }
        self.apply_scores(red_score, blue_score);
        self.advance_word();
    }

    pub fn on_word_skipped(&mut self) {
        self.advance_word();
    }

    pub fn on_word_list(&mut self, words: Vec<Word>) {
        self.words.extend(words);
    }

    /// Rebuild everything from a resume handshake.
    pub fn rehydrate(&mut self, payload: &ReconnectAckPayload) -> CountdownCue {
        self.game_state = payload.state;
        self.red_score = payload.red_score;
        self.blue_score = payload.blue_score;
        self.words = payload.words.iter().cloned().collect();
        if payload.state.has_turn() {
            self.current_team = payload.current_team;
            self.guesser_id = payload.guesser_id.clone();
            self.hint_giver_id = payload.hint_giver_id.clone();
        } else {
            self.clear_turn();
        }

        match (payload.state, payload.remaining_duration) {
            (GameState::InRound, Some(remaining)) => CountdownCue::Start(remaining),
            (GameState::InRound, None) => CountdownCue::Start(self.duration_seconds),
            (GameState::RoundPaused, remaining) => CountdownCue::Pause(remaining),
            _ => CountdownCue::Reset,
        }
    }

    fn apply_scores(&mut self, red_score: u32, blue_score: u32) {
        if red_score < self.red_score || blue_score < self.blue_score {
            debug!(
                red_score,
                blue_score,
                current_red = self.red_score,
                current_blue = self.blue_score,
                "ignoring stale score announcement"
            );
            return;
        }
        self.red_score = red_score;
        self.blue_score = blue_score;
    }

    fn advance_word(&mut self) {
        if self.words.pop_front().is_none() {
            debug!("word queue already empty");
        }
    }

    fn clear_turn(&mut self) {
        self.current_team = None;
        self.guesser_id = None;
        self.hint_giver_id = None;
        self.words.clear();
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

    fn word(id: u32, text: &str) -> Word {
        Word {
            id,
            word: text.into(),
            taboo: vec![],
        }
    }

    fn in_progress() -> RoundStateMachine {
        let mut round = RoundStateMachine::new();
        round.on_game_state_changed(GameState::InProgress);
        round
    }

    fn in_round() -> RoundStateMachine {
        let mut round = in_progress();
        assert!(round.on_round_setup(
            Team::Red,
            "g".into(),
            "h".into(),
            45,
            vec![word(1, "apple"), word(2, "pear")],
        ));
        assert_eq!(round.on_round_started(), CountdownCue::Start(45));
        round
    }

    #[test]
    fn starts_in_lobby_with_zero_scores() {
        let round = RoundStateMachine::new();
        assert_eq!(round.game_state(), GameState::InLobby);
        assert_eq!(round.scores(), (0, 0));
        assert_eq!(round.duration_seconds(), DEFAULT_ROUND_SECONDS);
    }

    #[test]
    fn setup_then_started_enters_round() {
        let round = in_round();
        assert_eq!(round.game_state(), GameState::InRound);
        assert_eq!(round.current_team(), Some(Team::Red));
        assert_eq!(round.guesser_id(), Some("g"));
        assert_eq!(round.hint_giver_id(), Some("h"));
        assert_eq!(round.current_word().map(|w| w.word.as_str()), Some("apple"));
    }

    #[test]
    fn round_ended_keeps_scores_and_clears_turn() {
        let mut round = in_round();
        round.on_word_guessed(3, 2);
        assert_eq!(round.on_round_ended(), CountdownCue::Reset);
        assert_eq!(round.game_state(), GameState::InProgress);
        assert_eq!(round.scores(), (3, 2));
        assert_eq!(round.current_team(), None);
        assert_eq!(round.guesser_id(), None);
        assert_eq!(round.hint_giver_id(), None);
        assert_eq!(round.words_remaining(), 0);
    }

    #[test]
    fn pause_and_resume_cue_the_countdown() {
        let mut round = in_round();
        assert_eq!(round.on_round_paused(17), CountdownCue::Pause(Some(17)));
        assert_eq!(round.game_state(), GameState::RoundPaused);
        assert_eq!(round.on_round_resumed(None), CountdownCue::Resume(None));
        assert_eq!(round.game_state(), GameState::InRound);
    }

    #[test]
    fn game_reset_from_ended_zeroes_scores() {
        let mut round = in_round();
        round.on_game_ended(5, 4);
        assert_eq!(round.game_state(), GameState::Ended);
        assert_eq!(round.on_game_reset(), Some(CountdownCue::Reset));
        assert_eq!(round.game_state(), GameState::InLobby);
        assert_eq!(round.scores(), (0, 0));
    }

    #[test]
    fn game_reset_is_ignored_mid_game() {
        let mut round = in_round();
        round.on_word_guessed(1, 0);
        assert_eq!(round.on_game_reset(), None);
        assert_eq!(round.game_state(), GameState::InRound);
        assert_eq!(round.scores(), (1, 0));
    }

    #[test]
    fn ended_is_terminal_for_round_messages() {
        let mut round = in_round();
        round.on_game_ended(2, 1);
        assert_eq!(round.on_round_started(), CountdownCue::None);
        assert_eq!(round.on_round_paused(3), CountdownCue::None);
        assert_eq!(round.on_round_ended(), CountdownCue::None);
        round.on_word_guessed(9, 9);
        assert_eq!(round.game_state(), GameState::Ended);
        assert_eq!(round.scores(), (2, 1));
    }

    #[test]
    fn out_of_phase_messages_are_ignored() {
        let mut round = RoundStateMachine::new();
        assert_eq!(round.on_round_started(), CountdownCue::None);
        assert_eq!(round.on_round_resumed(Some(4)), CountdownCue::None);
        assert_eq!(round.game_state(), GameState::InLobby);

        let mut running = in_round();
        assert!(!running.on_round_setup(Team::Blue, "x".into(), "y".into(), 30, vec![]));
        assert_eq!(running.current_team(), Some(Team::Red));
        assert_eq!(running.guesser_id(), Some("g"));

        let mut ended = in_round();
        ended.on_game_ended(1, 0);
        assert!(!ended.on_round_setup(Team::Blue, "x".into(), "y".into(), 30, vec![]));
        assert_eq!(ended.game_state(), GameState::Ended);
    }

    #[test]
    fn setup_in_lobby_starts_the_game() {
        let mut round = RoundStateMachine::new();
        assert!(round.on_round_setup(
            Team::Blue,
            "g".into(),
            "h".into(),
            40,
            vec![word(1, "apple")],
        ));
        assert_eq!(round.game_state(), GameState::InProgress);
        assert_eq!(round.current_team(), Some(Team::Blue));
        assert_eq!(round.current_word().map(|w| w.id), Some(1));
        assert_eq!(round.on_round_started(), CountdownCue::Start(40));
        assert_eq!(round.game_state(), GameState::InRound);
    }

    #[test]
    fn waiting_team_is_the_opponent_of_the_playing_team() {
        let mut round = in_progress();
        assert_eq!(round.snapshot().waiting_team(), None);
        round.on_round_setup(Team::Red, "g".into(), "h".into(), 30, vec![]);
        assert_eq!(round.snapshot().waiting_team(), Some(Team::Blue));
        round.on_round_setup(Team::Blue, "g".into(), "h".into(), 30, vec![]);
        assert_eq!(round.snapshot().waiting_team(), Some(Team::Red));
    }

    #[test]
    fn word_guessed_sets_scores_without_local_increment() {
        let mut round = in_round();
        round.on_word_guessed(3, 2);
        assert_eq!(round.scores(), (3, 2));
        // A retransmitted confirmation does not double count.
        round.on_word_guessed(3, 2);
        assert_eq!(round.scores(), (3, 2));
        // Stale announcements never lower the score.
        round.on_word_guessed(2, 2);
        assert_eq!(round.scores(), (3, 2));
    }

    #[test]
    fn winner_is_derived_only_after_game_end() {
        let mut round = in_round();
        round.on_word_guessed(3, 2);
        assert_eq!(round.winner(), None);
        round.on_game_ended(3, 2);
        assert_eq!(round.winner(), Some(Team::Red));
        assert_eq!(round.snapshot().winner, Some(Team::Red));

        let mut tied = in_round();
        tied.on_game_ended(1, 1);
        assert_eq!(tied.winner(), None);

        let mut blue = in_round();
        blue.on_game_ended(0, 4);
        assert_eq!(blue.winner(), Some(Team::Blue));
    }

    #[test]
    fn word_queue_is_front_consuming() {
        let mut round = in_round();
        round.on_word_list(vec![word(3, "plum")]);
        assert_eq!(round.words_remaining(), 3);
        round.on_word_skipped();
        assert_eq!(round.current_word().map(|w| w.id), Some(2));
        round.on_word_guessed(1, 0);
        assert_eq!(round.current_word().map(|w| w.id), Some(3));
        round.on_word_skipped();
        round.on_word_skipped();
        assert!(round.current_word().is_none());
    }

    #[test]
    fn state_change_to_lobby_clears_turn_fields() {
        let mut round = in_round();
        assert_eq!(
            round.on_game_state_changed(GameState::InLobby),
            CountdownCue::Reset
        );
        assert_eq!(round.current_team(), None);
        assert_eq!(round.words_remaining(), 0);
    }

    #[test]
    fn rehydrate_paused_round() {
        let mut round = RoundStateMachine::new();
        let payload = ReconnectAckPayload {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
            team: Team::Blue,
            state: GameState::RoundPaused,
            remaining_duration: Some(22),
            current_team: Some(Team::Blue),
            guesser_id: Some("p1".into()),
            hint_giver_id: Some("p2".into()),
            red_score: 4,
            blue_score: 6,
            words: vec![word(9, "kiwi")],
        };
        assert_eq!(round.rehydrate(&payload), CountdownCue::Pause(Some(22)));
        assert_eq!(round.game_state(), GameState::RoundPaused);
        assert_eq!(round.scores(), (4, 6));
        assert_eq!(round.guesser_id(), Some("p1"));
        assert_eq!(round.current_word().map(|w| w.id), Some(9));
    }
}
