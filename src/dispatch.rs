//! Routing between the wire vocabulary and the local state slices.
//!
//! [`GameContext`] owns the session, roster, round state machine and
//! countdown. It is the only place that matches on the full
//! [`ServerMessage`] vocabulary, and the only place that turns a
//! presentation [`Intent`] into a [`ClientMessage`]. It performs no I/O:
//! the engine in [`client`](crate::client) feeds it decoded frames and sends
//! whatever it returns.

use tracing::{debug, info, warn};

use crate::countdown::{Countdown, CountdownSnapshot, CountdownStatus};
use crate::event::TabooEvent;
use crate::protocol::{ClientMessage, ReconnectAckPayload, ServerMessage, Team};
use crate::roster::{OtherPlayer, Roster, RosterSnapshot};
use crate::round::{CountdownCue, RoundSnapshot, RoundStateMachine};
use crate::session::Session;

/// A request from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ChangeName(String),
    ChangeTeam(Team),
    SetReady(bool),
    StartRound,
    ResumeRound,
    ResetGame,
    SkipWord,
    GuessWord,
}

#[derive(Debug)]
pub struct GameContext {
    session: Session,
    roster: Roster,
    round: RoundStateMachine,
    countdown: Countdown,
    /// Set while a `reconnect` handshake is waiting for its answer.
    awaiting_resume: bool,
    /// The last cue started the countdown already at zero.
    expired_on_start: bool,
}

impl GameContext {
    /// Build the local mirror, seeding the self player from `session`.
    pub fn new(session: Session, countdown: Countdown) -> Self {
        let mut roster = Roster::new(session.name());
        if let Some(id) = session.player_id() {
            roster.set_player_id(id);
        }
        if let Some(token) = session.identity().session_token.as_deref() {
            roster.set_session_token(token);
        }
        Self {
            session,
            roster,
            round: RoundStateMachine::new(),
            countdown,
            awaiting_resume: false,
            expired_on_start: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn round(&self) -> &RoundStateMachine {
        &self.round
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn countdown_mut(&mut self) -> &mut Countdown {
        &mut self.countdown
    }

    pub fn roster_snapshot(&self) -> RosterSnapshot {
        self.roster.snapshot()
    }

    pub fn round_snapshot(&self) -> RoundSnapshot {
        self.round.snapshot()
    }

    pub fn countdown_snapshot(&self) -> CountdownSnapshot {
        self.countdown.snapshot()
    }

    /// First message on a freshly opened transport: a resume if both halves
    /// of the persisted identity are known, a fresh connect otherwise.
    pub fn handshake(&mut self) -> ClientMessage {
        match self.session.identity().resume_credentials() {
            Some((player_id, session_token)) => {
                self.awaiting_resume = true;
                ClientMessage::Reconnect {
                    player_id: player_id.to_owned(),
                    session_token: session_token.to_owned(),
                }
            }
            None => {
                self.awaiting_resume = false;
                ClientMessage::Connect {
                    name: self.session.name().to_owned(),
                }
            }
        }
    }

    /// The transport went away; the countdown stops until the server says
    /// otherwise.
    pub fn on_transport_lost(&mut self) {
        self.countdown.stop();
        self.awaiting_resume = false;
    }

    pub fn on_countdown(&mut self, status: CountdownStatus) -> Option<TabooEvent> {
        match status {
            CountdownStatus::Running(_) => None,
            CountdownStatus::Expired => {
                debug!("round countdown expired");
                Some(TabooEvent::RoundExpired)
            }
        }
    }

    /// Expiry that happened while applying the last message rather than on a
    /// tick. Reported once, after the message's own event.
    pub fn take_expiry(&mut self) -> Option<TabooEvent> {
        std::mem::take(&mut self.expired_on_start).then_some(TabooEvent::RoundExpired)
    }

    /// Translate an intent into the message to send.
    ///
    /// Returns `None` when there is nothing to send, which is the case for
    /// every intent before the server has assigned a player id. A name change
    /// is still applied locally so it is used by the next handshake.
    pub fn intent(&mut self, intent: Intent) -> Option<ClientMessage> {
        if let Intent::ChangeName(name) = &intent {
            self.session.set_name(name.as_str());
            self.roster.set_player_name(name.as_str());
        }
        let Some(player_id) = self.session.player_id().map(str::to_owned) else {
            debug!(?intent, "no player id yet, dropping intent");
            return None;
        };
        let message = match intent {
            Intent::ChangeName(name) => ClientMessage::ChangeName { player_id, name },
            Intent::ChangeTeam(team) => ClientMessage::ChangeTeam { player_id, team },
            Intent::SetReady(is_ready) => ClientMessage::PlayerReady {
                player_id,
                is_ready,
            },
            Intent::StartRound => ClientMessage::StartRound { player_id },
            Intent::ResumeRound => ClientMessage::ResumeRound { player_id },
            Intent::ResetGame => ClientMessage::ResetGame { player_id },
            Intent::SkipWord => ClientMessage::SkipWord { player_id },
            Intent::GuessWord => ClientMessage::GuessWord { player_id },
        };
        Some(message)
    }

    /// Apply one inbound message. Returns the event to surface, if any.
    pub fn dispatch(&mut self, message: ServerMessage) -> Option<TabooEvent> {
        match message {
            ServerMessage::ConnectAck {
                player_id,
                session_token,
                name,
            } => Some(self.on_connect_ack(player_id, session_token, name)),
            ServerMessage::ReconnectAck(payload) => Some(self.on_reconnect_ack(*payload)),
            ServerMessage::NameChanged { player_id, name } => {
                if self.session.player_id() == Some(player_id.as_str()) {
                    self.session.set_name(name.as_str());
                }
                self.roster.rename_player(&player_id, name);
                None
            }
            ServerMessage::PlayerJoined { player_id, name } => {
                let added = self
                    .roster
                    .add_player(OtherPlayer::new(player_id.as_str(), name.as_str()));
                added.then_some(TabooEvent::PlayerJoined { player_id, name })
            }
            ServerMessage::PlayerLeft { player_id } => {
                let removed = self.roster.remove_player(&player_id);
                Some(TabooEvent::PlayerLeft {
                    player_id,
                    name: removed.map(|p| p.name),
                })
            }
            ServerMessage::PlayerDisconnected { player_id } => self
                .roster
                .set_player_connected(&player_id, false)
                .then_some(TabooEvent::PlayerDisconnected { player_id }),
            ServerMessage::PlayerReconnected { player_id } => self
                .roster
                .set_player_connected(&player_id, true)
                .then_some(TabooEvent::PlayerReconnected { player_id }),
            ServerMessage::PlayerList { players } => {
                let me = self.session.player_id().map(str::to_owned);
                if let Some(info) = players.iter().find(|p| Some(&p.id) == me.as_ref()) {
                    self.roster.set_self_team(info.team);
                    self.roster.set_self_ready(info.is_ready);
                }
                self.roster
                    .set_players(players.into_iter().map(OtherPlayer::from));
                None
            }
            ServerMessage::TeamChanged { player_id, team } => {
                self.roster.set_player_team(&player_id, team);
                None
            }
            ServerMessage::PlayerReady {
                player_id,
                is_ready,
            } => {
                self.roster.set_player_ready(&player_id, is_ready);
                None
            }
            ServerMessage::GameStateChanged { state } => {
                let cue = self.round.on_game_state_changed(state);
                self.apply_cue(cue);
                None
            }
            ServerMessage::RoundSetup {
                team,
                guesser_id,
                hint_giver_id,
                duration,
                words,
            } => {
                let accepted = self.round.on_round_setup(
                    team,
                    guesser_id.clone(),
                    hint_giver_id.clone(),
                    duration,
                    words,
                );
                accepted.then_some(TabooEvent::RoundSetup {
                    team,
                    guesser_id,
                    hint_giver_id,
                })
            }
            ServerMessage::RoundStarted { .. } => {
                let cue = self.round.on_round_started();
                self.cued_event(cue, TabooEvent::RoundStarted)
            }
            ServerMessage::RoundPaused { remaining_duration } => {
                let cue = self.round.on_round_paused(remaining_duration);
                self.cued_event(
                    cue,
                    TabooEvent::RoundPaused {
                        remaining_seconds: remaining_duration,
                    },
                )
            }
            ServerMessage::RoundResumed {
                remaining_duration, ..
            } => {
                let cue = self.round.on_round_resumed(remaining_duration);
                self.cued_event(cue, TabooEvent::RoundResumed)
            }
            ServerMessage::RoundEnded => {
                let cue = self.round.on_round_ended();
                self.cued_event(cue, TabooEvent::RoundEnded)
            }
            ServerMessage::GameEnded {
                red_score,
                blue_score,
            } => {
                let cue = self.round.on_game_ended(red_score, blue_score);
                if cue == CountdownCue::None {
                    return None;
                }
                self.apply_cue(cue);
                let (red_score, blue_score) = self.round.scores();
                Some(TabooEvent::GameEnded {
                    red_score,
                    blue_score,
                    winner: self.round.winner(),
                })
            }
            ServerMessage::GameReset { player_ids } => {
                let cue = self.round.on_game_reset()?;
                self.apply_cue(cue);
                match player_ids {
                    Some(ids) => self
                        .roster
                        .reset_player_teams(ids.iter().map(String::as_str)),
                    None => self.roster.reset_all_teams(),
                }
                Some(TabooEvent::GameReset)
            }
            ServerMessage::WordSkipped { player_id } => {
                self.round.on_word_skipped();
                Some(TabooEvent::WordSkipped { player_id })
            }
            ServerMessage::WordGuessed {
                player_id,
                red_score,
                blue_score,
            } => {
                self.round.on_word_guessed(red_score, blue_score);
                Some(TabooEvent::WordGuessed {
                    player_id,
                    red_score,
                    blue_score,
                })
            }
            ServerMessage::WordList { words } => {
                self.round.on_word_list(words);
                None
            }
            ServerMessage::ErrorResponse {
                failed_type,
                error,
                error_code,
            } => {
                warn!(%failed_type, ?error_code, "server rejected request: {error}");
                Some(TabooEvent::ServerError {
                    failed_type,
                    error,
                    error_code,
                })
            }
        }
    }

    fn on_connect_ack(
        &mut self,
        player_id: String,
        session_token: String,
        name: String,
    ) -> TabooEvent {
        if std::mem::take(&mut self.awaiting_resume) {
            info!(%player_id, "resume rejected, starting a new identity");
            self.roster.clear_session_data();
            self.roster.set_self_team(Team::Unassigned);
        } else {
            info!(%player_id, "identity assigned");
        }
        self.session
            .assign(player_id.clone(), session_token.clone(), name.clone());
        self.roster.set_player_id(player_id.as_str());
        self.roster.set_session_token(session_token);
        self.roster.set_player_name(name.as_str());
        TabooEvent::IdentityAssigned {
            player_id,
            name,
            resumed: false,
        }
    }

    fn on_reconnect_ack(&mut self, payload: ReconnectAckPayload) -> TabooEvent {
        self.awaiting_resume = false;
        info!(player_id = %payload.player_id, state = ?payload.state, "session resumed");
        self.session.assign(
            payload.player_id.clone(),
            payload.session_token.clone(),
            payload.name.clone(),
        );
        self.roster.set_player_id(payload.player_id.as_str());
        self.roster.set_session_token(payload.session_token.as_str());
        self.roster.set_player_name(payload.name.as_str());
        self.roster.set_self_team(payload.team);
        let cue = self.round.rehydrate(&payload);
        self.apply_cue(cue);
        TabooEvent::IdentityAssigned {
            player_id: payload.player_id,
            name: payload.name,
            resumed: true,
        }
    }

    /// Apply `cue` and surface `event` only if the transition was accepted.
    fn cued_event(&mut self, cue: CountdownCue, event: TabooEvent) -> Option<TabooEvent> {
        if cue == CountdownCue::None {
            return None;
        }
        self.apply_cue(cue);
        Some(event)
    }

    fn apply_cue(&mut self, cue: CountdownCue) {
        let status = match cue {
            CountdownCue::None => return,
            CountdownCue::Start(seconds) => self.countdown.start(Some(seconds)),
            CountdownCue::Pause(Some(seconds)) => {
                self.countdown.stop();
                self.countdown.adjust(seconds);
                return;
            }
            CountdownCue::Pause(None) => {
                self.countdown.stop();
                return;
            }
            CountdownCue::Resume(Some(seconds)) => {
                self.countdown.adjust(seconds);
                self.countdown.start(None)
            }
            CountdownCue::Resume(None) => self.countdown.start(None),
            CountdownCue::Reset => {
                self.countdown.reset();
                return;
            }
        };
        if status == CountdownStatus::Expired {
            debug!("round countdown started with no time left");
            self.expired_on_start = true;
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
    use crate::protocol::{GameState, PlayerInfo, Word};
    use crate::session::{MemorySessionStore, SessionIdentity};
    use std::time::Duration;

    fn context(store: &MemorySessionStore) -> GameContext {
        let session = Session::load(store.clone(), "Ada");
        GameContext::new(session, Countdown::new(Duration::from_secs(60)))
    }

    fn identified(store: &MemorySessionStore) -> GameContext {
        let mut ctx = context(store);
        ctx.handshake();
        ctx.dispatch(ServerMessage::ConnectAck {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
        });
        ctx
    }

    fn in_round(ctx: &mut GameContext) {
        ctx.dispatch(ServerMessage::GameStateChanged {
            state: GameState::InProgress,
        });
        ctx.dispatch(ServerMessage::RoundSetup {
            team: Team::Red,
            guesser_id: "p1".into(),
            hint_giver_id: "p2".into(),
            duration: 30,
            words: vec![Word {
                id: 1,
                word: "apple".into(),
                taboo: vec!["fruit".into()],
            }],
        });
        ctx.dispatch(ServerMessage::RoundStarted { player_id: None });
    }

    #[test]
    fn fresh_session_sends_connect_with_name() {
        let store = MemorySessionStore::new();
        let mut ctx = context(&store);
        assert_eq!(
            ctx.handshake(),
            ClientMessage::Connect { name: "Ada".into() }
        );
    }

    #[test]
    fn connect_ack_persists_identity_and_sets_self_id() {
        let store = MemorySessionStore::new();
        let mut ctx = context(&store);
        ctx.handshake();
        let event = ctx.dispatch(ServerMessage::ConnectAck {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
        });

        assert_eq!(
            event,
            Some(TabooEvent::IdentityAssigned {
                player_id: "p1".into(),
                name: "Ada".into(),
                resumed: false,
            })
        );
        assert_eq!(
            store.snapshot(),
            Some(SessionIdentity {
                player_id: Some("p1".into()),
                session_token: Some("t1".into()),
                name: "Ada".into(),
            })
        );
        assert_eq!(ctx.roster().me().id.as_deref(), Some("p1"));
        assert_eq!(ctx.roster().me().session_token.as_deref(), Some("t1"));
    }

    #[test]
    fn persisted_identity_sends_reconnect() {
        let store = MemorySessionStore::with_identity(SessionIdentity {
            player_id: Some("p1".into()),
            session_token: Some("t1".into()),
            name: "Ada".into(),
        });
        let mut ctx = context(&store);
        assert_eq!(ctx.roster().me().id.as_deref(), Some("p1"));
        assert_eq!(
            ctx.handshake(),
            ClientMessage::Reconnect {
                player_id: "p1".into(),
                session_token: "t1".into(),
            }
        );
    }

    #[test]
    fn connect_ack_after_resume_overwrites_identity() {
        let store = MemorySessionStore::with_identity(SessionIdentity {
            player_id: Some("old".into()),
            session_token: Some("stale".into()),
            name: "Ada".into(),
        });
        let mut ctx = context(&store);
        ctx.handshake();
        ctx.dispatch(ServerMessage::ConnectAck {
            player_id: "p9".into(),
            session_token: "t9".into(),
            name: "Ada".into(),
        });

        let persisted = store.snapshot().unwrap();
        assert_eq!(persisted.player_id.as_deref(), Some("p9"));
        assert_eq!(persisted.session_token.as_deref(), Some("t9"));
        assert_eq!(ctx.roster().me().id.as_deref(), Some("p9"));
        assert_eq!(ctx.roster().me().team, Team::Unassigned);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_ack_rehydrates_round_and_countdown() {
        let store = MemorySessionStore::with_identity(SessionIdentity {
            player_id: Some("p1".into()),
            session_token: Some("t1".into()),
            name: "Ada".into(),
        });
        let mut ctx = context(&store);
        ctx.handshake();
        let event = ctx.dispatch(ServerMessage::ReconnectAck(Box::new(ReconnectAckPayload {
            player_id: "p1".into(),
            session_token: "t1".into(),
            name: "Ada".into(),
            team: Team::Blue,
            state: GameState::InRound,
            remaining_duration: Some(25),
            current_team: Some(Team::Blue),
            guesser_id: Some("p1".into()),
            hint_giver_id: Some("p2".into()),
            red_score: 2,
            blue_score: 5,
            words: vec![],
        })));

        assert!(matches!(
            event,
            Some(TabooEvent::IdentityAssigned { resumed: true, .. })
        ));
        assert_eq!(ctx.roster().me().team, Team::Blue);
        assert_eq!(ctx.round().game_state(), GameState::InRound);
        assert_eq!(ctx.round().scores(), (2, 5));
        assert!(ctx.countdown().is_running());
        assert_eq!(ctx.countdown().remaining_seconds(), 25);
    }

    #[test]
    fn intents_need_a_player_id() {
        let store = MemorySessionStore::new();
        let mut ctx = context(&store);
        assert_eq!(ctx.intent(Intent::ChangeTeam(Team::Red)), None);
        assert_eq!(ctx.intent(Intent::GuessWord), None);

        // A name change is still remembered for the next handshake.
        assert_eq!(ctx.intent(Intent::ChangeName("Grace".into())), None);
        assert_eq!(
            ctx.handshake(),
            ClientMessage::Connect {
                name: "Grace".into()
            }
        );
    }

    #[test]
    fn intents_carry_the_player_id() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        assert_eq!(
            ctx.intent(Intent::ChangeTeam(Team::Blue)),
            Some(ClientMessage::ChangeTeam {
                player_id: "p1".into(),
                team: Team::Blue,
            })
        );
        assert_eq!(
            ctx.intent(Intent::SetReady(true)),
            Some(ClientMessage::PlayerReady {
                player_id: "p1".into(),
                is_ready: true,
            })
        );
        // Intents are not applied locally; the server broadcast does that.
        assert_eq!(ctx.roster().me().team, Team::Unassigned);
        assert!(!ctx.roster().me().is_ready);
    }

    #[test]
    fn player_list_never_lists_self_as_other() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        ctx.dispatch(ServerMessage::PlayerList {
            players: vec![
                PlayerInfo {
                    id: "p2".into(),
                    name: "Bob".into(),
                    team: Team::Blue,
                    is_ready: true,
                    connected: true,
                },
                PlayerInfo {
                    id: "p1".into(),
                    name: "Ada".into(),
                    team: Team::Red,
                    is_ready: true,
                    connected: true,
                },
            ],
        });

        assert_eq!(ctx.roster().others_len(), 1);
        assert!(ctx.roster().other("p1").is_none());
        assert_eq!(ctx.roster().me().team, Team::Red);
        assert!(ctx.roster().me().is_ready);
        let listing = ctx.roster_snapshot().players;
        assert!(listing[0].is_self);
        assert_eq!(listing[1].name, "Bob");
    }

    #[test]
    fn team_change_demotes_ready_flag() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        ctx.dispatch(ServerMessage::PlayerJoined {
            player_id: "p2".into(),
            name: "Bob".into(),
        });
        ctx.dispatch(ServerMessage::PlayerReady {
            player_id: "p2".into(),
            is_ready: true,
        });
        ctx.dispatch(ServerMessage::TeamChanged {
            player_id: "p2".into(),
            team: Team::Red,
        });
        let bob = ctx.roster().other("p2").unwrap();
        assert_eq!(bob.team, Team::Red);
        assert!(!bob.is_ready);
    }

    #[test]
    fn unknown_player_updates_are_silent() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        assert_eq!(
            ctx.dispatch(ServerMessage::PlayerDisconnected {
                player_id: "ghost".into()
            }),
            None
        );
        assert_eq!(
            ctx.dispatch(ServerMessage::TeamChanged {
                player_id: "ghost".into(),
                team: Team::Blue,
            }),
            None
        );
        assert_eq!(ctx.roster().others_len(), 0);
    }

    #[test]
    fn player_left_reports_the_last_known_name() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        ctx.dispatch(ServerMessage::PlayerJoined {
            player_id: "p2".into(),
            name: "Bob".into(),
        });
        assert_eq!(
            ctx.dispatch(ServerMessage::PlayerLeft {
                player_id: "p2".into()
            }),
            Some(TabooEvent::PlayerLeft {
                player_id: "p2".into(),
                name: Some("Bob".into()),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn word_guessed_mirrors_server_scores() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        in_round(&mut ctx);
        assert!(ctx.countdown().is_running());

        ctx.dispatch(ServerMessage::WordGuessed {
            player_id: "p1".into(),
            red_score: 3,
            blue_score: 2,
        });
        let round = ctx.round_snapshot();
        assert_eq!((round.red_score, round.blue_score), (3, 2));
        assert_eq!(round.winner, None);

        let event = ctx.dispatch(ServerMessage::GameEnded {
            red_score: 3,
            blue_score: 2,
        });
        assert_eq!(
            event,
            Some(TabooEvent::GameEnded {
                red_score: 3,
                blue_score: 2,
                winner: Some(Team::Red),
            })
        );
        assert!(!ctx.countdown().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_drive_the_countdown() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        in_round(&mut ctx);

        tokio::time::advance(Duration::from_secs(5)).await;
        ctx.dispatch(ServerMessage::RoundPaused {
            remaining_duration: 24,
        });
        assert!(!ctx.countdown().is_running());
        assert_eq!(ctx.countdown().remaining_seconds(), 24);

        tokio::time::advance(Duration::from_secs(10)).await;
        ctx.dispatch(ServerMessage::RoundResumed {
            player_id: Some("p1".into()),
            remaining_duration: None,
        });
        assert!(ctx.countdown().is_running());
        assert_eq!(ctx.countdown().remaining_seconds(), 24);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_loss_stops_the_countdown() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        in_round(&mut ctx);
        ctx.on_transport_lost();
        assert!(!ctx.countdown().is_running());
        assert_eq!(ctx.round().game_state(), GameState::InRound);
    }

    #[tokio::test(start_paused = true)]
    async fn game_reset_drops_players_missing_from_the_list() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        for (id, name) in [("p2", "Bob"), ("p3", "Cy")] {
            ctx.dispatch(ServerMessage::PlayerJoined {
                player_id: id.into(),
                name: name.into(),
            });
            ctx.dispatch(ServerMessage::TeamChanged {
                player_id: id.into(),
                team: Team::Blue,
            });
        }
        in_round(&mut ctx);
        ctx.dispatch(ServerMessage::GameEnded {
            red_score: 1,
            blue_score: 0,
        });

        let event = ctx.dispatch(ServerMessage::GameReset {
            player_ids: Some(vec!["p1".into(), "p2".into()]),
        });
        assert_eq!(event, Some(TabooEvent::GameReset));
        assert_eq!(ctx.round().game_state(), GameState::InLobby);
        assert_eq!(ctx.round().scores(), (0, 0));
        assert!(ctx.roster().other("p3").is_none());
        assert_eq!(ctx.roster().other("p2").unwrap().team, Team::Unassigned);
    }

    #[test]
    fn server_errors_surface_without_state_change() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        let before = ctx.round_snapshot();
        let event = ctx.dispatch(ServerMessage::ErrorResponse {
            failed_type: "change_team".into(),
            error: "team is full".into(),
            error_code: Some(crate::ErrorCode::TeamFull),
        });
        assert_eq!(
            event,
            Some(TabooEvent::ServerError {
                failed_type: "change_team".into(),
                error: "team is full".into(),
                error_code: Some(crate::ErrorCode::TeamFull),
            })
        );
        assert_eq!(ctx.round_snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn round_setup_in_lobby_leads_straight_into_the_round() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        assert_eq!(ctx.round().game_state(), GameState::InLobby);

        let setup = ctx.dispatch(ServerMessage::RoundSetup {
            team: Team::Blue,
            guesser_id: "p1".into(),
            hint_giver_id: "p2".into(),
            duration: 30,
            words: vec![Word {
                id: 1,
                word: "apple".into(),
                taboo: vec![],
            }],
        });
        assert_eq!(
            setup,
            Some(TabooEvent::RoundSetup {
                team: Team::Blue,
                guesser_id: "p1".into(),
                hint_giver_id: "p2".into(),
            })
        );
        assert_eq!(ctx.round().game_state(), GameState::InProgress);

        let started = ctx.dispatch(ServerMessage::RoundStarted {
            player_id: Some("p2".into()),
        });
        assert_eq!(started, Some(TabooEvent::RoundStarted));
        assert_eq!(ctx.round().game_state(), GameState::InRound);
        assert!(ctx.countdown().is_running());
        assert_eq!(ctx.countdown().remaining_seconds(), 30);
        assert_eq!(ctx.round_snapshot().waiting_team(), Some(Team::Red));
    }

    #[tokio::test(start_paused = true)]
    async fn round_started_with_no_time_left_expires_once() {
        let store = MemorySessionStore::new();
        let mut ctx = identified(&store);
        ctx.dispatch(ServerMessage::RoundSetup {
            team: Team::Red,
            guesser_id: "p1".into(),
            hint_giver_id: "p2".into(),
            duration: 0,
            words: vec![],
        });
        assert_eq!(ctx.take_expiry(), None);

        let started = ctx.dispatch(ServerMessage::RoundStarted { player_id: None });
        assert_eq!(started, Some(TabooEvent::RoundStarted));
        assert!(!ctx.countdown().is_running());
        assert_eq!(ctx.take_expiry(), Some(TabooEvent::RoundExpired));
        assert_eq!(ctx.take_expiry(), None);
    }

    #[test]
    fn countdown_expiry_becomes_an_event() {
        let store = MemorySessionStore::new();
        let mut ctx = context(&store);
        assert_eq!(
            ctx.on_countdown(CountdownStatus::Running(Duration::from_secs(3))),
            None
        );
        assert_eq!(
            ctx.on_countdown(CountdownStatus::Expired),
            Some(TabooEvent::RoundExpired)
        );
    }
}
