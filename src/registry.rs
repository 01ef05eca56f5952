//! Live game registry: at most one game per chat context
//!
//! Every game runs inside its own actor task that owns the [`Game`]
//! outright. Player commands and the gravity timer both go through that
//! task, so a game only ever sees one mutation at a time, in arrival
//! order. Different games never wait on each other.
//!
//! Ending a game happens inside its actor: the entry is removed from the
//! registry and the result goes to the [`Scoreboard`] before the caller
//! is answered, then anything still queued gets [`TrisError::NoSession`].
//! No gravity tick runs after that because the actor has returned. Score
//! files are written on the blocking pool, never on the actor itself.

use crate::command::Action;
use crate::error::{Result, TrisError};
use crate::game::{ContextKey, EndReason, FinalResult, Game, GameConfig, SessionView, UserId};
use crate::scoreboard::Scoreboard;
use crate::settings::{Settings, validate_speed};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Where a speed factor applies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpeedScope {
    /// Every channel of a server
    Server(u64),
    /// A single chat context
    Context(ContextKey),
}

/// Result of applying a command sequence
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// State after the last applied action
    pub view: SessionView,
    /// Set when the sequence ended the game
    pub result: Option<FinalResult>,
}

enum SessionMsg {
    Apply {
        actions: Vec<Action>,
        reply: oneshot::Sender<Result<CommandOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<SessionView>>,
    },
    End {
        reply: oneshot::Sender<Result<FinalResult>>,
    },
}

/// Registry-side handle to a running actor
struct SessionHandle {
    id: u64,
    tx: mpsc::UnboundedSender<SessionMsg>,
    view: watch::Receiver<SessionView>,
}

struct Inner {
    sessions: Mutex<HashMap<ContextKey, SessionHandle>>,
    speeds: Mutex<HashMap<SpeedScope, f64>>,
    scoreboard: Arc<Scoreboard>,
    settings: Settings,
    next_id: AtomicU64,
}

/// Maps chat contexts to live games
///
/// Must be used from inside a tokio runtime: starting a game spawns its
/// actor task.
pub struct Registry {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Registry {
    pub fn new(settings: Settings, scoreboard: Arc<Scoreboard>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                speeds: Mutex::new(HashMap::new()),
                scoreboard,
                settings,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn scoreboard(&self) -> &Arc<Scoreboard> {
        &self.inner.scoreboard
    }

    /// Set the speed factor for games created later in `scope`
    pub fn set_speed(&self, scope: SpeedScope, factor: f64) -> Result<()> {
        let factor = validate_speed(factor)?;
        info!(?scope, factor, "speed changed");
        lock(&self.inner.speeds).insert(scope, factor);
        Ok(())
    }

    /// Speed factor a game created now in `context` would get: the
    /// server-wide value, then the per-context value, then the default
    pub fn speed_for(&self, context: &ContextKey) -> f64 {
        let speeds = lock(&self.inner.speeds);
        context
            .server
            .and_then(|server| speeds.get(&SpeedScope::Server(server)))
            .or_else(|| speeds.get(&SpeedScope::Context(context.clone())))
            .copied()
            .unwrap_or(self.inner.settings.speed.factor)
    }

    /// Start a game with a random piece sequence
    pub fn start_session(&self, context: ContextKey, user_id: UserId) -> Result<SessionView> {
        let config = self.inner.settings.game_config(self.speed_for(&context));
        self.start_with_config(context, user_id, config)
    }

    /// Start a game with explicit tunables (fixed seed for replays and tests)
    pub fn start_with_config(
        &self,
        context: ContextKey,
        user_id: UserId,
        config: GameConfig,
    ) -> Result<SessionView> {
        let mut sessions = lock(&self.inner.sessions);
        if sessions.contains_key(&context) {
            return Err(TrisError::AlreadyRunning);
        }

        let game = Game::new(context.clone(), user_id, config);
        let view = game.view();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(view.clone());

        let actor = SessionActor {
            id,
            next_tick: Instant::now() + game.tick_interval(),
            game,
            rx,
            view_tx,
            registry: Arc::downgrade(&self.inner),
            retired: false,
        };
        tokio::spawn(actor.run());

        sessions.insert(
            context.clone(),
            SessionHandle {
                id,
                tx,
                view: view_rx,
            },
        );
        info!(%context, %user_id, session = id, "game started");
        Ok(view)
    }

    fn sender(&self, context: &ContextKey) -> Result<mpsc::UnboundedSender<SessionMsg>> {
        lock(&self.inner.sessions)
            .get(context)
            .map(|handle| handle.tx.clone())
            .ok_or(TrisError::NoSession)
    }

    /// Send a request to the game's actor and wait for the answer
    async fn request<T>(
        &self,
        context: &ContextKey,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> SessionMsg,
    ) -> Result<T> {
        let tx = self.sender(context)?;
        let (reply, answer) = oneshot::channel();
        // A closed queue or a dropped reply both mean the game ended first
        tx.send(make(reply)).map_err(|_| TrisError::NoSession)?;
        answer.await.map_err(|_| TrisError::NoSession)?
    }

    /// Current state of the game in `context`
    pub async fn get_session(&self, context: &ContextKey) -> Result<SessionView> {
        self.request(context, |reply| SessionMsg::Snapshot { reply })
            .await
    }

    /// Apply a command sequence in order, up to the first action that ends
    /// the game
    pub async fn apply_command(
        &self,
        context: &ContextKey,
        actions: &[Action],
    ) -> Result<CommandOutcome> {
        let actions = actions.to_vec();
        self.request(context, |reply| SessionMsg::Apply { actions, reply })
            .await
    }

    /// Evict the game in `context` and return its result
    pub async fn end_session(&self, context: &ContextKey) -> Result<FinalResult> {
        self.request(context, |reply| SessionMsg::End { reply }).await
    }

    /// Watch every state change of the game in `context`; the receiver
    /// closes when the game ends
    pub fn subscribe(&self, context: &ContextKey) -> Result<watch::Receiver<SessionView>> {
        lock(&self.inner.sessions)
            .get(context)
            .map(|handle| handle.view.clone())
            .ok_or(TrisError::NoSession)
    }

    pub fn is_running(&self, context: &ContextKey) -> bool {
        lock(&self.inner.sessions).contains_key(context)
    }

    pub fn live_sessions(&self) -> usize {
        lock(&self.inner.sessions).len()
    }

    /// Evict every live game
    pub async fn shutdown(&self) -> Vec<FinalResult> {
        let contexts: Vec<_> = lock(&self.inner.sessions).keys().cloned().collect();
        let mut results = Vec::with_capacity(contexts.len());
        for context in contexts {
            // A game that ended on its own meanwhile is already recorded
            if let Ok(result) = self.end_session(&context).await {
                results.push(result);
            }
        }
        results
    }
}

impl Inner {
    /// Drop the registry entry, only if it still belongs to session `id`
    fn remove(&self, context: &ContextKey, id: u64) {
        let mut sessions = lock(&self.sessions);
        if sessions.get(context).is_some_and(|handle| handle.id == id) {
            sessions.remove(context);
        }
    }
}

/// Owns one game; the only place that game is mutated
struct SessionActor {
    id: u64,
    game: Game,
    next_tick: Instant,
    rx: mpsc::UnboundedReceiver<SessionMsg>,
    view_tx: watch::Sender<SessionView>,
    registry: Weak<Inner>,
    retired: bool,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            // An overdue tick goes first so a busy queue cannot hold
            // gravity off; otherwise queued commands win a tie
            if Instant::now() >= self.next_tick {
                self.gravity();
            } else {
                tokio::select! {
                    biased;

                    msg = self.rx.recv() => match msg {
                        Some(msg) => self.handle(msg),
                        None => {
                            debug!(session = self.id, "registry gone, actor stopping");
                            return;
                        }
                    },
                    _ = sleep_until(self.next_tick) => self.gravity(),
                }
            }

            if !self.game.is_running() {
                self.retire();
                self.drain().await;
                return;
            }
        }
    }

    fn gravity(&mut self) {
        self.game.tick();
        self.publish();
        // Uses the level after this tick
        self.next_tick = Instant::now() + self.game.tick_interval();
    }

    fn handle(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Apply { actions, reply } => {
                self.game.apply(&actions);
                self.publish();
                let result = (!self.game.is_running()).then(|| self.retire());
                let _ = reply.send(Ok(CommandOutcome {
                    view: self.game.view(),
                    result,
                }));
            }
            SessionMsg::Snapshot { reply } => {
                let _ = reply.send(Ok(self.game.view()));
            }
            SessionMsg::End { reply } => {
                self.game.end(EndReason::Evicted);
                self.publish();
                let _ = reply.send(Ok(self.retire()));
            }
        }
    }

    fn publish(&self) {
        let view = self.game.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    /// Unregister and record the result; runs once, before anyone hears
    /// the game has ended
    fn retire(&mut self) -> FinalResult {
        let result = self.game.final_result();
        if self.retired {
            return result;
        }
        self.retired = true;

        match self.registry.upgrade() {
            Some(inner) => {
                inner.remove(&result.context, self.id);
                inner.scoreboard.record_final(&result);
                if inner.scoreboard.is_persistent() {
                    // File I/O stays off the runtime threads
                    let scoreboard = Arc::clone(&inner.scoreboard);
                    tokio::task::spawn_blocking(move || {
                        if let Err(e) = scoreboard.save() {
                            warn!("failed to persist scores: {}", e);
                        }
                    });
                }
            }
            None => warn!(session = self.id, "registry gone, result not recorded"),
        }
        info!(
            context = %result.context,
            user = %result.user_id,
            score = result.score,
            reason = ?result.reason,
            "game ended"
        );
        result
    }

    /// Turn away everything still queued
    async fn drain(mut self) {
        self.rx.close();
        while let Some(msg) = self.rx.recv().await {
            match msg {
                SessionMsg::Apply { reply, .. } => {
                    let _ = reply.send(Err(TrisError::NoSession));
                }
                SessionMsg::Snapshot { reply } => {
                    let _ = reply.send(Err(TrisError::NoSession));
                }
                SessionMsg::End { reply } => {
                    let _ = reply.send(Err(TrisError::NoSession));
                }
            }
        }
    }
}

impl Drop for SessionActor {
    fn drop(&mut self) {
        // A panicking actor must not leave its context locked
        if !self.retired {
            if let Some(inner) = self.registry.upgrade() {
                warn!(session = self.id, "actor stopped without ending its game");
                inner.remove(self.game.context(), self.id);
            }
        }
    }
}
