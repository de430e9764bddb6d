use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::best_score::BestScoreStore;
use crate::engine::GameSession;
use crate::rng::RandomSource;
use crate::types::{Intents, SessionSummary, Snapshot};

const COMMAND_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriverCommand {
    Start,
    Restart,
    Intents(Intents),
    Shutdown,
}

#[derive(Clone, Debug)]
pub enum DriverEvent {
    State(Snapshot),
    GameOver {
        summary: SessionSummary,
        best_score: i32,
    },
}

pub struct DriverHandle {
    pub commands: mpsc::Sender<DriverCommand>,
    pub events: mpsc::Receiver<DriverEvent>,
    pub task: JoinHandle<()>,
}

/// Spawns the task that owns `session` and steps it once per `tick`.
///
/// Commands are applied between ticks. State snapshots are dropped when the
/// event queue is full; game-over events wait for room. The task ends on
/// `Shutdown`, when every command sender is gone, or when the event receiver
/// is dropped.
pub fn spawn_session_driver<R>(
    session: GameSession<R>,
    store: Arc<Mutex<BestScoreStore>>,
    tick: Duration,
) -> DriverHandle
where
    R: RandomSource + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let task = tokio::spawn(run_driver(session, store, tick, command_rx, event_tx));
    DriverHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

async fn run_driver<R: RandomSource>(
    mut session: GameSession<R>,
    store: Arc<Mutex<BestScoreStore>>,
    tick: Duration,
    mut commands: mpsc::Receiver<DriverCommand>,
    events: mpsc::Sender<DriverEvent>,
) {
    let tick_ms = tick.as_millis() as u64;
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut intents = Intents::none();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(DriverCommand::Shutdown) => break,
                Some(DriverCommand::Start) | Some(DriverCommand::Restart) => {
                    let best_score = store.lock().await.best_score();
                    session.set_best_score(best_score);
                    if let Err(error) = session.restart() {
                        warn!(%error, "session restart rejected");
                        continue;
                    }
                    intents = Intents::none();
                }
                Some(DriverCommand::Intents(next)) => intents = next,
            },
            _ = interval.tick() => {
                if !session.is_running() {
                    continue;
                }
                session.step(tick_ms, intents);
                let snapshot = session.build_snapshot(true);
                let sent = events.try_send(DriverEvent::State(snapshot));
                if let Err(TrySendError::Closed(_)) = sent {
                    break;
                }
                if !session.is_ended() {
                    continue;
                }

                let summary = session.build_summary();
                let best_score = {
                    let mut store = store.lock().await;
                    store.record_session(&summary);
                    store.best_score()
                };
                let game_over = DriverEvent::GameOver {
                    summary,
                    best_score,
                };
                if events.send(game_over).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!(ticks = session.tick(), "session driver stopped");
}
