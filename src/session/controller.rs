use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{transition, Effect, Event, Phase, QuizSummary, SessionState};
use crate::error::TransitionError;
use crate::generator::QuizSource;
use crate::model::{Difficulty, QuizConfig, TopicSelection};

struct Inner {
    state: SessionState,
    /// Bumped whenever a round starts or is reset; a generation result is applied only
    /// if the round it was requested for is still current.
    round: u64,
    updates: watch::Sender<SessionState>,
}

impl Inner {
    fn commit(&mut self, state: SessionState) {
        if state != self.state {
            self.state = state;
            self.updates.send_replace(self.state.clone());
        }
    }
}

/// Owns the session state and drives it with user actions and generation outcomes.
///
/// Cloning is cheap and every clone controls the same session, so a front-end can keep
/// one clone awaiting [`start`](Self::start) while another handles `reset`.
#[derive(Clone)]
pub struct QuizController {
    source: Arc<dyn QuizSource>,
    difficulty: Difficulty,
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for QuizController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizController")
            .field("source", &self.source)
            .field("difficulty", &self.difficulty)
            .field("state", &self.lock().state)
            .finish()
    }
}

impl QuizController {
    pub fn new(source: Arc<dyn QuizSource>) -> Self {
        let (updates, _) = watch::channel(SessionState::default());
        Self {
            source,
            difficulty: Difficulty::default(),
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::default(),
                round: 0,
                updates,
            })),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.lock().updates.subscribe()
    }

    pub fn summary(&self) -> Option<QuizSummary> {
        QuizSummary::from_state(&self.lock().state)
    }

    /// Resolve the topic, request a quiz and wait for it.
    ///
    /// Generation failures are not returned: they move the session to `Error`. A start
    /// while a quiz is already loading does nothing. If the round was reset while the
    /// request was in flight, its result is dropped.
    #[instrument(target = "topic_quiz::session", skip(self, topic))]
    pub async fn start(&self, topic: impl Into<TopicSelection>) -> Result<(), TransitionError> {
        let config = QuizConfig::new(topic.into().resolve()).with_difficulty(self.difficulty);

        let (effect, round) = {
            let mut inner = self.lock();
            let t = transition(&inner.state, Event::Start(config))?;
            if t.effect.is_some() {
                inner.round += 1;
            }
            inner.commit(t.state);
            (t.effect, inner.round)
        };

        let Some(Effect::RequestQuiz(config)) = effect else {
            debug!("Start ignored, a quiz is already loading");
            return Ok(());
        };

        info!(round, topic = %config.topic, difficulty = %config.difficulty, "Starting round");
        let event = match self.source.generate(&config).await {
            Ok(questions) => Event::QuizReady(questions),
            Err(e) => {
                warn!(round, error = %e, kind = ?e.kind(), "Quiz generation failed");
                Event::QuizFailed(e.kind())
            }
        };

        let mut inner = self.lock();
        if inner.round != round || inner.state.phase != Phase::Loading {
            info!(round, current_round = inner.round, "Discarding result of a stale round");
            return Ok(());
        }
        let t = transition(&inner.state, event)?;
        inner.commit(t.state);
        debug!(phase = ?inner.state.phase, "Round ready");
        Ok(())
    }

    /// Record an answer for the current question. Repeated answers are ignored.
    pub fn answer(&self, option_index: usize) -> Result<(), TransitionError> {
        self.apply(Event::Answer(option_index))
    }

    /// Move to the next question, or finish after the last one.
    pub fn advance(&self) -> Result<(), TransitionError> {
        self.apply(Event::Advance)
    }

    /// Discard the round and return to Idle. Any in-flight generation result will be ignored.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.round += 1;
        inner.commit(SessionState::default());
        debug!(round = inner.round, "Session reset");
    }

    fn apply(&self, event: Event) -> Result<(), TransitionError> {
        let mut inner = self.lock();
        let name = event.name();
        let t = transition(&inner.state, event).map_err(|e| {
            debug!(event = name, error = %e, "Event rejected");
            e
        })?;
        inner.commit(t.state);
        Ok(())
    }
}
