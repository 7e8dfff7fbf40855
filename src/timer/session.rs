use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::{
    error::TrackerError,
    store::{create_project, project_store::ProjectStore, projects::Projects},
    utils::clock::Clock,
};

use super::{
    state::{Effect, TimerEvent, TimerState, Transition},
    ticker::Ticker,
    StatusSink, TimerConfig,
};

/// Drives [TimerState] against a real store. Every operation computes a [Transition] and only
/// commits it once all requested persistence succeeded, so a failed save leaves both the state
/// and the in-memory projects exactly as they were.
pub struct SessionTimer<S: ProjectStore> {
    store: S,
    projects: Projects,
    state: TimerState,
    displayed_total: f64,
    ticker: Ticker,
    clock: Arc<dyn Clock>,
    sink: Box<dyn StatusSink>,
    config: TimerConfig,
}

impl<S: ProjectStore> SessionTimer<S> {
    /// Loads projects from the store once. Later changes go only through this timer.
    pub async fn new(
        store: S,
        clock: Arc<dyn Clock>,
        sink: Box<dyn StatusSink>,
        config: TimerConfig,
    ) -> Self {
        let projects = store.load().await;
        Self {
            store,
            projects,
            state: TimerState::Idle,
            displayed_total: 0.,
            ticker: Ticker::new(config.tick_period, clock.clone()),
            clock,
            sink,
            config,
        }
    }

    pub fn projects(&self) -> &Projects {
        &self.projects
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn displayed_total(&self) -> f64 {
        self.displayed_total
    }

    pub fn sink(&mut self) -> &mut dyn StatusSink {
        self.sink.as_mut()
    }

    pub async fn create(&mut self, name: &str) -> Result<(), TrackerError> {
        create_project(&self.store, &mut self.projects, name).await
    }

    /// Selects a project. A running session is stopped and saved first.
    #[instrument(skip(self))]
    pub async fn load(&mut self, name: &str) -> Result<(), TrackerError> {
        self.dispatch(TimerEvent::Load(name)).await
    }

    pub async fn start(&mut self) -> Result<(), TrackerError> {
        self.dispatch(TimerEvent::Start).await
    }

    /// Refreshes the displayed total and checkpoints if enough time has passed.
    pub async fn tick(&mut self) -> Result<(), TrackerError> {
        self.dispatch(TimerEvent::Tick).await
    }

    pub async fn stop(&mut self) -> Result<(), TrackerError> {
        self.dispatch(TimerEvent::Stop).await
    }

    /// Resolves when the next tick is due. Never resolves unless a session is running.
    pub async fn wait_for_tick(&mut self) {
        self.ticker.tick().await;
    }

    async fn dispatch(&mut self, event: TimerEvent<'_>) -> Result<(), TrackerError> {
        let now = self.clock.instant();
        let transition = self
            .state
            .apply(event, &self.projects, now, &self.config)?;
        debug!("{event:?} moves {:?} to {:?}", self.state, transition.state);

        if transition.credits() {
            let projects = self.persist(&transition).await.inspect_err(|e| {
                error!("Failed to persist after {event:?}, keeping previous state: {e}")
            })?;
            self.projects = projects;
            if let Some(project) = self.state.project() {
                info!(
                    "Saved {project} with {} hours",
                    self.projects.hours(project).unwrap_or_default()
                );
            }
        }

        let Transition { state, effects } = transition;
        self.state = state;

        for effect in effects {
            match effect {
                Effect::Display(hours) => {
                    self.displayed_total = hours;
                    self.sink.show_total(hours);
                }
                Effect::ArmTicks => self.ticker.arm(now),
                Effect::CancelTicks => self.ticker.cancel(),
                Effect::Credit { .. } | Effect::Persist => (),
            }
        }
        Ok(())
    }

    /// Applies credits onto a copy of the projects and saves it.
    async fn persist(&self, transition: &Transition) -> Result<Projects, TrackerError> {
        let mut projects = self.projects.clone();
        for effect in &transition.effects {
            match effect {
                Effect::Credit { project, hours } => {
                    projects.add_hours(project, *hours)?;
                }
                Effect::Persist => self.store.save(&projects).await?,
                _ => (),
            }
        }
        Ok(projects)
    }
}
