use tokio::time::Instant;

use crate::{
    error::TrackerError,
    store::projects::{validate_name, Projects},
    utils::time::duration_to_hours,
};

use super::TimerConfig;

/// One contiguous run of the timer for one project. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub project: String,
    pub start_instant: Instant,
    pub last_checkpoint_instant: Instant,
}

impl Session {
    fn new(project: String, now: Instant) -> Self {
        Self {
            project,
            start_instant: now,
            last_checkpoint_instant: now,
        }
    }

    /// Hours measured since the last time they were credited to the project.
    pub fn unflushed_hours(&self, now: Instant) -> f64 {
        duration_to_hours(now.saturating_duration_since(self.start_instant))
    }

    fn checkpoint_due(&self, now: Instant, config: &TimerConfig) -> bool {
        now.saturating_duration_since(self.last_checkpoint_instant) >= config.checkpoint_interval
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Loaded {
        project: String,
    },
    Running(Session),
}

impl TimerState {
    pub fn project(&self) -> Option<&str> {
        match self {
            TimerState::Idle => None,
            TimerState::Loaded { project } => Some(project.as_str()),
            TimerState::Running(session) => Some(session.project.as_str()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent<'a> {
    Load(&'a str),
    Start,
    Tick,
    Stop,
}

/// Side effect a transition asks for. Effects are applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Add hours to the project's stored total.
    Credit { project: String, hours: f64 },
    /// Write the whole store to the disk.
    Persist,
    /// Show a total to the user.
    Display(f64),
    /// Begin periodic ticks.
    ArmTicks,
    /// Stop periodic ticks. No tick may fire afterwards.
    CancelTicks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TimerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &TimerState) -> Self {
        Self {
            state: state.clone(),
            effects: vec![],
        }
    }

    /// Returns true if applying the transition changes stored hours.
    pub fn credits(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::Credit { .. }))
    }
}

impl TimerState {
    /// Computes what happens when `event` arrives at `now`. The current state and `projects` are
    /// never touched; the caller is responsible for applying the returned effects and
    /// committing the new state.
    pub fn apply(
        &self,
        event: TimerEvent<'_>,
        projects: &Projects,
        now: Instant,
        config: &TimerConfig,
    ) -> Result<Transition, TrackerError> {
        match event {
            TimerEvent::Load(name) => self.load(name, projects, now),
            TimerEvent::Start => self.start(now),
            TimerEvent::Tick => Ok(self.tick(projects, now, config)),
            TimerEvent::Stop => Ok(self.stop(projects, now)),
        }
    }

    fn load(&self, name: &str, projects: &Projects, now: Instant) -> Result<Transition, TrackerError> {
        // Same normalization as on creation, so " Thesis " finds "Thesis".
        let name = validate_name(name)?;
        let stored = projects
            .hours(name)
            .ok_or_else(|| TrackerError::UnknownProject(name.to_owned()))?;

        let mut effects = vec![];
        let mut displayed = stored;

        // Switching while running stops the previous session first, so its time gets saved.
        if let TimerState::Running(session) = self {
            let hours = session.unflushed_hours(now);
            if session.project == name {
                displayed += hours;
            }
            effects.extend([
                Effect::CancelTicks,
                Effect::Credit {
                    project: session.project.clone(),
                    hours,
                },
                Effect::Persist,
            ]);
        }
        effects.push(Effect::Display(displayed));

        Ok(Transition {
            state: TimerState::Loaded {
                project: name.to_owned(),
            },
            effects,
        })
    }

    fn start(&self, now: Instant) -> Result<Transition, TrackerError> {
        match self {
            TimerState::Idle => Err(TrackerError::NoProjectSelected),
            TimerState::Loaded { project } => Ok(Transition {
                state: TimerState::Running(Session::new(project.clone(), now)),
                effects: vec![Effect::ArmTicks],
            }),
            TimerState::Running(_) => Ok(Transition::unchanged(self)),
        }
    }

    fn tick(&self, projects: &Projects, now: Instant, config: &TimerConfig) -> Transition {
        let TimerState::Running(session) = self else {
            return Transition::unchanged(self);
        };

        let stored = projects.hours(&session.project).unwrap_or_default();
        let hours = session.unflushed_hours(now);
        let displayed = Effect::Display(stored + hours);

        if !session.checkpoint_due(now, config) {
            return Transition {
                state: self.clone(),
                effects: vec![displayed],
            };
        }

        Transition {
            state: TimerState::Running(Session::new(session.project.clone(), now)),
            effects: vec![
                Effect::Credit {
                    project: session.project.clone(),
                    hours,
                },
                Effect::Persist,
                displayed,
            ],
        }
    }

    fn stop(&self, projects: &Projects, now: Instant) -> Transition {
        let TimerState::Running(session) = self else {
            return Transition::unchanged(self);
        };

        let stored = projects.hours(&session.project).unwrap_or_default();
        let hours = session.unflushed_hours(now);

        Transition {
            state: TimerState::Loaded {
                project: session.project.clone(),
            },
            effects: vec![
                Effect::CancelTicks,
                Effect::Credit {
                    project: session.project.clone(),
                    hours,
                },
                Effect::Persist,
                Effect::Display(stored + hours),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::{
        error::TrackerError,
        store::projects::Projects,
        timer::{
            state::{Effect, Session, TimerEvent, TimerState},
            TimerConfig,
        },
    };

    fn projects() -> Projects {
        [("Thesis", 1.), ("Garden", 2.)].into_iter().collect()
    }

    fn running(project: &str, at: Instant) -> TimerState {
        TimerState::Running(Session {
            project: project.into(),
            start_instant: at,
            last_checkpoint_instant: at,
        })
    }

    #[test]
    fn test_load_unknown() {
        let now = Instant::now();
        let result = TimerState::Idle.apply(
            TimerEvent::Load("ghost"),
            &Projects::new(),
            now,
            &TimerConfig::default(),
        );
        assert!(matches!(result, Err(TrackerError::UnknownProject(name)) if name == "ghost"));
    }

    #[test]
    fn test_load_displays_stored() {
        let now = Instant::now();
        let transition = TimerState::Idle
            .apply(TimerEvent::Load("Garden"), &projects(), now, &TimerConfig::default())
            .unwrap();
        assert_eq!(
            transition.state,
            TimerState::Loaded {
                project: "Garden".into()
            }
        );
        assert_eq!(transition.effects, vec![Effect::Display(2.)]);
        assert!(!transition.credits());
    }

    #[test]
    fn test_load_trims_name() {
        let now = Instant::now();
        let transition = TimerState::Idle
            .apply(TimerEvent::Load(" Garden  "), &projects(), now, &TimerConfig::default())
            .unwrap();
        assert_eq!(
            transition.state,
            TimerState::Loaded {
                project: "Garden".into()
            }
        );

        let result = running("Thesis", now).apply(
            TimerEvent::Load("   "),
            &projects(),
            now,
            &TimerConfig::default(),
        );
        assert!(matches!(result, Err(TrackerError::InvalidProjectName)));
    }

    #[test]
    fn test_start_without_project() {
        let result = TimerState::Idle.apply(
            TimerEvent::Start,
            &projects(),
            Instant::now(),
            &TimerConfig::default(),
        );
        assert!(matches!(result, Err(TrackerError::NoProjectSelected)));
    }

    #[test]
    fn test_start_arms_ticks() {
        let now = Instant::now();
        let loaded = TimerState::Loaded {
            project: "Thesis".into(),
        };
        let transition = loaded
            .apply(TimerEvent::Start, &projects(), now, &TimerConfig::default())
            .unwrap();
        assert_eq!(transition.state, running("Thesis", now));
        assert_eq!(transition.effects, vec![Effect::ArmTicks]);

        let again = transition
            .state
            .apply(TimerEvent::Start, &projects(), now, &TimerConfig::default())
            .unwrap();
        assert_eq!(again.state, transition.state);
        assert!(again.effects.is_empty());
    }

    #[test]
    fn test_tick_before_checkpoint() {
        let start = Instant::now();
        let now = start + Duration::from_secs(30);
        let state = running("Thesis", start);

        let transition = state
            .apply(TimerEvent::Tick, &projects(), now, &TimerConfig::default())
            .unwrap();

        assert_eq!(transition.state, state);
        assert_eq!(
            transition.effects,
            vec![Effect::Display(1. + 30. / 3600.)]
        );
    }

    #[test]
    fn test_tick_checkpoints() {
        let start = Instant::now();
        let now = start + Duration::from_secs(60);
        let state = running("Thesis", start);

        let transition = state
            .apply(TimerEvent::Tick, &projects(), now, &TimerConfig::default())
            .unwrap();

        assert_eq!(transition.state, running("Thesis", now));
        assert_eq!(
            transition.effects,
            vec![
                Effect::Credit {
                    project: "Thesis".into(),
                    hours: 60. / 3600.
                },
                Effect::Persist,
                Effect::Display(1. + 60. / 3600.),
            ]
        );
    }

    #[test]
    fn test_tick_when_not_running() {
        let loaded = TimerState::Loaded {
            project: "Thesis".into(),
        };
        for state in [TimerState::Idle, loaded] {
            let transition = state
                .apply(
                    TimerEvent::Tick,
                    &projects(),
                    Instant::now(),
                    &TimerConfig::default(),
                )
                .unwrap();
            assert_eq!(transition.state, state);
            assert!(transition.effects.is_empty());
        }
    }

    #[test]
    fn test_stop_credits() {
        let start = Instant::now();
        let now = start + Duration::from_secs(90);

        let transition = running("Garden", start)
            .apply(TimerEvent::Stop, &projects(), now, &TimerConfig::default())
            .unwrap();

        assert_eq!(
            transition.state,
            TimerState::Loaded {
                project: "Garden".into()
            }
        );
        assert_eq!(
            transition.effects,
            vec![
                Effect::CancelTicks,
                Effect::Credit {
                    project: "Garden".into(),
                    hours: 0.025
                },
                Effect::Persist,
                Effect::Display(2. + 90. / 3600.),
            ]
        );
    }

    #[test]
    fn test_stop_when_not_running() {
        let loaded = TimerState::Loaded {
            project: "Thesis".into(),
        };
        let transition = loaded
            .apply(
                TimerEvent::Stop,
                &projects(),
                Instant::now(),
                &TimerConfig::default(),
            )
            .unwrap();
        assert_eq!(transition.state, loaded);
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn test_load_while_running_stops_first() {
        let start = Instant::now();
        let now = start + Duration::from_secs(36);

        let transition = running("Thesis", start)
            .apply(TimerEvent::Load("Garden"), &projects(), now, &TimerConfig::default())
            .unwrap();

        assert_eq!(
            transition.state,
            TimerState::Loaded {
                project: "Garden".into()
            }
        );
        assert_eq!(
            transition.effects,
            vec![
                Effect::CancelTicks,
                Effect::Credit {
                    project: "Thesis".into(),
                    hours: 0.01
                },
                Effect::Persist,
                Effect::Display(2.),
            ]
        );
    }

    #[test]
    fn test_reload_running_project() {
        let start = Instant::now();
        let now = start + Duration::from_secs(36);

        let transition = running("Thesis", start)
            .apply(TimerEvent::Load("Thesis"), &projects(), now, &TimerConfig::default())
            .unwrap();

        assert!(transition.credits());
        assert_eq!(transition.effects.last(), Some(&Effect::Display(1. + 36. / 3600.)));
    }

    #[test]
    fn test_load_unknown_while_running_keeps_session() {
        let start = Instant::now();
        let state = running("Thesis", start);
        let result = state.apply(
            TimerEvent::Load("ghost"),
            &projects(),
            start + Duration::from_secs(5),
            &TimerConfig::default(),
        );
        assert!(matches!(result, Err(TrackerError::UnknownProject(_))));
        assert!(state.is_running());
    }
}
