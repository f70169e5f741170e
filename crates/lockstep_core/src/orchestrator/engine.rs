//! Engine: owns the stores, stage registry, presenters and input source of
//! a run, and drives them through the run phases.

use std::sync::Arc;

use super::errors::{EngineError, EngineResult};
use super::registry::{StageCatalog, StageRegistry};
use super::scheduler::Scheduler;
use super::stage::StageContext;
use crate::config::Settings;
use crate::input::{InputHandler, InputSource};
use crate::logging::{LogConfig, RunLogger};
use crate::models::{LabelFormat, Modality};
use crate::playback::{PlaybackState, RunPhase, Transition};
use crate::presentation::Presenter;
use crate::storage::{open_source, FrameSource};

/// Handle for stopping a running engine from another thread.
#[derive(Clone)]
pub struct StopHandle {
    playback: Arc<PlaybackState>,
}

impl StopHandle {
    /// Ask the scheduler to exit after the current tick.
    pub fn stop(&self) {
        self.playback.apply(Transition::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        !self.playback.snapshot().running
    }
}

/// The frame-synchronized pipeline engine.
///
/// ```ignore
/// let mut engine = Engine::new(settings, default_catalog(), logger);
/// engine.add_presenter(Box::new(LogPresenter::new(engine.logger())));
/// engine.configure()?;
/// engine.run()?;
/// ```
pub struct Engine {
    settings: Arc<Settings>,
    catalog: StageCatalog,
    logger: Arc<RunLogger>,
    playback: Arc<PlaybackState>,
    phase: RunPhase,
    sources: Vec<Box<dyn FrameSource>>,
    registry: StageRegistry,
    presenters: Vec<Box<dyn Presenter>>,
    input: Option<Box<dyn InputSource>>,
}

impl Engine {
    /// Create an idle engine.
    pub fn new(settings: Settings, catalog: StageCatalog, logger: Arc<RunLogger>) -> Self {
        Self {
            settings: Arc::new(settings),
            catalog,
            logger,
            playback: Arc::new(PlaybackState::new()),
            phase: RunPhase::Idle,
            sources: Vec::new(),
            registry: StageRegistry::default(),
            presenters: Vec::new(),
            input: None,
        }
    }

    /// Create an idle engine logging to `<logs_folder>/<run_name>.log`.
    ///
    /// Fails if the log file cannot be created.
    pub fn with_run_log(
        settings: Settings,
        catalog: StageCatalog,
        run_name: &str,
    ) -> EngineResult<Self> {
        let config = LogConfig::from(&settings.logging);
        let logger = RunLogger::new(run_name, &settings.logging.logs_folder, config, None)
            .map_err(|e| {
                tracing::error!(
                    folder = %settings.logging.logs_folder,
                    error = %e,
                    "Cannot create run log"
                );
                EngineError::Logger(e)
            })?;
        Ok(Self::new(settings, catalog, Arc::new(logger)))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn logger(&self) -> Arc<RunLogger> {
        Arc::clone(&self.logger)
    }

    pub fn playback(&self) -> Arc<PlaybackState> {
        Arc::clone(&self.playback)
    }

    pub fn sources(&self) -> &[Box<dyn FrameSource>] {
        &self.sources
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            playback: Arc::clone(&self.playback),
        }
    }

    pub fn add_presenter(&mut self, presenter: Box<dyn Presenter>) -> &mut Self {
        self.presenters.push(presenter);
        self
    }

    /// Set the input source hooked while running.
    pub fn set_input(&mut self, input: Box<dyn InputSource>) -> &mut Self {
        self.input = Some(input);
        self
    }

    /// Replace the settings used by the next `configure`. Only while idle.
    pub fn set_settings(&mut self, settings: Settings) -> EngineResult<()> {
        self.expect_phase(RunPhase::Idle)?;
        self.settings = Arc::new(settings);
        Ok(())
    }

    /// Largest record count across open stores, minus one (0 when empty).
    pub fn max_frame_index(&self) -> usize {
        self.sources
            .iter()
            .map(|s| s.len())
            .max()
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Build stores and the stage registry from the current settings.
    ///
    /// Only allowed from `Idle`. On failure everything opened so far is
    /// closed and the engine returns to `Idle`.
    pub fn configure(&mut self) -> EngineResult<()> {
        self.transition(RunPhase::Configuring)?;
        self.logger.phase("Configuring");

        match self.build() {
            Ok(()) => {
                self.logger.success(&format!(
                    "Configured {} stores and {} stages, frames 0..={}",
                    self.sources.len(),
                    self.registry.len(),
                    self.max_frame_index()
                ));
                Ok(())
            }
            Err(e) => {
                self.logger.error(&e.to_string());
                self.close_sources();
                self.registry = StageRegistry::default();
                self.phase = RunPhase::Idle;
                Err(e)
            }
        }
    }

    fn build(&mut self) -> EngineResult<()> {
        self.close_sources();

        let settings = Arc::clone(&self.settings);
        let enabled: Vec<Modality> = Modality::ALL
            .into_iter()
            .filter(|m| settings.modality_enabled(*m))
            .collect();

        let label_format = if enabled.contains(&Modality::Label) {
            settings
                .data
                .label
                .lbl_type
                .parse::<LabelFormat>()
                .map_err(EngineError::Configuration)?
        } else {
            LabelFormat::default()
        };

        let io_interval = settings.threads.io_interval();
        for modality in enabled {
            let source = open_source(&settings.data, modality, label_format, io_interval)
                .map_err(|source| EngineError::Store { modality, source })?;
            self.logger
                .info(&format!("{} store: {} records", modality, source.len()));
            self.sources.push(source);
        }

        self.registry = StageRegistry::build(&self.catalog, &settings.proc)?;
        for stage in self.registry.execution_plan() {
            self.logger.debug(&format!("Stage {}", stage));
        }
        Ok(())
    }

    /// Enter `Running`: reset playback and hook the input source.
    pub fn start(&mut self) -> EngineResult<()> {
        self.transition(RunPhase::Running)?;
        let snapshot = self.playback.apply(Transition::Start {
            maximum: self.max_frame_index(),
        });
        self.logger.phase("Running");

        if let Some(input) = self.input.as_mut() {
            if let Err(e) = input.hook(InputHandler::new(Arc::clone(&self.playback))) {
                self.logger.error(&format!("Input hook failed: {}", e));
                self.shutdown()?;
                return Err(EngineError::Input(e));
            }
        }
        tracing::debug!(maximum = snapshot.maximum, "Run started");
        Ok(())
    }

    /// Run the scheduler on the calling thread until stopped. Returns the
    /// number of frames presented.
    pub fn run_scheduler(&mut self) -> EngineResult<usize> {
        self.expect_phase(RunPhase::Running)?;
        let ctx = StageContext::new(Arc::clone(&self.settings), Arc::clone(&self.logger));
        let mut scheduler = Scheduler::new(
            &self.playback,
            &self.sources,
            &self.registry,
            &mut self.presenters,
            &ctx,
            self.settings.threads.tick_interval(),
        );
        Ok(scheduler.run())
    }

    /// `start`, loop until stopped, then `shutdown`.
    pub fn run(&mut self) -> EngineResult<usize> {
        self.start()?;
        let presented = self.run_scheduler();
        self.shutdown()?;
        presented
    }

    /// Leave `Running` (or a configured engine): clear the running flag,
    /// detach input, close stores without waiting and return to `Idle`.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        if self.phase == RunPhase::Idle {
            return Ok(());
        }
        self.transition(RunPhase::Stopping)?;
        self.logger.phase("Stopping");

        self.playback.apply(Transition::Stop);
        if let Some(input) = self.input.as_mut() {
            input.unhook();
        }
        self.close_sources();
        for presenter in self.presenters.iter_mut() {
            presenter.quit();
        }

        self.phase = RunPhase::Idle;
        self.logger.flush();
        Ok(())
    }

    fn close_sources(&mut self) {
        for source in self.sources.drain(..) {
            source.close();
        }
    }

    fn expect_phase(&self, expected: RunPhase) -> EngineResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::invalid_phase(expected, self.phase))
        }
    }

    fn transition(&mut self, next: RunPhase) -> EngineResult<()> {
        if !self.phase.can_transition_to(next) {
            let expected = match next {
                RunPhase::Configuring => RunPhase::Idle,
                RunPhase::Running => RunPhase::Configuring,
                RunPhase::Stopping => RunPhase::Running,
                RunPhase::Idle => RunPhase::Stopping,
            };
            return Err(EngineError::invalid_phase(expected, self.phase));
        }
        tracing::debug!(from = %self.phase, to = %next, "Engine phase change");
        self.phase = next;
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.playback.apply(Transition::Stop);
        if let Some(input) = self.input.as_mut() {
            input.unhook();
        }
        self.close_sources();
    }
}
