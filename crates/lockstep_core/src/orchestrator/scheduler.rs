//! The frame loop: advance, load, run stages, present.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use super::registry::{StageEntry, StageRegistry};
use super::stage::StageContext;
use crate::data_bag::{keys, DataBag};
use crate::models::{Modality, StageGroup};
use crate::playback::{PlaybackState, Transition};
use crate::presentation::Presenter;
use crate::storage::FrameSource;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The run is no longer marked running.
    Stopped,
    /// Frame unchanged; presenters only redrew.
    Redrawn,
    /// Frame `index` was loaded, processed and presented.
    Presented(usize),
}

/// Cooperative loop driving stores, stages and presenters in lockstep with
/// the playback state.
///
/// The scheduler is the only writer of the previous-frame marker and of the
/// data bag. It never holds the playback lock while calling out.
pub struct Scheduler<'a> {
    playback: &'a PlaybackState,
    sources: &'a [Box<dyn FrameSource>],
    registry: &'a StageRegistry,
    presenters: &'a mut [Box<dyn Presenter>],
    ctx: &'a StageContext,
    tick_interval: Duration,
    bag: DataBag,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        playback: &'a PlaybackState,
        sources: &'a [Box<dyn FrameSource>],
        registry: &'a StageRegistry,
        presenters: &'a mut [Box<dyn Presenter>],
        ctx: &'a StageContext,
        tick_interval: Duration,
    ) -> Self {
        Self {
            playback,
            sources,
            registry,
            presenters,
            ctx,
            tick_interval,
            bag: DataBag::new(),
        }
    }

    /// Bag of the most recently presented frame.
    pub fn bag(&self) -> &DataBag {
        &self.bag
    }

    /// Tick until the playback state stops running. Returns the number of
    /// frames presented.
    pub fn run(&mut self) -> usize {
        let mut presented = 0;
        loop {
            match self.tick() {
                TickOutcome::Stopped => break,
                TickOutcome::Presented(_) => presented += 1,
                TickOutcome::Redrawn => {}
            }
            if !self.tick_interval.is_zero() {
                thread::sleep(self.tick_interval);
            }
        }
        self.ctx
            .logger
            .info(&format!("Scheduler stopped after {} frames", presented));
        presented
    }

    /// One iteration of the loop, without the trailing sleep.
    pub fn tick(&mut self) -> TickOutcome {
        let snapshot = self.playback.apply(Transition::Tick);
        if !snapshot.running {
            return TickOutcome::Stopped;
        }

        if !snapshot.frame_changed() {
            for presenter in self.presenters.iter_mut() {
                presenter.redraw();
            }
            return TickOutcome::Redrawn;
        }

        let index = snapshot.current;
        self.playback.apply(Transition::MarkShown(index));
        self.ctx.logger.tick(&format!("Frame {}", index));

        self.load_frame(index);
        self.run_stages();

        for presenter in self.presenters.iter_mut() {
            presenter.update(&self.bag);
            presenter.redraw();
        }
        TickOutcome::Presented(index)
    }

    fn load_frame(&mut self, index: usize) {
        let mut bag = std::mem::take(&mut self.bag).next_frame();
        for modality in Modality::ALL {
            bag.clear_modality(modality);
        }
        bag.insert(keys::FRAME_INDEX, index);

        for source in self.sources {
            if index >= source.len() {
                self.ctx.logger.debug(&format!(
                    "No {} record for frame {} ({} records)",
                    source.modality(),
                    index,
                    source.len()
                ));
                bag.clear_modality(source.modality());
                continue;
            }
            if let Err(e) = source.load_into(index, &mut bag) {
                self.ctx.logger.error(&format!(
                    "Failed to read {} frame {}: {}",
                    source.modality(),
                    index,
                    e
                ));
                bag.clear_modality(source.modality());
            }
        }
        self.bag = bag;
    }

    /// A group runs when its modality has a store; `post` always runs.
    fn group_active(&self, group: StageGroup) -> bool {
        match group.modality() {
            Some(modality) => self.sources.iter().any(|s| s.modality() == modality),
            None => true,
        }
    }

    fn run_stages(&mut self) {
        for group in StageGroup::EXECUTION_ORDER {
            if !self.group_active(group) {
                continue;
            }
            for entry in self.registry.group(group) {
                run_isolated(group, entry, &mut self.bag, self.ctx);
            }
        }
    }
}

/// Run one stage, containing both returned errors and panics.
fn run_isolated(group: StageGroup, entry: &StageEntry, bag: &mut DataBag, ctx: &StageContext) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| entry.stage().run(bag, ctx)));
    let failure = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            format!("panicked: {}", message)
        }
    };
    ctx.logger.error(&format!(
        "Stage '{}/{}' failed: {}",
        group,
        entry.name(),
        failure
    ));
    ctx.logger.show_tail(entry.name());
}
