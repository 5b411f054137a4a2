//! Measurement coordinator.
//!
//! The coordinator is the fan-in/fan-out point of the pipeline. Once per cycle it walks the
//! registered sources in order, ticks each running one, and passes any ready measurement to
//! every recorder in the [`MeasurementDataStore`] before moving on to the next source.
//!
//! ## Lifecycle
//!
//! The coordinator is a [`Component`] itself. Its `init`/`start`/`stop`/`reset` run the same
//! transition on every registered source, then on every recorder, and stop at the first
//! component that refuses. A refused `init` resets, and a refused `start` stops, the
//! components that had already moved, so the request can be retried once the culprit is
//! fixed or removed. Children already running or stopped are left alone by `start` and
//! `stop`. Its `tick` runs one measurement cycle.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut coordinator: MeasurementCoordinator<'_, Board> = MeasurementCoordinator::new();
//! coordinator.add_source(Source::PulseCounter(&mut bnc1))?;
//! coordinator.add_source(Source::Serial(&mut instrument))?;
//! coordinator.store_mut().add_observer(Recorder::WiFi(&mut wifi))?;
//! coordinator.store_mut().add_observer(Recorder::Cache(&mut cache))?;
//! coordinator.init()?;
//! coordinator.start()?;
//! loop {
//!     coordinator.tick()?;
//! }
//! ```

use crate::consts::MAX_SOURCES;
use crate::error::{LifecycleError, RegistryError};
use crate::lifecycle::{Component, ComponentState, StateMachine};
use crate::measurement::MeasurementDeviceId;
use crate::platform::Platform;
use crate::registry::Registry;
use crate::source::Source;
use crate::store::MeasurementDataStore;

type LifecycleOp = fn(&mut dyn Component) -> Result<(), LifecycleError>;

/// What happened during one measurement cycle.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CycleReport {
    /// Running sources that were polled.
    pub sources_polled: usize,
    /// Measurements read from sources and handed to the recorders.
    pub measurements: usize,
    /// Recorder notifications that failed.
    pub recorder_failures: usize,
}

/// Polls sources and drives recorders.
#[derive(Debug)]
pub struct MeasurementCoordinator<'a, P: Platform> {
    sm: StateMachine,
    sources: Registry<Source<'a, P>, MAX_SOURCES>,
    store: MeasurementDataStore<'a, P>,
    last_cycle: CycleReport,
}

impl<'a, P: Platform> MeasurementCoordinator<'a, P> {
    /// Creates a coordinator with no sources and an empty data store.
    pub const fn new() -> Self {
        Self {
            sm: StateMachine::new(),
            sources: Registry::new(),
            store: MeasurementDataStore::new(),
            last_cycle: CycleReport {
                sources_polled: 0,
                measurements: 0,
                recorder_failures: 0,
            },
        }
    }

    /// Registers a source after the existing ones.
    ///
    /// # Errors
    /// [`RegistryError::Full`] once [`MAX_SOURCES`] are registered.
    pub fn add_source(&mut self, source: Source<'a, P>) -> Result<(), RegistryError> {
        self.sources.add(source)
    }

    /// Unregisters the source reporting as `id` and hands it back.
    pub fn remove_source(&mut self, id: MeasurementDeviceId) -> Option<Source<'a, P>> {
        self.sources.remove_where(|s| s.id() == id)
    }

    /// Registered sources in order.
    pub fn sources(&self) -> impl Iterator<Item = &Source<'a, P>> {
        self.sources.iter()
    }

    /// The recorder side.
    pub fn store(&self) -> &MeasurementDataStore<'a, P> {
        &self.store
    }

    /// The recorder side, mutably.
    pub fn store_mut(&mut self) -> &mut MeasurementDataStore<'a, P> {
        &mut self.store
    }

    /// Report of the last cycle run by [`tick`](Component::tick).
    pub fn last_cycle(&self) -> CycleReport {
        self.last_cycle
    }

    /// Runs one measurement cycle.
    ///
    /// Each running source is ticked, then asked for a measurement; a measurement reaches
    /// every recorder before the next source is looked at. Sources that are not running are
    /// skipped.
    pub fn update_measurements(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        for source in self.sources.iter_mut() {
            if source.state() != ComponentState::Running {
                continue;
            }
            report.sources_polled += 1;
            if let Err(e) = source.tick() {
                warn!("coordinator: {:?} tick failed, {:?}", source.id(), e);
            }
            if !source.is_measurement_available() {
                continue;
            }
            if let Some(measurement) = source.measurement() {
                report.measurements += 1;
                report.recorder_failures += self.store.notify_observers(&measurement).failed;
            }
        }
        report
    }

    /// Applies `op` to every source, then every recorder, stopping at the first refusal.
    ///
    /// On a refusal the components that had already accepted are handed to `undo`, so a
    /// failed fan-out leaves the children where they were and can be retried.
    fn fan_out(&mut self, op: LifecycleOp, undo: Option<LifecycleOp>) -> bool {
        let done = match self.for_each_component(op) {
            Ok(()) => return true,
            Err(done) => done,
        };
        if let Some(undo) = undo {
            let sources_done = done.min(self.sources.len());
            for source in self.sources.iter_mut().take(sources_done) {
                if let Err(e) = undo(source) {
                    warn!("coordinator: rollback of {:?} failed, {:?}", source.id(), e);
                }
            }
            for recorder in self.store.recorders_mut().take(done - sources_done) {
                if let Err(e) = undo(recorder) {
                    warn!("coordinator: rollback of {:?} failed, {:?}", recorder.kind(), e);
                }
            }
        }
        false
    }

    /// Returns the number of components that accepted `op` before one refused.
    fn for_each_component(&mut self, op: LifecycleOp) -> Result<(), usize> {
        let mut done = 0;
        for source in self.sources.iter_mut() {
            if let Err(e) = op(source) {
                warn!("coordinator: source {:?} refused, {:?}", source.id(), e);
                return Err(done);
            }
            done += 1;
        }
        for recorder in self.store.recorders_mut() {
            if let Err(e) = op(recorder) {
                warn!("coordinator: {:?} recorder refused, {:?}", recorder.kind(), e);
                return Err(done);
            }
            done += 1;
        }
        Ok(())
    }
}

impl<P: Platform> Default for MeasurementCoordinator<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> Component for MeasurementCoordinator<'_, P> {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    fn on_init(&mut self) -> bool {
        let undo: LifecycleOp = |c| c.reset();
        self.fan_out(|c| c.init(), Some(undo))
    }

    fn on_start(&mut self) -> bool {
        let undo: LifecycleOp = |c| c.stop();
        let started = self.fan_out(
            |c| match c.state() {
                ComponentState::Running => Ok(()),
                _ => c.start(),
            },
            Some(undo),
        );
        if started {
            info!(
                "coordinator: started, {} sources, {} recorders",
                self.sources.len(),
                self.store.len()
            );
        }
        started
    }

    fn on_stop(&mut self) -> bool {
        let stopped = self.fan_out(
            |c| match c.state() {
                ComponentState::Stopped => Ok(()),
                _ => c.stop(),
            },
            None,
        );
        if stopped {
            info!("coordinator: stopped");
        }
        stopped
    }

    fn on_reset(&mut self) -> bool {
        self.last_cycle = CycleReport::default();
        self.fan_out(|c| c.reset(), None)
    }

    fn on_tick(&mut self) -> bool {
        self.last_cycle = self.update_measurements();
        true
    }
}
