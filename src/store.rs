//! Measurement data store: the recorder side of the fan-out.

use crate::consts::MAX_RECORDERS;
use crate::error::{RecordError, RegistryError};
use crate::measurement::{Measurement, MeasurementDeviceId};
use crate::platform::Platform;
use crate::recorder::{MeasurementReader, Recorder, RecorderKind};
use crate::registry::Registry;

/// Outcome of handing one measurement to every recorder.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct NotifyReport {
    /// Recorders that were handed the measurement.
    pub notified: usize,
    /// Recorders among them that failed.
    pub failed: usize,
    /// The last failure, if any.
    pub last_error: Option<RecordError>,
}

/// Holds the registered recorders and notifies them in registration order.
///
/// A failing recorder never stops the others from being notified, and is not retried.
#[derive(Debug)]
pub struct MeasurementDataStore<'a, P: Platform> {
    recorders: Registry<Recorder<'a, P>, MAX_RECORDERS>,
}

impl<'a, P: Platform> MeasurementDataStore<'a, P> {
    /// Creates a store with no recorders.
    pub const fn new() -> Self {
        Self {
            recorders: Registry::new(),
        }
    }

    /// Registers a recorder after the existing ones.
    ///
    /// # Errors
    /// [`RegistryError::Full`] once [`MAX_RECORDERS`] are registered.
    pub fn add_observer(&mut self, recorder: Recorder<'a, P>) -> Result<(), RegistryError> {
        self.recorders.add(recorder)
    }

    /// Unregisters the first recorder of `kind` and hands it back.
    pub fn remove_observer(&mut self, kind: RecorderKind) -> Option<Recorder<'a, P>> {
        self.recorders.remove_where(|r| r.kind() == kind)
    }

    /// Hands `measurement` to every registered recorder.
    pub fn notify_observers(&mut self, measurement: &Measurement) -> NotifyReport {
        let mut report = NotifyReport::default();
        for recorder in self.recorders.iter_mut() {
            report.notified += 1;
            if let Err(e) = recorder.notify(measurement) {
                warn!("data store: {:?} recorder failed, {:?}", recorder.kind(), e);
                report.failed += 1;
                report.last_error = Some(e);
            }
        }
        report
    }

    /// Latest value cached for `source` by the first cache recorder, 0 without one.
    pub fn latest_measurement(&self, source: MeasurementDeviceId) -> u32 {
        self.recorders
            .iter()
            .find_map(Recorder::as_reader)
            .map_or(0, |reader| MeasurementReader::latest_measurement(reader, source))
    }

    /// Registered recorders in order.
    pub fn recorders(&self) -> impl Iterator<Item = &Recorder<'a, P>> {
        self.recorders.iter()
    }

    /// Registered recorders in order, mutably.
    pub fn recorders_mut(&mut self) -> impl Iterator<Item = &mut Recorder<'a, P>> {
        self.recorders.iter_mut()
    }

    /// Number of registered recorders.
    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    /// `true` if no recorder is registered.
    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

impl<P: Platform> Default for MeasurementDataStore<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}
