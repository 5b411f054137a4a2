//! Measurement sources.
//!
//! A source answers two questions each cycle: is a value ready, and what is it. The
//! coordinator asks them through the closed [`Source`] enum, which borrows one of the
//! concrete sources below. Every source is a [`Component`]; the capability methods only
//! report data while it is running.

use crate::lifecycle::{Component, ComponentState, StateMachine};
use crate::measurement::{Measurement, MeasurementDeviceId};
use crate::platform::Platform;
use crate::pulse::PulseCounter;
use crate::receiver::{FrameReceiver, RxStatus};
use crate::serial::SerialPort;

/// Reports the count of one BNC pulse input.
#[derive(Debug)]
pub struct PulseCounterSource<C> {
    sm: StateMachine,
    id: MeasurementDeviceId,
    counter: C,
}

impl<C: PulseCounter> PulseCounterSource<C> {
    /// Creates a source reporting `counter` as `id`.
    pub fn new(id: MeasurementDeviceId, counter: C) -> Self {
        Self {
            sm: StateMachine::new(),
            id,
            counter,
        }
    }

    /// Device this source reports as.
    pub fn id(&self) -> MeasurementDeviceId {
        self.id
    }

    /// The underlying counter.
    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// A running pulse counter always has a value.
    pub fn is_measurement_available(&self) -> bool {
        self.state() == ComponentState::Running
    }

    /// The current count as a 32-bit measurement.
    pub fn measurement(&mut self) -> Option<Measurement> {
        self.is_measurement_available()
            .then(|| Measurement::new(self.id, self.counter.read()))
    }
}

impl<C: PulseCounter> Component for PulseCounterSource<C> {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    fn on_init(&mut self) -> bool {
        self.counter.clear();
        true
    }

    fn on_start(&mut self) -> bool {
        true
    }

    fn on_stop(&mut self) -> bool {
        true
    }

    fn on_reset(&mut self) -> bool {
        self.counter.clear();
        true
    }
}

/// Reports measurements framed by an instrument on a serial link.
///
/// Each tick advances the frame receiver. A verified frame becomes the pending
/// measurement, tagged with this source's id; any fault is logged and dropped. Either way
/// the receiver is re-armed for the next frame.
#[derive(Debug)]
pub struct SerialSource<S, B> {
    sm: StateMachine,
    id: MeasurementDeviceId,
    rx: FrameReceiver<S, B>,
    pending: Option<Measurement>,
}

impl<S, B> SerialSource<S, B>
where
    S: SerialPort,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Creates a source that reads frames from `port` into `buf`.
    ///
    /// # Arguments
    /// * `id` - device the measurements are reported as
    /// * `port` - serial link to the instrument
    /// * `buf` - receive buffer; starting fails without one
    /// * `timeout_ticks` - ticks of silence after which a partial frame is dropped
    pub fn new(
        id: MeasurementDeviceId,
        port: S,
        buf: Option<B>,
        timeout_ticks: Option<u32>,
    ) -> Self {
        Self {
            sm: StateMachine::new(),
            id,
            rx: FrameReceiver::new(port, buf, timeout_ticks),
            pending: None,
        }
    }

    /// Device this source reports as.
    pub fn id(&self) -> MeasurementDeviceId {
        self.id
    }

    /// The frame receiver.
    pub fn receiver(&self) -> &FrameReceiver<S, B> {
        &self.rx
    }

    /// The frame receiver, mutably.
    pub fn receiver_mut(&mut self) -> &mut FrameReceiver<S, B> {
        &mut self.rx
    }

    /// `true` if a frame arrived since the last [`measurement`](Self::measurement).
    pub fn is_measurement_available(&self) -> bool {
        self.pending.is_some()
    }

    /// Hands out the pending measurement, once.
    pub fn measurement(&mut self) -> Option<Measurement> {
        self.pending.take()
    }
}

impl<S, B> Component for SerialSource<S, B>
where
    S: SerialPort,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    fn on_init(&mut self) -> bool {
        self.pending = None;
        true
    }

    fn on_start(&mut self) -> bool {
        self.rx.open();
        self.rx.status() == RxStatus::Active
    }

    fn on_stop(&mut self) -> bool {
        self.rx.close();
        true
    }

    fn on_reset(&mut self) -> bool {
        self.rx.close();
        self.pending = None;
        true
    }

    fn on_tick(&mut self) -> bool {
        if self.rx.tick() != RxStatus::Finished {
            return true;
        }
        match self.rx.measurement() {
            Ok(m) => {
                self.pending = Some(Measurement {
                    source: self.id,
                    value: m.value,
                });
            }
            Err(e) => warn!(
                "serial source {:?}: dropped frame, {:?} / {:?}",
                self.id,
                self.rx.substatus(),
                e
            ),
        }
        self.rx.open();
        true
    }
}

/// A source registered with the coordinator.
#[derive(Debug)]
pub enum Source<'a, P: Platform> {
    /// A BNC pulse input.
    PulseCounter(&'a mut PulseCounterSource<P::PulseCounter>),
    /// The serial instrument.
    Serial(&'a mut SerialSource<P::InstrumentPort, P::RxBuffer>),
}

impl<P: Platform> Source<'_, P> {
    /// Device this source reports as.
    pub fn id(&self) -> MeasurementDeviceId {
        match self {
            Self::PulseCounter(s) => s.id(),
            Self::Serial(s) => s.id(),
        }
    }

    /// `true` if [`measurement`](Self::measurement) has a value to give.
    pub fn is_measurement_available(&self) -> bool {
        match self {
            Self::PulseCounter(s) => s.is_measurement_available(),
            Self::Serial(s) => s.is_measurement_available(),
        }
    }

    /// Reads the available measurement.
    pub fn measurement(&mut self) -> Option<Measurement> {
        match self {
            Self::PulseCounter(s) => s.measurement(),
            Self::Serial(s) => s.measurement(),
        }
    }
}

impl<P: Platform> Component for Source<'_, P> {
    fn state_machine(&self) -> &StateMachine {
        match self {
            Self::PulseCounter(s) => s.state_machine(),
            Self::Serial(s) => s.state_machine(),
        }
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        match self {
            Self::PulseCounter(s) => s.state_machine_mut(),
            Self::Serial(s) => s.state_machine_mut(),
        }
    }

    fn on_init(&mut self) -> bool {
        match self {
            Self::PulseCounter(s) => s.on_init(),
            Self::Serial(s) => s.on_init(),
        }
    }

    fn on_start(&mut self) -> bool {
        match self {
            Self::PulseCounter(s) => s.on_start(),
            Self::Serial(s) => s.on_start(),
        }
    }

    fn on_stop(&mut self) -> bool {
        match self {
            Self::PulseCounter(s) => s.on_stop(),
            Self::Serial(s) => s.on_stop(),
        }
    }

    fn on_reset(&mut self) -> bool {
        match self {
            Self::PulseCounter(s) => s.on_reset(),
            Self::Serial(s) => s.on_reset(),
        }
    }

    fn on_tick(&mut self) -> bool {
        match self {
            Self::PulseCounter(s) => s.on_tick(),
            Self::Serial(s) => s.on_tick(),
        }
    }
}
