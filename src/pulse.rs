//! Pulse counting shared between an interrupt and the polling loop.
//!
//! The count behind a BNC input is incremented from interrupt context and read from the
//! coordinator's cycle. [`PulseCount`] keeps it in a `critical_section::Mutex`, so both
//! sides can hold a shared reference, typically to a `static`:
//!
//! ```rust
//! use measlink::pulse::{PulseCount, PulseCounter};
//!
//! static BNC1: PulseCount = PulseCount::new();
//!
//! // in the EXTI handler
//! BNC1.increment();
//!
//! // in the polling loop
//! assert_eq!(BNC1.read(), 1);
//! ```
//!
//! Boards without a spare interrupt can sample the input instead with [`EdgeCounter`].

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;
use embedded_hal::digital::InputPin;

/// Read/clear access to a hardware pulse count.
pub trait PulseCounter {
    /// Current count.
    fn read(&self) -> u32;

    /// Sets the count back to zero.
    fn clear(&self);
}

impl<T: PulseCounter + ?Sized> PulseCounter for &T {
    fn read(&self) -> u32 {
        T::read(self)
    }

    fn clear(&self) {
        T::clear(self)
    }
}

/// Interrupt-safe pulse counter.
pub struct PulseCount {
    count: Mutex<Cell<u32>>,
}

impl PulseCount {
    /// Creates a counter at zero. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// Adds one pulse. Wraps at `u32::MAX`.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Adds `pulses` pulses. Wraps at `u32::MAX`.
    pub fn add(&self, pulses: u32) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(pulses));
        });
    }
}

impl Default for PulseCount {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PulseCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulseCount")
            .field("count", &self.read())
            .finish()
    }
}

impl PulseCounter for PulseCount {
    fn read(&self) -> u32 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }

    fn clear(&self) {
        critical_section::with(|cs| self.count.borrow(cs).set(0));
    }
}

/// Counts rising edges on a sampled input pin into a [`PulseCount`].
///
/// [`poll`](EdgeCounter::poll) must be called faster than the shortest expected pulse.
#[derive(Debug)]
pub struct EdgeCounter<'a, P: InputPin> {
    pin: P,
    count: &'a PulseCount,
    was_high: bool,
}

impl<'a, P: InputPin> EdgeCounter<'a, P> {
    /// Creates an edge counter. The input is assumed low until the first sample.
    ///
    /// # Arguments
    /// * `pin` - the BNC input
    /// * `count` - where detected edges are added
    pub fn new(pin: P, count: &'a PulseCount) -> Self {
        Self {
            pin,
            count,
            was_high: false,
        }
    }

    /// Samples the pin once.
    ///
    /// # Returns
    /// `true` if a rising edge was detected and counted.
    pub fn poll(&mut self) -> Result<bool, P::Error> {
        let high = self.pin.is_high()?;
        let rising = high && !self.was_high;
        self.was_high = high;
        if rising {
            self.count.increment();
        }
        Ok(rising)
    }

    /// Releases the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn test_increment_read_clear() {
        let count = PulseCount::new();
        count.increment();
        count.increment();
        count.add(3);
        assert_eq!(count.read(), 5);
        count.clear();
        assert_eq!(count.read(), 0);
    }

    #[test]
    fn test_wraps_at_max() {
        let count = PulseCount::new();
        count.add(u32::MAX);
        count.increment();
        assert_eq!(count.read(), 0);
    }

    #[test]
    fn test_shared_reference_reads_same_count() {
        static SHARED: PulseCount = PulseCount::new();
        SHARED.clear();
        let reader: &dyn PulseCounter = &&SHARED;
        SHARED.increment();
        assert_eq!(reader.read(), 1);
    }

    #[test]
    fn test_edge_counter_counts_rising_edges() {
        let count = PulseCount::new();
        let pin = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
        ]);
        let mut edges = EdgeCounter::new(pin, &count);
        let mut seen = [false; 5];
        for s in seen.iter_mut() {
            *s = edges.poll().unwrap();
        }
        assert_eq!(seen, [false, true, false, false, true]);
        assert_eq!(count.read(), 2);
        edges.release().done();
    }
}
