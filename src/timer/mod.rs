//! Cycle timing helpers.
//!
//! The pipeline expects `tick()` to be called at a fixed period, either from a hardware timer
//! interrupt or from a blocking delay loop (`delay-loop` feature).
//!
//! Contains:
//! - `compute_reload_value`: runtime auto-reload calculator
//! - `const_reload_value`: compile-time auto-reload calculator
//! - `run_cycle_loop` / `run_cycles`: blocking drivers for `DelayNs` (feature `delay-loop`)
//!
//! Common settings for a 72 MHz timer clock (for use with `compute_reload_value` and
//! `const_reload_value`):
//!
//! | PRESCALER | PERIOD   | RELOAD |
//! |-----------|----------|--------|
//! |      7200 |    10 ms |     99 |
//! |      7200 |   100 ms |    999 |
//! |      7200 |  1000 ms |   9999 |
//! |     36000 |  5000 ms |   9999 |

use libm::round;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg(feature = "delay-loop")]
pub use delay::*;

/// Milliseconds per second.
pub const MILLISECONDS_PER_SECOND: u32 = 1_000;

/// Computes the auto-reload value that makes a timer overflow every `period_ms`.
///
/// # Arguments
/// - `timer_hz`: timer input clock in Hz
/// - `prescaler`: timer prescaler (e.g. 7200)
/// - `period_ms`: desired cycle period in milliseconds (e.g. 100.0)
///
/// # Returns
/// - The reload value, i.e. counts per period minus one, rounded to nearest
/// - Saturates at `u16::MAX` for periods the timer cannot reach
pub fn compute_reload_value(timer_hz: u32, prescaler: u32, period_ms: f32) -> u16 {
    let counts_per_second = timer_hz as f64 / prescaler as f64;
    let counts = round(counts_per_second * period_ms as f64 / MILLISECONDS_PER_SECOND as f64);
    if counts < 1.0 {
        0
    } else if counts > u16::MAX as f64 + 1.0 {
        u16::MAX
    } else {
        (counts - 1.0) as u16
    }
}

/// Compile-time auto-reload value calculator.
///
/// # Arguments
/// - `timer_hz`: timer input clock in Hz
/// - `prescaler`: timer prescaler (e.g. 7200)
/// - `period_ms`: desired cycle period in whole milliseconds
///
/// # Returns
/// - The reload value (counts per period minus one, truncated)
/// - Saturates at `u16::MAX`
pub const fn const_reload_value(timer_hz: u32, prescaler: u32, period_ms: u32) -> u16 {
    let counts =
        (timer_hz / prescaler) as u64 * period_ms as u64 / MILLISECONDS_PER_SECOND as u64;
    if counts == 0 {
        0
    } else if counts > u16::MAX as u64 + 1 {
        u16::MAX
    } else {
        (counts - 1) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_table() {
        assert_eq!(compute_reload_value(72_000_000, 7200, 10.0), 99);
        assert_eq!(compute_reload_value(72_000_000, 7200, 100.0), 999);
        assert_eq!(compute_reload_value(72_000_000, 36_000, 5000.0), 9999);
        assert_eq!(const_reload_value(72_000_000, 7200, 1000), 9999);
    }

    #[test]
    fn test_runtime_and_const_agree() {
        for period in [1u32, 10, 250, 1000] {
            assert_eq!(
                compute_reload_value(8_000_000, 800, period as f32),
                const_reload_value(8_000_000, 800, period)
            );
        }
    }

    #[test]
    fn test_reload_rounds_and_saturates() {
        // 10 kHz, 0.26 ms -> 2.6 counts -> 3 counts -> reload 2
        assert_eq!(compute_reload_value(72_000_000, 7200, 0.26), 2);
        assert_eq!(compute_reload_value(72_000_000, 7200, 0.01), 0);
        assert_eq!(compute_reload_value(72_000_000, 1, 1000.0), u16::MAX);
        assert_eq!(const_reload_value(72_000_000, 1, 1000), u16::MAX);
    }
}
