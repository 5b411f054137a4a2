use embedded_hal::delay::DelayNs;

use crate::lifecycle::Component;

/// Runs a blocking loop that calls `tick()` on `component` once per period.
///
/// This is a simple timing loop for firmware without a spare timer interrupt. The period
/// is the delay between ticks, so the effective cycle is `period_us` plus the time the tick
/// itself takes.
///
/// # Arguments
/// - `component`: usually the [`MeasurementCoordinator`](crate::coordinator::MeasurementCoordinator)
/// - `delay`: a delay provider implementing `DelayNs`, typically from the HAL
/// - `period_us`: delay between ticks, in microseconds
///
/// # Example
/// ```rust,ignore
/// use measlink::timer::run_cycle_loop;
/// coordinator.init()?;
/// coordinator.start()?;
/// run_cycle_loop(&mut coordinator, &mut delay, 100_000);
/// ```
///
/// # Notes
/// - This loop never returns.
/// - Tick failures (including the component not running) are ignored; the next period
///   tries again.
pub fn run_cycle_loop<C, D>(component: &mut C, delay: &mut D, period_us: u32) -> !
where
    C: Component + ?Sized,
    D: DelayNs,
{
    loop {
        let _ = component.tick();
        delay.delay_us(period_us);
    }
}

/// Like [`run_cycle_loop`], but stops after `cycles` periods.
///
/// # Returns
/// The number of ticks that succeeded.
pub fn run_cycles<C, D>(component: &mut C, delay: &mut D, period_us: u32, cycles: usize) -> usize
where
    C: Component + ?Sized,
    D: DelayNs,
{
    let mut ok = 0;
    for _ in 0..cycles {
        if component.tick().is_ok() {
            ok += 1;
        }
        delay.delay_us(period_us);
    }
    ok
}
