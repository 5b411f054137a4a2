//! Component lifecycle state machine.
//!
//! Every hardware-facing part of the pipeline (sources, recorders, the coordinator itself)
//! moves through the same set of states:
//!
//! ```text
//!  Reset ──init──▶ Initialized ──start──▶ Starting ──▶ Running ──stop──▶ Stopped
//!    ▲                                                   │  ▲              │
//!    │                                                   └──┘ tick         │
//!    └──────────────────reset (from any state)─────────────────────────────┤
//!                                        Starting ◀──────start─────────────┘
//! ```
//!
//! `reset` is the way out of every state, including a `Running` component whose stop hook
//! keeps failing.
//!
//! The legality of a transition is decided in one place, [`ComponentState::can_transition_to`].
//! Implementors of [`Component`] only supply hook bodies; the provided `init`/`start`/`stop`/
//! `reset`/`tick` methods check the transition, run the hook and commit the new state only
//! if the hook succeeded.

use crate::error::LifecycleError;

/// Lifecycle state of a component.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum ComponentState {
    /// Initial state after construction, and the state after a successful `reset()`.
    #[default]
    Reset = 0xff,
    /// The init hook succeeded; the component may be started.
    Initialized = 0x01,
    /// The start hook is running.
    Starting = 0x02,
    /// Periodic work is allowed.
    Running = 0x03,
    /// The stop hook succeeded; the component may be restarted or reset.
    Stopped = 0x04,
}

impl ComponentState {
    /// Returns `true` if moving from `self` to `next` is allowed.
    pub const fn can_transition_to(self, next: ComponentState) -> bool {
        use ComponentState::*;
        match self {
            Reset => matches!(next, Initialized),
            Initialized => matches!(next, Starting | Reset),
            Starting => matches!(next, Running | Stopped | Reset),
            Running => matches!(next, Running | Stopped | Reset),
            Stopped => matches!(next, Starting | Reset),
        }
    }
}

/// Holds the lifecycle state of one component.
///
/// The state can only be read from outside this module; it is changed exclusively by the
/// provided methods of [`Component`].
#[derive(Debug, Default)]
pub struct StateMachine {
    state: ComponentState,
}

impl StateMachine {
    /// Creates a state machine in [`ComponentState::Reset`].
    pub const fn new() -> Self {
        Self {
            state: ComponentState::Reset,
        }
    }

    /// Current state.
    pub const fn state(&self) -> ComponentState {
        self.state
    }

    fn check(&self, to: ComponentState) -> Result<ComponentState, LifecycleError> {
        let from = self.state;
        if from.can_transition_to(to) {
            Ok(from)
        } else {
            warn!("lifecycle: rejected {:?} -> {:?}", from, to);
            Err(LifecycleError::InvalidTransition { from, to })
        }
    }
}

/// A component governed by the lifecycle state machine.
///
/// Implementors hand out their [`StateMachine`] and provide the hook bodies. The hooks
/// return `true` on success; a `false` aborts the requested transition and leaves the
/// state untouched.
pub trait Component {
    /// Shared access to the component's state machine.
    fn state_machine(&self) -> &StateMachine;

    /// Exclusive access to the component's state machine.
    fn state_machine_mut(&mut self) -> &mut StateMachine;

    /// Hardware/resource initialization.
    fn on_init(&mut self) -> bool;

    /// Called while the component is in [`ComponentState::Starting`].
    fn on_start(&mut self) -> bool;

    /// Called before the component enters [`ComponentState::Stopped`].
    fn on_stop(&mut self) -> bool;

    /// Called before the component returns to [`ComponentState::Reset`].
    fn on_reset(&mut self) -> bool;

    /// Periodic work. Only ever called while running.
    fn on_tick(&mut self) -> bool {
        true
    }

    /// Current lifecycle state.
    fn state(&self) -> ComponentState {
        self.state_machine().state()
    }

    /// `Reset → Initialized`.
    fn init(&mut self) -> Result<(), LifecycleError> {
        let target = ComponentState::Initialized;
        let _ = self.state_machine().check(target)?;
        run_hook(self, target, Self::on_init)?;
        self.state_machine_mut().state = target;
        Ok(())
    }

    /// `Initialized | Stopped → Starting → Running`.
    ///
    /// The start hook observes [`ComponentState::Starting`]. If it fails the previous
    /// state is restored.
    fn start(&mut self) -> Result<(), LifecycleError> {
        let previous = self.state_machine().check(ComponentState::Starting)?;
        self.state_machine_mut().state = ComponentState::Starting;
        if self.on_start() {
            self.state_machine_mut().state = ComponentState::Running;
            Ok(())
        } else {
            self.state_machine_mut().state = previous;
            warn!("lifecycle: start hook failed, back to {:?}", previous);
            Err(LifecycleError::HookFailed {
                target: ComponentState::Running,
            })
        }
    }

    /// `Running → Stopped`.
    fn stop(&mut self) -> Result<(), LifecycleError> {
        let target = ComponentState::Stopped;
        let from = self.state();
        if from != ComponentState::Running {
            warn!("lifecycle: rejected {:?} -> {:?}", from, target);
            return Err(LifecycleError::InvalidTransition { from, to: target });
        }
        run_hook(self, target, Self::on_stop)?;
        self.state_machine_mut().state = target;
        Ok(())
    }

    /// `* → Reset`. Already being in `Reset` is a successful no-op.
    ///
    /// The reset hook runs in the current state; if it fails the state is kept.
    fn reset(&mut self) -> Result<(), LifecycleError> {
        let target = ComponentState::Reset;
        if self.state() == target {
            return Ok(());
        }
        let _ = self.state_machine().check(target)?;
        run_hook(self, target, Self::on_reset)?;
        self.state_machine_mut().state = target;
        Ok(())
    }

    /// Runs the periodic hook if, and only if, the component is running.
    fn tick(&mut self) -> Result<(), LifecycleError> {
        let state = self.state();
        if state != ComponentState::Running {
            return Err(LifecycleError::NotRunning { state });
        }
        if self.on_tick() {
            Ok(())
        } else {
            Err(LifecycleError::HookFailed { target: state })
        }
    }
}

fn run_hook<C: Component + ?Sized>(
    component: &mut C,
    target: ComponentState,
    hook: fn(&mut C) -> bool,
) -> Result<(), LifecycleError> {
    if hook(component) {
        Ok(())
    } else {
        warn!("lifecycle: hook failed while moving to {:?}", target);
        Err(LifecycleError::HookFailed { target })
    }
}
