use crate::binding::Binding;
use crate::stack::MenuId;

use winsys::input::EventKind;
use winsys::input::InputEvent;
use winsys::window::Window;

use std::time::Duration;
use std::time::Instant;

/// What a delayed action runs against once it fires.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterruptTarget {
    Window(Window),
    Menu(MenuId, usize),
    Root,
}

#[derive(Debug, Clone)]
pub struct Interrupt {
    pub deadline: Instant,
    pub screen: usize,
    pub target: InterruptTarget,
    pub binding: Binding,
    pub event: InputEvent,
    generation: u64,
}

impl Interrupt {
    pub fn new(
        now: Instant,
        screen: usize,
        target: InterruptTarget,
        binding: Binding,
        event: InputEvent,
    ) -> Self {
        Self {
            deadline: now + binding.delay.unwrap_or_default(),
            screen,
            target,
            binding,
            event,
            generation: 0,
        }
    }
}

/// Pending delayed actions, kept in deadline order.
#[derive(Debug, Default)]
pub struct Timer {
    queue: Vec<Interrupt>,
    generation: u64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Marks the start of a new dispatch; interrupts scheduled from now on
    /// survive validation against the event that scheduled them.
    #[inline]
    pub fn begin_dispatch(&mut self) {
        self.generation += 1;
    }

    pub fn schedule(
        &mut self,
        mut interrupt: Interrupt,
    ) {
        interrupt.generation = self.generation;

        let index = self
            .queue
            .iter()
            .position(|queued| queued.deadline > interrupt.deadline)
            .unwrap_or(self.queue.len());

        debug!(
            "scheduling {} in {:?}",
            interrupt.binding.action,
            interrupt.binding.delay.unwrap_or_default()
        );

        self.queue.insert(index, interrupt);
    }

    /// Cancels every pending interrupt that breaks on `kind` and captured
    /// `window`; returns how many were cancelled.
    pub fn validate(
        &mut self,
        kind: EventKind,
        window: Window,
    ) -> usize {
        let generation = self.generation;
        let before = self.queue.len();

        self.queue.retain(|interrupt| {
            let cancel = interrupt.generation != generation
                && interrupt.event.window == window
                && interrupt.binding.breaks_on(kind);

            if cancel {
                debug!("cancelling {} on {}", interrupt.binding.action, kind);
            }

            !cancel
        });

        before - self.queue.len()
    }

    /// Drops every interrupt aimed at `window`.
    pub fn forget_window(
        &mut self,
        window: Window,
    ) {
        self.queue
            .retain(|interrupt| interrupt.target != InterruptTarget::Window(window));
    }

    pub fn forget_menu(
        &mut self,
        menu: MenuId,
    ) {
        self.queue.retain(|interrupt| match interrupt.target {
            InterruptTarget::Menu(id, _) => id != menu,
            _ => true,
        });
    }

    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.first().map(|interrupt| interrupt.deadline)
    }

    /// How long the event source may block before the head interrupt is
    /// due.
    #[inline]
    pub fn timeout(
        &self,
        now: Instant,
    ) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Pops every interrupt due at `now`, earliest first.
    pub fn expired(
        &mut self,
        now: Instant,
    ) -> Vec<Interrupt> {
        let due = self
            .queue
            .iter()
            .position(|interrupt| interrupt.deadline > now)
            .unwrap_or(self.queue.len());

        self.queue.drain(..due).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::action::Action;
    use crate::action::RootAction;

    use winsys::input::ModMask;

    fn delayed(
        millis: u64,
        breaks: Vec<EventKind>,
    ) -> Binding {
        let mut binding = Binding::new(EventKind::KeyPress, Action::Root(RootAction::TaskSwitcher));
        binding.delay = Some(Duration::from_millis(millis));
        binding.breaks = breaks;
        binding
    }

    fn press(window: Window) -> InputEvent {
        InputEvent::new(EventKind::KeyPress, 23, ModMask::MOD1, window)
    }

    #[test]
    fn fires_in_deadline_order() {
        let now = Instant::now();
        let mut timer = Timer::new();

        timer.begin_dispatch();
        timer.schedule(Interrupt::new(
            now,
            0,
            InterruptTarget::Root,
            delayed(300, vec![]),
            press(1),
        ));
        timer.schedule(Interrupt::new(
            now,
            0,
            InterruptTarget::Window(7),
            delayed(100, vec![]),
            press(7),
        ));

        assert_eq!(timer.timeout(now), Some(Duration::from_millis(100)));
        assert!(timer.expired(now + Duration::from_millis(50)).is_empty());

        let fired = timer.expired(now + Duration::from_millis(300));
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].target, InterruptTarget::Window(7));
        assert_eq!(fired[1].target, InterruptTarget::Root);
        assert!(timer.is_empty());
    }

    #[test]
    fn release_cancels_delayed_switch() {
        let now = Instant::now();
        let mut timer = Timer::new();

        timer.begin_dispatch();
        timer.schedule(Interrupt::new(
            now,
            0,
            InterruptTarget::Root,
            delayed(300, vec![EventKind::KeyRelease, EventKind::KeyPress]),
            press(1),
        ));

        // the scheduling press itself does not cancel
        assert_eq!(timer.validate(EventKind::KeyPress, 1), 0);

        timer.begin_dispatch();
        assert_eq!(timer.validate(EventKind::KeyRelease, 2), 0);
        assert_eq!(timer.validate(EventKind::KeyRelease, 1), 1);
        assert!(timer.expired(now + Duration::from_millis(300)).is_empty());
    }

    #[test]
    fn forgetting_targets() {
        let now = Instant::now();
        let mut timer = Timer::new();

        timer.schedule(Interrupt::new(
            now,
            0,
            InterruptTarget::Window(3),
            delayed(10, vec![]),
            press(3),
        ));
        timer.schedule(Interrupt::new(
            now,
            0,
            InterruptTarget::Menu(1, 0),
            delayed(10, vec![]),
            press(9),
        ));

        timer.forget_window(3);
        assert_eq!(timer.len(), 1);
        timer.forget_menu(1);
        assert!(timer.is_empty());
    }
}
