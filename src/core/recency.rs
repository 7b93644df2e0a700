use crate::change::Direction;

use winsys::window::Window;

use std::collections::VecDeque;

/// Managed windows in most-recently-focused order; the head is the window
/// that holds, or last held, focus.
#[derive(Debug, Default)]
pub struct Recency {
    windows: VecDeque<Window>,
}

impl Recency {
    pub fn new() -> Self {
        Self {
            windows: VecDeque::with_capacity(30),
        }
    }

    #[inline]
    pub fn head(&self) -> Option<Window> {
        self.windows.front().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[inline]
    pub fn contains(
        &self,
        window: Window,
    ) -> bool {
        self.windows.contains(&window)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter()
    }

    /// Moves `window` to the head.
    pub fn touch(
        &mut self,
        window: Window,
    ) {
        self.remove(window);
        self.windows.push_front(window);
    }

    /// Adds `window` at the tail unless it is already listed.
    pub fn append(
        &mut self,
        window: Window,
    ) {
        if !self.contains(window) {
            self.windows.push_back(window);
        }
    }

    pub fn remove(
        &mut self,
        window: Window,
    ) -> bool {
        match self.windows.iter().position(|&listed| listed == window) {
            Some(index) => self.windows.remove(index).is_some(),
            None => false,
        }
    }

    /// The first window after (or before) the head that satisfies
    /// `eligible`, wrapping around.
    pub fn cycle(
        &self,
        dir: Direction,
        eligible: impl Fn(Window) -> bool,
    ) -> Option<Window> {
        let len = self.windows.len();
        let mut index = 0;

        for _ in 1..len {
            index = dir.step(index, len);

            if eligible(self.windows[index]) {
                return Some(self.windows[index]);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_moves_to_head() {
        let mut recency = Recency::new();

        recency.append(1);
        recency.append(2);
        recency.append(3);
        recency.touch(3);

        assert_eq!(recency.iter().copied().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(recency.head(), Some(3));

        assert!(recency.remove(1));
        assert!(!recency.remove(1));
        assert_eq!(recency.len(), 2);
    }

    #[test]
    fn cycling_skips_ineligible() {
        let mut recency = Recency::new();

        for window in 1..=4 {
            recency.append(window);
        }

        assert_eq!(recency.cycle(Direction::Forward, |w| w != 2), Some(3));
        assert_eq!(recency.cycle(Direction::Backward, |_| true), Some(4));
        assert_eq!(recency.cycle(Direction::Forward, |_| false), None);
    }
}
