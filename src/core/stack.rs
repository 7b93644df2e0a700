use winsys::window::Window;

use std::collections::HashMap;
use std::vec::Vec;

use strum::EnumString;

pub type MenuId = usize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Layer {
    AlwaysOnTop,
    Normal,
    AlwaysAtBottom,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::AlwaysOnTop, Layer::Normal, Layer::AlwaysAtBottom];

    #[inline]
    fn index(self) -> usize {
        match self {
            Layer::AlwaysOnTop => 0,
            Layer::Normal => 1,
            Layer::AlwaysAtBottom => 2,
        }
    }
}

/// Anything that takes part in the stacking order of a screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stacked {
    Client(Window),
    Menu(MenuId),
    Dock(usize),
}

/// Three ordered groups, each listed head (top) first, with menus kept in
/// parallel lists that stack above the windows of the same group.
pub struct StackingGroups {
    layers: HashMap<Stacked, Layer>,
    windows: [Vec<Stacked>; 3],
    menus: [Vec<Stacked>; 3],
}

impl StackingGroups {
    pub fn new() -> Self {
        Self {
            layers: HashMap::with_capacity(30),
            windows: [
                Vec::with_capacity(10),
                Vec::with_capacity(30),
                Vec::with_capacity(10),
            ],
            menus: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    #[inline]
    fn group_mut(
        &mut self,
        entry: Stacked,
        layer: Layer,
    ) -> &mut Vec<Stacked> {
        match entry {
            Stacked::Menu(_) => &mut self.menus[layer.index()],
            _ => &mut self.windows[layer.index()],
        }
    }

    #[inline]
    pub fn contains(
        &self,
        entry: Stacked,
    ) -> bool {
        self.layers.contains_key(&entry)
    }

    #[inline]
    pub fn layer(
        &self,
        entry: Stacked,
    ) -> Option<Layer> {
        self.layers.get(&entry).copied()
    }

    /// Inserts at the head of `layer`; already stacked entries are moved.
    pub fn insert(
        &mut self,
        entry: Stacked,
        layer: Layer,
    ) {
        self.remove(entry);
        self.group_mut(entry, layer).insert(0, entry);
        self.layers.insert(entry, layer);
    }

    pub fn remove(
        &mut self,
        entry: Stacked,
    ) -> bool {
        if let Some(layer) = self.layers.remove(&entry) {
            self.group_mut(entry, layer).retain(|&stacked| stacked != entry);
            true
        } else {
            false
        }
    }

    pub fn raise(
        &mut self,
        entry: Stacked,
    ) {
        if let Some(layer) = self.layer(entry) {
            let group = self.group_mut(entry, layer);
            group.retain(|&stacked| stacked != entry);
            group.insert(0, entry);
        }
    }

    pub fn lower(
        &mut self,
        entry: Stacked,
    ) {
        if let Some(layer) = self.layer(entry) {
            let group = self.group_mut(entry, layer);
            group.retain(|&stacked| stacked != entry);
            group.push(entry);
        }
    }

    /// Moves `entry` to sit directly above `sibling` when both share a
    /// group.
    pub fn place_above(
        &mut self,
        entry: Stacked,
        sibling: Stacked,
    ) {
        let layer = match (self.layer(entry), self.layer(sibling)) {
            (Some(layer), Some(sibling_layer)) if layer == sibling_layer => layer,
            _ => return,
        };

        let group = self.group_mut(entry, layer);
        group.retain(|&stacked| stacked != entry);

        let index = group
            .iter()
            .position(|&stacked| stacked == sibling)
            .unwrap_or(0);

        group.insert(index, entry);
    }

    #[inline]
    pub fn relayer(
        &mut self,
        entry: Stacked,
        layer: Layer,
    ) {
        if self.layer(entry) != Some(layer) {
            self.insert(entry, layer);
        }
    }

    /// The visible order, top first.
    pub fn order(&self) -> Vec<Stacked> {
        Layer::ALL
            .iter()
            .flat_map(|layer| {
                self.menus[layer.index()]
                    .iter()
                    .chain(self.windows[layer.index()].iter())
            })
            .copied()
            .collect()
    }

    pub fn clients(&self) -> Vec<Window> {
        self.order()
            .into_iter()
            .filter_map(|stacked| match stacked {
                Stacked::Client(window) => Some(window),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_flatten_top_to_bottom() {
        let mut stack = StackingGroups::new();

        stack.insert(Stacked::Client(1), Layer::Normal);
        stack.insert(Stacked::Client(2), Layer::AlwaysAtBottom);
        stack.insert(Stacked::Client(3), Layer::AlwaysOnTop);
        stack.insert(Stacked::Menu(0), Layer::AlwaysOnTop);
        stack.insert(Stacked::Client(4), Layer::Normal);

        assert_eq!(stack.order(), vec![
            Stacked::Menu(0),
            Stacked::Client(3),
            Stacked::Client(4),
            Stacked::Client(1),
            Stacked::Client(2),
        ]);
    }

    #[test]
    fn raise_and_lower_stay_within_group() {
        let mut stack = StackingGroups::new();

        for window in 1..=3 {
            stack.insert(Stacked::Client(window), Layer::Normal);
        }
        stack.insert(Stacked::Client(9), Layer::AlwaysOnTop);

        stack.raise(Stacked::Client(1));
        assert_eq!(stack.clients(), vec![9, 1, 3, 2]);

        stack.lower(Stacked::Client(1));
        assert_eq!(stack.clients(), vec![9, 3, 2, 1]);

        stack.lower(Stacked::Client(9));
        assert_eq!(stack.clients(), vec![9, 3, 2, 1]);
    }

    #[test]
    fn order_is_a_permutation_of_entries() {
        let mut stack = StackingGroups::new();
        let entries = [
            (Stacked::Client(1), Layer::Normal),
            (Stacked::Client(2), Layer::AlwaysOnTop),
            (Stacked::Menu(4), Layer::Normal),
            (Stacked::Dock(0), Layer::AlwaysOnTop),
            (Stacked::Client(3), Layer::AlwaysAtBottom),
        ];

        for &(entry, layer) in &entries {
            stack.insert(entry, layer);
        }

        stack.relayer(Stacked::Client(1), Layer::AlwaysOnTop);
        stack.raise(Stacked::Client(3));
        stack.place_above(Stacked::Client(2), Stacked::Dock(0));
        stack.remove(Stacked::Menu(4));

        let mut order = stack.order();
        order.sort_by_key(|entry| format!("{:?}", entry));
        order.dedup();

        assert_eq!(order.len(), 4);
        assert!(!stack.contains(Stacked::Menu(4)));
        assert_eq!(stack.layer(Stacked::Client(1)), Some(Layer::AlwaysOnTop));
    }

    #[test]
    fn placing_above_a_sibling() {
        let mut stack = StackingGroups::new();

        for window in 1..=3 {
            stack.insert(Stacked::Client(window), Layer::Normal);
        }

        stack.place_above(Stacked::Client(1), Stacked::Client(2));
        assert_eq!(stack.clients(), vec![3, 1, 2]);
    }
}
