use strum::EnumString;

/// The three flavours in which every on/off action exists, e.g.
/// `shade`/`unshade`/`toggleshade`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Toggle {
    On,
    Off,
    #[strum(serialize = "toggle")]
    Reverse,
}

impl From<bool> for Toggle {
    #[inline(always)]
    fn from(toggle: bool) -> Self {
        match toggle {
            true => Toggle::On,
            false => Toggle::Off,
        }
    }
}

impl Toggle {
    #[inline(always)]
    pub fn eval(
        self,
        current: bool,
    ) -> bool {
        match self {
            Toggle::On => true,
            Toggle::Off => false,
            Toggle::Reverse => !current,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn rev(&self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Steps `index` one position in this direction within `len`, wrapping
    /// around at both ends.
    #[inline]
    pub fn step(
        self,
        index: usize,
        len: usize,
    ) -> usize {
        if len == 0 {
            return 0;
        }

        match self {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => {
                if index == 0 {
                    len - 1
                } else {
                    index - 1
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_evaluation() {
        assert!(Toggle::On.eval(false));
        assert!(!Toggle::Off.eval(true));
        assert!(Toggle::Reverse.eval(false));
        assert_eq!("toggle".parse::<Toggle>().unwrap(), Toggle::Reverse);
    }

    #[test]
    fn stepping_wraps() {
        assert_eq!(Direction::Forward.step(2, 3), 0);
        assert_eq!(Direction::Backward.step(0, 3), 2);
        assert_eq!(Direction::Backward.step(0, 0), 0);
    }
}
