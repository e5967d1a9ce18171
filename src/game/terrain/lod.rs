/// Discrete triangle density of a terrain patch. Lower values have more detail.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[repr(u8)]
pub enum Lod {
    #[default]
    High = 1,
    Med = 2,
    Low = 3,
    Minimum = 4,
}

impl Lod {
    /// Amount of LOD slots. Slot 0 is never used.
    pub const NUM_LODS: usize = 5;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            1 => Some(Self::High),
            2 => Some(Self::Med),
            3 => Some(Self::Low),
            4 => Some(Self::Minimum),
            _ => None,
        }
    }

    /// Distance between sampled vertices, in cells.
    pub fn step(self) -> u32 {
        1 << (self as u32 - 1)
    }

    /// The next level with less detail, saturating at [Lod::Minimum].
    pub fn coarser(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(Self::Minimum)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn indices_round_trip() {
        for lod in Lod::iter() {
            assert_eq!(Lod::from_index(lod.index()), Some(lod));
            assert!(lod.index() < Lod::NUM_LODS);
        }
        assert_eq!(Lod::from_index(0), None);
        assert_eq!(Lod::from_index(Lod::NUM_LODS), None);
    }

    #[test]
    fn steps_double() {
        assert_eq!(Lod::High.step(), 1);
        assert_eq!(Lod::Med.step(), 2);
        assert_eq!(Lod::Low.step(), 4);
        assert_eq!(Lod::Minimum.step(), 8);
    }

    #[test]
    fn coarser_saturates() {
        assert_eq!(Lod::High.coarser(), Lod::Med);
        assert_eq!(Lod::Minimum.coarser(), Lod::Minimum);
    }

    #[test]
    fn parse() {
        assert_eq!("Low".parse::<Lod>(), Ok(Lod::Low));
        assert!("Ultra".parse::<Lod>().is_err());
    }
}
