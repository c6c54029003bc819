#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Fixed-capacity bit array over the codes of a factor predictor.
///
/// A set bit sends the corresponding factor code to the left subtree. The width is fixed at
/// construction and accounts for every code of the predictor, observed at the node or not.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitMask {
    words: Box<[u64]>,
    width: usize,
}

impl BitMask {
    /// Creates a cleared mask of `width` bits
    pub fn new(width: usize) -> Self {
        BitMask {
            words: vec![0; (width + WORD_BITS - 1) / WORD_BITS].into_boxed_slice(),
            width,
        }
    }

    /// Number of addressable bits
    pub fn bit_width(&self) -> usize {
        self.width
    }

    /// Backing words, least significant bit first
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// ### Panics
    ///
    /// If `bit` is not below the width
    pub fn set(&mut self, bit: usize) {
        assert!(bit < self.width, "bit {} beyond width {}", bit, self.width);
        self.words[bit / WORD_BITS] |= 1u64 << (bit % WORD_BITS);
    }

    /// Returns true if the bit is set. Bits beyond the width read as clear.
    pub fn test(&self, bit: usize) -> bool {
        bit < self.width && self.words[bit / WORD_BITS] & (1u64 << (bit % WORD_BITS)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Set bits in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.width).filter(move |&bit| self.test(bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_words() {
        let mut mask = BitMask::new(130);
        mask.set(0);
        mask.set(64);
        mask.set(129);

        assert_eq!(mask.bit_width(), 130);
        assert_eq!(mask.words().len(), 3);
        assert_eq!(mask.count_ones(), 3);
        assert_eq!(mask.iter_ones().collect::<Vec<_>>(), vec![0, 64, 129]);
        assert!(!mask.test(1));
        assert!(!mask.test(500));
    }

    #[test]
    #[should_panic]
    fn set_beyond_width_panics() {
        BitMask::new(3).set(3);
    }
}
