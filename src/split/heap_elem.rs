use std::cmp::{Ordering, Reverse};

use noisy_float::{checkers::FiniteChecker, NoisyFloat};

use crate::Float;

/// Heap entry ordered by its key, falling back on the element for ties.
///
/// Smaller elements rank higher on equal keys, so that a max-heap pops them first.
pub(crate) struct HeapElem<K: Ord, T> {
    pub(crate) key: K,
    pub(crate) elem: T,
}

impl<K: Ord, T: Ord> PartialEq for HeapElem<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<K: Ord, T: Ord> Eq for HeapElem<K, T> {}

impl<K: Ord, T: Ord> PartialOrd for HeapElem<K, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, T: Ord> Ord for HeapElem<K, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.elem.cmp(&self.elem))
    }
}

pub(crate) type MaxHeapElem<F, T> = HeapElem<NoisyFloat<F, FiniteChecker>, T>;

impl<F: Float, T> MaxHeapElem<F, T> {
    pub(crate) fn new(key: F, elem: T) -> Self {
        Self {
            key: NoisyFloat::new(key),
            elem,
        }
    }
}

pub(crate) type MinHeapElem<F, T> = HeapElem<Reverse<NoisyFloat<F, FiniteChecker>>, T>;

impl<F: Float, T> MinHeapElem<F, T> {
    pub(crate) fn new(key: F, elem: T) -> Self {
        Self {
            key: Reverse(NoisyFloat::new(key)),
            elem,
        }
    }
}
