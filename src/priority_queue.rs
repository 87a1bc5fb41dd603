//! Binary min-heap with a caller-supplied ordering.
//!
//! `std::collections::BinaryHeap` is a max-heap tied to `Ord`; the Huffman
//! merge wants "pop the smallest by (frequency, tie-break symbol)" without
//! wrapping every element in `Reverse`, so the ordering is a plain function.

use std::cmp::Ordering;

pub struct PriorityQueue<T, F> {
    data: Vec<T>,
    compare: F,
}

impl<T: Ord> PriorityQueue<T, fn(&T, &T) -> Ordering> {
    pub fn new() -> Self {
        Self::with_comparator(T::cmp)
    }
}

impl<T: Ord> Default for PriorityQueue<T, fn(&T, &T) -> Ordering> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn with_comparator(compare: F) -> Self {
        Self {
            data: Vec::new(),
            compare,
        }
    }

    /// Build a heap over `data` in linear time.
    pub fn from_vec_with_comparator(data: Vec<T>, compare: F) -> Self {
        let mut queue = Self { data, compare };
        for id in (0..queue.data.len() / 2).rev() {
            queue.sift_down(id);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The smallest element, if any.
    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn push(&mut self, value: T) {
        self.data.push(value);
        let mut current = self.data.len() - 1;
        while current > 0 {
            let parent = (current - 1) / 2;
            if !self.less(current, parent) {
                break;
            }
            self.data.swap(parent, current);
            current = parent;
        }
    }

    /// Remove and return the smallest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let top = self.data.swap_remove(0);
        self.sift_down(0);
        Some(top)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.data[a], &self.data[b]) == Ordering::Less
    }

    fn sift_down(&mut self, mut id: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * id + 1;
            if left >= len {
                break;
            }
            let mut smallest = left;
            if left + 1 < len && self.less(left + 1, left) {
                smallest = left + 1;
            }
            if !self.less(smallest, id) {
                break;
            }
            self.data.swap(id, smallest);
            id = smallest;
        }
    }
}
