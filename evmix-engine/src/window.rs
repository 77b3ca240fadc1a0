use std::collections::VecDeque;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
/// An error that can occur when accessing a [Window].
pub enum WindowError {
    #[error("Window index {index} out of range for length {len}")]
    /// The requested position is not occupied.
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
/// A bounded FIFO of the most recent items of a bin.
///
/// Pushing into a full window evicts the oldest item. Items are ordered
/// from oldest (index `0`) to newest.
pub struct Window<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Window<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item, returning the evicted item if the window was full.
    ///
    /// A window with a capacity of `0` never holds anything, the pushed
    /// item is handed straight back.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Returns the item at the given position, `0` being the oldest.
    pub fn at(&self, index: usize) -> Result<&T, WindowError> {
        self.items.get(index).ok_or(WindowError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Iterates from the oldest to the newest item.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + '_ {
        self.items.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = Window::new(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert!(window.is_full());

        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.len(), 3);
    }

    #[rstest::rstest]
    #[case(0, Ok(&"a"))]
    #[case(1, Ok(&"b"))]
    #[case(2, Err(WindowError::IndexOutOfRange { index: 2, len: 2 }))]
    fn test_at(#[case] index: usize, #[case] expected: Result<&&str, WindowError>) {
        let mut window = Window::new(4);
        window.push("a");
        window.push("b");
        assert_eq!(window.at(index), expected);
    }

    #[test]
    fn test_zero_capacity() {
        let mut window = Window::new(0);
        assert_eq!(window.push(1), Some(1));
        assert!(window.is_empty());
        assert!(window.is_full());
    }

    #[test]
    fn test_clear() {
        let mut window = Window::new(2);
        window.push(1);
        window.push(2);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 2);
        assert_eq!(window.push(3), None);
    }
}
