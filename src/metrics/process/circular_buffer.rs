use std::fmt;

/// Fixed-capacity FIFO. Once full, each push overwrites the oldest item.
#[derive(Clone)]
pub struct CircularBuffer<T> {
    buffer: Vec<T>,
    write_pos: usize,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            write_pos: 0,
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
        } else {
            self.buffer[self.write_pos] = item;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let head = if self.buffer.len() < self.capacity {
            0
        } else {
            self.write_pos
        };

        self.buffer[head..].iter().chain(&self.buffer[..head])
    }

    pub fn last(&self) -> Option<&T> {
        if self.buffer.is_empty() {
            return None;
        }
        let idx = (self.write_pos + self.capacity - 1) % self.capacity;
        self.buffer.get(idx)
    }

    pub fn as_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn evicts_oldest_first() {
        let mut buf = CircularBuffer::new(3);
        for c in ['A', 'B', 'C', 'D'] {
            buf.push(c);
        }
        assert_eq!(buf.as_vec(), ['B', 'C', 'D']);
        assert_eq!(buf.last(), Some(&'D'));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn partial_fill_keeps_insertion_order() {
        let mut buf = CircularBuffer::new(5);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.as_vec(), [1, 2]);
        assert_eq!(buf.last(), Some(&2));
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut buf = CircularBuffer::new(0);
        buf.push(1);
        assert!(buf.is_empty());
        assert_eq!(buf.last(), None);
    }

    proptest! {
        #[test]
        fn retains_most_recent_in_order(
            capacity in 1usize..20,
            items in proptest::collection::vec(any::<u32>(), 0..100)
        ) {
            let mut buf = CircularBuffer::new(capacity);
            for item in &items {
                buf.push(*item);
                prop_assert!(buf.len() <= capacity);
            }
            let start = items.len().saturating_sub(capacity);
            prop_assert_eq!(buf.as_vec(), items[start..].to_vec());
        }
    }
}
