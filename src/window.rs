/// Fixed-capacity FIFO over the most recent samples.
///
/// Storage is allocated once; after the window fills, each push overwrites the
/// oldest slot in place.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    buf: Vec<T>,
    head: usize,
    capacity: usize,
}

impl<T: Copy> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append `value`, returning the element it displaced when the window was full.
    ///
    /// After an eviction, [`oldest`](Self::oldest) is the element that arrived
    /// right after the evicted one.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.buf[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn oldest(&self) -> Option<T> {
        self.buf.get(self.head).copied()
    }

    pub fn newest(&self) -> Option<T> {
        if self.buf.is_empty() {
            return None;
        }
        let idx = (self.head + self.buf.len() - 1) % self.buf.len();
        Some(self.buf[idx])
    }

    /// Contents in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let (older, newer) = self.buf.split_at(self.head);
        newer.iter().chain(older.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}
