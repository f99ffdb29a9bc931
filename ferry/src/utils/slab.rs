/// A slab of reusable slots.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands
/// out stable indices that are recycled after removal. The worker uses
/// it as the registry of live tasks, so every computation that is still
/// suspended can be found again when the scheduler stops.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,

    /// Stack of free indices that can be reused.
    free: Vec<usize>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with `size` pre-allocated free slots.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        let free = (0..size).rev().collect();

        Self {
            items,
            free,
            len: 0,
        }
    }

    /// Inserts a value and returns its index.
    ///
    /// Free slots are reused first; otherwise the slab grows by
    /// doubling.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                let len = self.items.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.items.resize_with(new_len, || None);
                self.free.extend(((len + 1)..new_len).rev());

                len
            }
        };

        self.items[index] = Some(item);
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// Returns `None` if the slot is out of range or already free.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every stored value, yielding them in index order.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.free.clear();
        self.len = 0;

        let size = self.items.len();
        self.free.extend((0..size).rev());

        self.items.iter_mut().filter_map(Option::take)
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn reuses_freed_slots() {
        let mut slab = Slab::new(2);

        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_ne!(a, b);
        assert_eq!(slab.len(), 2);

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.remove(a), None);

        let c = slab.insert("c");
        assert_eq!(c, a);
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut slab = Slab::new(0);

        let keys: Vec<_> = (0..10).map(|i| slab.insert(i)).collect();
        assert_eq!(slab.len(), 10);

        for (i, key) in keys.into_iter().enumerate() {
            assert_eq!(slab.remove(key), Some(i));
        }
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn drain_empties_the_slab() {
        let mut slab = Slab::new(4);
        slab.insert(1);
        let two = slab.insert(2);
        slab.insert(3);
        slab.remove(two);

        let drained: Vec<_> = slab.drain().collect();
        assert_eq!(drained, vec![1, 3]);
        assert_eq!(slab.len(), 0);

        let key = slab.insert(9);
        assert_eq!(slab.remove(key), Some(9));
    }
}
