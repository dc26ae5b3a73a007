use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::ProbeError;

/// Number of slots allocated by [`HashTable::new`].
pub const DEFAULT_CAPACITY: usize = 64;

/// Whether `populated` entries in `capacity` slots would exceed a load factor
/// of one half.
#[inline(always)]
fn exceeds_load_factor(populated: usize, capacity: usize) -> bool {
    populated > capacity / 2
}

#[inline(always)]
fn home_index(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

/// Forward distance from `from` to `to`, wrapping at `capacity`.
#[inline(always)]
fn probe_distance(from: usize, to: usize, capacity: usize) -> usize {
    if to >= from {
        to - from
    } else {
        capacity - from + to
    }
}

#[inline]
fn next_capacity(capacity: usize) -> Result<usize, ProbeError> {
    capacity
        .checked_mul(2)
        .ok_or(ProbeError::CapacityExceeded { capacity })
}

fn allocate_slots<V>(capacity: usize) -> Result<Vec<Slot<V>>, TryReserveError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots)
}

/// A single position in the slot array.
///
/// There is no tombstone state: removal repairs the probe chain by shifting
/// later entries backwards, so `Empty` always terminates a probe.
#[derive(Clone)]
enum Slot<V> {
    Empty,
    Occupied { hash: u64, value: V },
}

impl<V> Slot<V> {
    #[inline(always)]
    fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    #[inline(always)]
    fn hash(&self) -> Option<u64> {
        match self {
            Slot::Empty => None,
            Slot::Occupied { hash, .. } => Some(*hash),
        }
    }

    #[inline(always)]
    fn value(&self) -> Option<&V> {
        match self {
            Slot::Empty => None,
            Slot::Occupied { value, .. } => Some(value),
        }
    }

    #[inline(always)]
    fn value_mut(&mut self) -> Option<&mut V> {
        match self {
            Slot::Empty => None,
            Slot::Occupied { value, .. } => Some(value),
        }
    }

    #[inline(always)]
    fn take(&mut self) -> Option<V> {
        match core::mem::replace(self, Slot::Empty) {
            Slot::Empty => None,
            Slot::Occupied { value, .. } => Some(value),
        }
    }
}

/// Distribution of probe distances over the occupied slots of a table.
///
/// `bins()[d]` counts the entries sitting `d` slots past their home slot.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Entry counts indexed by probe distance.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// The longest probe distance of any entry, or `None` for an empty table.
    pub fn max_probe_length(&self) -> Option<usize> {
        self.bins.len().checked_sub(1)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = *self.bins.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries):",
            self.bins.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", distance, make_bar(count), count);
        }
    }
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries currently in the table
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Longest distance between an entry and its home slot
    pub max_probe_length: usize,
    /// Mean distance between an entry and its home slot
    pub mean_probe_length: f64,
    /// Length of the longest run of consecutive occupied slots
    pub longest_cluster: usize,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
    /// Memory in bytes held by empty slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Probe length: max {}, mean {:.3}",
            self.max_probe_length, self.mean_probe_length
        );
        println!("Longest cluster: {} slots", self.longest_cluster);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// An open-addressing hash table using linear probing.
///
/// `HashTable<V>` stores values of type `V` in a flat slot array. It does not
/// hash anything itself: every operation takes a precomputed `u64` hash and
/// an equality predicate. The hash is stored next to the value, so growth and
/// removal never need to recompute it.
///
/// - A value's home slot is `hash % capacity`; collisions move forward one
///   slot at a time, wrapping at the end of the array.
/// - The table never holds more than half as many entries as it has slots.
///   An insert that would break this first doubles the slot array.
/// - Removal uses backward-shift deletion, so there are no tombstones and a
///   probe always stops at the first empty slot.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use probe_hash::hash_table::Entry;
/// # use probe_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(16).unwrap();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry
///             .insert(Person {
///                 id: 123,
///                 name: "Alice".to_string(),
///             })
///             .unwrap();
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Vec<Slot<V>>,
    populated: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        let capacity = self.capacity();
        let slots = self
            .slots
            .chunks(16)
            .enumerate()
            .map(|(row, chunk)| {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, slot)| match slot.hash() {
                        None => "..".to_string(),
                        Some(hash) => format!(
                            "{:02}",
                            probe_distance(home_index(hash, capacity), row * 16 + offset, capacity)
                        ),
                    })
                    .collect::<Vec<String>>()
                    .join(", ")
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("probe_distances", &slots)
            .field("populated", &self.populated)
            .field("capacity", &capacity)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(DEFAULT_CAPACITY);
        slots.resize_with(DEFAULT_CAPACITY, || Slot::Empty);
        Self {
            slots,
            populated: 0,
        }
    }

    /// Creates an empty table with exactly `capacity` slots.
    ///
    /// Fails with [`ProbeError::InvalidCapacity`] if `capacity` is zero or the
    /// slot array cannot be reserved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeError;
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100).unwrap();
    /// assert_eq!(table.capacity(), 100);
    ///
    /// let invalid = HashTable::<String>::with_capacity(0);
    /// assert_eq!(
    ///     invalid.unwrap_err(),
    ///     ProbeError::InvalidCapacity { requested: 0 }
    /// );
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, ProbeError> {
        if capacity == 0 {
            return Err(ProbeError::InvalidCapacity {
                requested: capacity,
            });
        }

        let slots = allocate_slots(capacity).map_err(|_| ProbeError::InvalidCapacity {
            requested: capacity,
        })?;

        Ok(Self {
            slots,
            populated: 0,
        })
    }

    /// Returns the number of slots in the table.
    ///
    /// At most half of them are ever occupied.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Ratio of occupied slots to total slots. Never above `0.5`.
    pub fn load_factor(&self) -> f64 {
        self.populated as f64 / self.capacity() as f64
    }

    /// Walks the probe sequence for `hash`.
    ///
    /// Returns `Ok(index)` of the first matching value, or `Err(index)` of
    /// the empty slot that ended the probe.
    #[inline]
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Result<usize, usize> {
        let capacity = self.capacity();
        let mut index = home_index(hash, capacity);
        // The load factor keeps at least one slot empty, so this terminates.
        loop {
            match &self.slots[index] {
                Slot::Empty => return Err(index),
                Slot::Occupied { hash: stored, value } if *stored == hash && eq(value) => {
                    return Ok(index);
                }
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) % capacity;
        }
    }

    /// Writes `value` into the first empty slot of its probe sequence without
    /// checking the load factor or matching existing values.
    fn place(&mut self, hash: u64, value: V) -> usize {
        let capacity = self.capacity();
        let mut index = home_index(hash, capacity);
        while !self.slots[index].is_empty() {
            index = (index + 1) % capacity;
        }
        self.slots[index] = Slot::Occupied { hash, value };
        index
    }

    fn occupied(&self, index: usize) -> &V {
        match self.slots[index].value() {
            Some(value) => value,
            None => unreachable!("slot {index} is not occupied"),
        }
    }

    fn occupied_mut(&mut self, index: usize) -> &mut V {
        match self.slots[index].value_mut() {
            Some(value) => value,
            None => unreachable!("slot {index} is not occupied"),
        }
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use probe_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(hash_u64(42), 42u64).unwrap();
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(7), |&n| n == 7), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }
        let index = self.probe(hash, eq).ok()?;
        self.slots[index].value()
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }
        let index = self.probe(hash, eq).ok()?;
        self.slots[index].value_mut()
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// Looking up an entry never grows the table; growth happens only when a
    /// [`VacantEntry`] is filled.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use probe_hash::hash_table::Entry;
    /// # use probe_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string()).unwrap();
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// table
    ///     .entry(hash, |s: &String| s == "hello")
    ///     .or_insert("ignored".to_string())
    ///     .unwrap();
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.probe(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err(_) => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Inserts `value` without checking whether an equal value is already
    /// present.
    ///
    /// If the insert would push the load factor above one half, the table
    /// doubles first. On [`ProbeError::CapacityExceeded`] the table is left
    /// unchanged and `value` is dropped.
    ///
    /// Callers that need insert-or-update semantics should go through
    /// [`entry`](Self::entry) instead.
    pub fn insert_unique(&mut self, hash: u64, value: V) -> Result<&mut V, ProbeError> {
        if exceeds_load_factor(self.populated + 1, self.capacity()) {
            self.grow()?;
        }

        let index = self.place(hash, value);
        self.populated += 1;
        debug_assert!(!exceeds_load_factor(self.populated, self.capacity()));

        Ok(self.occupied_mut(index))
    }

    /// Removes and returns a value matching the hash and predicate.
    ///
    /// Later entries of the same cluster are shifted back into the freed
    /// slot, so lookups for them keep working.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use probe_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10).unwrap();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42).unwrap();
    ///
    /// let removed = table.remove(hash_u64(42), |&n| n == 42);
    /// assert_eq!(removed, Some(42));
    /// assert!(table.is_empty());
    ///
    /// // Removing a missing value is a no-op
    /// let not_found = table.remove(hash_u64(99), |&n| n == 99);
    /// assert_eq!(not_found, None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        let index = self.probe(hash, eq).ok()?;
        Some(self.remove_at(index))
    }

    fn remove_at(&mut self, index: usize) -> V {
        let Some(value) = self.slots[index].take() else {
            unreachable!("slot {index} is not occupied");
        };
        self.populated -= 1;
        self.backward_shift(index);
        value
    }

    /// Closes the gap left at `hole` by walking the rest of its cluster and
    /// moving back every entry whose home slot is at or before the hole.
    fn backward_shift(&mut self, mut hole: usize) {
        let capacity = self.capacity();
        let mut index = (hole + 1) % capacity;

        while let Some(hash) = self.slots[index].hash() {
            let home = home_index(hash, capacity);
            if probe_distance(home, index, capacity) >= probe_distance(hole, index, capacity) {
                self.slots.swap(hole, index);
                log::trace!("shifted entry from slot {index} back to slot {hole}");
                hole = index;
            }
            index = (index + 1) % capacity;
        }
    }

    /// Ensures `additional` more values fit without exceeding the load
    /// factor, rehashing at most once.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(4).unwrap();
    /// table.reserve(10).unwrap();
    /// assert_eq!(table.capacity(), 32);
    /// ```
    pub fn reserve(&mut self, additional: usize) -> Result<(), ProbeError> {
        let current = self.capacity();
        let required = self
            .populated
            .checked_add(additional)
            .ok_or(ProbeError::CapacityExceeded { capacity: current })?;

        let mut capacity = current;
        while exceeds_load_factor(required, capacity) {
            capacity = next_capacity(capacity)
                .map_err(|_| ProbeError::CapacityExceeded { capacity: current })?;
        }

        if capacity != current {
            log::trace!("reserving {additional} entries: {current} -> {capacity} slots");
            self.rehash(capacity)?;
        }

        Ok(())
    }

    #[cold]
    fn grow(&mut self) -> Result<(), ProbeError> {
        let capacity = next_capacity(self.capacity())?;
        self.rehash(capacity)
    }

    /// Moves every entry into a fresh slot array of `capacity` slots, in the
    /// order they appear in the current array.
    ///
    /// On failure the current array is untouched.
    fn rehash(&mut self, capacity: usize) -> Result<(), ProbeError> {
        let old_capacity = self.capacity();
        let slots = allocate_slots(capacity).map_err(|_| ProbeError::CapacityExceeded {
            capacity: old_capacity,
        })?;

        let old_slots = core::mem::replace(&mut self.slots, slots);
        let mut moved = 0usize;
        for slot in old_slots {
            if let Slot::Occupied { hash, value } = slot {
                self.place(hash, value);
                moved += 1;
            }
        }
        debug_assert_eq!(moved, self.populated);

        log::debug!("grew table from {old_capacity} to {capacity} slots ({moved} entries moved)");
        Ok(())
    }

    /// Removes all values, keeping the current capacity.
    pub fn clear(&mut self) {
        if self.populated == 0 {
            return;
        }
        self.slots.fill_with(|| Slot::Empty);
        self.populated = 0;
    }

    /// Returns an iterator over all values, in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for n in 0..3u64 {
    ///     table.insert_unique(n, n * 10).unwrap();
    /// }
    ///
    /// let mut values: Vec<_> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, vec![0, 10, 20]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Removes all values, returning them as an iterator. The capacity is
    /// kept.
    ///
    /// Values not consumed by the caller are dropped when the iterator is.
    pub fn drain(&mut self) -> Drain<'_, V> {
        let HashTable { slots, populated } = self;
        Drain {
            slots: slots.iter_mut(),
            populated,
        }
    }

    /// Computes a histogram of probe distances for the current table state.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let capacity = self.capacity();
        let mut bins = alloc::vec::Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(hash) = slot.hash() {
                let distance = probe_distance(home_index(hash, capacity), index, capacity);
                if bins.len() <= distance {
                    bins.resize(distance + 1, 0);
                }
                bins[distance] += 1;
            }
        }
        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity();
        let histogram = self.probe_histogram();
        let total_distance: usize = histogram
            .bins()
            .iter()
            .enumerate()
            .map(|(distance, count)| distance * count)
            .sum();

        // Clusters may wrap, so start counting just after an empty slot.
        let mut longest_cluster = 0;
        if let Some(start) = self.slots.iter().position(Slot::is_empty) {
            let mut run = 0;
            for offset in 1..=capacity {
                if self.slots[(start + offset) % capacity].is_empty() {
                    run = 0;
                } else {
                    run += 1;
                    longest_cluster = longest_cluster.max(run);
                }
            }
        }

        let slot_size = core::mem::size_of::<Slot<V>>();
        DebugStats {
            populated: self.populated,
            capacity,
            load_factor: self.load_factor(),
            max_probe_length: histogram.max_probe_length().unwrap_or(0),
            mean_probe_length: if self.populated == 0 {
                0.0
            } else {
                total_distance as f64 / self.populated as f64
            },
            longest_cluster,
            total_bytes: capacity * slot_size,
            wasted_bytes: (capacity - self.populated) * slot_size,
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, V>),
    /// A vacant entry.
    Vacant(VacantEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> Result<&'a mut V, ProbeError> {
        match self {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> Result<&'a mut V, ProbeError> {
        match self {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.table.occupied(self.index)
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.occupied_mut(self.index)
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let OccupiedEntry { table, index } = self;
        table.occupied_mut(index)
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        self.table.remove_at(self.index)
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts `value`, growing the table first if needed.
    pub fn insert(self, value: V) -> Result<&'a mut V, ProbeError> {
        let VacantEntry { table, hash } = self;
        table.insert_unique(hash, value)
    }
}

/// An iterator over the values of a [`HashTable`].
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.slots.by_ref().find_map(Slot::value)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
pub struct Drain<'a, V> {
    slots: core::slice::IterMut<'a, Slot<V>>,
    populated: &'a mut usize,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.slots.by_ref().find_map(Slot::take)?;
        *self.populated -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (*self.populated, Some(*self.populated))
    }
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in self {}
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn slot_of(table: &HashTable<Item>, hash: u64, key: u64) -> Option<usize> {
        table.probe(hash, |v| v.key == key).ok()
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(1).unwrap();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v: &Item| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item {
                        key: k,
                        value: (k as i32) * 2,
                    })
                    .unwrap();
                    assert_eq!(
                        table.find(hash, |v| v.key == k),
                        Some(&Item {
                            key: k,
                            value: (k as i32) * 2
                        }),
                        "{:#?}",
                        table
                    );
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert: {:#?}", table),
            }
        }
        assert_eq!(table.len(), 32);
        assert_eq!(table.capacity(), 64);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        match table.entry(hash, |v| v.key == k) {
            Entry::Vacant(v) => {
                v.insert(Item { key: k, value: 7 }).unwrap();
            }
            Entry::Occupied(_) => panic!("should be vacant first time"),
        }

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev_value = occ.get().value;
                *occ.get_mut() = Item { key: k, value: 11 };
                assert_eq!(prev_value, 7, "{:#?}", table);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        let found = table.find(hash, |v| v.key == k).unwrap();
        assert_eq!(found.value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item { key: k, value: 1 }).unwrap();
                }
                _ => unreachable!(),
            }
        }

        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            if let Some(v) = table.find_mut(hash, |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            let v = table.find(hash, |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..8u64 {
            let hash = hash_key(&state, k);
            table
                .insert_unique(
                    hash,
                    Item {
                        key: k,
                        value: k as i32,
                    },
                )
                .unwrap();
        }
        assert_eq!(table.len(), 8);
        for k in [0u64, 3, 7] {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k).expect("should remove");
            assert_eq!(removed.key, k);
            assert!(table.find(hash, |v| v.key == k).is_none());
        }
        assert_eq!(table.len(), 5);

        for k in [1u64, 2, 4, 5, 6] {
            let hash = hash_key(&state, k);
            assert!(table.find(hash, |v| v.key == k).is_some(), "{:#?}", table);
        }

        let hash = hash_key(&state, 1000);
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
        assert_eq!(table.len(), 5);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(1).unwrap();
        for k in 0..50_000u64 {
            let hash = hash_key(&state, k);
            table
                .entry(hash, |v| v.key == k)
                .or_insert(Item {
                    key: k,
                    value: k as i32,
                })
                .unwrap();
            assert!(table.load_factor() <= 0.5);
        }
        assert_eq!(table.len(), 50_000);
        assert_eq!(table.capacity(), 131_072);

        for k in (0..50_000u64).step_by(2) {
            let hash = hash_key(&state, k);
            assert!(table.remove(hash, |v| v.key == k).is_some());
        }
        for k in 0..50_000u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).is_some(), k % 2 == 1);
        }
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::with_capacity(64).unwrap();
        let hash = 5;
        for k in 0..20u64 {
            table
                .insert_unique(
                    hash,
                    Item {
                        key: k,
                        value: k as i32,
                    },
                )
                .unwrap();
        }
        assert_eq!(table.probe_histogram().max_probe_length(), Some(19));

        for k in [0u64, 7, 8, 13] {
            assert!(table.remove(hash, |v| v.key == k).is_some());
        }
        assert_eq!(table.len(), 16);

        for k in 0..20u64 {
            let expected = ![0u64, 7, 8, 13].contains(&k);
            assert_eq!(
                table.find(hash, |v| v.key == k).is_some(),
                expected,
                "{:#?}",
                table
            );
        }
        // The cluster is compacted back against its home slot.
        assert_eq!(table.probe_histogram().max_probe_length(), Some(15));
    }

    #[test]
    fn removal_repairs_wrapping_cluster() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for (key, hash) in [(1u64, 6u64), (2, 6), (3, 7), (4, 6)] {
            table
                .insert_unique(
                    hash,
                    Item {
                        key,
                        value: key as i32,
                    },
                )
                .unwrap();
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(slot_of(&table, 6, 1), Some(6));
        assert_eq!(slot_of(&table, 6, 2), Some(7));
        assert_eq!(slot_of(&table, 7, 3), Some(0));
        assert_eq!(slot_of(&table, 6, 4), Some(1));

        assert_eq!(table.remove(6, |v| v.key == 1).map(|v| v.key), Some(1));

        assert_eq!(slot_of(&table, 6, 2), Some(6));
        assert_eq!(slot_of(&table, 7, 3), Some(7));
        assert_eq!(slot_of(&table, 6, 4), Some(0));
        assert!(table.slots[1].is_empty());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn removal_keeps_entries_at_their_home_slot() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for (key, hash) in [(1u64, 2u64), (2, 3), (3, 2)] {
            table
                .insert_unique(
                    hash,
                    Item {
                        key,
                        value: key as i32,
                    },
                )
                .unwrap();
        }
        // Slots: 2 -> key 1, 3 -> key 2, 4 -> key 3.
        assert_eq!(slot_of(&table, 2, 3), Some(4));

        table.remove(2, |v| v.key == 1).unwrap();

        // Key 2 lives at its home slot and must stay; key 3 skips over it.
        assert_eq!(slot_of(&table, 3, 2), Some(3));
        assert_eq!(slot_of(&table, 2, 3), Some(2));
        assert!(table.slots[4].is_empty());
    }

    #[test]
    fn growth_doubles_capacity() {
        let mut table: HashTable<u64> = HashTable::with_capacity(4).unwrap();
        table.insert_unique(1, 1).unwrap();
        table.insert_unique(2, 2).unwrap();
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.load_factor(), 0.5);

        table.insert_unique(3, 3).unwrap();
        assert_eq!(table.capacity(), 8);
        for n in 1..=3u64 {
            assert_eq!(table.find(n, |&v| v == n), Some(&n));
        }
    }

    #[test]
    fn capacity_one_grows_before_first_insert() {
        let mut table: HashTable<u64> = HashTable::with_capacity(1).unwrap();
        table.insert_unique(0, 10).unwrap();
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(0, |&v| v == 10), Some(10));
        assert!(table.is_empty());
        assert!(table.find(0, |&v| v == 10).is_none());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = HashTable::<Item>::with_capacity(0).unwrap_err();
        assert_eq!(err, ProbeError::InvalidCapacity { requested: 0 });
    }

    #[test]
    fn unaddressable_capacity_is_invalid() {
        let requested = usize::MAX / 2;
        let err = HashTable::<Item>::with_capacity(requested).unwrap_err();
        assert_eq!(err, ProbeError::InvalidCapacity { requested });
    }

    #[test]
    fn next_capacity_overflow() {
        assert_eq!(next_capacity(4), Ok(8));
        let capacity = usize::MAX / 2 + 1;
        assert_eq!(
            next_capacity(capacity),
            Err(ProbeError::CapacityExceeded { capacity })
        );
    }

    #[test]
    fn failed_rehash_leaves_table_unchanged() {
        let mut table: HashTable<u64> = HashTable::with_capacity(8).unwrap();
        for n in 0..4u64 {
            table.insert_unique(n, n).unwrap();
        }

        let err = table.rehash(usize::MAX / 2).unwrap_err();
        assert_eq!(err, ProbeError::CapacityExceeded { capacity: 8 });
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.len(), 4);
        for n in 0..4u64 {
            assert_eq!(table.find(n, |&v| v == n), Some(&n));
        }
    }

    #[test]
    fn reserve_rehashes_once() {
        let mut table: HashTable<u64> = HashTable::with_capacity(4).unwrap();
        table.insert_unique(9, 9).unwrap();
        table.reserve(10).unwrap();
        assert_eq!(table.capacity(), 32);

        for n in 0..10u64 {
            table.insert_unique(n, n).unwrap();
        }
        assert_eq!(table.capacity(), 32);
        assert_eq!(table.len(), 11);

        table.reserve(0).unwrap();
        assert_eq!(table.capacity(), 32);

        let err = table.reserve(usize::MAX).unwrap_err();
        assert_eq!(err, ProbeError::CapacityExceeded { capacity: 32 });
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for k in 0..10u64 {
            let hash = hash_key(&state, k);
            table
                .insert_unique(
                    hash,
                    Item {
                        key: k,
                        value: (k * 3) as i32,
                    },
                )
                .unwrap();
        }

        let iter = table.iter();
        assert_eq!(iter.len(), 10);
        let mut seen: Vec<u64> = iter.map(|item| item.key).collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        let capacity = table.capacity();
        let mut drained: Vec<Item> = table.drain().collect();
        drained.sort_by_key(|item| item.key);
        assert_eq!(drained.len(), 10);
        assert_eq!(drained[4], Item { key: 4, value: 12 });
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn dropped_drain_empties_table() {
        let mut table: HashTable<String> = HashTable::new();
        for (hash, s) in ["a", "b", "c"].into_iter().enumerate() {
            table.insert_unique(hash as u64, s.to_string()).unwrap();
        }

        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert!(table.find(1, |s| s == "b").is_none());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut table: HashTable<u64> = HashTable::with_capacity(2).unwrap();
        for n in 0..20u64 {
            table.insert_unique(n, n).unwrap();
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert!(table.find(3, |&v| v == 3).is_none());

        table.insert_unique(3, 3).unwrap();
        assert_eq!(table.find(3, |&v| v == 3), Some(&3));
    }

    #[test]
    fn entry_or_insert_with() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let hash = hash_key(&state, 5);

        let value = table
            .entry(hash, |v| v.key == 5)
            .or_insert_with(|| Item { key: 5, value: 1 })
            .unwrap();
        value.value += 1;

        let value = table
            .entry(hash, |v| v.key == 5)
            .or_insert_with(|| panic!("entry is occupied"))
            .unwrap();
        assert_eq!(value.value, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn occupied_entry_remove() {
        let mut table: HashTable<Item> = HashTable::with_capacity(8).unwrap();
        for key in 0..3u64 {
            table
                .insert_unique(
                    1,
                    Item {
                        key,
                        value: key as i32,
                    },
                )
                .unwrap();
        }

        match table.entry(1, |v| v.key == 0) {
            Entry::Occupied(entry) => assert_eq!(entry.remove().key, 0),
            Entry::Vacant(_) => panic!("key 0 should be present"),
        }
        assert_eq!(table.len(), 2);
        assert_eq!(slot_of(&table, 1, 1), Some(1));
        assert_eq!(slot_of(&table, 1, 2), Some(2));
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(4).unwrap();
        for k in 0..12u64 {
            let hash = hash_key(&state, k);
            table
                .insert_unique(
                    hash,
                    Item {
                        key: k,
                        value: k as i32,
                    },
                )
                .unwrap();
        }

        let mut cloned = table.clone();
        assert_eq!(cloned.len(), table.len());
        assert_eq!(cloned.capacity(), table.capacity());

        let hash = hash_key(&state, 3);
        cloned.remove(hash, |v| v.key == 3).unwrap();
        assert!(table.find(hash, |v| v.key == 3).is_some());
        assert!(cloned.find(hash, |v| v.key == 3).is_none());
    }

    #[test]
    fn debug_stats_report_clusters() {
        let mut table: HashTable<u64> = HashTable::with_capacity(16).unwrap();
        for n in 0..4u64 {
            table.insert_unique(14, n).unwrap();
        }
        table.insert_unique(5, 99).unwrap();

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 5);
        assert_eq!(stats.capacity, 16);
        assert_eq!(stats.max_probe_length, 3);
        assert_eq!(stats.longest_cluster, 4);
        assert!((stats.mean_probe_length - 6.0 / 5.0).abs() < f64::EPSILON);
        assert_eq!(table.probe_histogram().bins(), &[2, 1, 1, 1]);
    }

    #[test]
    fn debug_output_lists_probe_distances() {
        let mut table: HashTable<u64> = HashTable::with_capacity(4).unwrap();
        table.insert_unique(1, 1).unwrap();
        table.insert_unique(1, 2).unwrap();

        let output = alloc::format!("{:?}", table);
        assert!(output.contains("\".., 00, 01, ..\""), "{output}");
        assert!(output.contains("populated: 2"));
    }
}
