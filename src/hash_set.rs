use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::ProbeError;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hasher::DefaultHashBuilder;

/// A hash set implemented using the linear-probing [`HashTable`] as the
/// underlying storage.
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. It shares the
/// map's growth policy: inserting a new value doubles the set first when the
/// load factor would exceed one half.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug + Hash + Eq,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash set with 64 slots and the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash set with exactly `capacity` slots and the given
    /// hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// # use rustc_hash::FxBuildHasher;
    /// #
    /// let set: HashSet<i32, _> = HashSet::with_capacity_and_hasher(100, FxBuildHasher).unwrap();
    /// assert_eq!(set.capacity(), 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self, ProbeError> {
        Ok(Self {
            table: HashTable::with_capacity(capacity)?,
            hash_builder,
        })
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the set.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all elements from the set, keeping the capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<(), ProbeError> {
        self.table.reserve(additional)
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already in
    /// the set is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// #
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(2).unwrap());
    /// assert!(!set.insert(2).unwrap());
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> Result<bool, ProbeError> {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| v == &value) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(value)?;
                Ok(true)
            }
        }
    }

    /// Adds a value to the set, replacing and returning an equal value if one
    /// was present.
    pub fn replace(&mut self, value: T) -> Result<Option<T>, ProbeError> {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| v == &value) {
            Entry::Occupied(mut entry) => Ok(Some(core::mem::replace(entry.get_mut(), value))),
            Entry::Vacant(entry) => {
                entry.insert(value)?;
                Ok(None)
            }
        }
    }

    /// Returns `true` if the set contains the value.
    pub fn contains(&self, value: &T) -> bool {
        self.get(value).is_some()
    }

    /// Returns a reference to the stored value equal to `value`, if any.
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value)
    }

    /// Removes a value from the set. Returns whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`, if any.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v == value)
    }

    /// An iterator visiting all elements in arbitrary order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements as an iterator.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set with 64 slots using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set with exactly `capacity` slots using the default
    /// hasher builder.
    pub fn with_capacity(capacity: usize) -> Result<Self, ProbeError> {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the elements of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A draining iterator over the elements of a `HashSet`.
pub struct Drain<'a, T> {
    inner: crate::hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
