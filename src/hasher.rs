cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`HashMap::new`](crate::HashMap::new) and
        /// [`HashSet::new`](crate::HashSet::new).
        ///
        /// Randomly seeded `foldhash` when the `foldhash` feature is enabled.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`HashMap::new`](crate::HashMap::new) and
        /// [`HashSet::new`](crate::HashSet::new).
        ///
        /// The standard library's SipHash-1-3 `RandomState` when `foldhash` is
        /// disabled.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else if #[cfg(feature = "rustc-hash")] {
        /// The hasher builder used by [`HashMap::new`](crate::HashMap::new) and
        /// [`HashSet::new`](crate::HashSet::new).
        ///
        /// Without `foldhash` or `std` there is no source of random seeds, so
        /// the `rustc-hash` feature selects the deterministic `FxBuildHasher`.
        /// It is not resistant to hash flooding.
        pub type DefaultHashBuilder = rustc_hash::FxBuildHasher;
    } else {
        /// Placeholder used when no hasher feature is enabled.
        ///
        /// It has no values, so `new()` and `Default` are unavailable. Build
        /// maps and sets with [`HashMap::with_hasher`](crate::HashMap::with_hasher)
        /// or [`HashSet::with_hasher`](crate::HashSet::with_hasher) instead.
        #[derive(Debug, Clone, Copy)]
        pub enum DefaultHashBuilder {}
    }
}
