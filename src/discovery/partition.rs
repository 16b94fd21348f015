//! Round-robin partitioning of the type catalog into worker shards

use std::num::NonZeroUsize;

/// Split `items` into exactly `shards` disjoint shards, round-robin
///
/// Shards beyond the number of items are empty.
pub fn partition<T>(items: impl IntoIterator<Item = T>, shards: NonZeroUsize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = (0..shards.get()).map(|_| Vec::new()).collect();
    for (index, item) in items.into_iter().enumerate() {
        out[index % shards.get()].push(item);
    }
    out
}
