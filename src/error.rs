/// RbsetError enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq)]
pub enum RbsetError<K>
where
    K: Clone + Ord,
{
    /// Returned by insert() and load_from() when an equal element is
    /// already present. Carries the rejected element back to the caller.
    DuplicateElement(K),
    /// Fatal case, a red node has a red child.
    ConsecutiveReds,
    /// Fatal case, the logical root is coloured red.
    RedRoot,
    /// Fatal case, left and right paths cross a different number of
    /// black nodes. The String component of this variant can be used
    /// for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    SortError(K, K),
}
