use std::{borrow::Borrow, cmp::Ordering, fmt, mem};

use rand::Rng;

use crate::depth::Depth;
use crate::error::RbsetError;

// Reserved slots in the node table. Slot NIL is the shared leaf
// sentinel, slot HEADER is the dummy parent of the logical root.
const NIL: usize = 0;
const HEADER: usize = 1;

/// Rbset manages a single instance of an in-memory ordered set using
/// a [red-black][rbt] tree.
///
/// Nodes live in a growable table and link to each other by index,
/// which keeps the parent/child cycle out of the ownership graph.
/// The sentinel and the header are reserved table slots, always
/// black and never carrying an element, so every "absent child" and
/// "parent of the root" access stays a plain table lookup.
///
/// [rbt]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
#[derive(Clone)]
pub struct Rbset<K>
where
    K: Clone + Ord,
{
    name: String,
    nodes: Vec<Node<K>>,
    freed: Vec<usize>,
    n_count: usize, // number of elements in the set.
}

/// Different ways to construct a new Rbset instance.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Create an empty instance of Rbset, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Rbset<K>
    where
        S: AsRef<str>,
    {
        let nodes = vec![Node::reserved(), Node::reserved()];
        Rbset {
            name: name.as_ref().to_string(),
            nodes,
            freed: Vec::new(),
            n_count: 0,
        }
    }

    /// Create a new instance of Rbset and load it with elements from
    /// `iter`. Elements must be unique, the first duplicate aborts
    /// the load.
    pub fn load_from<S, I>(name: S, iter: I) -> Result<Rbset<K>, RbsetError<K>>
    where
        S: AsRef<str>,
        I: Iterator<Item = K>,
    {
        let mut index = Rbset::new(name);
        for element in iter {
            index.insert(element)?;
        }
        Ok(index)
    }
}

/// Maintenance API.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Identify this instance. Applications can choose unique names
    /// while creating Rbset instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of elements in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this set is empty, in other words whether the
    /// header's right child is the sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes[HEADER].right == NIL
    }

    /// Return quickly with basic statistics, only entries() method is
    /// valid with this statistics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K>>())
    }
}

/// Write operations on Rbset instance.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Add a new element into the set. If an equal element is already
    /// present return it wrapped in [`RbsetError::DuplicateElement`],
    /// leaving the set unchanged. Equality is decided by `Ord` alone.
    ///
    /// The descent is single pass: whenever the node about to be
    /// passed has two red children, the violation is repaired right
    /// away, so attaching the new red leaf never needs a second pass
    /// over the path.
    pub fn insert(&mut self, element: K) -> Result<(), RbsetError<K>> {
        let (mut current, mut parent, mut grand, mut great) = (HEADER, HEADER, HEADER, HEADER);
        loop {
            great = grand;
            grand = parent;
            parent = current;
            current = match self.compare(&element, current) {
                Ordering::Less => self.nodes[current].left,
                _ => self.nodes[current].right,
            };
            if current == NIL {
                break;
            }
            if self.compare(&element, current) == Ordering::Equal {
                return Err(RbsetError::DuplicateElement(element));
            }
            // double-red one level below the trailing pointers
            if self.is_red(self.nodes[current].left) && self.is_red(self.nodes[current].right) {
                let (c, p) = self.reorient(&element, current, parent, grand, great);
                current = c;
                parent = p;
            }
        }

        let key = element.clone();
        let node = self.alloc(element);
        self.nodes[node].parent = parent;
        match self.compare(&key, parent) {
            Ordering::Less => self.nodes[parent].left = node,
            _ => self.nodes[parent].right = node,
        }
        // the fresh red leaf can itself be the lower half of a double-red
        self.reorient(&key, node, parent, grand, great);
        self.n_count += 1;
        Ok(())
    }

    /// Delete `element` from this instance. Return whether a removal
    /// happened; a miss is a no-op.
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.nodes[HEADER].right;
        loop {
            if current == NIL {
                return false;
            }
            current = match self.key(current).borrow().cmp(element) {
                Ordering::Greater => self.nodes[current].left,
                Ordering::Less => self.nodes[current].right,
                Ordering::Equal => break,
            };
        }

        let (left, right) = (self.nodes[current].left, self.nodes[current].right);
        let target = if left != NIL && right != NIL {
            // Two real children: swap elements with the in-order
            // successor and unlink the successor instead. The
            // successor has no real left child, so this reduces to
            // the at-most-one-child case without re-searching.
            let mut succ = right;
            while self.nodes[succ].left != NIL {
                succ = self.nodes[succ].left;
            }
            let key = self.nodes[current].key.take();
            let skey = self.nodes[succ].key.take();
            self.nodes[current].key = skey;
            self.nodes[succ].key = key;
            succ
        } else {
            current
        };
        self.unlink(target);
        self.n_count -= 1;
        true
    }

    /// Remove every element. The whole node table is reclaimed.
    pub fn clear(&mut self) {
        self.nodes.truncate(HEADER + 1);
        self.nodes[HEADER].left = NIL;
        self.nodes[HEADER].right = NIL;
        self.freed.clear();
        self.n_count = 0;
    }

    /// Validate the tree with following rules:
    ///
    /// * Logical root must be black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure elements are in sorted order, without duplicates.
    ///
    /// Additionally return full statistics on the tree. Refer to
    /// [`Stats`] for more information.
    pub fn validate(&self) -> Result<Stats, RbsetError<K>> {
        let root = self.nodes[HEADER].right;
        if self.is_red(root) {
            return Err(RbsetError::RedRoot);
        }
        let mut stats = Stats::new(self.n_count, mem::size_of::<Node<K>>());
        stats.set_depths(Depth::new());
        let blacks = self.validate_tree(root, false, 0, 0, &mut stats)?;
        stats.set_blacks(blacks);
        Ok(stats)
    }
}

/// Read operations on Rbset instance.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Check whether `element` is a member of the set.
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.nodes[HEADER].right;
        while node != NIL {
            node = match self.key(node).borrow().cmp(element) {
                Ordering::Greater => self.nodes[node].left,
                Ordering::Less => self.nodes[node].right,
                Ordering::Equal => return true,
            };
        }
        false
    }

    /// Find the smallest element in the set, None if empty.
    pub fn find_min(&self) -> Option<K> {
        let mut node = self.nodes[HEADER].right;
        if node == NIL {
            return None;
        }
        while self.nodes[node].left != NIL {
            node = self.nodes[node].left;
        }
        Some(self.key(node).clone())
    }

    /// Find the largest element in the set, None if empty.
    pub fn find_max(&self) -> Option<K> {
        let mut node = self.nodes[HEADER].right;
        if node == NIL {
            return None;
        }
        while self.nodes[node].right != NIL {
            node = self.nodes[node].right;
        }
        Some(self.key(node).clone())
    }

    /// Find the in-order successor of `element`. Return None when
    /// `element` is not a member or is the maximum.
    pub fn find_successor<Q>(&self, element: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.nodes[HEADER].right;
        loop {
            if current == NIL {
                return None;
            }
            current = match self.key(current).borrow().cmp(element) {
                Ordering::Greater => self.nodes[current].left,
                Ordering::Less => self.nodes[current].right,
                Ordering::Equal => break,
            };
        }

        if self.nodes[current].right != NIL {
            // successor sits below, leftmost node of the right subtree
            let mut succ = self.nodes[current].right;
            while self.nodes[succ].left != NIL {
                succ = self.nodes[succ].left;
            }
            Some(self.key(succ).clone())
        } else {
            // successor sits above, the parent of the last left move
            loop {
                let parent = self.nodes[current].parent;
                if parent == HEADER {
                    return None;
                }
                if self.nodes[parent].left == current {
                    return Some(self.key(parent).clone());
                }
                current = parent;
            }
        }
    }

    /// Return a random member of this set.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<K> {
        let mut node = self.nodes[HEADER].right;
        if node == NIL {
            return None;
        }

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let next = match rng.gen::<u8>() % 2 {
                0 => self.nodes[node].left,
                1 => self.nodes[node].right,
                _ => unreachable!(),
            };
            if at_depth == 0 || next == NIL {
                break Some(self.key(node).clone());
            }
            at_depth -= 1;
            node = next;
        }
    }

    /// Print every element in ascending order to stdout. Diagnostic
    /// only, not part of the data contract.
    pub fn debug_print(&self)
    where
        K: fmt::Debug,
    {
        self.print_tree(self.nodes[HEADER].right)
    }

    fn print_tree(&self, node: usize)
    where
        K: fmt::Debug,
    {
        if node != NIL {
            self.print_tree(self.nodes[node].left);
            println!("{:?}", self.key(node));
            self.print_tree(self.nodes[node].right);
        }
    }
}

// Insertion internals.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Repair a double-red violation at `current` while descending
    /// for `element`. Recolours current red and its children black,
    /// and when the immediate parent is red as well, performs one or
    /// two rotations. Returns the (current, parent) pair to continue
    /// the descent from, since rotations reshuffle the trailing
    /// pointers.
    fn reorient(
        &mut self,
        element: &K,
        current: usize,
        parent: usize,
        grand: usize,
        great: usize,
    ) -> (usize, usize) {
        let (mut current, mut parent) = (current, parent);

        self.nodes[current].black = false;
        let (left, right) = (self.nodes[current].left, self.nodes[current].right);
        if left != NIL {
            self.nodes[left].black = true;
        }
        if right != NIL {
            self.nodes[right].black = true;
        }

        if self.is_red(parent) {
            // have to rotate, assumes invariants hold above current
            self.nodes[grand].black = false;
            let zig = self.compare(element, grand) == Ordering::Less;
            let zag = self.compare(element, parent) == Ordering::Less;
            if zig != zag {
                parent = self.rotate(element, grand); // start double rotation
            }
            current = self.rotate(element, great);
            self.nodes[current].black = true;
        }

        // ensure the logical root stays black
        let root = self.nodes[HEADER].right;
        if root != NIL {
            self.nodes[root].black = true;
        }
        (current, parent)
    }

    /// Single or double rotation under `upper`, picked by which side
    /// of `upper` and of `upper`'s child the element descends to.
    /// Because there are two levels of choice, there are four cases.
    fn rotate(&mut self, element: &K, upper: usize) -> usize {
        if self.compare(element, upper) == Ordering::Less {
            let left = self.nodes[upper].left;
            match self.compare(element, left) {
                Ordering::Less => self.rotate_right(left), // left-left
                _ => self.rotate_left(left),               // left-right
            }
        } else {
            let right = self.nodes[upper].right;
            match self.compare(element, right) {
                Ordering::Less => self.rotate_right(right), // right-left
                _ => self.rotate_left(right),               // right-right
            }
        }
    }
}

// Deletion internals. The repair cases carry the deficient node's
// parent alongside, because the deficient node can be the shared
// sentinel whose own parent link is meaningless.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    /// Physically remove `node`, which has at most one real child,
    /// splicing that child into its slot. Removing a red node keeps
    /// the black-height as is; a black node replaced by a red child
    /// is settled by recolouring; otherwise walk up the six repair
    /// cases starting from the spliced-in child.
    fn unlink(&mut self, node: usize) {
        let child = if self.nodes[node].right == NIL {
            self.nodes[node].left
        } else {
            self.nodes[node].right
        };
        let parent = self.nodes[node].parent;

        if self.nodes[parent].right == node {
            self.nodes[parent].right = child;
        } else {
            self.nodes[parent].left = child;
        }
        if child != NIL {
            self.nodes[child].parent = parent;
        }

        if self.nodes[node].black {
            if self.is_red(child) {
                self.nodes[child].black = true;
            } else {
                self.delete_case1(child, parent);
            }
        }
        self.dealloc(node);
    }

    /// Case 1: the deficit reached the root, every path lost one
    /// black node uniformly, done.
    fn delete_case1(&mut self, node: usize, parent: usize) {
        if parent != HEADER {
            self.delete_case2(node, parent);
        }
    }

    /// Case 2: red sibling. Recolour parent and sibling and rotate at
    /// the parent towards `node`, which leaves `node` with a black
    /// sibling, then fall through.
    fn delete_case2(&mut self, node: usize, parent: usize) {
        let sibling = self.sibling(node, parent);
        if self.is_red(sibling) {
            self.nodes[parent].black = false;
            self.nodes[sibling].black = true;
            if self.nodes[parent].left == node {
                self.rotate_left(parent);
            } else {
                self.rotate_right(parent);
            }
        }
        self.delete_case3(node, parent);
    }

    /// Case 3: parent, sibling and sibling's children all black.
    /// Repaint the sibling red, which pushes the deficit one level
    /// up, and restart the repair at the parent.
    fn delete_case3(&mut self, node: usize, parent: usize) {
        let sibling = self.sibling(node, parent);
        let (sl, sr) = (self.nodes[sibling].left, self.nodes[sibling].right);
        if self.nodes[parent].black
            && self.nodes[sibling].black
            && self.is_black(sl)
            && self.is_black(sr)
        {
            self.nodes[sibling].black = false;
            let grand = self.nodes[parent].parent;
            self.delete_case1(parent, grand);
        } else {
            self.delete_case4(node, parent);
        }
    }

    /// Case 4: red parent, black sibling with two black children.
    /// Swapping the colours of parent and sibling settles the
    /// deficit.
    fn delete_case4(&mut self, node: usize, parent: usize) {
        let sibling = self.sibling(node, parent);
        let (sl, sr) = (self.nodes[sibling].left, self.nodes[sibling].right);
        if !self.nodes[parent].black
            && self.nodes[sibling].black
            && self.is_black(sl)
            && self.is_black(sr)
        {
            self.nodes[sibling].black = false;
            self.nodes[parent].black = true;
        } else {
            self.delete_case5(node, parent);
        }
    }

    /// Case 5: black sibling whose near child (relative to `node`) is
    /// red and far child is black. Rotate at the sibling away from
    /// `node`, recolouring, so the new sibling has a red far child,
    /// then fall through to case 6. The sibling is necessarily black
    /// here, cases 2 and 4 already disposed of the red combinations.
    fn delete_case5(&mut self, node: usize, parent: usize) {
        let sibling = self.sibling(node, parent);
        if self.nodes[sibling].black {
            let (sl, sr) = (self.nodes[sibling].left, self.nodes[sibling].right);
            if self.nodes[parent].left == node && self.is_black(sr) && self.is_red(sl) {
                self.nodes[sibling].black = false;
                self.nodes[sl].black = true;
                self.rotate_right(sibling);
            } else if self.nodes[parent].right == node && self.is_black(sl) && self.is_red(sr) {
                self.nodes[sibling].black = false;
                self.nodes[sr].black = true;
                self.rotate_left(sibling);
            }
        }
        self.delete_case6(node, parent);
    }

    /// Case 6: black sibling with a red far child. The sibling takes
    /// the parent's colour, parent and far child turn black, and a
    /// rotation at the parent towards `node` absorbs the deficit.
    fn delete_case6(&mut self, node: usize, parent: usize) {
        let sibling = self.sibling(node, parent);
        self.nodes[sibling].black = self.nodes[parent].black;
        self.nodes[parent].black = true;
        if self.nodes[parent].left == node {
            let sr = self.nodes[sibling].right;
            self.nodes[sr].black = true;
            self.rotate_left(parent);
        } else {
            let sl = self.nodes[sibling].left;
            self.nodes[sl].black = true;
            self.rotate_right(parent);
        }
    }

    /// The other child of `node`'s parent. During repair the sibling
    /// is always a real node, it carries the surviving black height.
    fn sibling(&self, node: usize, parent: usize) -> usize {
        if self.nodes[parent].left == node {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        }
    }
}

// Rotation primitives and plumbing shared by insertion and deletion.
impl<K> Rbset<K>
where
    K: Clone + Ord,
{
    //            grand                       grand
    //              |                           |
    //             node                       pivot
    //             /  \                       /   \
    //          left  pivot                node    right
    //                /   \                /  \
    //            inner   right         left  inner
    //
    /// Rotate the subtree left at `node`. The right child must be
    /// real. The grandparent's child slot is rewired here as well,
    /// so callers never reattach the returned subtree root.
    fn rotate_left(&mut self, node: usize) -> usize {
        let pivot = self.nodes[node].right;
        if pivot == NIL {
            panic!("rotate_left(): rotating the sentinel ? call the programmer");
        }
        let grand = self.nodes[node].parent;
        let inner = self.nodes[pivot].left;
        self.nodes[node].right = inner;
        if inner != NIL {
            self.nodes[inner].parent = node;
        }
        self.nodes[pivot].left = node;
        self.nodes[node].parent = pivot;
        self.nodes[pivot].parent = grand;
        if self.nodes[grand].right == node {
            self.nodes[grand].right = pivot;
        } else {
            self.nodes[grand].left = pivot;
        }
        pivot
    }

    //            grand                       grand
    //              |                           |
    //             node                       pivot
    //             /  \                       /   \
    //         pivot  right                left   node
    //         /   \                              /  \
    //      left   inner                      inner   right
    //
    /// Rotate the subtree right at `node`. The left child must be
    /// real. The grandparent's child slot is rewired here as well.
    fn rotate_right(&mut self, node: usize) -> usize {
        let pivot = self.nodes[node].left;
        if pivot == NIL {
            panic!("rotate_right(): rotating the sentinel ? call the programmer");
        }
        let grand = self.nodes[node].parent;
        let inner = self.nodes[pivot].right;
        self.nodes[node].left = inner;
        if inner != NIL {
            self.nodes[inner].parent = node;
        }
        self.nodes[pivot].right = node;
        self.nodes[node].parent = pivot;
        self.nodes[pivot].parent = grand;
        if self.nodes[grand].right == node {
            self.nodes[grand].right = pivot;
        } else {
            self.nodes[grand].left = pivot;
        }
        pivot
    }

    /// Compare `element` against the node at `node`, with the caveat
    /// that the header always answers "element is greater", so that
    /// descent from the header proceeds into its right subtree. This
    /// is the one comparison rule shared by search, insertion and
    /// rotation.
    fn compare(&self, element: &K, node: usize) -> Ordering {
        if node == HEADER {
            Ordering::Greater
        } else {
            element.cmp(self.key(node))
        }
    }

    fn key(&self, node: usize) -> &K {
        match &self.nodes[node].key {
            Some(key) => key,
            None => panic!("key(): element lookup on a reserved node ? call the programmer"),
        }
    }

    #[inline]
    fn is_red(&self, node: usize) -> bool {
        !self.nodes[node].black
    }

    #[inline]
    fn is_black(&self, node: usize) -> bool {
        self.nodes[node].black
    }

    fn alloc(&mut self, key: K) -> usize {
        match self.freed.pop() {
            Some(node) => {
                self.nodes[node] = Node::fresh(key);
                node
            }
            None => {
                self.nodes.push(Node::fresh(key));
                self.nodes.len() - 1
            }
        }
    }

    fn dealloc(&mut self, node: usize) {
        self.nodes[node] = Node::reserved();
        self.freed.push(node);
    }

    fn validate_tree(
        &self,
        node: usize,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        stats: &mut Stats,
    ) -> Result<usize, RbsetError<K>> {
        if node == NIL {
            if let Some(depths) = stats.depths.as_mut() {
                depths.sample(depth);
            }
            return Ok(nb);
        }

        let red = self.is_red(node);
        if fromred && red {
            return Err(RbsetError::ConsecutiveReds);
        }
        if !red {
            nb += 1;
        }
        let (left, right) = (self.nodes[node].left, self.nodes[node].right);
        let lblacks = self.validate_tree(left, red, nb, depth + 1, stats)?;
        let rblacks = self.validate_tree(right, red, nb, depth + 1, stats)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(RbsetError::UnbalancedBlacks(err));
        }
        if left != NIL && self.key(left).ge(self.key(node)) {
            let (lkey, parent) = (self.key(left).clone(), self.key(node).clone());
            return Err(RbsetError::SortError(lkey, parent));
        }
        if right != NIL && self.key(right).le(self.key(node)) {
            let (rkey, parent) = (self.key(right).clone(), self.key(node).clone());
            return Err(RbsetError::SortError(rkey, parent));
        }
        Ok(lblacks)
    }
}

/// Node is a single slot in the node table.
#[derive(Clone)]
struct Node<K> {
    key: Option<K>, // None only for the two reserved slots
    black: bool,
    left: usize,
    right: usize,
    parent: usize,
}

impl<K> Node<K> {
    // reserved slot, black with no element and sentinel links.
    fn reserved() -> Node<K> {
        Node {
            key: None,
            black: true,
            left: NIL,
            right: NIL,
            parent: NIL,
        }
    }

    // freshly inserted nodes start red, with sentinel children, and
    // are wired to their parent by the caller.
    fn fresh(key: K) -> Node<K> {
        Node {
            key: Some(key),
            black: false,
            left: NIL,
            right: NIL,
            parent: NIL,
        }
    }
}

/// Statistics on [`Rbset`] instance. Serves two purpose:
///
/// * To get partial but quick statistics via [`Rbset::stats`] method.
/// * To get full statistics via [`Rbset::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of elements in the set.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number of elements in the [`Rbset`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size of `Rbset<K>`, including the table slot
    /// overhead. The node overhead is constant, the size varies with
    /// the element type.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return the number of black nodes from root to leaf, same on
    /// the left path and the right path.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, only available after a
    /// [`Rbset::validate`] pass.
    pub fn depths(&self) -> Option<Depth> {
        match &self.depths {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
