//! Node pool and open list for the graph search.
//!
//! The pool is a fixed-capacity arena with a hash index from polygon ref to
//! node slot; exhausting it is the search's "out of nodes" budget signal.
//! The open list is a lazy binary heap over node indices: cost improvements
//! push a duplicate entry, and stale entries are skipped at pop time by
//! checking the node's closed flag.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::PolyRef;

/// Node index type
pub(crate) type NodeIndex = u16;

/// Null node index constant
pub(crate) const NULL_IDX: NodeIndex = NodeIndex::MAX;

/// Node flags for search state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeFlags(u8);

impl NodeFlags {
    pub(crate) const OPEN: NodeFlags = NodeFlags(0x01);
    pub(crate) const CLOSED: NodeFlags = NodeFlags(0x02);

    pub(crate) fn empty() -> Self {
        NodeFlags(0)
    }

    pub(crate) fn contains(&self, flag: NodeFlags) -> bool {
        self.0 & flag.0 != 0
    }

    pub(crate) fn insert(&mut self, flag: NodeFlags) {
        self.0 |= flag.0;
    }

    pub(crate) fn remove(&mut self, flag: NodeFlags) {
        self.0 &= !flag.0;
    }
}

/// Node in the search graph
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Position of the node (portal edge midpoint, or the start position)
    pub pos: [f32; 3],
    /// Cost from the start to this node
    pub cost: f32,
    /// Total cost (cost plus heuristic)
    pub total: f32,
    /// Index of the parent node
    pub pidx: NodeIndex,
    /// Search state flags
    pub flags: NodeFlags,
    /// Polygon ref the node corresponds to
    pub poly: PolyRef,
}

impl Node {
    fn new() -> Self {
        Self {
            pos: [0.0; 3],
            cost: 0.0,
            total: 0.0,
            pidx: NULL_IDX,
            flags: NodeFlags::empty(),
            poly: PolyRef::NONE,
        }
    }
}

/// Fixed-capacity node pool with hash lookup by polygon ref
#[derive(Debug)]
pub(crate) struct NodePool {
    nodes: Vec<Node>,
    first: Vec<NodeIndex>,
    next: Vec<NodeIndex>,
    hash_size: usize,
    node_count: usize,
}

impl NodePool {
    /// Creates a pool holding at most `max_nodes` nodes.
    ///
    /// Capacity is clamped so every slot stays addressable by [`NodeIndex`]
    /// with `NULL_IDX` reserved as the sentinel.
    pub(crate) fn new(max_nodes: usize) -> Self {
        let max_nodes = max_nodes.clamp(1, NULL_IDX as usize - 1);
        let hash_size = max_nodes.next_power_of_two();
        Self {
            nodes: vec![Node::new(); max_nodes],
            first: vec![NULL_IDX; hash_size],
            next: vec![NULL_IDX; max_nodes],
            hash_size,
            node_count: 0,
        }
    }

    /// Forgets all nodes; the arena is reused across searches
    pub(crate) fn clear(&mut self) {
        self.first.fill(NULL_IDX);
        self.next.fill(NULL_IDX);
        self.node_count = 0;
    }

    /// Current node count
    pub(crate) fn node_count(&self) -> usize {
        self.node_count
    }

    fn hash_ref(poly: PolyRef) -> usize {
        let a = poly.id() as usize;
        a ^ (a >> 16)
    }

    /// Finds the node for a polygon ref, if one was allocated
    pub(crate) fn find_node(&self, poly: PolyRef) -> Option<NodeIndex> {
        let hash = Self::hash_ref(poly) & (self.hash_size - 1);
        let mut idx = self.first[hash];
        while idx != NULL_IDX {
            if self.nodes[idx as usize].poly == poly {
                return Some(idx);
            }
            idx = self.next[idx as usize];
        }
        None
    }

    /// Gets or allocates the node for a polygon ref.
    ///
    /// Returns `None` when the pool is exhausted (out of nodes).
    pub(crate) fn get_node(&mut self, poly: PolyRef) -> Option<NodeIndex> {
        if let Some(idx) = self.find_node(poly) {
            return Some(idx);
        }

        if self.node_count >= self.nodes.len() {
            return None;
        }

        let idx = self.node_count as NodeIndex;
        self.node_count += 1;

        let node = &mut self.nodes[idx as usize];
        node.pos = [0.0; 3];
        node.cost = 0.0;
        node.total = 0.0;
        node.pidx = NULL_IDX;
        node.flags = NodeFlags::empty();
        node.poly = poly;

        let hash = Self::hash_ref(poly) & (self.hash_size - 1);
        self.next[idx as usize] = self.first[hash];
        self.first[hash] = idx;

        Some(idx)
    }

    /// Borrows a node by index
    pub(crate) fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx as usize]
    }

    /// Mutably borrows a node by index
    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.nodes[idx as usize]
    }
}

/// Heap entry keyed on the node's total cost at push time
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    idx: NodeIndex,
    total: f32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed ordering turns the max-heap into a min-heap on total
        // cost; NaN sorts last so it can never win the pop.
        match other.total.partial_cmp(&self.total) {
            Some(ordering) => ordering,
            None => {
                if other.total.is_nan() && !self.total.is_nan() {
                    Ordering::Less
                } else if !other.total.is_nan() && self.total.is_nan() {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
        }
    }
}

/// Open list: min-heap of node indices by total cost, with lazy deletion
#[derive(Debug, Default)]
pub(crate) struct OpenList {
    heap: BinaryHeap<HeapEntry>,
}

impl OpenList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    /// Pushes a node; a node whose cost improved is simply pushed again and
    /// the stale entry ignored at pop time
    pub(crate) fn push(&mut self, idx: NodeIndex, total: f32) {
        self.heap.push(HeapEntry { idx, total });
    }

    /// Pops the open node with the lowest total cost, skipping entries whose
    /// node has since been closed or re-pushed with a better cost
    pub(crate) fn pop(&mut self, pool: &NodePool) -> Option<NodeIndex> {
        while let Some(entry) = self.heap.pop() {
            let node = pool.node(entry.idx);
            if node.flags.contains(NodeFlags::CLOSED) {
                continue;
            }
            if node.total < entry.total {
                // Superseded by a cheaper duplicate still in the heap.
                continue;
            }
            return Some(entry.idx);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocates_and_finds() {
        let mut pool = NodePool::new(16);

        let a = PolyRef::new(1);
        let idx = pool.get_node(a).unwrap();
        assert_eq!(pool.node(idx).poly, a);
        assert_eq!(pool.node_count(), 1);

        // Same ref returns the same slot.
        assert_eq!(pool.get_node(a).unwrap(), idx);
        assert_eq!(pool.node_count(), 1);

        assert_eq!(pool.find_node(a), Some(idx));
        assert_eq!(pool.find_node(PolyRef::new(2)), None);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut pool = NodePool::new(2);
        assert!(pool.get_node(PolyRef::new(1)).is_some());
        assert!(pool.get_node(PolyRef::new(2)).is_some());
        assert!(pool.get_node(PolyRef::new(3)).is_none());

        pool.clear();
        assert!(pool.get_node(PolyRef::new(3)).is_some());
    }

    #[test]
    fn test_pool_capacity_is_clamped_to_index_range() {
        // An oversized request must not let node indices wrap past the
        // sentinel and alias slot 0.
        let mut pool = NodePool::new(usize::MAX);
        let mut allocated = 0u32;
        while pool.get_node(PolyRef::new(allocated + 1)).is_some() {
            allocated += 1;
        }
        assert_eq!(allocated as usize, NULL_IDX as usize - 1);

        // The first node is still resolvable by its own ref.
        let idx = pool.find_node(PolyRef::new(1)).unwrap();
        assert_eq!(pool.node(idx).poly, PolyRef::new(1));
    }

    #[test]
    fn test_open_list_orders_by_total() {
        let mut pool = NodePool::new(8);
        let mut open = OpenList::new();

        for (id, total) in [(1u32, 5.0f32), (2, 3.0), (3, 7.0)] {
            let idx = pool.get_node(PolyRef::new(id)).unwrap();
            pool.node_mut(idx).total = total;
            open.push(idx, total);
        }

        let first = open.pop(&pool).unwrap();
        assert_eq!(pool.node(first).poly, PolyRef::new(2));
        pool.node_mut(first).flags.insert(NodeFlags::CLOSED);

        let second = open.pop(&pool).unwrap();
        assert_eq!(pool.node(second).poly, PolyRef::new(1));
        pool.node_mut(second).flags.insert(NodeFlags::CLOSED);

        let third = open.pop(&pool).unwrap();
        assert_eq!(pool.node(third).poly, PolyRef::new(3));
        pool.node_mut(third).flags.insert(NodeFlags::CLOSED);

        assert!(open.pop(&pool).is_none());
    }

    #[test]
    fn test_open_list_skips_stale_entries() {
        let mut pool = NodePool::new(8);
        let mut open = OpenList::new();

        let idx = pool.get_node(PolyRef::new(1)).unwrap();
        pool.node_mut(idx).total = 9.0;
        open.push(idx, 9.0);

        // Cost improves; duplicate entry pushed, stale one must not pop.
        pool.node_mut(idx).total = 4.0;
        open.push(idx, 4.0);

        let popped = open.pop(&pool).unwrap();
        assert_eq!(popped, idx);
        pool.node_mut(popped).flags.insert(NodeFlags::CLOSED);
        assert!(open.pop(&pool).is_none());
    }
}
