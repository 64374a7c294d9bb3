// Self-balancing (AVL) BST keyed by price, one per (book, side). Owns the
// slab of `PriceLevel`s and the slab of `Order`s for that side, so every
// intrusive link (`parent`/`left`/`right`/`prev`/`next`) is a handle into
// storage this tree itself owns — the arena-of-handles idiom this crate
// generalizes from a fixed-capacity memory pool into a growable arena.
//
// The tree's root's parent is a conceptual sentinel that is never
// materialized as a slab entry; `root: Option<Handle<PriceLevel>>` plays its
// one real role. Rotations and rebalancing always recompute which slot
// (`left`, `right`, or `root`) a moved subtree belongs in by comparing keys,
// never by assuming a subtree kept the slot it held before the rotation.

use common::slab::{Handle, Slab};
use common::types::{Price, Side, Size};

use crate::order::Order;
use crate::price_level::PriceLevel;

pub struct PriceTree {
    side: Side,
    root: Option<Handle<PriceLevel>>,
    levels: Slab<PriceLevel>,
    orders: Slab<Order>,
}

impl PriceTree {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            root: None,
            levels: Slab::new(),
            orders: Slab::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> Option<Handle<PriceLevel>> {
        self.root
    }

    #[inline]
    pub fn level(&self, handle: Handle<PriceLevel>) -> &PriceLevel {
        self.levels.get(handle)
    }

    #[inline]
    pub fn level_mut(&mut self, handle: Handle<PriceLevel>) -> &mut PriceLevel {
        self.levels.get_mut(handle)
    }

    #[inline]
    pub fn order(&self, handle: Handle<Order>) -> &Order {
        self.orders.get(handle)
    }

    #[inline]
    pub fn order_mut(&mut self, handle: Handle<Order>) -> &mut Order {
        self.orders.get_mut(handle)
    }

    /// Direct access to the order slab, for FIFO traversal of a level's
    /// `OrderList` (see `OrderList::iter`).
    #[inline]
    pub fn orders_slab(&self) -> &Slab<Order> {
        &self.orders
    }

    pub fn alloc_order(&mut self, order: Order) -> Handle<Order> {
        self.orders.insert(order)
    }

    /// Appends an already-allocated order onto a level's FIFO list and
    /// folds its size into the level's aggregate.
    pub fn append_order(&mut self, level: Handle<PriceLevel>, order: Handle<Order>) {
        let size = self.orders.get(order).size;
        self.levels.get_mut(level).orders.append(&mut self.orders, order);
        self.levels.get_mut(level).size += size;
    }

    /// Unlinks an order from its level's FIFO list, adjusts the level's
    /// aggregate size, frees the order's slab slot, and returns it.
    pub fn remove_order(&mut self, order: Handle<Order>) -> Order {
        let level = self.orders.get(order).level;
        let size = self.orders.get(order).size;
        self.levels.get_mut(level).orders.remove(&mut self.orders, order);
        self.levels.get_mut(level).size -= size;
        self.orders.remove(order)
    }

    /// Finds the level at `price`, inserting a fresh empty one if none
    /// exists. Returns `(handle, created)`.
    pub fn find_or_insert_level(&mut self, price: Price) -> (Handle<PriceLevel>, bool) {
        if self.root.is_none() {
            let handle = self.levels.insert(PriceLevel::new(self.side, price));
            self.root = Some(handle);
            return (handle, true);
        }

        let mut cur = self.root.unwrap();
        loop {
            let cur_price = self.levels.get(cur).price;
            if price == cur_price {
                return (cur, false);
            } else if price < cur_price {
                match self.levels.get(cur).left {
                    Some(l) => cur = l,
                    None => {
                        let handle = self.levels.insert(PriceLevel::new(self.side, price));
                        self.levels.get_mut(handle).parent = Some(cur);
                        self.levels.get_mut(cur).left = Some(handle);
                        self.retrace(Some(cur));
                        return (handle, true);
                    }
                }
            } else {
                match self.levels.get(cur).right {
                    Some(r) => cur = r,
                    None => {
                        let handle = self.levels.insert(PriceLevel::new(self.side, price));
                        self.levels.get_mut(handle).parent = Some(cur);
                        self.levels.get_mut(cur).right = Some(handle);
                        self.retrace(Some(cur));
                        return (handle, true);
                    }
                }
            }
        }
    }

    /// Removes the given level from the tree and frees its slab slot.
    pub fn remove_level(&mut self, handle: Handle<PriceLevel>) {
        let (left, right) = {
            let node = self.levels.get(handle);
            (node.left, node.right)
        };

        match (left, right) {
            (None, None) => {
                let parent = self.levels.get(handle).parent;
                self.set_child_slot(parent, handle, None);
                self.retrace(parent);
                self.levels.remove(handle);
            }
            (Some(child), None) | (None, Some(child)) => {
                let parent = self.levels.get(handle).parent;
                self.levels.get_mut(child).parent = parent;
                self.set_child_slot(parent, handle, Some(child));
                self.retrace(parent);
                self.levels.remove(handle);
            }
            (Some(_), Some(right_child)) => {
                let successor = self.min_handle(right_child);
                self.swap_structural(handle, successor);
                // `handle` now occupies a leaf-or-one-child slot; finish there.
                self.remove_level(handle);
            }
        }
    }

    /// Minimum-price level in the tree.
    pub fn min(&self) -> Option<Handle<PriceLevel>> {
        self.root.map(|r| self.min_handle(r))
    }

    /// Maximum-price level in the tree.
    pub fn max(&self) -> Option<Handle<PriceLevel>> {
        self.root.map(|r| self.max_handle(r))
    }

    /// In-order predecessor of `handle` (next lower price), if any.
    pub fn predecessor(&self, handle: Handle<PriceLevel>) -> Option<Handle<PriceLevel>> {
        if let Some(left) = self.levels.get(handle).left {
            return Some(self.max_handle(left));
        }
        let mut cur = handle;
        let mut parent = self.levels.get(handle).parent;
        while let Some(p) = parent {
            if self.levels.get(p).right == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.levels.get(p).parent;
        }
        None
    }

    /// In-order successor of `handle` (next higher price), if any.
    pub fn successor(&self, handle: Handle<PriceLevel>) -> Option<Handle<PriceLevel>> {
        if let Some(right) = self.levels.get(handle).right {
            return Some(self.min_handle(right));
        }
        let mut cur = handle;
        let mut parent = self.levels.get(handle).parent;
        while let Some(p) = parent {
            if self.levels.get(p).left == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.levels.get(p).parent;
        }
        None
    }

    /// In-order traversal of (price, size) for every resting level,
    /// ascending by price.
    pub fn ascending(&self) -> Vec<(Price, Size)> {
        let mut out = Vec::new();
        self.ascending_from(self.root, &mut out);
        out
    }

    fn ascending_from(&self, h: Option<Handle<PriceLevel>>, out: &mut Vec<(Price, Size)>) {
        if let Some(h) = h {
            let node = self.levels.get(h);
            self.ascending_from(node.left, out);
            out.push((node.price, node.size));
            self.ascending_from(node.right, out);
        }
    }

    fn min_handle(&self, mut h: Handle<PriceLevel>) -> Handle<PriceLevel> {
        while let Some(l) = self.levels.get(h).left {
            h = l;
        }
        h
    }

    fn max_handle(&self, mut h: Handle<PriceLevel>) -> Handle<PriceLevel> {
        while let Some(r) = self.levels.get(h).right {
            h = r;
        }
        h
    }

    fn height(&self, h: Option<Handle<PriceLevel>>) -> i32 {
        match h {
            Some(h) => self.levels.get(h).height,
            None => 0,
        }
    }

    fn update_height(&mut self, h: Handle<PriceLevel>) {
        let (l, r) = {
            let node = self.levels.get(h);
            (node.left, node.right)
        };
        let new_height = 1 + self.height(l).max(self.height(r));
        self.levels.get_mut(h).height = new_height;
    }

    fn balance_factor(&self, h: Handle<PriceLevel>) -> i32 {
        let node = self.levels.get(h);
        self.height(node.right) - self.height(node.left)
    }

    /// Single left rotation around `x` (x is right-heavy). Returns the new
    /// subtree root. Does not rewire the caller's reference to `x`; the
    /// caller must reattach the returned handle via `reattach`.
    fn rotate_left(&mut self, x: Handle<PriceLevel>) -> Handle<PriceLevel> {
        let y = self.levels.get(x).right.expect("rotate_left needs a right child");
        let t2 = self.levels.get(y).left;

        self.levels.get_mut(y).left = Some(x);
        self.levels.get_mut(x).right = t2;
        if let Some(t2) = t2 {
            self.levels.get_mut(t2).parent = Some(x);
        }

        let x_parent = self.levels.get(x).parent;
        self.levels.get_mut(y).parent = x_parent;
        self.levels.get_mut(x).parent = Some(y);

        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Single right rotation around `x` (x is left-heavy). Symmetric to
    /// `rotate_left`.
    fn rotate_right(&mut self, x: Handle<PriceLevel>) -> Handle<PriceLevel> {
        let y = self.levels.get(x).left.expect("rotate_right needs a left child");
        let t2 = self.levels.get(y).right;

        self.levels.get_mut(y).right = Some(x);
        self.levels.get_mut(x).left = t2;
        if let Some(t2) = t2 {
            self.levels.get_mut(t2).parent = Some(x);
        }

        let x_parent = self.levels.get(x).parent;
        self.levels.get_mut(y).parent = x_parent;
        self.levels.get_mut(x).parent = Some(y);

        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Rebalances the subtree rooted at `h` if its factor exceeds ±1 (RR/RL/
    /// LL/LR as needed), returning the (possibly new) subtree root. Does not
    /// rewire the grandparent; see `retrace`.
    fn rebalance_node(&mut self, h: Handle<PriceLevel>) -> Handle<PriceLevel> {
        self.update_height(h);
        let bf = self.balance_factor(h);

        if bf > 1 {
            let right = self.levels.get(h).right.expect("bf>1 implies a right child");
            if self.balance_factor(right) < 0 {
                let new_right = self.rotate_right(right);
                self.levels.get_mut(h).right = Some(new_right);
            }
            self.rotate_left(h)
        } else if bf < -1 {
            let left = self.levels.get(h).left.expect("bf<-1 implies a left child");
            if self.balance_factor(left) > 0 {
                let new_left = self.rotate_left(left);
                self.levels.get_mut(h).left = Some(new_left);
            }
            self.rotate_right(h)
        } else {
            h
        }
    }

    /// Rewires `new_root`'s parent's child slot (or the tree root) to point
    /// at `new_root`, by comparing keys — never by assuming a prior slot.
    fn reattach(&mut self, new_root: Handle<PriceLevel>) {
        let parent = self.levels.get(new_root).parent;
        match parent {
            None => self.root = Some(new_root),
            Some(p) => {
                let new_price = self.levels.get(new_root).price;
                let p_price = self.levels.get(p).price;
                if new_price < p_price {
                    self.levels.get_mut(p).left = Some(new_root);
                } else {
                    self.levels.get_mut(p).right = Some(new_root);
                }
            }
        }
    }

    /// Retraces from `start` upward to the sentinel, rebalancing every
    /// ancestor whose factor exceeds ±1. Per the corrected walk extent
    /// (rather than stopping one level early), this is required to keep
    /// every shape AVL-balanced, not only the ones a shorter walk happens
    /// to cover.
    fn retrace(&mut self, mut h: Option<Handle<PriceLevel>>) {
        while let Some(node) = h {
            let new_root = self.rebalance_node(node);
            self.reattach(new_root);
            h = self.levels.get(new_root).parent;
        }
    }

    fn set_child_slot(
        &mut self,
        parent: Option<Handle<PriceLevel>>,
        old_child: Handle<PriceLevel>,
        new_child: Option<Handle<PriceLevel>>,
    ) {
        match parent {
            None => self.root = new_child,
            Some(p) => {
                if self.levels.get(p).left == Some(old_child) {
                    self.levels.get_mut(p).left = new_child;
                } else {
                    debug_assert_eq!(self.levels.get(p).right, Some(old_child));
                    self.levels.get_mut(p).right = new_child;
                }
            }
        }
    }

    /// Swaps the structural links (not the price/payload) of `a` and `b`,
    /// where `b` is the in-order successor of `a` (the minimum of `a`'s
    /// right subtree, hence never has a left child). After the swap, `a`
    /// occupies `b`'s former position (leaf or one right child) while `b`
    /// takes over `a`'s former position in the tree. `a`'s identity (its
    /// handle, and hence any PriceLevel the caller still references) is
    /// preserved; only its tree coordinates move.
    fn swap_structural(&mut self, a: Handle<PriceLevel>, b: Handle<PriceLevel>) {
        let a_parent = self.levels.get(a).parent;
        let a_left = self.levels.get(a).left;
        let a_right = self.levels.get(a).right;
        let b_parent = self.levels.get(b).parent;
        let b_right = self.levels.get(b).right;
        debug_assert!(self.levels.get(b).left.is_none());

        match a_parent {
            None => self.root = Some(b),
            Some(p) => {
                if self.levels.get(p).left == Some(a) {
                    self.levels.get_mut(p).left = Some(b);
                } else {
                    self.levels.get_mut(p).right = Some(b);
                }
            }
        }

        self.levels.get_mut(b).left = a_left;
        if let Some(l) = a_left {
            self.levels.get_mut(l).parent = Some(b);
        }

        if a_right == Some(b) {
            self.levels.get_mut(b).right = Some(a);
            self.levels.get_mut(b).parent = a_parent;
            self.levels.get_mut(a).parent = Some(b);
            self.levels.get_mut(a).right = b_right;
            if let Some(r) = b_right {
                self.levels.get_mut(r).parent = Some(a);
            }
            self.levels.get_mut(a).left = None;
        } else {
            self.levels.get_mut(b).right = a_right;
            if let Some(r) = a_right {
                self.levels.get_mut(r).parent = Some(b);
            }
            self.levels.get_mut(b).parent = a_parent;

            let bp = b_parent.expect("non-adjacent successor always has a parent");
            self.levels.get_mut(bp).left = Some(a);
            self.levels.get_mut(a).parent = b_parent;
            self.levels.get_mut(a).left = None;
            self.levels.get_mut(a).right = b_right;
            if let Some(r) = b_right {
                self.levels.get_mut(r).parent = Some(a);
            }
        }

        let ha = self.levels.get(a).height;
        let hb = self.levels.get(b).height;
        self.levels.get_mut(a).height = hb;
        self.levels.get_mut(b).height = ha;
    }

    /// Checks the BST and AVL invariants by walking the whole tree. Used by
    /// tests and the randomized stress scenario; not on any hot path.
    #[cfg(test)]
    fn check_invariants(&self) -> (i32, usize) {
        fn walk(tree: &PriceTree, h: Option<Handle<PriceLevel>>, lo: Option<Price>, hi: Option<Price>) -> (i32, usize) {
            match h {
                None => (0, 0),
                Some(h) => {
                    let node = tree.levels.get(h);
                    if let Some(lo) = lo {
                        assert!(node.price > lo, "BST order violated");
                    }
                    if let Some(hi) = hi {
                        assert!(node.price < hi, "BST order violated");
                    }
                    let (lh, lc) = walk(tree, node.left, lo, Some(node.price));
                    let (rh, rc) = walk(tree, node.right, Some(node.price), hi);
                    assert!((lh - rh).abs() <= 1, "AVL balance violated at price {}", node.price);
                    assert_eq!(node.height, 1 + lh.max(rh), "cached height stale");
                    (1 + lh.max(rh), 1 + lc + rc)
                }
            }
        }
        walk(self, self.root, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn price(n: i64) -> Price {
        Decimal::new(n, 0)
    }

    #[test]
    fn insert_maintains_bst_and_avl() {
        let mut tree = PriceTree::new(Side::Bid);
        for n in [50, 30, 70, 20, 40, 60, 80, 10, 90, 25, 35] {
            tree.find_or_insert_level(price(n));
        }
        let (_, count) = tree.check_invariants();
        assert_eq!(count, 11);
        let prices: Vec<i64> = tree.ascending().iter().map(|(p, _)| p.to_string().parse().unwrap()).collect();
        let mut sorted = prices.clone();
        sorted.sort();
        assert_eq!(prices, sorted);
    }

    #[test]
    fn duplicate_insert_returns_existing_handle() {
        let mut tree = PriceTree::new(Side::Bid);
        let (h1, created1) = tree.find_or_insert_level(price(100));
        let (h2, created2) = tree.find_or_insert_level(price(100));
        assert!(created1);
        assert!(!created2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn remove_preserves_avl_across_all_three_cases() {
        let mut tree = PriceTree::new(Side::Bid);
        let mut handles = Vec::new();
        for n in [50, 30, 70, 20, 40, 60, 80, 10, 90, 25, 35, 65, 75, 85, 95] {
            let (h, _) = tree.find_or_insert_level(price(n));
            handles.push(h);
        }
        tree.check_invariants();

        for h in handles {
            tree.remove_level(h);
            tree.check_invariants();
        }
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn predecessor_successor_navigate_in_order() {
        let mut tree = PriceTree::new(Side::Bid);
        let mut handles = Vec::new();
        for n in [50, 30, 70, 20, 40, 60, 80] {
            let (h, _) = tree.find_or_insert_level(price(n));
            handles.push((n, h));
        }
        let mid = handles.iter().find(|(n, _)| *n == 50).unwrap().1;
        let pred = tree.predecessor(mid).unwrap();
        let succ = tree.successor(mid).unwrap();
        assert_eq!(tree.level(pred).price, price(40));
        assert_eq!(tree.level(succ).price, price(60));
    }

    #[test]
    fn randomized_insert_then_reverse_cancel_stays_balanced() {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut prices: Vec<i64> = (0..1000).collect();
        prices.shuffle(&mut rng);

        let mut tree = PriceTree::new(Side::Bid);
        let mut handles = Vec::new();
        for &n in &prices {
            let (h, _) = tree.find_or_insert_level(price(n));
            handles.push(h);
        }
        tree.check_invariants();

        for h in handles.into_iter().rev() {
            let max_before = tree.max().map(|m| tree.level(m).price);
            let is_max = Some(tree.level(h).price) == max_before;
            tree.remove_level(h);
            tree.check_invariants();
            if is_max {
                if let Some(new_max) = tree.max() {
                    assert!(tree.level(new_max).price < max_before.unwrap());
                }
            }
        }
        assert_eq!(tree.root(), None);
    }
}
