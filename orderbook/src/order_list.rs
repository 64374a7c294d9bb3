// Intrusive FIFO doubly-linked list of `Order`s belonging to one `PriceLevel`.
//
// The list itself stores only `head`/`tail`/`count`; the links live on the
// `Order` values in the owning side's slab, so every operation here takes
// that slab by mutable reference rather than owning the orders directly.

use common::slab::{Handle, Slab};

use crate::order::Order;

/// FIFO queue of order handles for one price level.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderList {
    pub(crate) head: Option<Handle<Order>>,
    pub(crate) tail: Option<Handle<Order>>,
    pub(crate) count: usize,
}

impl OrderList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn head(&self) -> Option<Handle<Order>> {
        self.head
    }

    /// Appends `handle` at the tail. O(1).
    ///
    /// Caller owns the order's `size` accounting (the level adds it to its
    /// own aggregate); this only threads the intrusive links.
    pub fn append(&mut self, orders: &mut Slab<Order>, handle: Handle<Order>) {
        orders.get_mut(handle).prev = self.tail;
        orders.get_mut(handle).next = None;

        if let Some(tail) = self.tail {
            orders.get_mut(tail).next = Some(handle);
        } else {
            self.head = Some(handle);
        }
        self.tail = Some(handle);
        self.count += 1;
    }

    /// Unlinks `handle` from the list in place. O(1). Does not deallocate
    /// the order from the slab; the caller decides that.
    pub fn remove(&mut self, orders: &mut Slab<Order>, handle: Handle<Order>) {
        let (prev, next) = {
            let order = orders.get(handle);
            (order.prev, order.next)
        };

        match prev {
            Some(prev) => orders.get_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => orders.get_mut(next).prev = prev,
            None => self.tail = prev,
        }
        self.count -= 1;
    }

    /// Collects the handles in FIFO order, for traversal/testing.
    pub fn iter<'a>(&self, orders: &'a Slab<Order>) -> OrderListIter<'a> {
        OrderListIter {
            orders,
            current: self.head,
        }
    }
}

pub struct OrderListIter<'a> {
    orders: &'a Slab<Order>,
    current: Option<Handle<Order>>,
}

impl<'a> Iterator for OrderListIter<'a> {
    type Item = Handle<Order>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.current?;
        self.current = self.orders.get(handle).next;
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::time::Nanos;
    use common::types::Side;
    use rust_decimal::Decimal;

    fn mk(orders: &mut Slab<Order>, id: &str) -> Handle<Order> {
        // level handle is never dereferenced in these tests; use a dummy
        // slab to mint one.
        let mut levels: Slab<crate::price_level::PriceLevel> = Slab::new();
        let level = levels.insert(crate::price_level::PriceLevel::new(Side::Bid, Decimal::ONE));
        orders.insert(Order::new(
            id.to_string(),
            Side::Bid,
            Decimal::ONE,
            1,
            Nanos::new(0),
            level,
        ))
    }

    #[test]
    fn append_preserves_fifo() {
        let mut orders: Slab<Order> = Slab::new();
        let mut list = OrderList::new();

        let a = mk(&mut orders, "a");
        let b = mk(&mut orders, "b");
        let c = mk(&mut orders, "c");

        list.append(&mut orders, a);
        list.append(&mut orders, b);
        list.append(&mut orders, c);

        let seen: Vec<String> = list
            .iter(&orders)
            .map(|h| orders.get(h).order_id.clone())
            .collect();
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(list.count(), 3);
    }

    #[test]
    fn remove_middle_relinks_neighbors() {
        let mut orders: Slab<Order> = Slab::new();
        let mut list = OrderList::new();

        let a = mk(&mut orders, "a");
        let b = mk(&mut orders, "b");
        let c = mk(&mut orders, "c");
        list.append(&mut orders, a);
        list.append(&mut orders, b);
        list.append(&mut orders, c);

        list.remove(&mut orders, b);

        let seen: Vec<String> = list
            .iter(&orders)
            .map(|h| orders.get(h).order_id.clone())
            .collect();
        assert_eq!(seen, vec!["a", "c"]);
        assert_eq!(orders.get(a).next, Some(c));
        assert_eq!(orders.get(c).prev, Some(a));
    }

    #[test]
    fn remove_head_and_tail() {
        let mut orders: Slab<Order> = Slab::new();
        let mut list = OrderList::new();
        let a = mk(&mut orders, "a");
        list.append(&mut orders, a);
        list.remove(&mut orders, a);
        assert!(list.is_empty());
        assert_eq!(list.head, None);
        assert_eq!(list.tail, None);
    }
}
