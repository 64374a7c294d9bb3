// A single resting limit order: the leaf node of the structure, threaded
// into its price level's intrusive doubly-linked list via handles into the
// owning `PriceTree`'s order slab.

use common::slab::Handle;
use common::time::Nanos;
use common::types::{OrderId, Price, Side, Size};

use crate::price_level::PriceLevel;

/// A resting limit order.
///
/// `prev`/`next` are intrusive FIFO links within the owning price level's
/// `OrderList`; `level` is a non-owning back-reference to that level. All
/// three are handles into the side's order/level slabs, not pointers.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub size: Size,
    pub timestamp: Nanos,
    pub(crate) prev: Option<Handle<Order>>,
    pub(crate) next: Option<Handle<Order>>,
    pub(crate) level: Handle<PriceLevel>,
}

impl Order {
    pub(crate) fn new(
        order_id: OrderId,
        side: Side,
        price: Price,
        size: Size,
        timestamp: Nanos,
        level: Handle<PriceLevel>,
    ) -> Self {
        Self {
            order_id,
            side,
            price,
            size,
            timestamp,
            prev: None,
            next: None,
            level,
        }
    }

    #[inline]
    pub fn is_bid(&self) -> bool {
        self.side.is_bid()
    }
}
