// A node of the price tree at one exact price: owns an `OrderList` and
// aggregates the total resting size at that price. Tree linkage (`parent`,
// `left`, `right`) and the cached AVL `height` live here because rotations
// operate directly on these fields; the rotation logic itself is in
// `price_tree`.

use common::slab::Handle;
use common::types::{Price, Side, Size};

use crate::order_list::OrderList;

#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    pub price: Price,
    pub side: Side,
    pub size: Size,
    pub(crate) height: i32,
    pub(crate) parent: Option<Handle<PriceLevel>>,
    pub(crate) left: Option<Handle<PriceLevel>>,
    pub(crate) right: Option<Handle<PriceLevel>>,
    pub(crate) orders: OrderList,
}

impl PriceLevel {
    pub(crate) fn new(side: Side, price: Price) -> Self {
        Self {
            price,
            side,
            size: 0,
            height: 1,
            parent: None,
            left: None,
            right: None,
            orders: OrderList::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.count()
    }

    pub fn orders(&self) -> &OrderList {
        &self.orders
    }
}
