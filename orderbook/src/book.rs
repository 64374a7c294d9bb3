// Per-ticker facade: two `PriceTree`s (bids, asks), an order-id index, a
// (side, price) index, and cached best-bid/best-ask handles. This is the
// component that actually implements §4.3 of the add/update/remove/
// depth_view contract; `PriceTree` only knows how to keep one side's BST
// balanced.

use std::collections::HashMap;

use common::slab::Handle;
use common::time::Nanos;
use common::types::{OrderId, Price, Side, Size, Ticker};

use crate::error::EngineError;
use crate::order::Order;
use crate::price_level::PriceLevel;
use crate::price_tree::PriceTree;

/// One row of a depth ladder. Empty sides are `None`; the ticker is only
/// populated on the first row of a book's ladder (callers rendering text
/// output should print the empty string for `None`, per §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthRow {
    pub ticker: Option<Ticker>,
    pub ask_price: Option<Price>,
    pub ask_qty: Option<Size>,
    pub bid_price: Option<Price>,
    pub bid_qty: Option<Size>,
}

/// Where a resting order lives, for O(1) lookup by order-id.
#[derive(Clone, Copy)]
struct OrderLocation {
    side: Side,
    handle: Handle<Order>,
}

pub struct OrderBook {
    ticker: Ticker,
    bids: PriceTree,
    asks: PriceTree,
    order_index: HashMap<OrderId, OrderLocation>,
    price_index: HashMap<(Side, Price), Handle<PriceLevel>>,
    best_bid: Option<Handle<PriceLevel>>,
    best_ask: Option<Handle<PriceLevel>>,
}

impl OrderBook {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            bids: PriceTree::new(Side::Bid),
            asks: PriceTree::new(Side::Ask),
            order_index: HashMap::new(),
            price_index: HashMap::new(),
            best_bid: None,
            best_ask: None,
        }
    }

    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.best_bid.is_none() && self.best_ask.is_none()
    }

    #[inline]
    pub fn best_bid_price(&self) -> Option<Price> {
        self.best_bid.map(|h| self.bids.level(h).price)
    }

    #[inline]
    pub fn best_bid_size(&self) -> Option<Size> {
        self.best_bid.map(|h| self.bids.level(h).size)
    }

    #[inline]
    pub fn best_ask_price(&self) -> Option<Price> {
        self.best_ask.map(|h| self.asks.level(h).price)
    }

    #[inline]
    pub fn best_ask_size(&self) -> Option<Size> {
        self.best_ask.map(|h| self.asks.level(h).size)
    }

    fn tree(&self, side: Side) -> &PriceTree {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn tree_mut(&mut self, side: Side) -> &mut PriceTree {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// `true` if `candidate` improves on the current best for `side`
    /// (greater for bids, lesser for asks).
    fn improves_best(&self, side: Side, candidate: Price) -> bool {
        match side {
            Side::Bid => match self.best_bid_price() {
                Some(best) => candidate > best,
                None => true,
            },
            Side::Ask => match self.best_ask_price() {
                Some(best) => candidate < best,
                None => true,
            },
        }
    }

    /// Adds a new resting order. Fails with `DuplicateOrder` if `order_id`
    /// is already resting anywhere in this book.
    pub fn add(
        &mut self,
        order_id: OrderId,
        side: Side,
        price: Price,
        size: Size,
        timestamp: Nanos,
    ) -> Result<(), EngineError> {
        if self.order_index.contains_key(&order_id) {
            return Err(EngineError::DuplicateOrder(order_id));
        }

        let key = (side, price);
        let (level_handle, created) = match self.price_index.get(&key) {
            Some(&h) => (h, false),
            None => {
                let (h, _) = self.tree_mut(side).find_or_insert_level(price);
                self.price_index.insert(key, h);
                (h, true)
            }
        };

        let order = Order::new(order_id.clone(), side, price, size, timestamp, level_handle);
        let order_handle = self.tree_mut(side).alloc_order(order);
        self.tree_mut(side).append_order(level_handle, order_handle);
        self.order_index.insert(order_id, OrderLocation { side, handle: order_handle });

        if created && self.improves_best(side, price) {
            self.set_best(side, Some(level_handle));
        }

        Ok(())
    }

    /// Sets the new absolute size of a resting order. `new_size = 0` is
    /// accepted (see design notes): the order stays resting at its FIFO
    /// slot with a zero-size contribution; callers that want removal send
    /// a cancel.
    pub fn update(&mut self, order_id: &str, new_size: Size) -> Result<(), EngineError> {
        let location = *self
            .order_index
            .get(order_id)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?;

        let tree = self.tree_mut(location.side);
        let level_handle = tree.order(location.handle).level;
        let old_size = tree.order(location.handle).size;
        let delta = old_size as i64 - new_size as i64;

        tree.order_mut(location.handle).size = new_size;
        let level = tree.level_mut(level_handle);
        level.size = (level.size as i64 - delta) as Size;

        Ok(())
    }

    /// Cancels a resting order. Returns `UnknownOrder` (and leaves all
    /// structures untouched) if `order_id` isn't currently resting.
    pub fn remove(&mut self, order_id: &str) -> Result<(), EngineError> {
        let location = self
            .order_index
            .remove(order_id)
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))?;

        let side = location.side;
        let tree = self.tree_mut(side);
        let level_handle = tree.order(location.handle).level;
        tree.remove_order(location.handle);

        if tree.level(level_handle).is_empty() {
            let price = tree.level(level_handle).price;

            let was_best = match side {
                Side::Bid => self.best_bid == Some(level_handle),
                Side::Ask => self.best_ask == Some(level_handle),
            };
            // Navigate to the next-best level *before* the structural
            // removal invalidates the removed level's own pointers (its
            // neighbors' pointers remain valid).
            let replacement = if was_best {
                match side {
                    Side::Bid => self.tree(side).predecessor(level_handle),
                    Side::Ask => self.tree(side).successor(level_handle),
                }
            } else {
                None
            };

            self.tree_mut(side).remove_level(level_handle);
            self.price_index.remove(&(side, price));

            if was_best {
                self.set_best(side, replacement);
            }
        }

        Ok(())
    }

    fn set_best(&mut self, side: Side, handle: Option<Handle<PriceLevel>>) {
        match side {
            Side::Bid => self.best_bid = handle,
            Side::Ask => self.best_ask = handle,
        }
    }

    /// Produces the depth ladder per §4.3: bids strictly below the best
    /// ask (or all bids, if there's no ask) descending, asks strictly above
    /// the best bid (or all asks, if there's no bid) ascending, zipped row
    /// by row, optionally truncated to `depth` levels per side.
    pub fn depth_view(&self, depth: Option<usize>) -> Vec<DepthRow> {
        let best_ask_price = self.best_ask_price();
        let best_bid_price = self.best_bid_price();

        let mut bids: Vec<(Price, Size)> = self.bids.ascending();
        bids.reverse(); // descending
        if let Some(ask_p) = best_ask_price {
            bids.retain(|(p, _)| *p < ask_p);
        }

        let mut asks: Vec<(Price, Size)> = self.asks.ascending(); // already ascending
        if let Some(bid_p) = best_bid_price {
            asks.retain(|(p, _)| *p > bid_p);
        }

        if let Some(depth) = depth {
            bids.truncate(depth);
            asks.truncate(depth);
        }

        let rows = bids.len().max(asks.len());
        let mut out = Vec::with_capacity(rows);
        for i in 0..rows {
            out.push(DepthRow {
                ticker: if i == 0 { Some(self.ticker.clone()) } else { None },
                ask_price: asks.get(i).map(|(p, _)| *p),
                ask_qty: asks.get(i).map(|(_, q)| *q),
                bid_price: bids.get(i).map(|(p, _)| *p),
                bid_qty: bids.get(i).map(|(_, q)| *q),
            });
        }
        out
    }
}
