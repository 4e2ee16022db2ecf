//! Proposed-vs-resting order reconciliation and bulk cancellation
//!
//! The exchange has no batch cancel, so cancellation walks the orders one at
//! a time and stops at the first failure. The error names the failed order
//! plus what was and was not cancelled; callers re-fetch rather than assume.

use tracing::{debug, info};

use crate::error::{GridBotError, Result};
use crate::gateway::ExchangeGateway;
use crate::tick::TickRules;
use crate::types::{ActiveOrder, OrderId, ProposedOrder};

pub struct OrderReconciler {
    rules: TickRules,
}

impl OrderReconciler {
    /// `rules` must match the gateway's submission rounding
    pub fn new(rules: TickRules) -> Self {
        OrderReconciler { rules }
    }

    /// True if a resting entry makes submitting `proposed` pointless
    ///
    /// An entry dominates when it equals the proposal after tick and lot
    /// rounding, or when it rests above the proposed entry price.
    pub fn has_dominant_entry(&self, proposed: &ProposedOrder, orders: &[ActiveOrder]) -> bool {
        let price = self.rules.round_price(proposed.entry_price);
        let amount = self.rules.round_amount(proposed.amount);

        orders.iter().filter(|o| o.is_entry()).any(|o| {
            let duplicate = self.rules.round_price(o.price) == price
                && self.rules.round_amount(o.amount) == amount;
            duplicate || o.price > proposed.entry_price
        })
    }

    /// Cancel every resting entry, in order
    pub async fn cancel_entries<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        orders: &[ActiveOrder],
    ) -> Result<Vec<OrderId>> {
        let targets: Vec<OrderId> = orders.iter().filter(|o| o.is_entry()).map(|o| o.id).collect();
        let cancelled = cancel_sequentially(gateway, targets).await?;
        if !cancelled.is_empty() {
            info!("Cancelled {} entry orders", cancelled.len());
        }
        Ok(cancelled)
    }

    /// Cancel every resting order, entries and exits
    pub async fn cancel_all<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        orders: &[ActiveOrder],
    ) -> Result<Vec<OrderId>> {
        let targets: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let cancelled = cancel_sequentially(gateway, targets).await?;
        info!("Cancelled all {} orders", cancelled.len());
        Ok(cancelled)
    }
}

async fn cancel_sequentially<G: ExchangeGateway + ?Sized>(
    gateway: &G,
    targets: Vec<OrderId>,
) -> Result<Vec<OrderId>> {
    let mut cancelled = Vec::with_capacity(targets.len());
    for (i, id) in targets.iter().enumerate() {
        match gateway.cancel_order(*id).await {
            Ok(()) => {
                debug!("Cancelled order {}", id);
                cancelled.push(*id);
            }
            Err(e) => {
                return Err(GridBotError::CancellationFailed {
                    order_id: *id,
                    reason: e.to_string(),
                    cancelled,
                    remaining: targets[i + 1..].to_vec(),
                });
            }
        }
    }
    Ok(cancelled)
}
