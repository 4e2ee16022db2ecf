//! Zaif API wire types
//!
//! Private responses share one envelope: `{"success": 1, "return": ...}` on
//! success and `{"success": 0, "error": "..."}` otherwise. Order and trade
//! listings come back as objects keyed by id rather than arrays.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{GridBotError, Result};
use crate::types::{
    AccountSnapshot, ActiveOrder, BookLevel, OrderBookSnapshot, OrderId, OrderSide, TradeRecord,
};

/// Envelope of every private API response
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "return", default)]
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, surfacing the exchange message on failure
    pub fn into_result(self) -> Result<T> {
        if self.success != 1 {
            let message = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("request failed with success={}", self.success));
            return Err(GridBotError::Exchange(message));
        }
        self.payload
            .ok_or_else(|| GridBotError::Parse("missing 'return' in successful response".into()))
    }
}

/// Per-currency balances; only the BTC/JPY pair is read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Balances {
    #[serde(default)]
    pub jpy: Decimal,
    #[serde(default)]
    pub btc: Decimal,
}

/// `get_info2` payload
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub funds: Balances,
    pub deposit: Balances,
}

impl From<AccountInfo> for AccountSnapshot {
    fn from(info: AccountInfo) -> Self {
        AccountSnapshot {
            funds_jpy: info.funds.jpy,
            funds_btc: info.funds.btc,
            deposit_jpy: info.deposit.jpy,
            deposit_btc: info.deposit.btc,
        }
    }
}

/// One entry of the `active_orders` map
#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    #[serde(default)]
    pub currency_pair: String,
    pub action: String,
    pub amount: Decimal,
    pub price: Decimal,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
}

impl WireOrder {
    pub fn into_active_order(self, id: OrderId) -> Result<ActiveOrder> {
        let side = OrderSide::from_action(&self.action).ok_or_else(|| {
            GridBotError::Parse(format!("unknown action '{}' on order {}", self.action, id))
        })?;
        Ok(ActiveOrder {
            id,
            side,
            price: self.price,
            amount: self.amount,
        })
    }
}

/// One entry of the `trade_history` map
#[derive(Debug, Clone, Deserialize)]
pub struct WireTrade {
    #[serde(default)]
    pub currency_pair: String,
    #[serde(default)]
    pub action: String,
    pub amount: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub your_action: String,
    #[serde(default)]
    pub bonus: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl From<WireTrade> for TradeRecord {
    fn from(trade: WireTrade) -> Self {
        TradeRecord {
            price: trade.price,
            initiated_by_us: trade.your_action == "bid",
        }
    }
}

/// `trade` payload
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResult {
    #[serde(default)]
    pub received: Decimal,
    #[serde(default)]
    pub remains: Decimal,
    pub order_id: u64,
}

/// `cancel_order` payload
#[derive(Debug, Clone, Deserialize)]
pub struct CancelResult {
    pub order_id: u64,
}

/// Public depth endpoint; levels are `[price, quantity]` pairs
#[derive(Debug, Clone, Deserialize)]
pub struct DepthResponse {
    #[serde(default)]
    pub asks: Vec<(Decimal, Decimal)>,
    #[serde(default)]
    pub bids: Vec<(Decimal, Decimal)>,
}

impl DepthResponse {
    /// Convert to a sorted book, rejecting a book without bids
    pub fn into_snapshot(self) -> Result<OrderBookSnapshot> {
        if self.bids.is_empty() {
            return Err(GridBotError::InvalidOrderBook(
                "depth response has no bids".to_string(),
            ));
        }
        let level = |(price, quantity): (Decimal, Decimal)| BookLevel::new(price, quantity);
        Ok(OrderBookSnapshot::new(
            self.asks.into_iter().map(level).collect(),
            self.bids.into_iter().map(level).collect(),
        ))
    }
}

/// Decode an id-keyed listing
///
/// An empty listing may arrive as `[]` instead of `{}`.
pub fn parse_id_keyed<T: DeserializeOwned>(value: serde_json::Value) -> Result<Vec<(u64, T)>> {
    match value {
        serde_json::Value::Array(items) if items.is_empty() => Ok(Vec::new()),
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, item) in map {
                let id = key
                    .parse::<u64>()
                    .map_err(|_| GridBotError::Parse(format!("non-numeric id key '{}'", key)))?;
                entries.push((id, serde_json::from_value(item)?));
            }
            Ok(entries)
        }
        other => Err(GridBotError::Parse(format!(
            "expected id-keyed object, got {}",
            other
        ))),
    }
}

/// Active orders from an `active_orders` payload, ordered by id
pub fn active_orders_from_value(value: serde_json::Value) -> Result<Vec<ActiveOrder>> {
    let mut entries: Vec<(u64, WireOrder)> = parse_id_keyed(value)?;
    entries.sort_by_key(|(id, _)| *id);
    entries
        .into_iter()
        .map(|(id, order)| order.into_active_order(OrderId(id)))
        .collect()
}

/// Trades from a `trade_history` payload, most recent first
pub fn trades_from_value(value: serde_json::Value) -> Result<Vec<TradeRecord>> {
    let mut entries: Vec<(u64, WireTrade)> = parse_id_keyed(value)?;
    entries.sort_by(|(a_id, a), (b_id, b)| {
        b.timestamp.cmp(&a.timestamp).then_with(|| b_id.cmp(a_id))
    });
    Ok(entries.into_iter().map(|(_, trade)| trade.into()).collect())
}

// Zaif sends timestamps as strings; tolerate plain numbers too
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a unix timestamp as string or number")
        }

        fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<f64>()
                .map(|t| t as i64)
                .map_err(|_| E::custom(format!("invalid timestamp '{}'", v)))
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v as i64)
        }

        fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v as i64)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(0)
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_error_surfaces_message() {
        let json = r#"{"success": 0, "error": "nonce not incremented"}"#;
        let resp: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();

        match resp.into_result() {
            Err(GridBotError::Exchange(msg)) => assert_eq!(msg, "nonce not incremented"),
            other => panic!("expected exchange error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_return_is_parse_error() {
        let resp: ApiResponse<CancelResult> = serde_json::from_str(r#"{"success": 1}"#).unwrap();
        assert!(matches!(resp.into_result(), Err(GridBotError::Parse(_))));
    }

    #[test]
    fn test_account_info_parsing() {
        let json = r#"{
            "success": 1,
            "return": {
                "funds": {"jpy": 15320, "btc": 1.389, "mona": 0},
                "deposit": {"jpy": 20000, "btc": 1.5, "mona": 0},
                "rights": {"info": 1, "trade": 1},
                "open_orders": 3,
                "server_time": 1401950833
            }
        }"#;

        let resp: ApiResponse<AccountInfo> = serde_json::from_str(json).unwrap();
        let account: AccountSnapshot = resp.into_result().unwrap().into();

        assert_eq!(account.funds_jpy, dec!(15320));
        assert_eq!(account.funds_btc, dec!(1.389));
        assert_eq!(account.deposit_jpy, dec!(20000));
        assert_eq!(account.deposit_btc, dec!(1.5));
    }

    #[test]
    fn test_active_orders_keyed_by_id() {
        let value = serde_json::json!({
            "184": {"currency_pair": "btc_jpy", "action": "ask", "amount": 0.01, "price": 201900, "timestamp": "1402021125"},
            "182": {"currency_pair": "btc_jpy", "action": "bid", "amount": 0.0049, "price": 199900, "timestamp": "1402021120"}
        });

        let orders = active_orders_from_value(value).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, OrderId(182));
        assert_eq!(orders[0].side, OrderSide::Entry);
        assert_eq!(orders[0].price, dec!(199900));
        assert_eq!(orders[1].side, OrderSide::Exit);
        assert_eq!(orders[1].amount, dec!(0.01));
    }

    #[test]
    fn test_empty_listing_as_array_or_object() {
        assert!(active_orders_from_value(serde_json::json!([])).unwrap().is_empty());
        assert!(active_orders_from_value(serde_json::json!({})).unwrap().is_empty());
        assert!(trades_from_value(serde_json::json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let value = serde_json::json!({
            "1": {"action": "buy", "amount": 1, "price": 100}
        });
        assert!(matches!(
            active_orders_from_value(value),
            Err(GridBotError::Parse(_))
        ));
    }

    #[test]
    fn test_trades_sorted_most_recent_first() {
        let value = serde_json::json!({
            "10": {"currency_pair": "btc_jpy", "action": "bid", "amount": 0.01, "price": 200000,
                   "fee": 0, "your_action": "bid", "bonus": null, "timestamp": "1500000000", "comment": ""},
            "12": {"currency_pair": "btc_jpy", "action": "ask", "amount": 0.01, "price": 202000,
                   "fee": 0, "your_action": "ask", "bonus": null, "timestamp": "1500000100", "comment": ""},
            "11": {"currency_pair": "btc_jpy", "action": "bid", "amount": 0.01, "price": 199900,
                   "fee": 0, "your_action": "bid", "bonus": null, "timestamp": "1500000050", "comment": ""}
        });

        let trades = trades_from_value(value).unwrap();
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].price, dec!(202000));
        assert!(!trades[0].initiated_by_us);
        assert_eq!(trades[1].price, dec!(199900));
        assert!(trades[1].initiated_by_us);
    }

    #[test]
    fn test_depth_parsing() {
        let json = r#"{"asks": [[200010, 0.5], [200005, 0.1]], "bids": [[199990, 0.2], [199995, 1.0]]}"#;
        let depth: DepthResponse = serde_json::from_str(json).unwrap();
        let book = depth.into_snapshot().unwrap();

        assert_eq!(book.best_ask(), Some(dec!(200005)));
        assert_eq!(book.best_bid(), Some(dec!(199995)));
    }

    #[test]
    fn test_depth_without_bids_is_invalid() {
        let json = r#"{"asks": [[200010, 0.5]], "bids": []}"#;
        let depth: DepthResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            depth.into_snapshot(),
            Err(GridBotError::InvalidOrderBook(_))
        ));
    }

    #[test]
    fn test_timestamp_accepts_numbers() {
        let order: WireOrder = serde_json::from_str(
            r#"{"action": "bid", "amount": 1, "price": 100, "timestamp": 1402021125}"#,
        )
        .unwrap();
        assert_eq!(order.timestamp, 1402021125);
    }
}
