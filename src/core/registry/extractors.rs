//! Pure extraction strategies over parsed response bodies.
//!
//! Every function is total: a body that does not carry the expected shape
//! yields `None` ("not applicable now"), never an error.

use serde_json::{Map, Value};

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

/// Metric nodes arrive as `{ "value": 123 }` wrappers; older payloads carry
/// the bare number.
fn unwrap_value(v: &Value) -> Option<f64> {
    match v {
        Value::Object(obj) => obj.get("value").and_then(as_number),
        other => as_number(other),
    }
}

/// Depth-first lookup of a node by its `pageName.value` label in the
/// traffic-source tree (`{ pageName: { value }, children: [...] }`).
pub fn walk_by_page_name<'a>(nodes: &'a Value, name: &str) -> Option<&'a Value> {
    for node in nodes.as_array()? {
        if node.pointer("/pageName/value").and_then(Value::as_str) == Some(name) {
            return Some(node);
        }
        if let Some(children) = node.get("children") {
            if let Some(found) = walk_by_page_name(children, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Live item view: the single-row `itemCartCnt` counter.
/// Applies only when the inner list holds exactly one row.
pub fn cart_count(body: &Value) -> Option<f64> {
    let list = body.pointer("/data/data/data/data")?.as_array()?;
    if list.len() != 1 {
        return None;
    }
    unwrap_value(list[0].get("itemCartCnt")?)
}

/// Traffic-source tree: visitor counts and pay-conversion rates for the
/// search and cart branches, as one four-column record. Either branch
/// missing means the payload is not applicable.
pub fn flow_source(body: &Value, search_label: &str, cart_label: &str) -> Option<Map<String, Value>> {
    let list = body.pointer("/data/data/data")?;
    list.as_array()?;
    let search = walk_by_page_name(list, search_label)?;
    let cart = walk_by_page_name(list, cart_label)?;

    let field = |node: &Value, key: &str| {
        node.get(key).and_then(unwrap_value).unwrap_or(0.0)
    };
    let cart_pay_rate = (field(cart, "payRate") * 100.0).round() / 100.0;

    let mut record = Map::new();
    record.insert("search_uv".into(), field(search, "uv").into());
    record.insert("search_pay_rate".into(), field(search, "payRate").into());
    record.insert("cart_uv".into(), field(cart, "uv").into());
    record.insert("cart_pay_rate".into(), cart_pay_rate.into());
    Some(record)
}

/// Market rank listing: one `{shop_title, rank}` row per listed shop.
/// Rows with neither a title nor a rank are dropped; an empty result means
/// the payload is not applicable.
pub fn market_rank(body: &Value) -> Option<Vec<Map<String, Value>>> {
    let list = body.pointer("/data/data/data/data")?.as_array()?;
    if list.is_empty() {
        return None;
    }

    let mut items = Vec::new();
    for row in list {
        let title = row
            .pointer("/shop/title")
            .or_else(|| row.pointer("/shop/value"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let rank = row
            .get("cateRankId")
            .and_then(unwrap_value)
            .unwrap_or(0.0);
        if title.is_empty() && rank == 0.0 {
            continue;
        }
        let mut item = Map::new();
        item.insert("shop_title".into(), title.into());
        item.insert("rank".into(), rank.into());
        items.push(item);
    }
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
