use bplus_index::{Order, UniqueIndex};
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IndexConfig {
    order: Order,
}

#[test]
fn order_serializes_as_plain_integer() {
    let order = Order::new(16).unwrap();
    assert_eq!(serde_json::to_string(&order).unwrap(), "16");
    assert_eq!(serde_json::from_str::<Order>("16").unwrap(), order);
}

#[test]
fn deserialization_validates_the_order() {
    let err = serde_json::from_str::<Order>("1").unwrap_err();
    assert!(err.to_string().starts_with("B+Tree order must be an integer >= 2, got 1"));

    let err = serde_json::from_str::<IndexConfig>(r#"{ "order": 0 }"#).unwrap_err();
    assert!(err.to_string().starts_with("B+Tree order must be an integer >= 2, got 0"));
}

#[test]
fn config_drives_index_construction() {
    let config: IndexConfig = serde_json::from_str(r#"{ "order": 3 }"#).unwrap();
    let mut index = UniqueIndex::with_order(config.order);
    index.insert("p-001", 1299);
    assert_eq!(index.order().get(), 3);
    assert_eq!(index.search(&"p-001"), Some(&1299));
}
