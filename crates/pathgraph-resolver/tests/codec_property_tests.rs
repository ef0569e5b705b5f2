use pathgraph_resolver::{BoolInt, FieldCodec, Identity, NumericText};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,12}".prop_map(Value::String),
    ]
}

proptest! {
    #[test]
    fn identity_round_trips(value in scalar_strategy()) {
        prop_assert_eq!(Identity.deserialize(&Identity.serialize(&value)), value);
    }

    #[test]
    fn numeric_text_round_trips_integers(n in any::<i64>()) {
        let stored = NumericText.serialize(&json!(n));
        prop_assert_eq!(&stored, &json!(n.to_string()));
        prop_assert_eq!(NumericText.deserialize(&stored), json!(n));
    }

    #[test]
    fn bool_int_round_trips(b in any::<bool>()) {
        let stored = BoolInt.serialize(&json!(b));
        prop_assert!(stored == json!(0) || stored == json!(1));
        prop_assert_eq!(BoolInt.deserialize(&stored), json!(b));
    }
}
