use pathgraph_syntax::{parse_path, parse_route, Key, KeySet, Range, RouteElement, WildcardKind};

#[test]
fn parses_reference_request() {
    let path = parse_path("bleeh[1,2].value").expect("parse");
    assert_eq!(path.len(), 3);
    assert_eq!(
        path[1].keys(),
        vec![Key::Integer(1), Key::Integer(2)]
    );
}

#[test]
fn parses_range_request_against_sequence() {
    let path = parse_path("bar.someValues[2...4].value").expect("parse");
    assert_eq!(path[2], KeySet::Range(Range::new(2, 3)));
    assert_eq!(path[2].keys(), vec![Key::Integer(2), Key::Integer(3)]);
}

#[test]
fn parses_literal_range_route() {
    let route = parse_route("never[1..4].you").expect("parse");
    assert_eq!(
        route[1],
        RouteElement::Literal {
            keys: KeySet::Range(Range::new(1, 4))
        }
    );
}

#[test]
fn parses_every_wildcard_kind() {
    let route = parse_route("a[{integers:i}][{ranges:r}][{keys}]").expect("parse");
    let kinds: Vec<_> = route
        .iter()
        .filter_map(|element| match element {
            RouteElement::Wildcard(w) => Some((w.kind, w.name.clone())),
            RouteElement::Literal { .. } => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (WildcardKind::Integers, Some("i".to_string())),
            (WildcardKind::Ranges, Some("r".to_string())),
            (WildcardKind::Keys, None),
        ]
    );
}

#[test]
fn mixed_list_of_keys_and_ranges() {
    let path = parse_path("a[0..1, 'x', 5]").expect("parse");
    assert_eq!(
        path[1].keys(),
        vec![Key::Integer(0), Key::Integer(1), Key::from("x"), Key::Integer(5)]
    );
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(
        parse_path("  foo  ").expect("parse"),
        vec![KeySet::from("foo")]
    );
}
