//! End-to-end tests across the workspace: path syntax → route index →
//! resolver → envelope, against in-memory and SQLite executors.
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use pathgraph_resolver::{
    DataSource, Envelope, Error, Graph, MemoryExecutor, ResolveError, Resolver, SqliteExecutor,
};
use pathgraph_syntax::{parse_path, PathSet};
use serde_json::{json, Value};
use tempfile::tempdir;

fn demo_graph() -> Value {
    json!({
        "foo": 12,
        "bleeh": {"$type": "ref", "value": ["bar", "someValues"]},
        "bar": {
            "foobar": "Hello World",
            "fizzbuzz": 42,
            "someValues": [
                {"value": 1},
                {"value": 2},
                {"value": 3},
                {"value": 4},
                {"value": 5}
            ]
        }
    })
}

fn paths(text: &[&str]) -> Vec<PathSet> {
    text.iter().map(|t| parse_path(t).unwrap()).collect()
}

fn resolver(graph: Value) -> Resolver {
    Resolver::new(Graph::from_json(&graph).unwrap(), Arc::new(MemoryExecutor::new()))
}

async fn get(resolver: &Resolver, text: &[&str]) -> Result<(Envelope, Value), Error> {
    let requested = paths(text);
    let envelope = resolver.get(&requested).await?;
    let view = envelope.project(&requested);
    Ok((envelope, view))
}

// ============================================================================
// Graph literals
// ============================================================================

#[tokio::test]
async fn test_atoms_and_containers() {
    let resolver = resolver(demo_graph());
    let (envelope, view) = get(&resolver, &["foo", "bar.foobar"]).await.unwrap();
    assert_eq!(envelope.tree, json!({"foo": 12, "bar": {"foobar": "Hello World"}}));
    assert_eq!(envelope.paths, vec!["foo", "bar.foobar"]);
    assert_eq!(view, envelope.tree);
}

#[tokio::test]
async fn test_key_list() {
    let resolver = resolver(demo_graph());
    let (_, view) = get(&resolver, &["bar[foobar, fizzbuzz]"]).await.unwrap();
    assert_eq!(view, json!({"bar": {"foobar": "Hello World", "fizzbuzz": 42}}));
}

#[tokio::test]
async fn test_exclusive_range() {
    let resolver = resolver(demo_graph());
    let (envelope, view) = get(&resolver, &["bar.someValues[2...4].value"]).await.unwrap();
    assert_eq!(
        envelope.paths,
        vec!["bar.someValues.2.value", "bar.someValues.3.value"]
    );
    assert_eq!(
        view,
        json!({"bar": {"someValues": {"2": {"value": 3}, "3": {"value": 4}}}})
    );
}

#[tokio::test]
async fn test_reference_redirect() {
    let resolver = resolver(demo_graph());
    let (envelope, view) = get(&resolver, &["bleeh[1,2].value"]).await.unwrap();
    assert_eq!(
        envelope.paths,
        vec!["bleeh", "bar.someValues.1.value", "bar.someValues.2.value"]
    );
    assert_eq!(
        envelope.tree["bleeh"],
        json!({"$type": "ref", "value": ["bar", "someValues"]})
    );
    assert_eq!(view, json!({"bleeh": {"1": {"value": 2}, "2": {"value": 3}}}));
}

#[tokio::test]
async fn test_duplicate_requests_fold_to_one_path() {
    let resolver = resolver(demo_graph());
    let (envelope, _) = get(&resolver, &["foo", "foo", "bar[fizzbuzz, fizzbuzz]"])
        .await
        .unwrap();
    assert_eq!(envelope.paths, vec!["foo", "bar.fizzbuzz"]);
}

#[tokio::test]
async fn test_resolution_errors() {
    let resolver = resolver(demo_graph());

    let err = get(&resolver, &["foo.bar.foobar"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::AtomBeforeEnd(ref p)) if p == "foo"));

    let err = get(&resolver, &["foo.mystery"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::AtomBeforeEnd(_))));

    let err = get(&resolver, &["bar"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::NonAtomic(ref p)) if p == "bar"));

    let err = get(&resolver, &["bar.mystery"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::GraphUndefined(ref p)) if p == "bar.mystery"));
    assert!(err.is_domain());

    // one failing path-set fails the whole call
    let err = get(&resolver, &["foo", "bar"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::NonAtomic(_))));
}

// ============================================================================
// Query-backed subtrees
// ============================================================================

fn catalog_graph() -> Value {
    json!({
        "genres": {
            "$type": "query",
            "table": "genres",
            "filters": ["id"],
            "key": "id",
            "fields": {
                "id": "genre_id",
                "name": "genre_name",
                "featured": {"column": "is_featured", "codec": "bool_int"}
            }
        },
        "titles": {
            "$type": "routes",
            "routes": [
                {
                    "route": "byGenre[{integers:genre}][{integers:rank}][{keys}]",
                    "table": "titles",
                    "fields": {"genre": "genre_id", "rank": "rank", "name": "title_name"}
                },
                {
                    "route": "byYear[{ranges:year}].name",
                    "table": "titles",
                    "fields": {"year": "year", "name": "title_name"}
                }
            ]
        },
        "featured": {"$type": "ref", "value": ["genres", 2]}
    })
}

const CATALOG_SQL: &str = "
    CREATE TABLE genres (genre_id INTEGER PRIMARY KEY, genre_name TEXT, is_featured INTEGER);
    INSERT INTO genres VALUES (1, 'comedy', 0), (2, 'drama', 1), (3, 'horror', 0);
    CREATE TABLE titles (genre_id INTEGER, rank INTEGER, year INTEGER, title_name TEXT);
    INSERT INTO titles VALUES
        (1, 0, 1999, 'Office Space'),
        (1, 1, 2004, 'Mean Girls'),
        (2, 0, 1994, 'Shawshank'),
        (2, 1, 2001, 'Amelie'),
        (3, 0, 1980, 'The Shining');
";

fn catalog_tables() -> MemoryExecutor {
    MemoryExecutor::from_json(json!({
        "genres": [
            {"genre_id": 1, "genre_name": "comedy", "is_featured": 0},
            {"genre_id": 2, "genre_name": "drama", "is_featured": 1},
            {"genre_id": 3, "genre_name": "horror", "is_featured": 0}
        ],
        "titles": [
            {"genre_id": 1, "rank": 0, "year": 1999, "title_name": "Office Space"},
            {"genre_id": 1, "rank": 1, "year": 2004, "title_name": "Mean Girls"},
            {"genre_id": 2, "rank": 0, "year": 1994, "title_name": "Shawshank"},
            {"genre_id": 2, "rank": 1, "year": 2001, "title_name": "Amelie"},
            {"genre_id": 3, "rank": 0, "year": 1980, "title_name": "The Shining"}
        ]
    }))
    .unwrap()
}

async fn check_catalog(resolver: &Resolver) {
    let (envelope, view) = get(resolver, &["genres[1..3][name, featured]"]).await.unwrap();
    assert_eq!(envelope.paths.len(), 6);
    assert_eq!(
        view,
        json!({"genres": {
            "1": {"name": "comedy", "featured": false},
            "2": {"name": "drama", "featured": true},
            "3": {"name": "horror", "featured": false}
        }})
    );

    let (_, view) = get(resolver, &["featured.name"]).await.unwrap();
    assert_eq!(view, json!({"featured": {"name": "drama"}}));

    let (_, view) = get(resolver, &["titles.byGenre[1,2][0].name"]).await.unwrap();
    assert_eq!(
        view,
        json!({"titles": {"byGenre": {
            "1": {"0": {"name": "Office Space"}},
            "2": {"0": {"name": "Shawshank"}}
        }}})
    );

    let (_, view) = get(resolver, &["titles.byYear[1990..2002].name"]).await.unwrap();
    assert_eq!(
        view,
        json!({"titles": {"byYear": {
            "1994": {"name": "Shawshank"},
            "1999": {"name": "Office Space"},
            "2001": {"name": "Amelie"}
        }}})
    );

    let err = get(resolver, &["titles.byAuthor.x.name"]).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::NoRoute(_))));
}

#[tokio::test]
async fn test_catalog_in_memory() {
    let graph = Graph::from_json(&catalog_graph()).unwrap();
    let resolver = Resolver::new(graph, Arc::new(catalog_tables()));
    check_catalog(&resolver).await;
}

#[tokio::test]
async fn test_catalog_in_sqlite() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("catalog.db");
    SqliteExecutor::open(&db)
        .unwrap()
        .execute_batch(CATALOG_SQL)
        .unwrap();

    let graph = Graph::from_json(&catalog_graph()).unwrap();
    let resolver = Resolver::new(graph, Arc::new(SqliteExecutor::open(&db).unwrap()));
    check_catalog(&resolver).await;
}

#[tokio::test]
async fn test_missing_table_is_an_executor_error() {
    let graph = Graph::from_json(&catalog_graph()).unwrap();
    let resolver = Resolver::new(graph, Arc::new(MemoryExecutor::new()));
    let err = get(&resolver, &["genres[1].name"]).await.unwrap_err();
    assert!(matches!(err, Error::Executor(_)));
    assert!(!err.is_domain());
}
