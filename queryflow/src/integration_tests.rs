//! End-to-end tests: built-in catalog, runner, and sources together.

use crate::builtins::{self, builtin_catalog};
use crate::config::CatalogConfig;
use crate::runner::Runner;
use crate::source::{Document, DocumentSource};
use crate::testing::{bot_user, dated_tweet, document, troll_user, MemorySource, RecordingSource};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

async fn collect(runner: &Runner, name: &str, source: &dyn DocumentSource) -> Vec<Document> {
    let mut stream = runner.run(name, source).await.unwrap();
    let mut docs = Vec::new();
    while let Some(item) = stream.next().await {
        docs.push(item.unwrap());
    }
    docs
}

fn builtin_runner() -> Runner {
    Runner::new(Arc::new(builtin_catalog()))
}

#[tokio::test]
async fn test_bot_activity_totals() {
    // Two users above their class thresholds, two below.
    let source = MemorySource::new().with_collection(
        "users",
        vec![
            bot_user(0, 1.5, 3, 1, 0, 2),
            bot_user(0, 1.6, 5, 2, 1, 2),
            bot_user(0, 1.0, 100, 100, 100, 100),
            bot_user(1, 1.6, 100, 100, 100, 100),
        ],
    );

    let docs = collect(&builtin_runner(), "activity_per_type_of_bots", &source).await;

    assert_eq!(
        docs,
        vec![document(json!({
            "_id": "all",
            "ors_total": 8,
            "rts_total": 3,
            "rps_total": 1,
            "qts_total": 4,
        }))]
    );
}

#[tokio::test]
async fn test_inter_party_tuples_sorted_descending() {
    let source = MemorySource::new().with_collection(
        "users",
        vec![
            troll_user("anr", "plra", [1, 0, 0, 0]),
            troll_user("anr", "plra", [2, 0, 0, 0]),
            troll_user("plra", "anr", [3, 0, 0, 0]),
        ],
    );

    let docs = collect(&builtin_runner(), "inter_party_profiles_per_party", &source).await;

    let tuples: Vec<(&str, i64)> = docs
        .iter()
        .map(|doc| {
            (
                doc.get("party-tuple").and_then(|v| v.as_str()).unwrap(),
                doc.get("count").and_then(serde_json::Value::as_i64).unwrap(),
            )
        })
        .collect();
    assert_eq!(tuples, vec![("plra-anr", 1), ("anr-plra", 2)]);
}

#[tokio::test]
async fn test_link_sharing_counts_per_party() {
    let anr_tweet = document(json!({
        "relevante": 1,
        "tweet_obj": {
            "truncated": false,
            "is_quote_status": false,
            "entities": { "urls": ["https://example.com/a"] },
        },
        "flag": { "partido_politico": { "anr": 1, "plra": 0, "pdp": 0 } },
    }));
    let plra_tweet = document(json!({
        "relevante": 1,
        "tweet_obj": {
            "truncated": false,
            "is_quote_status": false,
            "entities": { "urls": ["https://example.com/b"] },
        },
        "flag": { "partido_politico": { "anr": 0, "plra": 2, "pdp": 0 } },
    }));
    // Irrelevant and media-bearing tweets must not count.
    let irrelevant = document(json!({
        "relevante": 0,
        "tweet_obj": {
            "truncated": false,
            "is_quote_status": false,
            "entities": { "urls": ["https://example.com/c"] },
        },
        "flag": { "partido_politico": { "anr": 1 } },
    }));
    let with_media = document(json!({
        "relevante": 1,
        "tweet_obj": {
            "truncated": false,
            "is_quote_status": false,
            "entities": { "urls": ["https://example.com/d"], "media": [{}] },
        },
        "flag": { "partido_politico": { "anr": 1 } },
    }));

    let source = MemorySource::new().with_collection(
        "tweets",
        vec![anr_tweet, plra_tweet, irrelevant, with_media],
    );

    let docs = collect(&builtin_runner(), "tweets_with_links", &source).await;

    assert_eq!(
        docs,
        vec![document(json!({ "_id": "all", "anr": 1, "plra": 1, "pdp": 0 }))]
    );
}

#[tokio::test]
async fn test_daily_counts_for_one_account() {
    let source = MemorySource::new().with_collection(
        "tweets",
        vec![
            dated_tweet("EfrainAlegre", "2018-04-01"),
            dated_tweet("EfrainAlegre", "2018-04-01"),
            dated_tweet("EfrainAlegre", "2018-04-02"),
            dated_tweet("SomeoneElse", "2018-04-01"),
        ],
    );

    let docs = collect(&builtin_runner(), "tweets_of_user_by_date", &source).await;

    assert_eq!(
        docs,
        vec![
            document(json!({ "_id": "2018-04-01", "count": 2 })),
            document(json!({ "_id": "2018-04-02", "count": 1 })),
        ]
    );
}

#[tokio::test]
async fn test_every_builtin_reaches_the_source_verbatim() {
    let runner = builtin_runner();
    let source = RecordingSource::new();

    for def in builtins::definitions() {
        source.reset();
        let mut stream = runner.run(&def.name, &source).await.unwrap();
        while stream.next().await.is_some() {}

        let calls = source.calls();
        assert_eq!(calls.len(), 1, "{} issued extra calls", def.name);
        assert_eq!(calls[0].collection, def.collection);
        assert_eq!(calls[0].stages, def.rendered_stages(), "{} diverged", def.name);
    }
}

#[tokio::test]
async fn test_config_loaded_catalog_runs() {
    let raw = r#"{
        "pipelines": [
            {
                "name": "by_date",
                "collection": "tweets",
                "stages": [
                    { "$match": { "tweet_obj.user.screen_name": "EfrainAlegre" } },
                    { "$group": { "_id": "$tweet_py_date", "count": { "$sum": 1 } } }
                ]
            }
        ]
    }"#;
    let catalog = CatalogConfig::from_json_str(raw)
        .unwrap()
        .into_catalog()
        .unwrap();
    let runner = Runner::new(Arc::new(catalog));

    let source = MemorySource::new().with_collection(
        "tweets",
        vec![
            dated_tweet("EfrainAlegre", "2018-04-01"),
            dated_tweet("EfrainAlegre", "2018-04-02"),
        ],
    );

    let docs = collect(&runner, "by_date", &source).await;
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn test_video_embed_projection() {
    let source = MemorySource::new().with_collection(
        "tweets",
        vec![
            document(json!({
                "_id": "t1",
                "video_embed_url": { "is_video": 1, "is_video_response": "yes" },
                "tweet_obj": { "id_str": "111" },
            })),
            document(json!({
                "_id": "t2",
                "video_embed_url": {
                    "is_video": 1,
                    "is_false_positive": true,
                    "is_video_response": "yes",
                },
                "tweet_obj": { "id_str": "222" },
            })),
        ],
    );

    let docs = collect(&builtin_runner(), "tweet_id_video_embed_response", &source).await;

    assert_eq!(
        docs,
        vec![document(json!({ "_id": "t1", "tweet": "111", "response": "yes" }))]
    );
}
