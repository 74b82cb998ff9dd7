//! Document fixtures shaped like the analysis dataset.

use crate::source::Document;
use serde_json::{json, Value};

/// Converts a JSON object into a `Document`.
///
/// Non-object values yield an empty document; tests that hit this will fail
/// loudly on their own assertions.
#[must_use]
pub fn document(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

/// A user profile with a bot-analysis score and per-type tweet counters.
#[must_use]
pub fn bot_user(
    exists: i64,
    pbb: f64,
    original_tweets: i64,
    rts: i64,
    rps: i64,
    qts: i64,
) -> Document {
    document(json!({
        "_id": format!("user-{exists}-{original_tweets}"),
        "exists": exists,
        "bot_analysis": { "pbb": pbb },
        "original_tweets": original_tweets,
        "rts": rts,
        "rps": rps,
        "qts": qts,
    }))
}

/// A likely-troll profile with party affiliations and tweet counters.
#[must_use]
pub fn troll_user(party: &str, most_interacted_party: &str, counters: [i64; 4]) -> Document {
    let [original_tweets, rts, rps, qts] = counters;
    document(json!({
        "_id": format!("troll-{party}-{most_interacted_party}-{original_tweets}"),
        "is_potential_troll": 1,
        "party": party,
        "most_interacted_party": most_interacted_party,
        "original_tweets": original_tweets,
        "rts": rts,
        "rps": rps,
        "qts": qts,
    }))
}

/// A tweet by one account on a given date.
#[must_use]
pub fn dated_tweet(screen_name: &str, date: &str) -> Document {
    document(json!({
        "tweet_obj": { "user": { "screen_name": screen_name } },
        "tweet_py_date": date,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_user_shape() {
        let doc = bot_user(0, 1.5, 3, 1, 0, 2);
        assert_eq!(doc.get("original_tweets"), Some(&serde_json::json!(3)));
        assert!(doc.get("bot_analysis").unwrap().get("pbb").is_some());
    }

    #[test]
    fn test_document_on_non_object_is_empty() {
        assert!(document(serde_json::json!(42)).is_empty());
    }
}
