//! The built-in catalog of production analysis queries.
//!
//! These definitions cover the recurring questions asked of the
//! social-media dataset: how active the detected bot accounts are, how
//! likely-troll profiles interact across party lines, which tweets carry
//! shared links, and a few per-tweet export views. Collections: `users`
//! (one document per profile, with bot-analysis scores and per-type tweet
//! counters) and `tweets` (one document per collected tweet, with the raw
//! tweet object, party flags, and annotations).

use crate::catalog::Catalog;
use crate::definition::PipelineDef;
use crate::expr::Expr;
use crate::stage::{SortOrder, Stage};
use serde_json::Value;

/// Total tweet activity, per type, of profiles classified as likely bots.
///
/// A profile counts as a likely bot when its `bot_analysis.pbb` score
/// exceeds the threshold calibrated for its `exists` class.
#[must_use]
pub fn activity_per_type_of_bots() -> PipelineDef {
    PipelineDef::new("activity_per_type_of_bots", "users")
        .with_stage(Stage::match_on(Expr::or(vec![
            Expr::and(vec![
                Expr::map([("exists", Expr::literal(0))]),
                Expr::map([(
                    "bot_analysis.pbb",
                    Expr::op("gt", vec![Expr::literal(1.465_753_425)]),
                )]),
            ]),
            Expr::and(vec![
                Expr::map([("exists", Expr::literal(1))]),
                Expr::map([(
                    "bot_analysis.pbb",
                    Expr::op("gt", vec![Expr::literal(1.716_666_667)]),
                )]),
            ]),
        ])))
        .with_stage(Stage::project([
            ("ors_total", Expr::field("original_tweets")),
            ("rts_total", Expr::field("rts")),
            ("rps_total", Expr::field("rps")),
            ("qts_total", Expr::field("qts")),
            ("_id", Expr::literal("all")),
        ]))
        .with_stage(Stage::group(
            Expr::field("_id"),
            [
                ("ors_total", Expr::sum(Expr::field("ors_total"))),
                ("rts_total", Expr::sum(Expr::field("rts_total"))),
                ("rps_total", Expr::sum(Expr::field("rps_total"))),
                ("qts_total", Expr::sum(Expr::field("qts_total"))),
            ],
        ))
}

/// How many likely-troll profiles of each party interact mostly with each
/// other party.
#[must_use]
pub fn inter_party_profiles_per_party() -> PipelineDef {
    PipelineDef::new("inter_party_profiles_per_party", "users")
        .with_stage(Stage::match_on(Expr::map([(
            "is_potential_troll",
            Expr::literal(1),
        )])))
        .with_stage(Stage::group(
            Expr::map([
                ("party", Expr::field("party")),
                ("most_interacted_party", Expr::field("most_interacted_party")),
            ]),
            [("count", Expr::sum(Expr::literal(1)))],
        ))
        .with_stage(Stage::project([
            (
                "party-tuple",
                Expr::concat(vec![
                    Expr::field("_id.party"),
                    Expr::literal("-"),
                    Expr::field("_id.most_interacted_party"),
                ]),
            ),
            ("count", Expr::field("count")),
        ]))
        .with_stage(Stage::sort([("party-tuple", SortOrder::Descending)]))
}

/// Tweet-type totals of likely-troll profiles, broken down by party.
#[must_use]
pub fn inter_party_profiles_type_of_tweets() -> PipelineDef {
    PipelineDef::new("inter_party_profiles_type_of_tweets", "users")
        .with_stage(Stage::match_on(Expr::map([(
            "is_potential_troll",
            Expr::literal(1),
        )])))
        .with_stage(Stage::project([
            ("ors_total", Expr::sum(Expr::field("original_tweets"))),
            ("rts_total", Expr::sum(Expr::field("rts"))),
            ("rps_total", Expr::sum(Expr::field("rps"))),
            ("qts_total", Expr::sum(Expr::field("qts"))),
            ("_id", Expr::field("party")),
        ]))
        .with_stage(Stage::group(
            Expr::field("_id"),
            [
                ("ors_total", Expr::sum(Expr::field("ors_total"))),
                ("rts_total", Expr::sum(Expr::field("rts_total"))),
                ("rps_total", Expr::sum(Expr::field("rps_total"))),
                ("qts_total", Expr::sum(Expr::field("qts_total"))),
            ],
        ))
}

/// Tweet id and embed-probe response for confirmed video tweets that were
/// not later marked as false positives.
#[must_use]
pub fn tweet_id_video_embed_response() -> PipelineDef {
    PipelineDef::new("tweet_id_video_embed_response", "tweets")
        .with_stage(Stage::match_on(Expr::map([
            ("video_embed_url.is_video", Expr::literal(1)),
            ("video_embed_url.is_false_positive", Expr::exists(false)),
        ])))
        .with_stage(Stage::project([
            ("tweet", Expr::field("tweet_obj.id_str")),
            ("response", Expr::field("video_embed_url.is_video_response")),
        ]))
}

/// Daily tweet counts for one account.
#[must_use]
pub fn tweets_of_user_by_date() -> PipelineDef {
    PipelineDef::new("tweets_of_user_by_date", "tweets")
        .with_stage(Stage::match_on(Expr::map([(
            "tweet_obj.user.screen_name",
            Expr::literal("EfrainAlegre"),
        )])))
        .with_stage(Stage::group(
            Expr::field("tweet_py_date"),
            [("count", Expr::sum(Expr::literal(1)))],
        ))
}

/// Relevant tweets authored by a party's accounts that carry no flag for
/// the author's own party, with the full annotation set for review.
#[must_use]
pub fn tweets_from_anr_about_other_parties() -> PipelineDef {
    PipelineDef::new("tweets_from_anr_about_other_parties", "tweets")
        .with_stage(Stage::match_on(Expr::map([
            ("author_party", Expr::literal("pdp")),
            ("flag.partido_politico.pdp", Expr::literal(0)),
            ("relevante", Expr::literal(1)),
        ])))
        .with_stage(Stage::project([
            ("id", Expr::field("tweet_obj.id")),
            ("tweet", Expr::field("tweet_obj.full_text")),
            ("quote", Expr::field("tweet_obj.is_quote_status")),
            (
                "retweeted_status",
                Expr::cond(
                    Expr::op(
                        "eq",
                        vec![
                            Expr::field("tweet_obj.retweeted_status"),
                            Expr::literal(Value::Null),
                        ],
                    ),
                    Expr::literal("false"),
                    Expr::literal("true"),
                ),
            ),
            (
                "reply",
                Expr::cond(
                    Expr::op(
                        "eq",
                        vec![
                            Expr::field("tweet_obj.in_reply_to_status_id"),
                            Expr::literal(Value::Null),
                        ],
                    ),
                    Expr::literal("false"),
                    Expr::literal("true"),
                ),
            ),
            ("datetime", Expr::field("tweet_py_datetime")),
            (
                "author_screen_name",
                Expr::field("tweet_obj.user.screen_name"),
            ),
            (
                "author_description",
                Expr::field("tweet_obj.user.description"),
            ),
            ("author_party", Expr::field("author_party")),
            (
                "sentiment",
                Expr::if_null(
                    Expr::field("sentimiento.score"),
                    Expr::literal("Unspecified"),
                ),
            ),
            ("anr_flag", Expr::field("flag.partido_politico.anr")),
            ("pdp_flag", Expr::field("flag.partido_politico.pdp")),
            ("ganar_flag", Expr::field("flag.partido_politico.ganar")),
            ("plra_flag", Expr::field("flag.partido_politico.plra")),
            ("ppq_flag", Expr::field("flag.partido_politico.ppq")),
            ("hagamos_flag", Expr::field("flag.partido_politico.hagamos")),
            ("fg_flag", Expr::field("flag.partido_politico.fg")),
        ]))
        .with_stage(Stage::sort([("datetime", SortOrder::Descending)]))
}

/// Per-party counts of relevant, media-free tweets whose text carries at
/// least one shared link.
///
/// The three narrowing filters are kept as separate match stages, as the
/// analysis authored them: link-bearing shape first, retweet handling
/// second, party flags last.
#[must_use]
pub fn tweets_with_links() -> PipelineDef {
    PipelineDef::new("tweets_with_links", "tweets")
        .with_stage(Stage::match_on(Expr::and(vec![
            Expr::map([("relevante", Expr::op("eq", vec![Expr::literal(1)]))]),
            Expr::map([("tweet_obj.entities.media", Expr::exists(false))]),
            Expr::map([(
                "tweet_obj.entities.urls",
                Expr::op("ne", vec![Expr::literal(serde_json::json!([]))]),
            )]),
            Expr::map([("tweet_obj.truncated", Expr::literal(false))]),
            Expr::or(vec![
                Expr::map([("tweet_obj.is_quote_status", Expr::literal(false))]),
                Expr::and(vec![
                    Expr::map([("tweet_obj.is_quote_status", Expr::literal(true))]),
                    Expr::map([(
                        "tweet_obj.entities.urls",
                        Expr::op("size", vec![Expr::literal(2)]),
                    )]),
                ]),
            ]),
        ])))
        .with_stage(Stage::match_on(Expr::or(vec![
            Expr::map([("tweet_obj.retweeted_status", Expr::exists(false))]),
            Expr::and(vec![
                Expr::map([("tweet_obj.retweeted_status", Expr::exists(true))]),
                Expr::map([("tweet_obj.is_quote_status", Expr::literal(true))]),
            ]),
        ])))
        .with_stage(Stage::match_on(Expr::or(vec![
            Expr::map([(
                "flag.partido_politico.anr",
                Expr::op("gt", vec![Expr::literal(0)]),
            )]),
            Expr::map([(
                "flag.partido_politico.plra",
                Expr::op("gt", vec![Expr::literal(0)]),
            )]),
            Expr::map([(
                "flag.partido_politico.pdp",
                Expr::op("gt", vec![Expr::literal(0)]),
            )]),
        ])))
        .with_stage(Stage::project([
            (
                "anr",
                Expr::cond(
                    Expr::op(
                        "gt",
                        vec![Expr::field("flag.partido_politico.anr"), Expr::literal(0)],
                    ),
                    Expr::literal(1),
                    Expr::literal(0),
                ),
            ),
            (
                "plra",
                Expr::cond(
                    Expr::op(
                        "gt",
                        vec![Expr::field("flag.partido_politico.plra"), Expr::literal(0)],
                    ),
                    Expr::literal(1),
                    Expr::literal(0),
                ),
            ),
            (
                "pdp",
                Expr::cond(
                    Expr::op(
                        "gt",
                        vec![Expr::field("flag.partido_politico.pdp"), Expr::literal(0)],
                    ),
                    Expr::literal(1),
                    Expr::literal(0),
                ),
            ),
            ("all", Expr::literal("all")),
        ]))
        .with_stage(Stage::group(
            Expr::field("all"),
            [
                ("anr", Expr::sum(Expr::field("anr"))),
                ("plra", Expr::sum(Expr::field("plra"))),
                ("pdp", Expr::sum(Expr::field("pdp"))),
            ],
        ))
}

/// All built-in definitions, in catalog-name order.
#[must_use]
pub fn definitions() -> Vec<PipelineDef> {
    vec![
        activity_per_type_of_bots(),
        inter_party_profiles_per_party(),
        inter_party_profiles_type_of_tweets(),
        tweet_id_video_embed_response(),
        tweets_from_anr_about_other_parties(),
        tweets_of_user_by_date(),
        tweets_with_links(),
    ]
}

/// Builds a catalog holding every built-in definition.
#[must_use]
pub fn builtin_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for def in definitions() {
        if let Err(err) = catalog.register(def) {
            unreachable!("built-in definitions have unique names: {err}");
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_catalog_holds_all_definitions() {
        let catalog = builtin_catalog();
        assert_eq!(
            catalog.list_names(),
            vec![
                "activity_per_type_of_bots",
                "inter_party_profiles_per_party",
                "inter_party_profiles_type_of_tweets",
                "tweet_id_video_embed_response",
                "tweets_from_anr_about_other_parties",
                "tweets_of_user_by_date",
                "tweets_with_links",
            ]
        );
    }

    #[test]
    fn test_every_definition_validates() {
        for def in definitions() {
            assert!(def.validate().is_ok(), "{} failed validation", def.name);
        }
    }

    #[test]
    fn test_bot_activity_wire_shape() {
        let rendered = activity_per_type_of_bots().rendered_stages();
        assert_eq!(
            rendered,
            vec![
                json!({ "$match": { "$or": [
                    { "$and": [
                        { "exists": 0 },
                        { "bot_analysis.pbb": { "$gt": 1.465_753_425 } },
                    ] },
                    { "$and": [
                        { "exists": 1 },
                        { "bot_analysis.pbb": { "$gt": 1.716_666_667 } },
                    ] },
                ] } }),
                json!({ "$project": {
                    "ors_total": "$original_tweets",
                    "rts_total": "$rts",
                    "rps_total": "$rps",
                    "qts_total": "$qts",
                    "_id": "all",
                } }),
                json!({ "$group": {
                    "_id": "$_id",
                    "ors_total": { "$sum": "$ors_total" },
                    "rts_total": { "$sum": "$rts_total" },
                    "rps_total": { "$sum": "$rps_total" },
                    "qts_total": { "$sum": "$qts_total" },
                } }),
            ]
        );
    }

    #[test]
    fn test_link_query_uses_one_canonical_and() {
        let rendered = tweets_with_links().rendered_stages();
        assert_eq!(rendered.len(), 5);

        let first = rendered[0].get("$match").unwrap().as_object().unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["$and"]);
        assert_eq!(first.get("$and").unwrap().as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_definitions_survive_a_wire_round_trip() {
        // Typed trees can differ harmlessly on ambiguous shapes (an empty
        // array operand reads as an empty argument list), so compare the
        // re-rendered wire form instead.
        for def in definitions() {
            for rendered in def.rendered_stages() {
                let parsed = crate::stage::Stage::from_value(&rendered).unwrap();
                assert_eq!(parsed.to_value(), rendered, "{} stage diverged", def.name);
            }
        }
    }
}
