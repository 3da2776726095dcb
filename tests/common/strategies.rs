use proptest::prelude::*;
use relaycast_core::models::{Tag, UnsignedEvent};

/// Strategy for 64-char hex strings, occasionally malformed
pub fn pubkey_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[0-9a-f]{64}",
        1 => "[0-9a-zA-Z]{0,70}",
    ]
}

/// Strategy for tags including empty and nameless ones
pub fn tag_strategy() -> impl Strategy<Value = Tag> {
    prop::collection::vec("[a-zA-Z0-9+-]{0,8}", 0..4).prop_map(Tag)
}

/// Strategy for kinds, biased towards those with content rules
pub fn kind_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        3 => prop::sample::select(vec![0u32, 1, 6, 7, 1068, 1111, 4550, 30023, 34550]),
        1 => 0u32..70_000,
    ]
}

/// Strategy for timestamps well clear of the future-skew boundary, so a
/// re-run a second later cannot flip the verdict
pub fn created_at_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![-10i64..1_600_000_000, 3_000_000_000i64..4_000_000_000]
}

/// Strategy for arbitrary (not necessarily valid) unsigned events
pub fn unsigned_event_strategy() -> impl Strategy<Value = UnsignedEvent> {
    (
        kind_strategy(),
        created_at_strategy(),
        prop::collection::vec(tag_strategy(), 0..5),
        prop_oneof![
            Just(String::new()),
            Just("+".to_string()),
            Just("{\"name\":\"x\"}".to_string()),
            ".{0,64}",
        ],
        pubkey_strategy(),
    )
        .prop_map(|(kind, created_at, tags, content, pubkey)| UnsignedEvent {
            kind,
            created_at,
            tags,
            content,
            pubkey,
        })
}
