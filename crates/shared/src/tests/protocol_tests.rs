use super::*;
use crate::domain::ProductId;

#[test]
fn chat_reply_tolerates_missing_optional_sections() {
    let reply: ChatReply = serde_json::from_str(r#"{"message": "Hi"}"#).expect("decode");
    assert_eq!(reply.message, "Hi");
    assert!(reply.products.is_none());
    assert!(reply.clarifying_questions.is_none());
    assert!(reply.response_type.is_none());
}

#[test]
fn unknown_reply_kind_maps_to_other() {
    let reply: ChatReply =
        serde_json::from_str(r#"{"message": "Hi", "response_type": "small_talk"}"#)
            .expect("decode");
    assert_eq!(reply.response_type, Some(ReplyKind::Other));

    let reply: ChatReply =
        serde_json::from_str(r#"{"message": "Hi", "response_type": "no_results"}"#)
            .expect("decode");
    assert_eq!(reply.response_type, Some(ReplyKind::NoResults));
}

#[test]
fn search_reply_accepts_bare_and_enveloped_lists() {
    let bare: SearchReply =
        serde_json::from_str(r#"[{"id": 1, "title": "Desk", "price": 5000}]"#).expect("bare");
    let envelope: SearchReply =
        serde_json::from_str(r#"{"products": [{"id": 2, "title": "Chair", "price": 2000}]}"#)
            .expect("envelope");

    assert_eq!(bare.into_products()[0].id, Some(ProductId(1)));
    assert_eq!(envelope.into_products()[0].id, Some(ProductId(2)));
}

#[test]
fn population_request_defaults_to_fallback_seed() {
    let body = serde_json::to_value(PopulationRequest::default()).expect("encode");
    assert_eq!(
        body,
        serde_json::json!({"max_products": 30, "use_fallback": true})
    );
}

#[test]
fn population_status_maps_to_store_status() {
    let reply: PopulationStatusReply =
        serde_json::from_str(r#"{"database_products": 0, "vector_products": 5}"#)
            .expect("decode");
    let status = StoreStatus::from(reply);
    assert_eq!(status.primary_count, 0);
    assert_eq!(status.index_count, 5);
}
