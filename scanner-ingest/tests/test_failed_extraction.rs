use scanner_core::{ExtractionError, ExtractionResult, StatementStore, Transaction};
use scanner_ingest::gemini::parse_generate_response;
use serde_json::json;

fn prior() -> ExtractionResult {
    let mut r = ExtractionResult::new(vec![
        Transaction::new("01/02/24", "Coffee \"Shop\"", -4.5),
        Transaction::new("05/02/24", "Refund", 12.0).with_notes("card 1234"),
    ]);
    r.bank_name = Some("Monzo".into());
    r
}

fn apply(store: &mut StatementStore, body: &str) -> Result<(), ExtractionError> {
    let result = parse_generate_response(body)?;
    store.load(result);
    Ok(())
}

#[test]
fn test_missing_transactions_leaves_store_unchanged() {
    let mut store = StatementStore::new();
    store.load(prior());
    store.begin_edit(1).unwrap();

    let body = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "{\"bankName\":\"Monzo\",\"period\":\"Feb 2024\"}" }] }
        }]
    })
    .to_string();

    let err = apply(&mut store, &body).unwrap_err();
    assert!(matches!(err, ExtractionError::Malformed(_)));
    assert_eq!(store.result(), Some(&prior()));
    // the edit session survives a rejected response
    assert_eq!(store.active_index(), Some(1));
}

#[test]
fn test_valid_response_replaces_store_and_clears_edit() {
    let mut store = StatementStore::new();
    store.load(prior());
    store.begin_edit(0).unwrap();

    let body = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "{\"transactions\":[{\"date\":\"09/09\",\"description\":\"ATM\",\"amount\":-60}]}" }] }
        }]
    })
    .to_string();

    apply(&mut store, &body).unwrap();
    assert_eq!(store.transactions().len(), 1);
    assert_eq!(store.result().unwrap().bank_name, None);
    assert_eq!(store.active_index(), None);
}
