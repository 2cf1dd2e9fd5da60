use chrono::{Duration, Utc};
use monger::driver::DriverError;
use monger::{Cardinality, OdmError, RecordId, ResultSet, UpdatePayload};
use serde_json::json;

use crate::fixtures::*;

fn user(name: &str, age: u32) -> User {
    User {
        username: name.to_string(),
        age,
        ..Default::default()
    }
}

#[test]
fn test_create_assigns_identity_and_timestamps() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();

    let before = Utc::now();
    let mut ada = user("ada", 36);
    assert!(ada.base.is_empty());
    users.create(&mut ada).unwrap();

    assert!(!ada.base.is_empty());
    let created = ada.base.created_at.unwrap();
    assert!(created >= before && created <= Utc::now() + Duration::seconds(1));
    assert_eq!(ada.base.updated_at, Some(created));

    let stored = driver.documents("user");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["_id"], json!(ada.base.id.as_str()));
    assert!(stored[0].get("email").is_none());
    assert!(stored[0].get("profile").is_none());
}

#[test]
fn test_create_many_is_one_insert() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();
    driver.clear_calls();

    let mut batch = vec![user("ada", 36), user("bob", 25), user("carol", 30)];
    users.create_many(&mut batch).unwrap();

    let inserts = driver.calls().iter().filter(|c| c.operation == "insert").count();
    assert_eq!(inserts, 1);
    assert_eq!(users.count(doc(json!({}))).unwrap(), 3);
}

#[test]
fn test_create_many_of_nothing_skips_the_driver() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();
    driver.clear_calls();

    users.create_many(&mut []).unwrap();
    assert!(driver.calls().is_empty());
}

#[test]
fn test_duplicate_id_is_typed() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();

    let mut first = user("ada", 36);
    first.base.id = RecordId::from("u1");
    users.create(&mut first).unwrap();

    let mut second = user("ada again", 1);
    second.base.id = RecordId::from("u1");
    let err = users.create(&mut second).unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn test_find_modifiers() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();
    let mut batch = vec![user("ada", 36), user("bob", 25), user("carol", 30), user("dan", 41)];
    users.create_many(&mut batch).unwrap();

    let names: Vec<_> = users
        .find(doc(json!({ "age": { "$gte": 26 } })))
        .sort(["-age"])
        .skip(1)
        .limit(2)
        .all()
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["ada", "carol"]);

    let selected = users
        .first(doc(json!({ "username": "bob" })))
        .select(doc(json!({ "username": 1 })))
        .one()
        .unwrap();
    assert_eq!(selected.username, "bob");
    assert_eq!(selected.age, 0);
}

#[test]
fn test_find_by_id_and_not_found() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();
    let mut ada = user("ada", 36);
    users.create(&mut ada).unwrap();

    let found = users.find_by_id(&ada.base.id).unwrap();
    assert_eq!(found.username, "ada");
    assert_eq!(found.base.id, ada.base.id);

    let err = users.find_by_id(&RecordId::from("missing")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_partial_update_changes_only_named_fields() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();
    let mut ada = user("ada", 36);
    ada.email = "ada@example.com".to_string();
    users.create(&mut ada).unwrap();
    let created_at = ada.base.created_at;

    users
        .update(
            monger::model::id_filter(&ada.base.id),
            UpdatePayload::Partial(doc(json!({ "age": 37 }))),
        )
        .unwrap();

    let reread = users.find_by_id(&ada.base.id).unwrap();
    assert_eq!(reread.age, 37);
    assert_eq!(reread.username, "ada");
    assert_eq!(reread.email, "ada@example.com");
    assert_eq!(reread.base.created_at, created_at);
    assert!(reread.base.updated_at >= created_at);
}

#[test]
fn test_update_of_missing_record_is_not_found() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();

    let err = users
        .update(
            doc(json!({ "_id": "nope" })),
            UpdatePayload::Partial(doc(json!({ "age": 1 }))),
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_save_creates_then_upserts() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();

    let mut ada = user("ada", 36);
    users.save(&mut ada).unwrap();
    let id = ada.base.id.clone();
    assert!(!id.is_empty());

    ada.age = 40;
    users.save(&mut ada).unwrap();
    assert_eq!(ada.base.id, id);

    let stored = driver.documents("user");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["age"], 40);
}

#[test]
fn test_upsert_id_inserts_when_missing() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();

    let info = users
        .upsert_id(
            &RecordId::from("u9"),
            UpdatePayload::Partial(doc(json!({ "username": "zed" }))),
        )
        .unwrap();
    assert_eq!(info.upserted_id, Some(json!("u9")));
    assert_eq!(users.find_by_id(&RecordId::from("u9")).unwrap().username, "zed");

    let err = users
        .upsert_id(&RecordId::default(), UpdatePayload::Partial(doc(json!({}))))
        .unwrap_err();
    assert!(matches!(err, OdmError::InvalidParams(_)));
}

#[test]
fn test_exec_rejects_mismatched_result_shapes() {
    let (_, conn) = connect();
    let users = conn.register::<User>().unwrap();
    let mut ada = user("ada", 36);
    users.create(&mut ada).unwrap();

    let many = users.find(doc(json!({})));
    assert_eq!(many.cardinality(), Cardinality::Many);
    let mut single = User::default();
    let err = many.exec(ResultSet::One(&mut single)).unwrap_err();
    assert!(matches!(err, OdmError::InvalidParams(_)));

    let one = users.first(doc(json!({})));
    let mut list = Vec::new();
    let err = one.exec(ResultSet::Many(&mut list)).unwrap_err();
    assert!(matches!(err, OdmError::InvalidParams(_)));

    one.exec(ResultSet::One(&mut single)).unwrap();
    assert_eq!(single.username, "ada");
    many.exec(ResultSet::Many(&mut list)).unwrap();
    assert_eq!(list.len(), 1);
}

#[test]
fn test_count_propagates_driver_errors() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();

    driver.inject_failure("count", DriverError::Backend("connection reset".to_string()));
    let err = users.count(doc(json!({}))).unwrap_err();
    assert!(matches!(err, OdmError::Driver(DriverError::Backend(_))));
    assert_eq!(users.count(doc(json!({}))).unwrap(), 0);
}

#[test]
fn test_failed_insert_sets_no_after_state() {
    let (driver, conn) = connect();
    let users = conn.register::<User>().unwrap();

    driver.inject_failure("insert", DriverError::Backend("disk full".to_string()));
    let mut ada = user("ada", 36);
    assert!(users.create(&mut ada).is_err());
    assert!(driver.documents("user").is_empty());
}

#[test]
fn test_registration_errors_and_lookup() {
    let (_, conn) = connect();

    let err = conn.model::<User>().err().unwrap();
    assert!(matches!(err, OdmError::InvalidParams(_)));

    conn.register::<User>().unwrap();
    assert!(conn.model::<User>().is_ok());
    assert_eq!(conn.model_by_name("user").unwrap().collection, "user");
    assert!(conn.model_by_name("nobody").is_err());

    conn.register::<Profile>().unwrap();
    let registered: Vec<_> = conn
        .registered_models()
        .into_iter()
        .map(|m| (m.name, m.collection))
        .collect();
    assert_eq!(
        registered,
        vec![
            ("Profile".to_string(), "profile".to_string()),
            ("User".to_string(), "user".to_string()),
        ]
    );

    let first = conn.register::<Clashing>().err().unwrap();
    let second = conn.register::<Clashing>().err().unwrap();
    assert!(matches!(first, OdmError::Metadata(_)));
    assert_eq!(first.to_string(), second.to_string());
}
