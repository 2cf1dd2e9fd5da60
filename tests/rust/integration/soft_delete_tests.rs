use monger::OdmConfig;
use serde_json::json;

use crate::fixtures::*;

fn seeded_users(config: OdmConfig) -> (std::sync::Arc<monger::driver::memory::MemoryDriver>, monger::Model<User>) {
    let (driver, conn) = connect_with(config);
    let users = conn.register::<User>().unwrap();
    let mut batch: Vec<User> = ["ada", "bob", "carol"]
        .iter()
        .map(|name| User {
            username: name.to_string(),
            ..Default::default()
        })
        .collect();
    users.create_many(&mut batch).unwrap();
    (driver, users)
}

#[test]
fn test_delete_flags_and_hides_records() {
    let (driver, users) = seeded_users(OdmConfig::default());
    assert!(users.soft_deletes());

    users.delete(doc(json!({ "username": "bob" }))).unwrap();

    assert_eq!(driver.documents("user").len(), 3);
    assert_eq!(users.count(doc(json!({}))).unwrap(), 2);
    assert!(users.find_one(doc(json!({ "username": "bob" }))).unwrap_err().is_not_found());

    let bob = users
        .with_deleted()
        .find_one(doc(json!({ "username": "bob" })))
        .unwrap();
    assert!(bob.base.deleted);

    let all = users.find(doc(json!({}))).with_deleted().all().unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_restore_clears_the_flag() {
    let (_, users) = seeded_users(OdmConfig::default());

    let info = users.delete_all(doc(json!({}))).unwrap();
    assert_eq!(info.updated, 3);
    assert_eq!(users.count(doc(json!({}))).unwrap(), 0);

    let info = users.restore(doc(json!({ "username": "ada" }))).unwrap();
    assert_eq!(info.updated, 1);
    assert_eq!(users.count(doc(json!({}))).unwrap(), 1);
}

#[test]
fn test_force_delete_removes_documents() {
    let (driver, users) = seeded_users(OdmConfig::default());

    users.force_delete(doc(json!({ "username": "ada" }))).unwrap();
    assert_eq!(driver.documents("user").len(), 2);

    let info = users.force_delete_all(doc(json!({}))).unwrap();
    assert_eq!(info.removed, 2);
    assert!(driver.documents("user").is_empty());
}

#[test]
fn test_hard_deletes_when_disabled() {
    let (driver, users) = seeded_users(OdmConfig {
        soft_deletes: false,
        ..Default::default()
    });
    assert!(!users.soft_deletes());

    users.delete(doc(json!({ "username": "ada" }))).unwrap();
    assert_eq!(driver.documents("user").len(), 2);
}

#[test]
fn test_aggregate_respects_soft_deletes() {
    let (_, users) = seeded_users(OdmConfig::default());
    users.delete(doc(json!({ "username": "carol" }))).unwrap();

    let rows = users
        .aggregate(vec![monger::query_compiler::Stage::Count("n".to_string())])
        .unwrap();
    assert_eq!(rows[0]["n"], 2);
}
