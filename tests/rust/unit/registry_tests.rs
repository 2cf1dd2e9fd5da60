use monger::schema::{MetadataError, RelationshipKind};
use monger::Registry;
use std::sync::Arc;

use crate::fixtures::*;

#[test]
fn test_describe_twice_returns_cached_metadata() {
    let registry = Registry::new();
    let first = registry.describe_record::<User>().unwrap();
    let second = registry.describe_record::<User>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_flattened_field_table() {
    let registry = Registry::new();
    let user = registry.describe_record::<User>().unwrap();

    let storage: Vec<_> = user.fields().iter().map(|f| f.storage_name.as_str()).collect();
    assert_eq!(
        storage,
        vec!["_id", "created_at", "updated_at", "deleted", "username", "email", "age", "profile"]
    );
    assert!(user.fields()[..4].iter().all(|f| f.inline));
    assert_eq!(user.field("Email").unwrap().index_path, vec![2]);
    assert!(user.has_column("deleted"));
    assert!(!user.has_column("profile"));
}

#[test]
fn test_relationships_of_each_kind() {
    let registry = Registry::new();
    let conversation = registry.describe_record::<Conversation>().unwrap();

    let kinds: Vec<_> = conversation
        .relation_fields()
        .map(|f| f.relationship.as_ref().unwrap().kind)
        .collect();
    assert_eq!(kinds, vec![RelationshipKind::OwningReverse, RelationshipKind::OwningMany]);

    let members = conversation.field("members").unwrap().relationship.clone().unwrap();
    assert_eq!(members.collection, "conversation_members");
    let membership = members.target_metadata(&registry).unwrap();
    assert_eq!(membership.type_name(), "Membership");

    let user = membership.field("User").unwrap().relationship.clone().unwrap();
    assert_eq!((user.local_key.as_str(), user.foreign_key.as_str()), ("user_id", "_id"));
}

#[test]
fn test_mutually_referencing_types_resolve() {
    let registry = Registry::new();
    let user = registry.describe_record::<User>().unwrap();
    let profile = registry.describe_record::<Profile>().unwrap();

    let back = profile
        .field("User")
        .unwrap()
        .relationship
        .as_ref()
        .unwrap()
        .target_metadata(&registry)
        .unwrap();
    assert!(Arc::ptr_eq(&user, &back));
}

#[test]
fn test_duplicate_storage_name_fails_every_time() {
    let registry = Registry::new();
    let expected = MetadataError::DuplicateStorageName {
        record: "Clashing".to_string(),
        storage_name: "label".to_string(),
    };
    for _ in 0..3 {
        assert_eq!(registry.describe_record::<Clashing>().unwrap_err(), expected);
    }
    assert!(registry.contains::<Clashing>());
}
