use monger::schema::{RelationshipKind, TagKey, TagMap};
use test_case::test_case;

#[test_case("username", Some("username"); "bare first item")]
#[test_case("column=user_name;omitempty", Some("user_name"); "column key")]
#[test_case("COLUMN:user_name", Some("user_name"); "colon separator and upper-case key")]
#[test_case("omitempty", None; "flag only")]
#[test_case("", None; "empty tag")]
#[test_case("name;sparkly", Some("name"); "unknown key after column")]
fn test_column(raw: &str, expected: Option<&str>) {
    assert_eq!(TagMap::parse(raw).column(), expected);
}

#[test_case("profile;hasOne;foreignkey=user_id", RelationshipKind::OwningSingle; "has one")]
#[test_case("members;hasMany;foreignkey=conversation_id", RelationshipKind::OwningMany; "has many")]
#[test_case("user;belongTo;foreignkey=user_id", RelationshipKind::OwningReverse; "belong to")]
#[test_case("user;belongsTo;foreignkey=user_id", RelationshipKind::OwningReverse; "belongs to alias")]
fn test_relationship_kind(raw: &str, expected: RelationshipKind) {
    let tags = TagMap::parse(raw);
    assert_eq!(tags.relationship_kinds(), vec![expected]);
    assert!(tags.get(TagKey::ForeignKey).is_some());
}
