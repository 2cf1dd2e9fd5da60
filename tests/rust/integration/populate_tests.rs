use monger::{Connection, Model};
use serde_json::json;

use crate::fixtures::*;

struct Seeded {
    users: Model<User>,
    profiles: Model<Profile>,
    conversations: Model<Conversation>,
    ada: User,
    bob: User,
    chat: Conversation,
}

fn seed(conn: &Connection) -> Seeded {
    let users = conn.register::<User>().unwrap();
    let profiles = conn.register::<Profile>().unwrap();
    let conversations = conn.register::<Conversation>().unwrap();
    let memberships = conn.register::<Membership>().unwrap();

    let mut ada = User {
        username: "ada".to_string(),
        ..Default::default()
    };
    let mut bob = User {
        username: "bob".to_string(),
        ..Default::default()
    };
    users.create(&mut ada).unwrap();
    users.create(&mut bob).unwrap();

    let mut profile = Profile {
        bio: "analyst".to_string(),
        user_id: ada.base.id.to_string(),
        ..Default::default()
    };
    profiles.create(&mut profile).unwrap();

    let mut chat = Conversation {
        title: "engines".to_string(),
        master_id: ada.base.id.to_string(),
        ..Default::default()
    };
    conversations.create(&mut chat).unwrap();

    let mut members = vec![
        Membership {
            conversation_id: chat.base.id.to_string(),
            user_id: ada.base.id.to_string(),
            role: "owner".to_string(),
            ..Default::default()
        },
        Membership {
            conversation_id: chat.base.id.to_string(),
            user_id: bob.base.id.to_string(),
            role: "guest".to_string(),
            ..Default::default()
        },
    ];
    memberships.create_many(&mut members).unwrap();

    Seeded {
        users,
        profiles,
        conversations,
        ada,
        bob,
        chat,
    }
}

#[test]
fn test_belong_to_populate_keeps_unmatched_rows() {
    let (_, conn) = connect();
    let seeded = seed(&conn);

    let mut orphan = Profile {
        bio: "nobody's".to_string(),
        user_id: "ghost".to_string(),
        ..Default::default()
    };
    seeded.profiles.create(&mut orphan).unwrap();

    let profiles = seeded
        .profiles
        .find(doc(json!({})))
        .populate("User")
        .sort(["bio"])
        .all()
        .unwrap();

    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].bio, "analyst");
    assert_eq!(profiles[0].user.as_ref().unwrap().username, "ada");
    assert_eq!(profiles[1].bio, "nobody's");
    assert!(profiles[1].user.is_none());
}

#[test]
fn test_has_one_populate() {
    let (_, conn) = connect();
    let seeded = seed(&conn);

    let ada = seeded
        .users
        .first(doc(json!({ "username": "ada" })))
        .populate("Profile")
        .one()
        .unwrap();
    assert_eq!(ada.base.id, seeded.ada.base.id);
    assert_eq!(ada.profile.unwrap().bio, "analyst");

    let bob = seeded
        .users
        .first(doc(json!({ "username": "bob" })))
        .populate("Profile")
        .one()
        .unwrap();
    assert_eq!(bob.base.id, seeded.bob.base.id);
    assert!(bob.profile.is_none());
}

#[test]
fn test_nested_and_comma_separated_populate() {
    let (_, conn) = connect();
    let seeded = seed(&conn);

    let chat = seeded
        .conversations
        .first(doc(json!({ "title": "engines" })))
        .populate("Master,Members")
        .populate("Members.User.Profile")
        .one()
        .unwrap();

    assert_eq!(chat.base.id, seeded.chat.base.id);
    assert_eq!(chat.master.as_ref().unwrap().username, "ada");
    assert_eq!(chat.members.len(), 2);

    let mut roles: Vec<_> = chat
        .members
        .iter()
        .map(|m| {
            let user = m.user.as_ref().unwrap();
            (
                m.role.as_str(),
                user.username.as_str(),
                user.profile.as_ref().map(|p| p.bio.as_str()),
            )
        })
        .collect();
    roles.sort();
    assert_eq!(
        roles,
        vec![("guest", "bob", None), ("owner", "ada", Some("analyst"))]
    );
}

#[test]
fn test_populated_count_and_unknown_names() {
    let (_, conn) = connect();
    let seeded = seed(&conn);

    let count = seeded
        .users
        .find(doc(json!({})))
        .populate("Profile")
        .count()
        .unwrap();
    assert_eq!(count, 2);

    let none = seeded
        .users
        .find(doc(json!({ "username": "zed" })))
        .populate("Profile")
        .count()
        .unwrap();
    assert_eq!(none, 0);

    // names that are not relationships are dropped
    let users = seeded
        .users
        .find(doc(json!({})))
        .populate("Username")
        .all()
        .unwrap();
    assert_eq!(users.len(), 2);
}

#[test]
fn test_strict_populate_rejects_unknown_names() {
    let (_, conn) = connect_with(monger::OdmConfig {
        strict_populate: true,
        ..Default::default()
    });
    let seeded = seed(&conn);

    let err = seeded
        .users
        .find(doc(json!({})))
        .populate("Friends")
        .all()
        .unwrap_err();
    assert!(matches!(err, monger::OdmError::Compile(_)));
}
