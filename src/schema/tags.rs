//! Field tag parsing.
//!
//! Every declared field carries a short declarative tag string. The tag is
//! normalized once, at registration time, into a [`TagMap`]:
//!
//! ```text
//! "user,omitempty;belongTo;foreignkey=user_id"
//!   column       = user
//!   omitempty    = true
//!   belongTo     = true
//!   foreignkey   = user_id
//! ```
//!
//! Items are separated by `,` or `;` and are either a bare key, `key=value`
//! or `key:value`. Keys are matched case-insensitively. A bare first item
//! that is not part of the vocabulary is taken as the column name. The whole
//! tag `-` removes the field from persistence.

use lazy_static::lazy_static;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::relationship::RelationshipKind;

/// Recognized tag keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKey {
    Column,
    OmitEmpty,
    Inline,
    HasOne,
    HasMany,
    BelongTo,
    ForeignKey,
    LocalField,
    ForeignField,
    Default,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKey::Column => "column",
            TagKey::OmitEmpty => "omitempty",
            TagKey::Inline => "inline",
            TagKey::HasOne => "hasOne",
            TagKey::HasMany => "hasMany",
            TagKey::BelongTo => "belongTo",
            TagKey::ForeignKey => "foreignkey",
            TagKey::LocalField => "localfield",
            TagKey::ForeignField => "foreignfield",
            TagKey::Default => "default",
        }
    }

    /// Resolve a raw key, ignoring case
    pub fn lookup(raw: &str) -> Option<TagKey> {
        TAG_VOCABULARY
            .get(raw.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    /// Keys whose meaning is the value, not the presence
    fn takes_value(&self) -> bool {
        matches!(
            self,
            TagKey::Column | TagKey::ForeignKey | TagKey::LocalField | TagKey::ForeignField
        )
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref TAG_VOCABULARY: HashMap<&'static str, TagKey> = {
        let mut m = HashMap::new();
        m.insert("column", TagKey::Column);
        m.insert("omitempty", TagKey::OmitEmpty);
        m.insert("inline", TagKey::Inline);
        m.insert("hasone", TagKey::HasOne);
        m.insert("hasmany", TagKey::HasMany);
        m.insert("belongto", TagKey::BelongTo);
        // Accepted spelling used by most ODMs
        m.insert("belongsto", TagKey::BelongTo);
        m.insert("foreignkey", TagKey::ForeignKey);
        m.insert("localfield", TagKey::LocalField);
        m.insert("foreignfield", TagKey::ForeignField);
        m.insert("default", TagKey::Default);
        m
    };
}

/// Normalized key/value view of one field tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    ignored: bool,
    entries: BTreeMap<TagKey, String>,
}

impl TagMap {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "-" {
            return TagMap {
                ignored: true,
                entries: BTreeMap::new(),
            };
        }

        let mut entries = BTreeMap::new();
        let items = raw
            .split([',', ';'])
            .map(str::trim)
            .filter(|item| !item.is_empty());

        for (position, item) in items.enumerate() {
            let (key, value) = match item.split_once(['=', ':']) {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (item, None),
            };

            match (TagKey::lookup(key), value) {
                (Some(tag), Some(value)) => {
                    entries.insert(tag, value.to_string());
                }
                (Some(tag), None) if tag.takes_value() => {
                    log::warn!("Tag key `{}` needs a value, ignoring it in `{}`", tag, raw);
                }
                (Some(tag), None) => {
                    entries.insert(tag, "true".to_string());
                }
                (None, None) if position == 0 => {
                    entries.insert(TagKey::Column, key.to_string());
                }
                (None, _) => {
                    log::warn!("Unknown tag key `{}` in `{}`", key, raw);
                }
            }
        }

        TagMap {
            ignored: false,
            entries,
        }
    }

    /// True for the `-` tag
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Flag lookup. `omitempty=false` reads as absent.
    pub fn contains(&self, key: TagKey) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
    }

    pub fn get(&self, key: TagKey) -> Option<&str> {
        self.entries
            .get(&key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn column(&self) -> Option<&str> {
        self.get(TagKey::Column)
    }

    /// Relationship kinds requested by this tag, in vocabulary order
    pub fn relationship_kinds(&self) -> Vec<RelationshipKind> {
        let mut kinds = Vec::new();
        if self.contains(TagKey::HasOne) {
            kinds.push(RelationshipKind::OwningSingle);
        }
        if self.contains(TagKey::HasMany) {
            kinds.push(RelationshipKind::OwningMany);
        }
        if self.contains(TagKey::BelongTo) {
            kinds.push(RelationshipKind::OwningReverse);
        }
        kinds
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagKey, &str)> {
        self.entries.iter().map(|(key, value)| (*key, value.as_str()))
    }
}
