//! Collection naming for record types
use convert_case::{Case, Casing};
use std::any::type_name;

use super::record::Record;

/// `my_app::models::MemberProfile<T>` -> `MemberProfile`
pub fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// `MemberProfile` -> `member_profile`
pub fn default_collection_name(full_type_name: &str) -> String {
    short_type_name(full_type_name).to_case(Case::Snake)
}

/// Explicit `Record::collection_name` beats the derived name
pub fn collection_name_of<R: Record>() -> String {
    match R::collection_name() {
        Some(name) => name.to_string(),
        None => default_collection_name(type_name::<R>()),
    }
}
