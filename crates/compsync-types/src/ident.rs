//! Identifier rules for component local ids and namespaced full ids.

use crate::error::TypeError;

/// Separator between namespace scope and local id in a full id.
pub const SEPARATOR: char = '.';

/// Check that a local id can be used as a single path segment.
///
/// The empty string is valid and marks a structural node.
pub fn validate_local_id(id: &str) -> Result<(), TypeError> {
    if id.contains(SEPARATOR) {
        return Err(TypeError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Join a namespace scope and a local id into a full id.
///
/// An empty local id yields an empty full id (not addressable). An empty scope
/// yields the local id unchanged.
pub fn join_full_id(scope: &str, local_id: &str) -> String {
    if local_id.is_empty() {
        String::new()
    } else if scope.is_empty() {
        local_id.to_string()
    } else {
        format!("{scope}{SEPARATOR}{local_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dotted_id_is_rejected() {
        assert_eq!(
            validate_local_id("a.b"),
            Err(TypeError::InvalidIdentifier("a.b".into()))
        );
        assert!(validate_local_id("").is_ok());
        assert!(validate_local_id("length").is_ok());
    }

    #[test]
    fn join_rules() {
        assert_eq!(join_full_id("form", "length"), "form.length");
        assert_eq!(join_full_id("", "length"), "length");
        assert_eq!(join_full_id("form", ""), "");
        assert_eq!(join_full_id("", ""), "");
    }

    proptest! {
        #[test]
        fn joined_id_ends_with_local_id(scope in "[a-z]{0,6}(\\.[a-z]{1,6}){0,3}", local in "[a-z_0-9]{1,8}") {
            let full = join_full_id(&scope, &local);
            prop_assert!(full.ends_with(&local));
            if scope.is_empty() {
                prop_assert_eq!(full, local);
            } else {
                prop_assert_eq!(full, format!("{}.{}", scope, local));
            }
        }
    }
}
