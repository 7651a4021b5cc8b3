//! Property-based tests for variable substitution and shell key sanitization.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::shell_env::sanitize_key;
    use crate::variables::Variables;
    use proptest::prelude::*;

    // ============================================================================
    // Variables::substitute property tests
    // ============================================================================

    proptest! {
        /// Property: text without the token prefix is never changed
        #[test]
        fn substitute_leaves_text_without_prefix_untouched(
            text in "[^$]*",
            ident in "[A-Z]{1,8}",
            value in ".*",
        ) {
            let mut vars = Variables::empty();
            vars.define(&ident, &value);
            prop_assert_eq!(vars.substitute(&text), text);
        }

        /// Property: every occurrence of a bound token is replaced
        #[test]
        fn substitute_replaces_every_occurrence(
            parts in prop::collection::vec("[a-z/._-]*", 1..6),
            value in "[a-z0-9.]*",
        ) {
            let mut vars = Variables::empty();
            vars.define("TOKEN", &value);
            let text = parts.join("$TOKEN");
            prop_assert_eq!(vars.substitute(&text), parts.join(value.as_str()));
        }

        /// Property: a replacement value is inserted verbatim, even when it
        /// contains tokens itself
        #[test]
        fn substitute_is_single_pass(value in "[$A-Z]{0,12}") {
            let mut vars = Variables::empty();
            vars.define("A", &value);
            vars.define("B", "x");
            prop_assert_eq!(vars.substitute("$A"), value);
        }

        /// Property: substitution is deterministic (same input = same output)
        #[test]
        fn substitute_is_deterministic(text in ".*") {
            let mut vars = Variables::empty();
            vars.define("A", "1");
            vars.define("AB", "2");
            prop_assert_eq!(vars.substitute(&text), vars.substitute(&text));
        }
    }

    // ============================================================================
    // sanitize_key property tests
    // ============================================================================

    proptest! {
        /// Property: sanitized keys only contain uppercase letters, digits and
        /// single interior underscores
        #[test]
        fn sanitize_key_produces_shell_identifier_chars(input in ".*") {
            let key = sanitize_key(&input);
            prop_assert!(key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!key.starts_with('_'));
            prop_assert!(!key.ends_with('_'));
            prop_assert!(!key.contains("__"));
        }

        /// Property: sanitize_key is idempotent
        #[test]
        fn sanitize_key_is_idempotent(input in ".*") {
            let once = sanitize_key(&input);
            prop_assert_eq!(sanitize_key(&once), once);
        }

        /// Property: valid uppercase identifiers are kept as they are
        #[test]
        fn sanitize_key_preserves_identifiers(input in "[A-Z][A-Z0-9]{0,6}(_[A-Z0-9]{1,6}){0,3}") {
            prop_assert_eq!(sanitize_key(&input), input);
        }
    }
}
