//! `${name}` placeholder substitution against the run's variable table.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use stepcheck_types::Variables;

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex"))
}

/// Replace each `${name}` in `template` with the value of `name` in `vars`.
///
/// Unknown names and unterminated `${` are left as literal text, so the
/// function never fails.
pub fn substitute(template: &str, vars: &Variables) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Names referenced by `${...}` tokens in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_pattern()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().copied().collect()
    }

    #[test]
    fn substitute_single_variable() {
        let vars = vars(&[("name", "world")]);
        assert_eq!(substitute("Hello ${name}!", &vars), "Hello world!");
    }

    #[test]
    fn substitute_multiple_variables() {
        let vars = vars(&[("greeting", "Hello"), ("target", "world")]);
        assert_eq!(substitute("${greeting}, ${target}!", &vars), "Hello, world!");
    }

    #[test]
    fn unknown_token_passes_through() {
        assert_eq!(substitute("${missing}", &Variables::new()), "${missing}");
    }

    #[test]
    fn same_variable_multiple_times() {
        let vars = vars(&[("x", "42")]);
        assert_eq!(substitute("${x} + ${x} = ?", &vars), "42 + 42 = ?");
    }

    #[test]
    fn unterminated_token_is_literal() {
        let vars = vars(&[("x", "1")]);
        assert_eq!(substitute("cost: ${x", &vars), "cost: ${x");
        assert_eq!(substitute("${}", &vars), "${}");
    }

    #[test]
    fn substitution_is_idempotent() {
        let vars = vars(&[("id", "7"), ("host", "localhost")]);
        let template = "http://${host}/users/${id}?q=${other}";
        let once = substitute(template, &vars);
        assert_eq!(substitute(&once, &vars), once);
        assert_eq!(once, "http://localhost/users/7?q=${other}");
    }

    #[test]
    fn value_containing_token_is_not_expanded_again() {
        let vars = vars(&[("a", "${b}"), ("b", "nope")]);
        assert_eq!(substitute("${a}", &vars), "${b}");
    }

    #[test]
    fn placeholders_lists_names_in_order() {
        assert_eq!(placeholders("${a}/${b}/${a}"), vec!["a", "b", "a"]);
        assert!(placeholders("plain").is_empty());
    }
}
