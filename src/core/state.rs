//! State identity and base-name normalization.
//!
//! A state is declared as a type (`Closed`, `Empty<T>`, `fs::Open`), but it is
//! always compared by its *base name*: the last path segment with generic
//! arguments and reference/pointer wrappers stripped. `&mut fs::Empty<i32>`
//! and `Empty<T>` therefore name the same state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smart-pointer wrappers that are transparent for state identity.
const POINTER_WRAPPERS: &[&str] = &["Box", "Rc", "Arc"];

/// Parsed view of a type expression naming a state.
///
/// # Example
///
/// ```rust
/// use typestates::core::TypeRef;
///
/// let ty = TypeRef::parse("&mut io::Empty<Vec<u8>, T>");
/// assert_eq!(ty.base, "Empty");
/// assert_eq!(ty.args, vec!["Vec<u8>".to_string(), "T".to_string()]);
/// assert!(ty.borrowed);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// The type exactly as written.
    pub repr: String,
    /// Base name used for every identity comparison.
    pub base: String,
    /// Top-level generic arguments of the innermost type.
    pub args: Vec<String>,
    /// Whether the type was reached through `&`, `&mut` or a raw pointer.
    pub borrowed: bool,
}

impl TypeRef {
    pub fn parse(repr: &str) -> Self {
        let repr = repr.trim();
        let (inner, borrowed) = strip_wrappers(repr);
        let (path, args) = split_generics(inner);
        let base = last_segment(path).to_string();
        Self {
            repr: repr.to_string(),
            base,
            args,
            borrowed,
        }
    }
}

/// Extract the base name of a state type expression.
///
/// This is the single normalization function for state identity.
///
/// ```rust
/// use typestates::core::base_name;
///
/// assert_eq!(base_name("Empty<T>"), "Empty");
/// assert_eq!(base_name("& 'a mut crate::fs::Open"), "Open");
/// assert_eq!(base_name("Box<Closed>"), "Closed");
/// ```
pub fn base_name(repr: &str) -> String {
    TypeRef::parse(repr).base
}

fn strip_wrappers(mut s: &str) -> (&str, bool) {
    let mut borrowed = false;
    loop {
        s = s.trim();
        if let Some(rest) = s.strip_prefix('&') {
            borrowed = true;
            let mut rest = rest.trim_start();
            if rest.starts_with('\'') {
                rest = rest
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, tail)| tail)
                    .trim_start();
            }
            s = rest.strip_prefix("mut ").unwrap_or(rest);
            continue;
        }
        if let Some(rest) = s.strip_prefix('*') {
            borrowed = true;
            let rest = rest.trim_start();
            s = rest
                .strip_prefix("const ")
                .or_else(|| rest.strip_prefix("mut "))
                .unwrap_or(rest);
            continue;
        }
        if let Some(inner) = pointer_wrapper_inner(s) {
            s = inner;
            continue;
        }
        return (s, borrowed);
    }
}

fn pointer_wrapper_inner(s: &str) -> Option<&str> {
    let lt = top_level_lt(s)?;
    if !s.ends_with('>') {
        return None;
    }
    let head = last_segment(&s[..lt]);
    if POINTER_WRAPPERS.contains(&head) {
        Some(&s[lt + 1..s.len() - 1])
    } else {
        None
    }
}

fn top_level_lt(s: &str) -> Option<usize> {
    s.find('<')
}

fn split_generics(s: &str) -> (&str, Vec<String>) {
    let Some(lt) = top_level_lt(s) else {
        return (s.trim(), Vec::new());
    };
    let path = s[..lt].trim();
    let body = s[lt + 1..].trim_end();
    let body = body.strip_suffix('>').unwrap_or(body);
    (path, split_top_level(body, ','))
}

/// Split `s` on `sep` ignoring separators nested inside `<>`, `()` or `[]`.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c == sep && depth == 0 {
            push_part(&mut parts, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_part(&mut parts, &current);
    parts
}

fn push_part(parts: &mut Vec<String>, part: &str) {
    let part = part.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path).trim()
}

/// A declared state of a typestate graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Base name, the state's identity.
    pub name: String,
    /// Full representation as declared, kept for diagnostics and codegen.
    pub repr: String,
    /// Generic arguments of the declared type.
    pub args: Vec<String>,
}

impl State {
    pub fn parse(repr: &str) -> Self {
        let ty = TypeRef::parse(repr);
        Self {
            name: ty.base,
            repr: ty.repr,
            args: ty.args,
        }
    }

    /// Number of generic parameters the declared type carries.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Whether `repr` (possibly an instantiation) names this state.
    pub fn matches(&self, repr: &str) -> bool {
        base_name(repr) == self.name
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_is_its_own_base() {
        assert_eq!(base_name("Closed"), "Closed");
        assert_eq!(base_name("  Open "), "Open");
    }

    #[test]
    fn generic_arguments_are_stripped() {
        let ty = TypeRef::parse("Empty<HashMap<K, V>, T>");
        assert_eq!(ty.base, "Empty");
        assert_eq!(ty.args, vec!["HashMap<K, V>", "T"]);
        assert!(!ty.borrowed);
    }

    #[test]
    fn references_and_pointers_are_stripped() {
        assert!(TypeRef::parse("&Open").borrowed);
        assert!(TypeRef::parse("&'a mut Open").borrowed);
        assert!(TypeRef::parse("*const Open").borrowed);
        assert_eq!(base_name("*mut Open"), "Open");
        assert_eq!(base_name("& 'a mut Open < T >"), "Open");
    }

    #[test]
    fn smart_pointers_are_transparent() {
        let ty = TypeRef::parse("std::sync::Arc<Box<Connected>>");
        assert_eq!(ty.base, "Connected");
        assert!(!ty.borrowed);
    }

    #[test]
    fn module_qualifiers_are_stripped() {
        assert_eq!(base_name("crate::net::Connected"), "Connected");
        assert_eq!(base_name("net :: Connected"), "Connected");
    }

    #[test]
    fn instantiation_matches_generic_declaration() {
        let declared = State::parse("Empty<T>");
        assert_eq!(declared.arity(), 1);
        assert!(declared.matches("Empty<i32>"));
        assert!(declared.matches("&Empty<String>"));
        assert!(!declared.matches("Full<i32>"));
    }

    #[test]
    fn split_top_level_respects_nesting() {
        assert_eq!(
            split_top_level("A<B, C>, (D, E), F", ','),
            vec!["A<B, C>", "(D, E)", "F"]
        );
    }
}
