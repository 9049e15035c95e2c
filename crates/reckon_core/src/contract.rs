//! Static return-shape check of the compute callable.
//!
//! The callable is authored in the host environment (usually JavaScript) and
//! is opaque to the engine except for its source text. Before a session
//! starts we scan that text for the first `return` statement and extract the
//! keys of the returned object literal; those keys must be exactly the
//! computed variable set. This is a lint over untrusted text, not a parser
//! for the host language: strings and comments are stripped so their
//! contents are never mistaken for code, and anything the scanner cannot
//! see through (spreads, computed keys) simply contributes no keys.

use crate::error::ContractError;

/// Checks that the callable's returned keys match `computed` exactly.
///
/// Missing names are reported before redundant ones.
pub fn check(source: &str, computed: &[String]) -> Result<(), ContractError> {
    let tokens = tokenize(source);
    let promised = promised_keys(&tokens)?;

    let missing: Vec<String> = computed
        .iter()
        .filter(|name| !promised.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ContractError::Missing { names: missing });
    }

    let redundant: Vec<String> = promised
        .into_iter()
        .filter(|name| !computed.contains(name))
        .collect();
    if !redundant.is_empty() {
        return Err(ContractError::Redundant { names: redundant });
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    /// String literal content, kept only so a quoted key can be recognized.
    Str(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Other,
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '/' {
            chars.next();
            match chars.peek() {
                Some('/') => {
                    // Line comment: drop the rest of the line.
                    for d in chars.by_ref() {
                        if d == '\n' {
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for d in chars.by_ref() {
                        if prev == '*' && d == '/' {
                            break;
                        }
                        prev = d;
                    }
                }
                _ => tokens.push(Token::Other),
            }
        } else if c == '"' || c == '\'' || c == '`' {
            let quote = c;
            chars.next();
            let mut content = String::new();
            while let Some(d) = chars.next() {
                if d == '\\' {
                    // Escape: the next character is literal.
                    if let Some(escaped) = chars.next() {
                        content.push(escaped);
                    }
                } else if d == quote {
                    break;
                } else {
                    content.push(d);
                }
            }
            tokens.push(Token::Str(content));
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' || d == '$' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
        } else {
            match c {
                '{' => tokens.push(Token::LBrace),
                '}' => tokens.push(Token::RBrace),
                '[' => tokens.push(Token::LBracket),
                ']' => tokens.push(Token::RBracket),
                '(' => tokens.push(Token::LParen),
                ')' => tokens.push(Token::RParen),
                ':' => tokens.push(Token::Colon),
                ',' => tokens.push(Token::Comma),
                _ => tokens.push(Token::Other),
            }
            chars.next();
        }
    }

    tokens
}

/// Extracts the key set of the object literal returned by the first
/// `return` statement.
///
/// A return that is not an object literal (possibly wrapped in parentheses)
/// promises no keys at all. Inside the literal, keys are bare identifiers or
/// quoted strings at nesting depth one, either shorthand or followed by `:`;
/// everything deeper is value territory and is skipped by depth counting.
fn promised_keys(tokens: &[Token]) -> Result<Vec<String>, ContractError> {
    let ret = tokens
        .iter()
        .position(|t| matches!(t, Token::Ident(name) if name == "return"))
        .ok_or(ContractError::NoReturn)?;

    let mut pos = ret + 1;
    while tokens.get(pos) == Some(&Token::LParen) {
        pos += 1;
    }
    if tokens.get(pos) != Some(&Token::LBrace) {
        return Ok(Vec::new());
    }

    let mut keys: Vec<String> = Vec::new();
    let mut depth = 1usize;
    let mut pending: Option<String> = None;
    let mut in_value = false;

    for token in &tokens[pos + 1..] {
        match token {
            Token::LBrace | Token::LBracket | Token::LParen => depth += 1,
            Token::RBrace | Token::RBracket | Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    if let Some(key) = pending.take() {
                        push_unique(&mut keys, key);
                    }
                    break;
                }
            }
            Token::Comma if depth == 1 => {
                if let Some(key) = pending.take() {
                    push_unique(&mut keys, key);
                }
                in_value = false;
            }
            Token::Colon if depth == 1 => {
                if let Some(key) = pending.take() {
                    push_unique(&mut keys, key);
                }
                in_value = true;
            }
            Token::Ident(name) | Token::Str(name) if depth == 1 && !in_value => {
                if pending.is_none() {
                    pending = Some(name.clone());
                } else {
                    // Two names in a row is not a plain entry; skip it.
                    pending = None;
                    in_value = true;
                }
            }
            Token::Other if depth == 1 && !in_value => {
                // Spreads and other operator-led entries promise no key.
                pending = None;
                in_value = true;
            }
            _ => {}
        }
    }

    Ok(keys)
}

fn push_unique(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::{check, promised_keys, tokenize};
    use crate::error::ContractError;

    fn computed(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn keys_of(source: &str) -> Vec<String> {
        promised_keys(&tokenize(source)).unwrap()
    }

    #[test]
    fn accepts_a_matching_return_shape() {
        let source = "function compute(values) { return { y: values.x + values.k }; }";
        assert!(check(source, &computed(&["y"])).is_ok());

        // The check is shape-only: a wrong value behind the right key passes.
        let source = "(values) => { return { y: values.x }; }";
        assert!(check(source, &computed(&["y"])).is_ok());
    }

    #[test]
    fn reports_missing_names_first() {
        let source = "(values) => { return { y: 1 }; }";
        let err = check(source, &computed(&["y", "z"])).unwrap_err();
        assert_eq!(
            err,
            ContractError::Missing {
                names: vec!["z".to_string()],
            }
        );

        // Missing wins even when a redundant key is also present.
        let source = "(values) => { return { y: 1, extra: 2 }; }";
        let err = check(source, &computed(&["y", "z"])).unwrap_err();
        assert_eq!(
            err,
            ContractError::Missing {
                names: vec!["z".to_string()],
            }
        );
    }

    #[test]
    fn reports_redundant_names() {
        let source = "(values) => { return { y: 1, extra: 2 }; }";
        let err = check(source, &computed(&["y"])).unwrap_err();
        assert_eq!(
            err,
            ContractError::Redundant {
                names: vec!["extra".to_string()],
            }
        );
    }

    #[test]
    fn missing_return_is_an_error() {
        let err = check("(values) => values.x + 1", &computed(&["y"])).unwrap_err();
        assert_eq!(err, ContractError::NoReturn);
    }

    #[test]
    fn return_inside_string_or_comment_does_not_count() {
        let source = "(v) => { const s = 'return {y: 1}'; // return {y: 1}\n throw s; }";
        let err = check(source, &computed(&["y"])).unwrap_err();
        assert_eq!(err, ContractError::NoReturn);

        let source = "(v) => { /* return {z: 1} */ return { y: v.x }; }";
        assert!(check(source, &computed(&["y"])).is_ok());
    }

    #[test]
    fn non_object_returns_promise_nothing() {
        assert!(keys_of("() => { return 42; }").is_empty());
        assert!(keys_of("() => { return; }").is_empty());
        assert!(keys_of("() => { return [1, 2]; }").is_empty());
    }

    #[test]
    fn unwraps_parenthesized_object_returns() {
        assert_eq!(keys_of("(v) => { return ({ y: v.x }); }"), ["y"]);
        assert_eq!(keys_of("(v) => { return (({ y: v.x, z: v.k })); }"), [
            "y", "z"
        ]);
    }

    #[test]
    fn arrow_body_without_return_keyword_is_not_scanned() {
        // A bare object arrow body has no `return` token; the check reports
        // that rather than guessing at expression bodies.
        let err = check("v => { y: v.x }", &computed(&["y"])).unwrap_err();
        assert_eq!(err, ContractError::NoReturn);
    }

    #[test]
    fn collects_shorthand_and_quoted_keys() {
        assert_eq!(keys_of("() => { return { y, 'z': 1, \"w\": 2 }; }"), [
            "y", "z", "w"
        ]);
    }

    #[test]
    fn skips_nested_structure_inside_values() {
        let source = r#"
            function compute(values) {
                return {
                    y: solve(values.x, { tol: 1e-9 }),
                    z: [values.k, { nested: true }],
                    w: values.flag ? left : right,
                };
            }
        "#;
        assert_eq!(keys_of(source), ["y", "z", "w"]);
    }

    #[test]
    fn ternary_colons_inside_values_do_not_create_keys() {
        assert_eq!(keys_of("() => { return { y: a ? b : c, z: 1 }; }"), [
            "y", "z"
        ]);
    }

    #[test]
    fn computed_and_spread_entries_contribute_no_keys() {
        assert_eq!(keys_of("() => { return { [key]: 1, y: 2 }; }"), ["y"]);
        assert_eq!(keys_of("() => { return { ...rest, y: 2 }; }"), ["y"]);
    }

    #[test]
    fn first_return_wins() {
        let source = "(v) => { if (v.x) { return { y: 1 }; } return { y: 1, z: 2 }; }";
        assert_eq!(keys_of(source), ["y"]);
    }

    #[test]
    fn duplicate_keys_are_reported_once() {
        assert_eq!(keys_of("() => { return { y: 1, y: 2 }; }"), ["y"]);
    }

    #[test]
    fn empty_computed_set_accepts_empty_object() {
        assert!(check("() => { return {}; }", &computed(&[])).is_ok());
    }
}
