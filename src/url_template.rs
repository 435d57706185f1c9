//! # URL Template Module
//!
//! Converts the router's colon-style URL patterns into OpenAPI path templates.
//!
//! | Route pattern             | Path template            |
//! |---------------------------|--------------------------|
//! | `/users/:id`              | `/users/{id}`            |
//! | `/files/:name(^\d+).png`  | `/files/{name}.png`      |
//! | `/legacy/(^\d+)`          | `/legacy/{regexp1}`      |
//! | `/name::verb`             | `/name:verb`             |
//! | `/static/*`               | `/static/{wildcard}`     |
//!
//! The formatter is a small state machine rather than a regex replacement:
//! regex captures may nest their own groups, so the closing parenthesis has to
//! be found by counting depth.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

/// Parameter name emitted for a trailing `*` wildcard.
pub const WILDCARD_PARAM: &str = "wildcard";

static TEMPLATE_PARAM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("template parameter regex should be valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Copying literal characters
    Scan,
    /// Collecting a `:name`
    InParam,
    /// Inside a `( ... )` capture, counting depth
    InRegexCapture,
}

struct Formatter {
    out: String,
    param: String,
    depth: usize,
    unnamed_captures: usize,
}

impl Formatter {
    fn emit_param(&mut self, name: &str) {
        self.out.push('{');
        self.out.push_str(name);
        self.out.push('}');
    }

    /// Closes a `:name` that was not followed by a capture.
    fn close_param(&mut self) {
        if self.param.is_empty() {
            // A lone colon is not a parameter
            self.out.push(':');
        } else {
            let name = std::mem::take(&mut self.param);
            self.emit_param(&name);
        }
    }

    /// Closes a regex capture, naming it `regexpN` when it had no `:name`.
    fn close_capture(&mut self) {
        self.depth = 0;
        if self.param.is_empty() {
            self.unnamed_captures += 1;
            let name = format!("regexp{}", self.unnamed_captures);
            self.emit_param(&name);
        } else {
            let name = std::mem::take(&mut self.param);
            self.emit_param(&name);
        }
    }
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convert a route URL pattern into an OpenAPI path template.
///
/// Never fails: fragments that are not recognised are copied through, and a
/// parameter or capture left open at the end of the input is closed there.
///
/// # Example
///
/// ```
/// use routedoc::url_template::format_url_template;
///
/// assert_eq!(format_url_template("/example/:userId"), "/example/{userId}");
/// assert_eq!(format_url_template("/name::verb"), "/name:verb");
/// assert_eq!(format_url_template("/example/*"), "/example/{wildcard}");
/// ```
#[must_use]
pub fn format_url_template(pattern: &str) -> String {
    let mut fmt = Formatter {
        out: String::with_capacity(pattern.len() + 8),
        param: String::new(),
        depth: 0,
        unnamed_captures: 0,
    };
    let mut state = State::Scan;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Scan => match c {
                ':' if chars.peek() == Some(&':') => {
                    chars.next();
                    fmt.out.push(':');
                }
                ':' => state = State::InParam,
                '(' => {
                    fmt.depth = 1;
                    state = State::InRegexCapture;
                }
                '*' => fmt.emit_param(WILDCARD_PARAM),
                _ => fmt.out.push(c),
            },
            State::InParam => {
                if is_param_char(c) {
                    fmt.param.push(c);
                } else if c == '(' {
                    fmt.depth = 1;
                    state = State::InRegexCapture;
                } else {
                    fmt.close_param();
                    state = State::Scan;
                    // The terminator may itself open something (`/:a::b`, `/:a*`)
                    match c {
                        ':' if chars.peek() == Some(&':') => {
                            chars.next();
                            fmt.out.push(':');
                        }
                        ':' => state = State::InParam,
                        '*' => fmt.emit_param(WILDCARD_PARAM),
                        _ => fmt.out.push(c),
                    }
                }
            }
            State::InRegexCapture => match c {
                // Escaped characters never change depth
                '\\' => {
                    chars.next();
                }
                '(' => fmt.depth += 1,
                ')' => {
                    fmt.depth -= 1;
                    if fmt.depth == 0 {
                        fmt.close_capture();
                        state = State::Scan;
                    }
                }
                _ => {}
            },
        }
    }

    match state {
        State::Scan => {}
        State::InParam => fmt.close_param(),
        State::InRegexCapture => fmt.close_capture(),
    }

    fmt.out
}

/// Parameter names of an already formatted path template, in order of appearance.
#[must_use]
pub fn path_param_names(template: &str) -> Vec<String> {
    TEMPLATE_PARAM_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Whether a formatted path template contains at least one parameter.
#[must_use]
pub fn has_params(template: &str) -> bool {
    TEMPLATE_PARAM_REGEX.is_match(template)
}

/// Synthesize a `params` schema for a route that declares path parameters but
/// no explicit `params` schema: one string property per extracted name.
#[must_use]
pub fn generated_params_schema(template: &str) -> Value {
    let mut properties = Map::new();
    for name in path_param_names(template) {
        properties.insert(name, json!({ "type": "string" }));
    }
    json!({ "type": "object", "properties": properties })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_params() {
        assert_eq!(format_url_template("/example/:userId"), "/example/{userId}");
        assert_eq!(
            format_url_template("/example/:userId/:secretToken"),
            "/example/{userId}/{secretToken}"
        );
    }

    #[test]
    fn test_escaped_colon() {
        assert_eq!(format_url_template("/name::verb"), "/name:verb");
        assert_eq!(format_url_template("/user/:id::watch"), "/user/{id}:watch");
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(format_url_template("/example/*"), "/example/{wildcard}");
    }

    #[test]
    fn test_constrained_param_with_nested_groups() {
        assert_eq!(
            format_url_template("/files/:name(^(a|b)(\\d+)$).png"),
            "/files/{name}.png"
        );
    }

    #[test]
    fn test_unnamed_captures_are_numbered() {
        assert_eq!(
            format_url_template("/a/(^\\d+)/b/(^\\w+)"),
            "/a/{regexp1}/b/{regexp2}"
        );
    }

    #[test]
    fn test_escaped_paren_inside_capture() {
        assert_eq!(format_url_template("/a/:x(\\))/b"), "/a/{x}/b");
    }

    #[test]
    fn test_unterminated_capture_is_closed() {
        assert_eq!(format_url_template("/a/:id(^\\d+"), "/a/{id}");
        assert_eq!(format_url_template("/a/(x(y)"), "/a/{regexp1}");
    }

    #[test]
    fn test_multiple_params_in_one_segment() {
        assert_eq!(format_url_template("/range/:from-:to"), "/range/{from}-{to}");
    }

    #[test]
    fn test_lone_colon_passes_through() {
        assert_eq!(format_url_template("/a/:/b"), "/a/:/b");
    }

    #[test]
    fn test_plain_url_unchanged() {
        assert_eq!(format_url_template("/health"), "/health");
        assert_eq!(format_url_template(""), "");
    }

    #[test]
    fn test_path_param_names_and_generated_schema() {
        let template = format_url_template("/users/:id/posts/:postId");
        assert_eq!(path_param_names(&template), vec!["id", "postId"]);
        assert!(has_params(&template));
        assert!(!has_params("/users"));

        let schema = generated_params_schema(&template);
        assert_eq!(schema["properties"]["id"]["type"], "string");
        assert_eq!(schema["properties"]["postId"]["type"], "string");
    }
}
