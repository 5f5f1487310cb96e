//! URI templates: `/users/{id}/posts/{post_id}`.

use std::cmp::Ordering;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use super::RegistryError;
use crate::context::PathParams;

// Characters that cannot appear raw inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

/// A compiled URI template.
///
/// Literal segments match exactly and case-sensitively; `{name}` segments match any
/// single non-empty segment and capture it under `name`. A trailing `/` is ignored and
/// `/` alone is the root.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Compile a template string.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidTemplate`] when the template does not start with `/`, has
    /// an empty interior segment, an unbalanced or empty `{}`, a segment mixing literal
    /// text with a placeholder, the same parameter name twice, or a literal whose
    /// percent-encoding is malformed. Literals are stored decoded, the same form
    /// request segments are matched in.
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            template: template.to_owned(),
            reason: reason.to_owned(),
        };

        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some(name) => {
                        if name.is_empty() {
                            return Err(invalid("empty parameter name"));
                        }
                        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                            return Err(invalid("parameter names may only use [A-Za-z0-9_]"));
                        }
                        if segments
                            .iter()
                            .any(|s| matches!(s, Segment::Parameter(n) if n == name))
                        {
                            return Err(invalid("duplicate parameter name"));
                        }
                        Segment::Parameter(name.to_owned())
                    }
                    None if part.contains(['{', '}']) => {
                        return Err(invalid("a placeholder must span a whole segment"));
                    }
                    None => Segment::Literal(decode_literal(part).ok_or_else(|| {
                        invalid("malformed percent-encoding in literal segment")
                    })?),
                };
                segments.push(segment);
            }
        }

        Ok(Self {
            raw: template.to_owned(),
            segments,
        })
    }

    /// The template as it was registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parameter names in template order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Parameter(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match decoded path segments, returning the captured parameters.
    pub fn matches(&self, path: &[String]) -> Option<PathParams> {
        if self.segments.len() != path.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (seg, value) in self.segments.iter().zip(path) {
            match seg {
                Segment::Literal(lit) => {
                    if lit != value {
                        return None;
                    }
                }
                Segment::Parameter(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value.clone());
                }
            }
        }
        Some(params)
    }

    /// Two templates have the same shape when they would match exactly the same paths.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| match (a, b) {
                    (Segment::Literal(x), Segment::Literal(y)) => x == y,
                    (Segment::Parameter(_), Segment::Parameter(_)) => true,
                    _ => false,
                })
    }

    /// Orders templates by specificity: more literal segments first, then the one whose
    /// literals come earlier. `Greater` means `self` is more specific.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        self.literal_count()
            .cmp(&other.literal_count())
            .then_with(|| {
                let mask = |t: &Self| {
                    t.segments
                        .iter()
                        .map(|s| matches!(s, Segment::Literal(_)))
                        .collect::<Vec<_>>()
                };
                mask(self).cmp(&mask(other))
            })
    }

    /// Substitute captured values back into the template, percent-encoding each one.
    ///
    /// Parameters missing from `params` are left as their `{name}` placeholder.
    pub fn fill(&self, params: &PathParams) -> String {
        if self.segments.is_empty() {
            return "/".to_owned();
        }

        let mut out = String::with_capacity(self.raw.len() + 16);
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(lit) => out.extend(utf8_percent_encode(lit, SEGMENT)),
                Segment::Parameter(name) => match params.get(name) {
                    Some(value) => out.extend(utf8_percent_encode(value, SEGMENT)),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

/// Decode a literal segment, rejecting `%` not followed by two hex digits and escapes
/// that do not decode to UTF-8.
fn decode_literal(part: &str) -> Option<String> {
    let bytes = part.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }
    percent_decode_str(part)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_root_and_trailing_slash() {
        assert_eq!(UriTemplate::parse("/").unwrap().segments.len(), 0);
        let t = UriTemplate::parse("/users/").unwrap();
        assert_eq!(t.segments, vec![Segment::Literal("users".into())]);
    }

    #[test]
    fn encoded_literal_matches_decoded_segment() {
        let t = UriTemplate::parse("/a%20b/{id}").unwrap();
        let params = t.matches(&path(&["a b", "7"])).unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert!(t.same_shape(&UriTemplate::parse("/a b/{x}").unwrap()));
        assert_eq!(t.fill(&params), "/a%20b/7");
    }

    #[test]
    fn parse_parameters() {
        let t = UriTemplate::parse("/users/{id}/posts/{post_id}").unwrap();
        assert_eq!(t.parameter_names().collect::<Vec<_>>(), ["id", "post_id"]);
        assert_eq!(t.literal_count(), 2);
    }

    #[test]
    fn parse_rejects_bad_templates() {
        for bad in [
            "users",
            "/users//x",
            "/users/{}",
            "/users/{id",
            "/users/id}",
            "/users/x{id}",
            "/a/{id}/b/{id}",
            "/a/{i d}",
            "/a%2",
            "/a%zzb",
            "/%ff",
        ] {
            assert!(
                matches!(UriTemplate::parse(bad), Err(RegistryError::InvalidTemplate { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn matches_literals_case_sensitively() {
        let t = UriTemplate::parse("/users/{id}").unwrap();
        assert!(t.matches(&path(&["users", "42"])).is_some());
        assert!(t.matches(&path(&["Users", "42"])).is_none());
        assert!(t.matches(&path(&["users"])).is_none());
        assert!(t.matches(&path(&["users", "42", "x"])).is_none());
    }

    #[test]
    fn parameters_never_match_empty_segments() {
        let t = UriTemplate::parse("/users/{id}/posts").unwrap();
        assert!(t.matches(&path(&["users", "", "posts"])).is_none());
    }

    #[test]
    fn captures_values() {
        let t = UriTemplate::parse("/users/{id}/posts/{post_id}").unwrap();
        let params = t.matches(&path(&["users", "7", "posts", "99"])).unwrap();
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post_id"), Some("99"));
    }

    #[test]
    fn shape_ignores_parameter_names() {
        let a = UriTemplate::parse("/users/{id}").unwrap();
        let b = UriTemplate::parse("/users/{user_id}/").unwrap();
        let c = UriTemplate::parse("/users/me").unwrap();
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn specificity_prefers_literals_then_earlier_literals() {
        let param = UriTemplate::parse("/users/{id}").unwrap();
        let literal = UriTemplate::parse("/users/me").unwrap();
        assert_eq!(literal.cmp_specificity(&param), Ordering::Greater);

        let early = UriTemplate::parse("/a/{x}").unwrap();
        let late = UriTemplate::parse("/{y}/b").unwrap();
        assert_eq!(early.cmp_specificity(&late), Ordering::Greater);
    }

    #[test]
    fn fill_encodes_values() {
        let t = UriTemplate::parse("/files/{name}").unwrap();
        let params: PathParams = [("name", "a b/c")].into_iter().collect();
        assert_eq!(t.fill(&params), "/files/a%20b%2Fc");
        assert_eq!(UriTemplate::parse("/").unwrap().fill(&PathParams::new()), "/");
    }
}
