//! `{{name}}` placeholder templates.
//!
//! Equations are authored as display markup with embedded placeholders, e.g.
//! `"{{m}} \\cdot {{a}} = {{F}}"`. Parsing splits the text into literal and
//! placeholder segments once, so rendering is a straight substitution pass.

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// A variable slot. The name is normalized: every character outside
    /// `[A-Za-z0-9_]` is stripped, so `{{ x }}` and `{{x}}` are the same slot.
    Placeholder(String),
}

/// A display template split into segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `text` into literal and placeholder segments.
    ///
    /// A placeholder opens at `{{` and closes at the next `}}`. An opener
    /// with no closer is kept as literal text, as is a placeholder whose
    /// name normalizes to nothing (e.g. `{{}}` or `{{ ?? }}`).
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let name = normalize_name(&after[..close]);
                    if name.is_empty() {
                        // Nothing usable between the braces; keep it verbatim.
                        literal.push_str(&rest[..open + 2]);
                        literal.push_str(&after[..close + 2]);
                    } else {
                        literal.push_str(&rest[..open]);
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Placeholder(name));
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    literal.push_str(&rest[..open + 2]);
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            raw: text.to_string(),
            segments,
        }
    }

    /// The original template text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder using `resolve` and returns the markup.
    pub fn render(&self, mut resolve: impl FnMut(&str) -> String) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(&resolve(name)),
            }
        }
        out
    }
}

/// Placeholder names appearing in `text`, in order, duplicates included.
pub fn placeholder_names(text: &str) -> Vec<String> {
    Template::parse(text)
        .placeholders()
        .map(str::to_string)
        .collect()
}

/// Strips every character outside `[A-Za-z0-9_]` from a raw placeholder body.
pub fn normalize_name(body: &str) -> String {
    body.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
