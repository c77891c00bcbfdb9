//! Template parser.

use thiserror::Error;

/// Errors raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {offset}")]
    UnclosedTag { offset: usize },

    #[error("empty tag at byte {offset}")]
    EmptyTag { offset: usize },

    #[error("unclosed section '{name}'")]
    UnclosedSection { name: String },

    #[error("unopened section '{name}' at byte {offset}")]
    UnopenedSection { name: String, offset: usize },

    #[error("section '{expected}' closed by '{found}' at byte {offset}")]
    MismatchedSection {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unsupported tag '{tag}' at byte {offset}")]
    UnsupportedTag { tag: String, offset: usize },
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Variable {
        name: String,
        escape: bool,
    },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
    Partial(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Variable { escape: bool },
    Comment,
    Open { inverted: bool },
    Close,
    Partial,
}

impl TagKind {
    /// Block-level tags swallow their whole line when they stand alone on it.
    fn can_be_standalone(&self) -> bool {
        !matches!(self, TagKind::Variable { .. })
    }
}

struct OpenSection {
    name: String,
    inverted: bool,
    siblings: Vec<Node>,
}

/// Parse template source into an AST.
pub fn parse(source: &str) -> Result<Template, TemplateError> {
    let mut open: Vec<OpenSection> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(rel) = source[pos..].find("{{") {
        let start = pos + rel;
        text.push_str(&source[pos..start]);

        let (kind, name, end) = read_tag(source, start)?;
        pos = end;

        if kind.can_be_standalone() {
            if let Some(skip_to) = standalone_end(source, start, end) {
                let trimmed = text.trim_end_matches([' ', '\t']).len();
                text.truncate(trimmed);
                pos = skip_to;
            }
        }

        match kind {
            TagKind::Comment => {}
            TagKind::Variable { escape } => {
                flush_text(&mut text, &mut current);
                current.push(Node::Variable { name, escape });
            }
            TagKind::Partial => {
                flush_text(&mut text, &mut current);
                current.push(Node::Partial(name));
            }
            TagKind::Open { inverted } => {
                flush_text(&mut text, &mut current);
                open.push(OpenSection {
                    name,
                    inverted,
                    siblings: std::mem::take(&mut current),
                });
            }
            TagKind::Close => {
                flush_text(&mut text, &mut current);
                let Some(section) = open.pop() else {
                    return Err(TemplateError::UnopenedSection {
                        name,
                        offset: start,
                    });
                };
                if section.name != name {
                    return Err(TemplateError::MismatchedSection {
                        expected: section.name,
                        found: name,
                        offset: start,
                    });
                }
                let children = std::mem::replace(&mut current, section.siblings);
                current.push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    children,
                });
            }
        }
    }

    text.push_str(&source[pos..]);
    flush_text(&mut text, &mut current);

    if let Some(section) = open.pop() {
        return Err(TemplateError::UnclosedSection { name: section.name });
    }

    Ok(Template { nodes: current })
}

fn flush_text(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// Read the tag starting at `start` (which points at `{{`).
///
/// Returns the tag kind, its trimmed name and the byte offset just past it.
fn read_tag(source: &str, start: usize) -> Result<(TagKind, String, usize), TemplateError> {
    if source[start..].starts_with("{{{") {
        let body_start = start + 3;
        let close = source[body_start..]
            .find("}}}")
            .ok_or(TemplateError::UnclosedTag { offset: start })?;
        let name = source[body_start..body_start + close].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyTag { offset: start });
        }
        return Ok((
            TagKind::Variable { escape: false },
            name.to_string(),
            body_start + close + 3,
        ));
    }

    let body_start = start + 2;
    let close = source[body_start..]
        .find("}}")
        .ok_or(TemplateError::UnclosedTag { offset: start })?;
    let end = body_start + close + 2;
    let body = source[body_start..body_start + close].trim();

    let mut chars = body.chars();
    let (kind, rest) = match chars.next() {
        None => return Err(TemplateError::EmptyTag { offset: start }),
        Some('!') => return Ok((TagKind::Comment, String::new(), end)),
        Some('#') => (TagKind::Open { inverted: false }, chars.as_str()),
        Some('^') => (TagKind::Open { inverted: true }, chars.as_str()),
        Some('/') => (TagKind::Close, chars.as_str()),
        Some('>') => (TagKind::Partial, chars.as_str()),
        Some('&') => (TagKind::Variable { escape: false }, chars.as_str()),
        Some('=') | Some('{') => {
            return Err(TemplateError::UnsupportedTag {
                tag: body.to_string(),
                offset: start,
            });
        }
        Some(_) => (TagKind::Variable { escape: true }, body),
    };

    let name = rest.trim();
    if name.is_empty() {
        return Err(TemplateError::EmptyTag { offset: start });
    }
    Ok((kind, name.to_string(), end))
}

/// If the tag spanning `start..end` is alone on its line, return the offset
/// just past the line's newline (or the end of input).
fn standalone_end(source: &str, start: usize, end: usize) -> Option<usize> {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if !source[line_start..start]
        .chars()
        .all(|c| c == ' ' || c == '\t')
    {
        return None;
    }

    let rest = &source[end..];
    let line_len = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
    let tail = rest[..line_len].trim_end_matches('\n').trim_end_matches('\r');
    if !tail.chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    Some(end + line_len)
}
