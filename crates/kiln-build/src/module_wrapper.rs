//! Module registration wrapper.
//!
//! A script declares itself as a module in its leading block comment:
//!
//! ```text
//! /**
//!  * Shopping cart view
//!  * @module cart_view
//!  * @requires view, model,
//!  *           ys_i18n
//!  */
//! ```
//!
//! Declared scripts are wrapped in a loader registration call carrying the
//! module name, the original body, [`MODULE_VERSION_TAG`] and the `requires`
//! list. Everything else passes through untouched.

/// Version tag emitted in every registration call.
pub const MODULE_VERSION_TAG: &str = "1.0";

/// Declarations found in a script's leading comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    pub name: String,
    pub requires: Vec<String>,
}

/// Result of [`wrap_module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapOutcome {
    Wrapped(String),
    Unchanged(String),
}

impl WrapOutcome {
    pub fn into_inner(self) -> String {
        match self {
            WrapOutcome::Wrapped(s) | WrapOutcome::Unchanged(s) => s,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, WrapOutcome::Wrapped(_))
    }
}

/// Inner text of the first `/* ... */` block, if terminated.
fn first_block_comment(text: &str) -> Option<&str> {
    let start = text.find("/*")? + 2;
    let len = text[start..].find("*/")?;
    Some(&text[start..start + len])
}

fn is_name(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.'))
}

/// A comma separated list where every entry is at most one name.
fn is_list_text(text: &str) -> bool {
    text.split(',').all(|entry| {
        let mut tokens = entry.split_whitespace();
        tokens.next().is_none_or(is_name) && tokens.next().is_none()
    })
}

/// Split `keyword rest` when `line` starts with `keyword` as a whole word.
fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

/// Text following an `@tag` that appears anywhere in `line`, up to the next tag.
fn inline_tag<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(found) = line[offset..].find('@') {
        let at = offset + found;
        offset = at + 1;
        let word_start = at == 0 || line[..at].ends_with(char::is_whitespace);
        if !word_start {
            continue;
        }
        if let Some(rest) = keyword(&line[at + 1..], tag) {
            let end = rest.find(" @").unwrap_or(rest.len());
            return Some(rest[..end].trim());
        }
    }
    None
}

/// Keep the first valid module name.
fn declare_module(token: Option<&str>, name: &mut Option<String>) {
    if let Some(token) = token.filter(|token| is_name(token)) {
        name.get_or_insert_with(|| token.to_string());
    }
}

fn append_requires(raw: &mut Option<String>, list: &str) {
    let raw = raw.get_or_insert_with(String::new);
    if !raw.is_empty() && !raw.ends_with(',') {
        raw.push(',');
    }
    raw.push_str(list);
}

fn split_requires(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| {
            entry
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '*')
                .collect::<String>()
        })
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Parse the `module` / `requires` declarations of the leading comment.
///
/// Declarations are recognised at the start of a comment line, after the
/// usual `*` gutter, and tagged ones (`@module cart`) anywhere inside a line.
/// The `@` prefix is optional at line start, but the bare form must be the
/// whole line (`module cart_view`, `requires view, model`) so prose is never
/// mistaken for a declaration. A `requires` list continues on the following
/// lines while it ends with a comma.
pub fn parse_module_header(text: &str) -> Option<ModuleHeader> {
    let comment = first_block_comment(text)?;

    let mut name = None;
    let mut requires_raw: Option<String> = None;
    let mut continuing = false;

    for line in comment.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let (tagged, body) = match line.strip_prefix('@') {
            Some(body) => (true, body),
            None => (false, line),
        };

        if let Some(rest) = keyword(body, "module") {
            continuing = false;
            let mut tokens = rest.split_whitespace();
            let token = tokens.next();
            if tagged || tokens.next().is_none() {
                declare_module(token, &mut name);
            }
            if let Some(list) = inline_tag(rest, "requires") {
                append_requires(&mut requires_raw, list);
                continuing = list.ends_with(',');
            }
            continue;
        }

        if let Some(rest) = keyword(body, "requires") {
            let rest = if tagged {
                inline_tag(line, "requires").unwrap_or(rest)
            } else {
                rest
            };
            if tagged || is_list_text(rest) {
                append_requires(&mut requires_raw, rest);
                continuing = rest.trim_end().ends_with(',');
            }
            if let Some(module) = inline_tag(body, "module") {
                declare_module(module.split_whitespace().next(), &mut name);
            }
            continue;
        }

        let inline_module = inline_tag(line, "module");
        let inline_requires = inline_tag(line, "requires");
        if inline_module.is_some() || inline_requires.is_some() {
            continuing = false;
            if let Some(module) = inline_module {
                declare_module(module.split_whitespace().next(), &mut name);
            }
            if let Some(list) = inline_requires {
                append_requires(&mut requires_raw, list);
                continuing = list.ends_with(',');
            }
            continue;
        }

        if tagged {
            continuing = false;
            continue;
        }

        if continuing && !line.is_empty() && is_list_text(line) {
            if let Some(list) = requires_raw.as_mut() {
                list.push_str(line);
                continuing = line.trim_end().ends_with(',');
            }
        } else if !line.is_empty() {
            continuing = false;
        }
    }

    name.map(|name| ModuleHeader {
        name,
        requires: requires_raw.as_deref().map(split_requires).unwrap_or_default(),
    })
}

/// Wrap `text` in a registration call when it declares a module.
///
/// Never fails: any problem building the wrapped form yields the original
/// input as [`WrapOutcome::Unchanged`].
pub fn wrap_module(text: &str) -> WrapOutcome {
    let Some(header) = parse_module_header(text) else {
        return WrapOutcome::Unchanged(text.to_string());
    };

    match serde_json::to_string(&header.requires) {
        Ok(requires) => WrapOutcome::Wrapped(format!(
            "YUI.add('{}', function(Y) {{\n{}\n}}, '{}', {{requires: {}}});",
            header.name, text, MODULE_VERSION_TAG, requires
        )),
        Err(err) => {
            tracing::warn!(module = %header.name, "leaving module unwrapped: {err}");
            WrapOutcome::Unchanged(text.to_string())
        }
    }
}
