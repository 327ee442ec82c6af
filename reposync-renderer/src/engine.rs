//! Tera rendering engine for synced template files.
//!
//! Each file is rendered as a standalone template. Variable output is
//! HTML-escaped (`& < > " '` only) unless autoescaping is turned off.
//! Undefined variables render as the empty string:
//! when Tera reports a missing variable it is inserted into the context as
//! `""` and the render is retried.

use std::error::Error as StdError;
use std::path::Path;

use serde_json::Value;
use tera::Tera;

use crate::context::TemplateContext;
use crate::error::RenderError;

/// Upper bound on distinct undefined variables filled in for one render.
const MAX_UNDEFINED: usize = 64;

/// Name each source is registered under in its own Tera instance.
const TEMPLATE_NAME: &str = "template";

/// HTML escaping for variable output. Unlike Tera's default escaper, `/` is
/// left alone so URLs and paths survive.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Undefined-variable helpers
// ---------------------------------------------------------------------------

/// Name of the variable Tera could not find, if that is why rendering failed.
fn missing_variable(err: &tera::Error) -> Option<String> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err as &(dyn StdError + 'static));
    while let Some(e) = current {
        let msg = e.to_string();
        if let Some(rest) = msg.strip_prefix("Variable `") {
            if let Some((name, _)) = rest.split_once('`') {
                return Some(name.to_string());
            }
        }
        current = e.source();
    }
    None
}

/// Insert `""` at the dotted `path`, creating intermediate objects.
/// Returns false if the path runs through a non-object or already exists.
fn fill_undefined(root: &mut Value, path: &str) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut node = root;
    for segment in segments {
        let Value::Object(map) = node else {
            return false;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }

    match node {
        Value::Object(map) if !map.contains_key(last) => {
            map.insert(last.to_string(), Value::String(String::new()));
            true
        }
        _ => false,
    }
}

/// Full error chain joined into one line; Tera's top-level message alone only
/// names the template.
pub(crate) fn error_chain(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based renderer for template rules.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine {
    autoescape: bool,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        TemplateEngine { autoescape: true }
    }
}

impl TemplateEngine {
    pub fn new(autoescape: bool) -> Self {
        TemplateEngine { autoescape }
    }

    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    /// Render the template file at `path` with `ctx`.
    pub fn render_file(&self, path: &Path, ctx: &TemplateContext) -> Result<String, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let source = String::from_utf8(bytes).map_err(|_| RenderError::NotUtf8 {
            path: path.to_path_buf(),
        })?;
        self.render_str(&source, ctx).map_err(|e| match e {
            RenderError::Tera(err) => RenderError::Template {
                path: path.to_path_buf(),
                detail: error_chain(&err),
            },
            other => other,
        })
    }

    /// Render template `source` with `ctx`.
    pub fn render_str(&self, source: &str, ctx: &TemplateContext) -> Result<String, RenderError> {
        let tera = self.compile(source)?;
        let mut value = ctx.to_value()?;
        let mut filled: Vec<String> = Vec::new();

        loop {
            let tera_ctx = tera::Context::from_value(value.clone())?;
            let err = match tera.render(TEMPLATE_NAME, &tera_ctx) {
                Ok(rendered) => return Ok(rendered),
                Err(err) => err,
            };

            let Some(name) = missing_variable(&err) else {
                return Err(err.into());
            };
            if filled.contains(&name) || filled.len() >= MAX_UNDEFINED {
                return Err(err.into());
            }
            if !fill_undefined(&mut value, &name) {
                return Err(err.into());
            }
            tracing::debug!("undefined template variable `{name}` rendered as empty");
            filled.push(name);
        }
    }

    fn compile(&self, source: &str) -> Result<Tera, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        if self.autoescape {
            tera.autoescape_on(vec![TEMPLATE_NAME]);
            tera.set_escape_fn(escape_html);
        } else {
            tera.autoescape_on(Vec::new());
        }
        Ok(tera)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
