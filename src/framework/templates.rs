//! Minimal HTML templates: `{{ key }}` is replaced by the escaped context value,
//! `{{ key|safe }}` by the raw value. Missing keys render as nothing.

use crate::error::AppError;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("about.html", include_str!("../../templates/about.html")),
    ("contact.html", include_str!("../../templates/contact.html")),
    ("category_list.html", include_str!("../../templates/category_list.html")),
    ("category_create.html", include_str!("../../templates/category_create.html")),
    ("course_list.html", include_str!("../../templates/course_list.html")),
    ("course_create.html", include_str!("../../templates/course_create.html")),
    ("course_select.html", include_str!("../../templates/course_select.html")),
    ("student_list.html", include_str!("../../templates/student_list.html")),
    ("student_create.html", include_str!("../../templates/student_create.html")),
    ("student_course_list.html", include_str!("../../templates/student_course_list.html")),
];

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn value_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Clone, Debug)]
pub struct Templates {
    sources: HashMap<String, String>,
    placeholder: Regex,
}

impl Templates {
    pub fn empty() -> Result<Self, AppError> {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*(\|\s*safe\s*)?\}\}")
            .map_err(|e| AppError::Template(e.to_string()))?;
        Ok(Templates {
            sources: HashMap::new(),
            placeholder,
        })
    }

    /// The templates compiled into the crate.
    pub fn builtin() -> Result<Self, AppError> {
        let mut t = Self::empty()?;
        for (name, source) in BUILTIN {
            t.insert(*name, *source);
        }
        Ok(t)
    }

    /// Built-in templates, with every `*.html` file in `dir` replacing or adding to them.
    pub async fn with_overrides(dir: &Path) -> Result<Self, AppError> {
        let mut t = Self::builtin()?;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let source = tokio::fs::read_to_string(&path).await?;
            tracing::debug!(template = %name, "template override loaded");
            t.insert(name, source);
        }
        Ok(t)
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn render(&self, name: &str, context: &Value) -> Result<String, AppError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| AppError::Template(format!("{} not found", name)))?;
        let rendered = self.placeholder.replace_all(source, |caps: &Captures| {
            let text = value_text(context.get(&caps[1]));
            if caps.get(2).is_some() {
                text
            } else {
                escape_html(&text)
            }
        });
        Ok(rendered.into_owned())
    }

    /// Render `name` and wrap it in `base.html` under `title`.
    pub fn render_page(&self, name: &str, title: &str, context: &Value) -> Result<String, AppError> {
        let content = self.render(name, context)?;
        self.render(
            "base.html",
            &serde_json::json!({ "title": title, "content": content }),
        )
    }
}
