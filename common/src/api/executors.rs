use crate::errors::*;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Executor {
    pub node: String,
    /// Display name of the running build, `None` if idle
    pub build: Option<String>,
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(build) => write!(f, "{} building {}", self.node, build),
            None => write!(f, "{}", self.node),
        }
    }
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|err| format_err!("Invalid selector {:?}: {}", s, err))
}

fn first_text(row: &ElementRef, sel: &Selector) -> Option<String> {
    let text = row.select(sel).next()?.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse the executor table served at `/ajaxExecutors`.
///
/// A row with a `th a` names a node, the data rows below it are that node's
/// executors. Nodes without a running build are reported once as idle.
pub fn parse_executors(html: &str) -> Result<Vec<Executor>> {
    let document = Html::parse_document(html);
    let row_sel = selector("table tr")?;
    let node_sel = selector("th a")?;
    let build_sel = selector("td div a")?;

    let mut executors = Vec::new();
    let mut current: Option<(String, bool)> = None;

    for row in document.select(&row_sel) {
        if let Some(node) = first_text(&row, &node_sel) {
            if let Some((node, false)) = current.take() {
                executors.push(Executor { node, build: None });
            }
            current = Some((node, false));
        } else if let Some(build) = first_text(&row, &build_sel) {
            let Some((node, busy)) = current.as_mut() else {
                bail!("Found running build {:?} before any node", build);
            };
            *busy = true;
            executors.push(Executor {
                node: node.clone(),
                build: Some(build),
            });
        }
    }

    if let Some((node, false)) = current {
        executors.push(Executor { node, build: None });
    }

    Ok(executors)
}
