mod home;

use axum::{extract::State, response::Html};
use maud::Markup;
use std::collections::HashMap;
use tracing::error;

use crate::AppState;
use crate::error::RelayError;

/// Template variables handed to a page.
pub type VarMap = HashMap<String, String>;

/// Render a page by name.
pub fn render_page(name: &str, vars: Option<&VarMap>) -> Result<Markup, RelayError> {
    let empty = VarMap::new();
    let vars = vars.unwrap_or(&empty);
    match name {
        "home" => Ok(home::render(vars)),
        other => Err(RelayError::UnknownPage(other.to_string())),
    }
}

pub async fn home_page(State(state): State<AppState>) -> Result<Html<String>, RelayError> {
    let mut vars = VarMap::new();
    vars.insert("title".to_string(), state.page.title.clone());

    let markup = render_page("home", Some(&vars)).inspect_err(|e| error!("{}", e))?;
    Ok(Html(markup.into_string()))
}

fn var<'a>(vars: &'a VarMap, key: &str, default: &'a str) -> &'a str {
    vars.get(key).map(String::as_str).unwrap_or(default)
}

// Shared CSS constant
pub const CSS: &str = r#"
    body {
        font-family: system-ui, -apple-system, 'Segoe UI', Roboto, sans-serif;
        background: #111827;
        color: #e5e7eb;
        margin: 0;
    }

    .container {
        max-width: 960px;
        margin: 0 auto;
        padding: 1.5rem;
    }

    .layout {
        display: grid;
        grid-template-columns: 1fr 220px;
        gap: 1rem;
    }

    .card {
        background: #1f2937;
        border: 1px solid #374151;
        border-radius: 0.5rem;
        padding: 1rem;
    }

    .status {
        font-size: 0.8rem;
        color: #9ca3af;
    }

    .status.online { color: #34d399; }
    .status.offline { color: #f87171; }

    label {
        display: block;
        font-size: 0.875rem;
        margin-bottom: 0.25rem;
        color: #9ca3af;
    }

    input[type=text] {
        width: 100%;
        box-sizing: border-box;
        padding: 0.5rem;
        margin-bottom: 0.75rem;
        background: #111827;
        color: #e5e7eb;
        border: 1px solid #4b5563;
        border-radius: 0.25rem;
    }

    button {
        padding: 0.5rem 1rem;
        background: #4299e1;
        color: white;
        border: none;
        border-radius: 0.25rem;
        cursor: pointer;
    }

    button:hover { background: #3182ce; }

    #output {
        height: 320px;
        overflow-y: auto;
        margin-top: 1rem;
        padding: 0.5rem;
        background: #111827;
        border-radius: 0.25rem;
        white-space: pre-wrap;
    }

    #online-users {
        list-style: none;
        padding: 0;
        margin: 0;
    }

    #online-users li {
        padding: 0.25rem 0;
        border-bottom: 1px solid #374151;
    }
"#;
