use crate::identity::{AccessView, Identity};
use crate::router::{NavigationOutcome, RouteDef};

const MAX_COL_WIDTH: usize = 48;

/// Render rows as an ASCII table.
pub fn render_table(cols: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = cols.iter().map(|c| c.chars().count().min(MAX_COL_WIDTH)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }
    let sep = build_separator(&widths);
    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(sep.clone());
    out.push(build_row(&header, &widths));
    out.push(sep.clone());
    for r in rows { out.push(build_row(r, &widths)); }
    out.push(sep);
    out.join("\n")
}

pub fn render_routes(routes: &[RouteDef]) -> String {
    let rows: Vec<Vec<String>> = routes
        .iter()
        .map(|r| vec![
            r.path.clone(),
            if r.name.is_empty() { "-".to_string() } else { r.name.clone() },
            yes_no(r.meta.requires_auth),
            yes_no(r.meta.requires_admin),
            r.redirect.clone().unwrap_or_default(),
        ])
        .collect();
    render_table(&["path", "name", "auth", "admin", "redirect"], &rows)
}

pub fn render_whoami(identity: Option<&Identity>, view: &AccessView) -> String {
    let Some(id) = identity else { return "not signed in".to_string(); };
    let expires = id.token_expiration.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string());
    let rows = vec![
        vec!["name".to_string(), id.name.clone()],
        vec!["email".to_string(), id.email.clone()],
        vec!["expires".to_string(), expires],
        vec!["state".to_string(), format!("{:?}", view.state())],
    ];
    render_table(&["field", "value"], &rows)
}

pub fn render_navigation(outcome: &NavigationOutcome) -> String {
    if outcome.redirects.is_empty() {
        format!("at {}", outcome.path)
    } else {
        format!("at {} (redirected via {})", outcome.path, outcome.redirects.join(" -> "))
    }
}

fn yes_no(b: bool) -> String { if b { "yes".to_string() } else { "no".to_string() } }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        s.push_str(&text);
        s.push_str(&" ".repeat(w.saturating_sub(text.chars().count())));
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}
