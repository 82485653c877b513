//! HTML landing page.

use axum::response::Html;

/// Contents of the landing page.
#[derive(Debug, Clone)]
pub struct LandingConfig {
    pub name: String,
    pub description: String,
    pub version: String,
    pub metrics_path: String,
}

impl LandingConfig {
    /// Render the page once; it is served as a static body.
    pub fn render(&self) -> Html<String> {
        let name = escape(&self.name);
        Html(format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head><title>{name}</title></head>\n\
             <body>\n\
             <h1>{name}</h1>\n\
             <p>{description}</p>\n\
             <ul><li><a href=\"{path}\">Metrics</a></li></ul>\n\
             <p>Version: {version}</p>\n\
             </body>\n\
             </html>\n",
            description = escape(&self.description),
            path = escape(&self.metrics_path),
            version = escape(&self.version),
        ))
    }
}

fn escape(s: &str) -> String {
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
