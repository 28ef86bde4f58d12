//! HTML rendering for dashboard updates
//!
//! Samplers build their sections with [`Table`]; the publisher assembles the
//! sections into one [`Payload`] of `hx-swap-oob` blocks.

use std::fmt::Write;

use crate::websocket::Update;

const TABLE_CLASS: &str = "table table-striped table-hover table-sm";

/// Escape text for use inside HTML element content or attribute values
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a float with two decimals
pub fn fixed2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Bootstrap-styled table wrapped in a classed `div`
///
/// Cells are raw HTML; escape text with [`escape`] before adding it.
#[derive(Debug, Clone)]
pub struct Table {
    wrapper: &'static str,
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(wrapper: &'static str) -> Self {
        Self {
            wrapper,
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn header(mut self, columns: &[&'static str]) -> Self {
        self.header = columns.to_vec();
        self
    }

    pub fn row<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<div class='{}'><table class='{}'>", self.wrapper, TABLE_CLASS);

        if !self.header.is_empty() {
            html.push_str("<thead><tr>");
            for column in &self.header {
                let _ = write!(html, "<th>{}</th>", column);
            }
            html.push_str("</tr></thead>");
        }

        html.push_str("<tbody>");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                let _ = write!(html, "<td>{}</td>", cell);
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table></div>");
        html
    }
}

/// One dashboard update under construction
#[derive(Debug, Clone)]
pub struct Payload {
    html: String,
}

impl Payload {
    /// Start a payload stamped with the sampling time
    pub fn new(timestamp: &str) -> Self {
        let mut html = String::new();
        let _ = write!(
            html,
            "<div hx-swap-oob=\"innerHTML:#update-timestamp\"><p><i style=\"color: green\" class=\"fa fa-circle\"></i> {}</p></div>",
            escape(timestamp)
        );
        Self { html }
    }

    /// Append the content for one dashboard element
    pub fn section(&mut self, target: &str, html: &str) -> &mut Self {
        let _ = write!(
            self.html,
            "\n<div hx-swap-oob=\"innerHTML:#{}\">{}</div>",
            target, html
        );
        self
    }

    pub fn finish(self) -> Update {
        Update::from(self.html)
    }
}
