//! HTML page assembled from a recommendation set.

use std::path::Path;

use crate::error::PipelineError;
use crate::recommendation::{Recommendation, RecommendationSet};

const CARDS_PLACEHOLDER: &str = "{{MOVIE_CARDS}}";

/// A finished page, UTF-8 HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of card fragments in the page.
    pub fn card_count(&self) -> usize {
        self.0.matches(r#"<div class="movie-card">"#).count()
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), PipelineError> {
        tokio::fs::write(path, self.0.as_bytes())
            .await
            .map_err(|source| PipelineError::Output {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Renders every record as one card, in order, into the page skeleton.
pub fn assemble(set: &RecommendationSet) -> Document {
    let cards = set.iter().map(render_card).collect::<Vec<_>>().join("\n");
    Document(PAGE_TEMPLATE.replacen(CARDS_PLACEHOLDER, &cards, 1))
}

fn render_card(rec: &Recommendation) -> String {
    format!(
        r#"
        <div class="movie-card">
            <img src="{poster}" alt="{e_title}" class="movie-poster">
            <h2 class="movie-title">
                <span class="hebrew-text">{h_title}</span><br>
                <span>({e_title})</span>
            </h2>
            <p class="movie-description hebrew-text">{h_summary}</p>
            <p class="movie-description">{e_summary}</p>
            <p class="movie-description">Age Range: {age}</p>
            <p class="movie-description">Family-Friendly Reason: {reason}</p>
            <a href="{ticket_link}" target="_blank" rel="noopener" class="get-tickets">Get Tickets</a>
        </div>
        "#,
        poster = escape_html(&rec.poster),
        e_title = escape_html(&rec.english_title),
        h_title = escape_html(&rec.hebrew_title),
        h_summary = escape_html(&rec.hebrew_summary),
        e_summary = escape_html(&rec.english_summary),
        age = escape_html(&rec.age_range),
        reason = escape_html(&rec.family_friendly_reason),
        ticket_link = escape_html(&rec.ticket_link),
    )
}

/// Neutralizes characters that would break markup or attribute quoting.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>AI Family Movie Recommendations</title>
<style>
  * {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
  }
  body {
    background-color: #000;
    color: #fff;
    padding: 2rem;
  }
  header {
    text-align: center;
    margin-bottom: 3rem;
  }
  h1 { font-size: 2.5rem; }
  .movie-grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(250px, 1fr));
    gap: 2rem;
    max-width: 1200px;
    margin: 0 auto;
  }
  .movie-card {
    display: flex;
    flex-direction: column;
    gap: 1rem;
    align-items: center;
    text-align: center;
  }
  .movie-poster {
    width: 100%;
    aspect-ratio: 2/3;
    object-fit: contain;
    border-radius: 8px;
    transition: transform 0.2s;
  }
  .movie-poster:hover { transform: scale(1.02); }
  .movie-title {
    font-size: 1.25rem;
    font-weight: bold;
  }
  .movie-description {
    color: #ccc;
    font-size: 0.9rem;
    min-height: 60px;
    max-width: 300px;
    margin: 0 auto;
    white-space: pre-line;
  }
  .get-tickets {
    display: inline-block;
    background-color: #f00;
    color: white;
    padding: 0.8rem 1.5rem;
    border-radius: 4px;
    font-weight: bold;
    transition: background-color 0.2s;
    width: 200px;
    text-decoration: none;
    text-align: center;
  }
  .get-tickets:hover { background-color: #d00; }
  .hebrew-text { direction: rtl; }
</style>
</head>
<body>
<header>
  <h1>AI Family Movie Recommendations</h1>
</header>
<div class="movie-grid">
{{MOVIE_CARDS}}
</div>
</body>
</html>
"##;
