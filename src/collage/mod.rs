//! Collage state built from search events, with HTML and text renderings.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::orchestrator::{ChecklistItem, SearchEvent, StageStatus};
use crate::search::{SearchResult, SearchTerm};

pub const SEARCHING_PLACEHOLDER: &str = "Searching web...";

/// One cell of the collage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tile {
    /// In-flight term: first usable image if any, and how many more are known.
    Pending {
        term: String,
        image: Option<String>,
        more: usize,
    },
    /// Final `(result, image)` pair.
    Image {
        term: String,
        description: String,
        url: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CollageView {
    loading: bool,
    terms: Vec<SearchTerm>,
    term_images: HashMap<String, Vec<String>>,
    results: Vec<SearchResult>,
    failed: HashSet<String>,
    checklist: Vec<ChecklistItem>,
    error: Option<String>,
}

impl CollageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &SearchEvent) {
        match event {
            SearchEvent::Checklist { items } => {
                // First checklist of a run starts a fresh collage
                if !self.loading && items.iter().any(|i| i.status == StageStatus::Active) {
                    let failed = std::mem::take(&mut self.failed);
                    *self = Self {
                        loading: true,
                        failed,
                        ..Self::default()
                    };
                }
                self.checklist = items.clone();
            }
            SearchEvent::Terms { terms } => self.terms = terms.clone(),
            SearchEvent::ImagesFound { term, image_urls } => {
                // A repeated term replaces its earlier lookup
                self.term_images.insert(term.clone(), image_urls.clone());
            }
            SearchEvent::Completed { results } => {
                self.results = results.clone();
                self.loading = false;
            }
            SearchEvent::Failed { message } => {
                self.error = Some(message.clone());
                self.loading = false;
            }
        }
    }

    /// Remembers a URL that did not load; it is left out of every later render.
    pub fn mark_failed(&mut self, url: &str) {
        self.failed.insert(url.to_string());
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    pub fn tiles(&self) -> Vec<Tile> {
        if self.loading && !self.terms.is_empty() {
            return self
                .terms
                .iter()
                .map(|term| {
                    let name = term.term();
                    let usable = self.usable_urls(name);
                    Tile::Pending {
                        term: name.to_string(),
                        image: usable.first().map(|u| u.to_string()),
                        more: usable.len().saturating_sub(1),
                    }
                })
                .collect();
        }

        self.results
            .iter()
            .flat_map(|result| {
                result
                    .image_urls
                    .iter()
                    .filter(|url| !self.failed.contains(*url))
                    .map(|url| Tile::Image {
                        term: result.term.clone(),
                        description: result.description.clone(),
                        url: url.clone(),
                    })
            })
            .collect()
    }

    /// Known URLs for `term` that have not failed, in lookup order.
    fn usable_urls(&self, term: &str) -> Vec<&String> {
        self.term_images
            .get(term)
            .map(|urls| urls.iter().filter(|u| !self.failed.contains(*u)).collect())
            .unwrap_or_default()
    }

    pub fn render_html(&self) -> String {
        let tiles = self.tiles();
        let mut out = String::new();
        if tiles.is_empty() {
            return out;
        }

        if self.loading {
            let _ = writeln!(out, "<h2>Search Terms ({})</h2>", tiles.len());
        } else {
            let _ = writeln!(out, "<h2>Reference Images ({})</h2>", tiles.len());
        }
        out.push_str("<div class=\"collage\">\n");
        for tile in &tiles {
            match tile {
                Tile::Pending { term, image, more } => {
                    // The page walks data-urls when the shown image fails
                    let urls: Vec<String> = self
                        .usable_urls(term)
                        .into_iter()
                        .map(|u| escape_html(u))
                        .collect();
                    let _ = write!(
                        out,
                        "<figure class=\"tile pending\" data-urls=\"{}\">",
                        urls.join(" ")
                    );
                    match image {
                        Some(url) => {
                            let _ = write!(
                                out,
                                "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                                escape_html(url),
                                escape_html(term)
                            );
                        }
                        None => {
                            let _ = write!(
                                out,
                                "<div class=\"spinner\">{}</div>",
                                SEARCHING_PLACEHOLDER
                            );
                        }
                    }
                    let _ = write!(out, "<figcaption>{}", escape_html(term));
                    if *more > 0 {
                        let _ = write!(out, " <span class=\"more\">+{} more</span>", more);
                    }
                    out.push_str("</figcaption></figure>\n");
                }
                Tile::Image {
                    term,
                    description,
                    url,
                } => {
                    let _ = writeln!(
                        out,
                        "<figure class=\"tile\"><a href=\"{url}\" target=\"_blank\" rel=\"noopener\"><img src=\"{url}\" alt=\"{term}\" title=\"{desc}\" loading=\"lazy\"></a><figcaption>{term}</figcaption></figure>",
                        url = escape_html(url),
                        term = escape_html(term),
                        desc = escape_html(description),
                    );
                }
            }
        }
        out.push_str("</div>\n");
        out
    }

    pub fn render_checklist_html(&self) -> String {
        let mut out = String::from("<ol class=\"checklist\">\n");
        for item in &self.checklist {
            let _ = writeln!(
                out,
                "<li class=\"{}\" data-id=\"{}\">{}</li>",
                status_name(item.status),
                escape_html(&item.id),
                escape_html(&item.label)
            );
        }
        out.push_str("</ol>\n");
        out
    }

    /// Standalone page for exporting a finished collage. Images that fail to
    /// load hide themselves.
    pub fn render_document(&self, query: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - refmonster</title>
<style>
body {{ font-family: sans-serif; background: #111; color: #eee; margin: 2rem; }}
.collage {{ columns: 4 240px; column-gap: 12px; }}
.tile {{ break-inside: avoid; margin: 0 0 12px; }}
.tile img {{ width: 100%; border-radius: 6px; display: block; }}
figcaption {{ font-size: 0.8rem; opacity: 0.7; padding-top: 4px; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}<script>
document.querySelectorAll('img').forEach(function (img) {{
  img.addEventListener('error', function () {{ img.closest('figure').remove(); }});
}});
</script>
</body>
</html>
"#,
            title = escape_html(query),
            body = self.render_html(),
        )
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(error) = &self.error {
            let _ = writeln!(out, "Error: {}", error);
            return out;
        }

        let tiles = self.tiles();
        if self.loading {
            if !tiles.is_empty() {
                let _ = writeln!(out, "Search Terms ({})", tiles.len());
            }
        } else {
            let _ = writeln!(out, "Reference Images ({})", tiles.len());
        }
        let mut current: Option<&str> = None;
        for tile in &tiles {
            match tile {
                Tile::Pending { term, image, more } => match image {
                    Some(url) if *more > 0 => {
                        let _ = writeln!(out, "  {} - {} (+{} more)", term, url, more);
                    }
                    Some(url) => {
                        let _ = writeln!(out, "  {} - {}", term, url);
                    }
                    None => {
                        let _ = writeln!(out, "  {} - {}", term, SEARCHING_PLACEHOLDER);
                    }
                },
                Tile::Image {
                    term,
                    description,
                    url,
                } => {
                    if current != Some(term.as_str()) {
                        current = Some(term.as_str());
                        if description.is_empty() {
                            let _ = writeln!(out, "\n{}", term);
                        } else {
                            let _ = writeln!(out, "\n{} ({})", term, description);
                        }
                    }
                    let _ = writeln!(out, "  {}", url);
                }
            }
        }
        out
    }
}

pub fn render_checklist_text(items: &[ChecklistItem]) -> String {
    let mut out = String::new();
    for item in items {
        let mark = match item.status {
            StageStatus::Pending => "[ ]",
            StageStatus::Active => "[~]",
            StageStatus::Completed => "[x]",
        };
        let _ = writeln!(out, "{} {}", mark, item.label);
    }
    out
}

fn status_name(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "pending",
        StageStatus::Active => "active",
        StageStatus::Completed => "completed",
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Checklist, Stage};

    fn started() -> SearchEvent {
        let mut checklist = Checklist::new();
        checklist.start(Stage::Analyze).unwrap();
        SearchEvent::Checklist {
            items: checklist.items().to_vec(),
        }
    }

    fn loading_view() -> CollageView {
        let mut view = CollageView::new();
        view.apply(&started());
        view.apply(&SearchEvent::Terms {
            terms: vec![
                SearchTerm::new("brass gears", "texture"),
                SearchTerm::new("airship deck", "layout"),
            ],
        });
        view
    }

    #[test]
    fn test_loading_tiles_show_placeholder_until_images_arrive() {
        let mut view = loading_view();
        view.apply(&SearchEvent::ImagesFound {
            term: "brass gears".to_string(),
            image_urls: vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()],
        });

        let tiles = view.tiles();
        assert_eq!(
            tiles,
            vec![
                Tile::Pending {
                    term: "brass gears".to_string(),
                    image: Some("https://img/1.jpg".to_string()),
                    more: 1,
                },
                Tile::Pending {
                    term: "airship deck".to_string(),
                    image: None,
                    more: 0,
                },
            ]
        );
        let html = view.render_html();
        assert!(html.contains("+1 more"));
        assert!(html.contains(SEARCHING_PLACEHOLDER));
    }

    #[test]
    fn test_final_tiles_are_result_image_pairs_in_order() {
        let mut view = loading_view();
        view.apply(&SearchEvent::Completed {
            results: vec![
                SearchResult::new("a", "", vec!["https://img/a1".into(), "https://img/a2".into()]),
                SearchResult::new("b", "", vec!["https://img/b1".into()]),
            ],
        });

        assert!(!view.is_loading());
        let urls: Vec<String> = view
            .tiles()
            .into_iter()
            .map(|t| match t {
                Tile::Image { url, .. } => url,
                other => panic!("unexpected tile {:?}", other),
            })
            .collect();
        assert_eq!(urls, vec!["https://img/a1", "https://img/a2", "https://img/b1"]);
        assert!(view.render_html().contains("Reference Images (3)"));
    }

    #[test]
    fn test_failed_urls_are_excluded() {
        let mut view = loading_view();
        view.apply(&SearchEvent::ImagesFound {
            term: "brass gears".to_string(),
            image_urls: vec!["https://img/bad.jpg".to_string(), "https://img/good.jpg".to_string()],
        });
        view.mark_failed("https://img/bad.jpg");
        assert_eq!(
            view.tiles()[0],
            Tile::Pending {
                term: "brass gears".to_string(),
                image: Some("https://img/good.jpg".to_string()),
                more: 0,
            }
        );

        view.apply(&SearchEvent::Completed {
            results: vec![SearchResult::new(
                "brass gears",
                "",
                vec!["https://img/bad.jpg".into(), "https://img/good.jpg".into()],
            )],
        });
        assert_eq!(view.tiles().len(), 1);
    }

    #[test]
    fn test_new_run_clears_previous_collage() {
        let mut view = loading_view();
        view.apply(&SearchEvent::Completed {
            results: vec![SearchResult::new("old", "", vec!["https://img/old".into()])],
        });
        view.apply(&started());
        assert!(view.is_loading());
        assert!(view.tiles().is_empty());
    }

    #[test]
    fn test_failure_surfaces_error() {
        let mut view = loading_view();
        view.apply(&SearchEvent::Failed {
            message: "OPENAI_API_KEY not configured".to_string(),
        });
        assert_eq!(view.error(), Some("OPENAI_API_KEY not configured"));
        assert!(view.render_text().starts_with("Error: OPENAI_API_KEY"));
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
        let mut view = CollageView::new();
        view.apply(&SearchEvent::Completed {
            results: vec![SearchResult::new("<script>", "", vec!["https://img/x".into()])],
        });
        assert!(!view.render_document("q").contains("<script>alert"));
        assert!(view.render_html().contains("&lt;script&gt;"));
    }

    #[test]
    fn test_pending_tile_lists_fallback_urls() {
        let mut view = loading_view();
        view.apply(&SearchEvent::ImagesFound {
            term: "brass gears".to_string(),
            image_urls: vec!["https://img/1.jpg".to_string(), "https://img/2.jpg?a&b".to_string()],
        });
        let html = view.render_html();
        assert!(html.contains(r#"data-urls="https://img/1.jpg https://img/2.jpg?a&amp;b""#));
        assert!(html.contains(r#"<figure class="tile pending" data-urls="">"#));

        view.mark_failed("https://img/1.jpg");
        assert!(view
            .render_html()
            .contains(r#"data-urls="https://img/2.jpg?a&amp;b""#));
    }

    #[test]
    fn test_repeated_term_replaces_earlier_urls() {
        let mut view = loading_view();
        for urls in [vec!["https://img/1.jpg", "https://img/2.jpg"], vec!["https://img/3.jpg"]] {
            view.apply(&SearchEvent::ImagesFound {
                term: "brass gears".to_string(),
                image_urls: urls.into_iter().map(String::from).collect(),
            });
        }
        assert_eq!(
            view.tiles()[0],
            Tile::Pending {
                term: "brass gears".to_string(),
                image: Some("https://img/3.jpg".to_string()),
                more: 0,
            }
        );
    }

    #[test]
    fn test_loading_view_counts_search_terms() {
        let view = loading_view();
        assert!(view.render_html().starts_with("<h2>Search Terms (2)</h2>"));
        assert!(view.render_text().starts_with("Search Terms (2)"));
        assert!(!view.render_html().contains("Reference Images"));
    }

    #[test]
    fn test_checklist_text() {
        let text = render_checklist_text(Checklist::new().items());
        assert!(text.starts_with("[ ] Analyzing query"));
        assert_eq!(text.lines().count(), 4);
    }
}
