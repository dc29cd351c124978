//! Prompt text and output schemas for the three model tasks.

use serde_json::json;

use crate::gateway::OutputSchema;

/// Queries offered when the user has not typed anything yet.
pub const SUGGESTIONS: &[&str] = &[
    "mistborn era 2",
    "cyberpunk street samurai",
    "steampunk airship",
    "medieval castle interior",
    "fantasy tavern",
    "sci-fi spaceship cockpit",
];

pub const TERMS_SYSTEM: &str = "You are an expert reference researcher. When given an art reference query, break it down into 8-15 highly specific, visually-focused search terms that would help find relevant reference images.";

pub fn terms_user(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Generate specific search terms for finding visual references. Return ONLY JSON in this exact format:
{{
  "terms": [
    {{
      "term": "specific search term",
      "description": "why this term is relevant"
    }}
  ]
}}

Rules:
- Generate 8-15 specific search terms
- Focus on visual elements: objects, characters, settings, clothing, weapons, architecture
- Make terms searchable and concrete
- Each term should be 1-4 words
- Return ONLY the JSON, no other text"#
    )
}

pub const IMAGES_SYSTEM: &str = "You are an expert image researcher with access to web_search. Your task is to find high-quality, relevant images for a given search term.";

pub fn images_user(term: &str) -> String {
    format!(
        r#"Search term: "{term}"

Use the web_search tool to find 1 high-quality image for this term. Return ONLY JSON in this exact format:
{{
  "imageUrls": ["https://domain/path/image.jpg"]
}}

Rules:
- Use web_search to find actual images
- Only include direct image URLs (ending in .jpg, .png, .jpeg, .webp or served from known image CDNs)
- Find just 1 high-quality image
- Prioritize authoritative sources (museums, manufacturer sites, specialist publications)
- Exclude Pinterest, AI-generated images, watermarked stock photos
- Return ONLY the JSON, no other text"#
    )
}

pub const AGGREGATE_SYSTEM: &str = "You are an expert reference researcher with access to the web_search tool. When given an art reference query you must:
1. Break the query into 8-15 highly relevant visual search terms
2. For every search term, call the web_search tool to gather real image URLs (jpg, png, jpeg, or webp) from reputable sources
3. Only return URLs that point directly to image files or CDN-backed assets (no HTML pages, thumbnails, AI-generated images, or placeholders)
4. Provide 3-6 distinct image URLs per term, prioritising authoritative sources
5. Respond exclusively as JSON using the required schema";

pub fn aggregate_user(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Return JSON with this structure:
{{
  "results": [
    {{
      "term": "descriptive search term",
      "description": "short explanation of why the images matter",
      "imageUrls": ["https://domain/path/image.jpg"]
    }}
  ]
}}

Rules:
- Use the web_search tool for every search term before you respond
- Do not fabricate links; every URL must end with an image extension or carry recognised image CDN parameters
- Supply at least six total results and prioritise authoritative sources (museums, manufacturer archives, specialist publications, reputable blogs)
- Exclude Pinterest, wallpaper scrapers, stock watermarks, and AI-generated assets"#
    )
}

pub fn terms_schema() -> OutputSchema {
    OutputSchema {
        name: "search_terms",
        schema: json!({
            "type": "object",
            "properties": {
                "terms": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "term": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["term", "description"]
                    }
                }
            },
            "required": ["terms"]
        }),
    }
}

pub fn images_schema() -> OutputSchema {
    OutputSchema {
        name: "image_urls",
        schema: json!({
            "type": "object",
            "properties": {
                "imageUrls": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["imageUrls"]
        }),
    }
}

pub fn aggregate_schema() -> OutputSchema {
    OutputSchema {
        name: "reference_results",
        schema: json!({
            "type": "object",
            "properties": {
                "results": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "term": { "type": "string" },
                            "description": { "type": "string" },
                            "imageUrls": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["term", "description", "imageUrls"]
                    }
                }
            },
            "required": ["results"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompts_embed_input() {
        assert!(terms_user("fantasy tavern").starts_with("Query: \"fantasy tavern\""));
        assert!(images_user("tavern sign").contains("Search term: \"tavern sign\""));
        assert!(aggregate_user("airship").contains("\"results\""));
    }

    #[test]
    fn test_prompts_name_required_keys() {
        assert!(terms_user("q").contains("\"terms\""));
        assert!(images_user("t").contains("\"imageUrls\""));
        assert_eq!(terms_schema().schema["required"][0], "terms");
        assert_eq!(images_schema().schema["required"][0], "imageUrls");
        assert_eq!(aggregate_schema().schema["required"][0], "results");
    }
}
