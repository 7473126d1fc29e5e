//! Reading graphs from DOT or JSON and writing detection results.

pub mod dot;
pub mod json;

use crate::detect::Clusters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Dot,
}

/// Picks the input format: file extension first, then a content sniff
/// (JSON starts with `{` or `[`, DOT with an optionally-strict
/// graph/digraph header). `None` means the format is unknown.
pub fn sniff_format(path: Option<&std::path::Path>, content: &str) -> Option<InputFormat> {
    if let Some(extension) = path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        match extension.to_ascii_lowercase().as_str() {
            "json" => return Some(InputFormat::Json),
            "dot" | "gv" => return Some(InputFormat::Dot),
            _ => {}
        }
    }
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(InputFormat::Json);
    }
    if looks_like_dot(trimmed) {
        return Some(InputFormat::Dot);
    }
    None
}

fn looks_like_dot(text: &str) -> bool {
    let text = match text.strip_prefix("strict") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => text,
    };
    for keyword in ["digraph", "graph"] {
        if let Some(rest) = text.strip_prefix(keyword) {
            return rest
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric() && c != '_');
        }
    }
    false
}

/// CSV rendering of a membership, one row per node in input order.
pub fn membership_csv(clusters: &Clusters) -> String {
    let mut out = String::from("nodeId,communityId\n");
    for (id, &community) in clusters.node_ids().iter().zip(clusters.membership()) {
        out.push_str(id);
        out.push(',');
        out.push_str(&community.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn extension_wins_over_content() {
        let format = sniff_format(Some(Path::new("g.json")), "graph {}");
        assert_eq!(format, Some(InputFormat::Json));
    }

    #[test]
    fn content_sniffing_recognizes_both_formats() {
        assert_eq!(sniff_format(None, "  {\"links\": []}"), Some(InputFormat::Json));
        assert_eq!(sniff_format(None, "[{\"source\": 1}]"), Some(InputFormat::Json));
        assert_eq!(sniff_format(None, "strict digraph g {}"), Some(InputFormat::Dot));
        assert_eq!(sniff_format(None, "graph {}"), Some(InputFormat::Dot));
        assert_eq!(sniff_format(None, "graphite {}"), None);
        assert_eq!(sniff_format(None, "strictgraph {}"), None);
        assert_eq!(sniff_format(None, "nodes: 1 2 3"), None);
    }
}
