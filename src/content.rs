//! Static portfolio content: bio, map art and links.
//!
//! A built-in sample ships with the binary; operators replace any part of it
//! with a JSON file passed via `--content`. Omitted fields keep their
//! built-in values.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::state::RevealLimits;

const BULLET: &str = "\u{2022} ";
const INDENT: &str = "  ";

/// Drawn over every highlighted map cell.
pub const HIGHLIGHT_GLYPH: char = '\u{28FF}';

// UK dotted map, braille encoded: each cell packs a 2x4 dot grid.
const UK_MAP: &str = "                      ⢰⠶
                  ⣄ ⡀⣠⣈
            ⢠⣴⠃  ⢸⣿⣿⣿⣿⠟
            ⠨⠌  ⣤⣽⣿⣿⣿⡋
           ⡟ ⢴⡇ ⣿⣿⣿⣿⣯⣴⣾⣿⣿⣿⡿⠆
          ⠠⠁ ⢠⡋⠃⣼⣿⣿⣿⣿⣿⣿⣿⣿⣿⠃
             ⠄⡐⠾⠿⣿⣿⣿⣿⣿⣿⣿⣿⠛
            ⠉ ⠜⠃⢠⣿⣿⣿⣿⣿⣿⣥⡦
             ⢠⣴⠎⢹⢛⢹⣿⣿⣿⣴⣤⣶⣦⣄
          ⢀  ⠈⠃⣠⠟⡦⢘⣻⣿⣿⣿⣿⣿⣿⣿⣷⡄
       ⢰⣶⣾⣿⣧⣴⣶⡄⠈⠁⢀⣾⣿⣿⣿⠿⣿⣿⣿⣿⣿⣇
      ⠐⠞⣿⣿⣿⣿⣿⣿⣿⣧ ⠘⠙⠋⠈⠋⣠⣾⣿⣿⣿⣿⣿⡆⢀
  ⢦⣦⣦⣄⣴⣾⣿⣿⣿⣿⣿⣿⣿⠧⡀  ⡀  ⠻⣿⣿⣿⣿⣿⣿⣿⣿⣷⣀
  ⢙⣹⣿⣿⣿⣿⣿⣿⣿⣿⣿⣏⠋   ⠘     ⣸⣿⣿⣿⣿⣿⣿⣿⣿⡄
  ⠿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⠄     ⡀   ⠿⣿⣿⣿⣿⣿⣿⣿⣿⣧
   ⢠⣴⣿⣿⣿⣿⣿⣿⣿⣿⣿⡄    ⠉⣃⣴⣶⣾⣷⣿⣿⣿⣿⣿⣿⣿⣿⣿⠟ ⡀
  ⢠⣾⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⠃   ⠐⠛⠻⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣦⣼⣿⣿⣷⣆
⠴⠤⣿⣿⣿⣿⣿⣿⣿⣿⣿⡿⢿⡋      ⢀⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡏
⠚⢷⡿⣿⣿⣿⡟⠿⠛⠁       ⣠⣶⣶⣾⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⠿⡏⠁
⠈⠁⠐⠙⠙⠋           ⠘⠛⠉⠻⠿⢿⣿⡿⢿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡏⠓⢀⡀
                    ⢀⣴⣤⣀⣰⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡿⠃
                   ⣹⣾⣿⣿⣿⡿⠿⣿⣿⡿⠿⠛⠛⠟⠛⠋⠻⠋⠁
                ⢀⣰⡿⣿⠿⢿⡏⠁    ⠁
               ⠚⠙⠏";

const SAMPLE_BIO: &str = "Building small, sharp tools for people who live in the terminal.
Writing about systems, latency and the craft of shipping software.
Previously I have also:
Led a platform team through a zero-downtime database migration.
Taught an evening course on networking fundamentals.
Run a meetup for local open-source contributors.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub value: String,
    pub url: String,
}

impl Link {
    pub fn new(label: &str, value: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapArt {
    pub art: String,
    /// (row, column) cells drawn as a solid accent block
    pub highlights: Vec<(usize, usize)>,
    /// Shown next to the highlight once the whole map is revealed
    pub label: String,
    /// (row, column) of the label, relative to the map's top-left corner
    pub label_anchor: (u16, u16),
}

impl Default for MapArt {
    fn default() -> Self {
        Self {
            art: UK_MAP.to_string(),
            highlights: vec![(14, 26), (14, 27)],
            label: "[Manchester]".to_string(),
            label_anchor: (11, 33),
        }
    }
}

impl MapArt {
    pub fn lines(&self) -> Vec<&str> {
        self.art.lines().collect()
    }

    pub fn line_count(&self) -> usize {
        self.art.lines().count()
    }

    pub fn is_highlight(&self, row: usize, col: usize) -> bool {
        self.highlights.contains(&(row, col))
    }

    /// Widest line in terminal cells.
    pub fn width(&self) -> usize {
        self.art.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub owner: String,
    pub motto: String,
    pub bio: String,
    pub map: MapArt,
    pub links: Vec<Link>,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            owner: "Alex Rowan".to_string(),
            motto: "[1.01\u{00B3}\u{2076}\u{2075} = 37.8]  >  [0.99\u{00B3}\u{2076}\u{2075} = 0.03]"
                .to_string(),
            bio: SAMPLE_BIO.to_string(),
            map: MapArt::default(),
            links: vec![
                Link::new("Website", "example.com", "https://example.com"),
                Link::new("X", "@example", "https://x.com/example"),
                Link::new("GitHub", "@example", "https://github.com/example"),
                Link::new("LinkedIn", "/in/example", "https://www.linkedin.com/in/example"),
            ],
        }
    }
}

impl Content {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading content file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing content file {}", path.display()))
    }

    /// Bio length in characters; the typewriter counts characters, not bytes.
    pub fn bio_len(&self) -> usize {
        self.bio.chars().count()
    }

    pub fn limits(&self) -> RevealLimits {
        RevealLimits {
            bio_len: self.bio_len(),
            map_lines: self.map.line_count(),
            link_count: self.links.len(),
        }
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    /// The first `visible` characters of the bio, laid out as bullet lines
    /// wrapped to `width` columns.
    pub fn bio_lines(&self, visible: usize, width: usize) -> Vec<String> {
        let shown: String = self.bio.chars().take(visible).collect();
        let full: Vec<&str> = self.bio.split('\n').collect();

        let mut out = Vec::new();
        for (index, line) in shown.split('\n').enumerate() {
            if line.trim().is_empty() {
                out.push(String::new());
                continue;
            }
            let heading = full
                .get(index)
                .map(|l| l.trim_end().ends_with(':'))
                .unwrap_or(false);
            let text = if heading {
                line.trim().to_string()
            } else {
                format!("{BULLET}{line}")
            };
            out.extend(wrap_line(&text, width));
        }
        out
    }
}

/// Word wrap with a hanging indent on continuation lines.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.width() <= width {
        return vec![line.to_string()];
    }

    let mut result = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if candidate.width() > width && !current.is_empty() {
            result.push(std::mem::replace(&mut current, format!("{INDENT}{word}")));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_with_bio(bio: &str) -> Content {
        Content {
            bio: bio.to_string(),
            ..Content::default()
        }
    }

    #[test]
    fn test_builtin_map_shape() {
        let map = MapArt::default();
        assert_eq!(map.line_count(), 24);
        assert!(map.is_highlight(14, 26));
        assert!(map.is_highlight(14, 27));
        assert!(!map.is_highlight(0, 0));
        assert!(map.width() <= 42);
    }

    #[test]
    fn test_limits_follow_content() {
        let content = content_with_bio("héllo");
        let limits = content.limits();
        assert_eq!(limits.bio_len, 5);
        assert_eq!(limits.map_lines, 24);
        assert_eq!(limits.link_count, 4);
    }

    #[test]
    fn test_bio_lines_bullets_and_headings() {
        let content = content_with_bio("First point\nPreviously I have also:\nSecond point");
        let lines = content.bio_lines(usize::MAX, 50);
        assert_eq!(
            lines,
            vec![
                "\u{2022} First point".to_string(),
                "Previously I have also:".to_string(),
                "\u{2022} Second point".to_string(),
            ]
        );
    }

    #[test]
    fn test_bio_lines_partial_reveal() {
        let content = content_with_bio("Alpha\nBeta");
        assert!(content.bio_lines(0, 50).iter().all(|l| l.is_empty()));
        assert_eq!(content.bio_lines(3, 50), vec!["\u{2022} Alp".to_string()]);
        assert_eq!(
            content.bio_lines(6, 50),
            vec!["\u{2022} Alpha".to_string(), String::new()]
        );
    }

    #[test]
    fn test_partial_heading_keeps_heading_style() {
        let content = content_with_bio("Previously:\nmore");
        assert_eq!(content.bio_lines(4, 50), vec!["Prev".to_string()]);
    }

    #[test]
    fn test_wrap_line_hanging_indent() {
        let wrapped = wrap_line("\u{2022} one two three four", 12);
        assert_eq!(
            wrapped,
            vec![
                "\u{2022} one two".to_string(),
                "  three four".to_string(),
            ]
        );
        for line in &wrapped {
            assert!(line.width() <= 12);
        }
    }

    #[test]
    fn test_wrap_line_keeps_overlong_word() {
        let wrapped = wrap_line("supercalifragilistic", 5);
        assert_eq!(wrapped, vec!["supercalifragilistic".to_string()]);
    }

    #[test]
    fn test_content_json_defaults() {
        let content: Content = serde_json::from_str(r#"{"owner": "Sam"}"#).unwrap();
        assert_eq!(content.owner, "Sam");
        assert_eq!(content.links, Content::default().links);
        assert_eq!(content.map.line_count(), 24);
    }

    #[test]
    fn test_content_json_links_and_highlights() {
        let json = r#"{
            "links": [{"label": "Mail", "value": "me@x.io", "url": "mailto:me@x.io"}],
            "map": {"art": "ab\ncd", "highlights": [[1, 0]]}
        }"#;
        let content: Content = serde_json::from_str(json).unwrap();
        assert_eq!(content.links.len(), 1);
        assert_eq!(content.links[0].url, "mailto:me@x.io");
        assert_eq!(content.map.line_count(), 2);
        assert!(content.map.is_highlight(1, 0));
        assert_eq!(content.map.label, "[Manchester]");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = Content::load(Path::new("/nonexistent/termfolio.json")).unwrap_err();
        assert!(err.to_string().contains("reading content file"));
    }
}
