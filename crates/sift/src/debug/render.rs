//! Text rendering of a debug tree.

use std::fmt::Write;
use std::time::Duration;

use console::Style;

use super::{DebugKind, DebugNode, DebugStats};
use crate::config::FilterConfig;
use crate::value::display;

/// What the rendered tree shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Show node kinds and literal values.
    pub verbose: bool,
    /// Append per-node elapsed time.
    pub show_timings: bool,
    /// Emit ANSI styling regardless of terminal detection.
    pub colorize: bool,
}

impl RenderOptions {
    pub fn from_config(config: &FilterConfig) -> Self {
        RenderOptions {
            verbose: config.verbose,
            show_timings: config.show_timings,
            colorize: config.colorize,
        }
    }
}

struct Palette {
    logical: Style,
    field: Style,
    hit: Style,
    miss: Style,
    muted: Style,
}

impl Palette {
    fn new() -> Self {
        Palette {
            logical: Style::new().bold().force_styling(true),
            field: Style::new().cyan().force_styling(true),
            hit: Style::new().green().force_styling(true),
            miss: Style::new().red().force_styling(true),
            muted: Style::new().dim().force_styling(true),
        }
    }
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    palette: Option<Palette>,
    out: String,
}

impl Renderer<'_> {
    fn paint(&self, pick: fn(&Palette) -> &Style, text: &str) -> String {
        match &self.palette {
            Some(palette) => pick(palette).apply_to(text).to_string(),
            None => text.to_string(),
        }
    }

    fn node(&mut self, node: &DebugNode, prefix: &str, connector: &str, child_prefix: &str) {
        let label = match node.kind {
            DebugKind::Logical => self.paint(|p| &p.logical, &node.label),
            DebugKind::Field => self.paint(|p| &p.field, &node.label),
            _ => node.label.clone(),
        };
        let mut line = format!("{}{}{}", prefix, connector, label);
        if self.options.verbose {
            if let Some(value) = &node.value {
                let _ = write!(line, " {}", display(value));
            }
            let kind = format!("[{}]", node.kind.as_str());
            let _ = write!(line, " {}", self.paint(|p| &p.muted, &kind));
        }
        let counts = format!("{}/{}", node.matched, node.total);
        let counts = if node.matched > 0 {
            self.paint(|p| &p.hit, &counts)
        } else {
            self.paint(|p| &p.miss, &counts)
        };
        let _ = write!(line, "  {} ({})", counts, percent(node.matched, node.total));
        if self.options.show_timings {
            let _ = write!(line, " {}", self.paint(|p| &p.muted, &millis(node.elapsed)));
        }
        self.out.push_str(&line);
        self.out.push('\n');

        let nested = format!("{}{}", prefix, child_prefix);
        let last = node.children.len().saturating_sub(1);
        for (i, child) in node.children.iter().enumerate() {
            if i == last {
                self.node(child, &nested, "└── ", "    ");
            } else {
                self.node(child, &nested, "├── ", "│   ");
            }
        }
    }
}

fn percent(matched: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", matched as f64 * 100.0 / total as f64)
}

fn millis(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Renders `tree` followed by a one-line summary.
pub fn render(tree: &DebugNode, stats: &DebugStats, options: &RenderOptions) -> String {
    let mut renderer = Renderer {
        options,
        palette: options.colorize.then(Palette::new),
        out: String::new(),
    };
    renderer.node(tree, "", "", "");
    let mut summary = format!(
        "matched {} of {} items ({:.1}%), {} conditions evaluated",
        stats.matched, stats.total, stats.percentage, stats.conditions_evaluated
    );
    if options.show_timings {
        let _ = write!(summary, " in {}", millis(stats.elapsed));
    }
    renderer.out.push_str(&summary);
    renderer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(label: &str, matched: usize, total: usize) -> DebugNode {
        DebugNode {
            kind: DebugKind::Comparison,
            label: label.to_string(),
            field: None,
            value: Some(json!(35)),
            children: Vec::new(),
            matched,
            total,
            elapsed: Duration::from_micros(1500),
        }
    }

    fn tree() -> (DebugNode, DebugStats) {
        let field = DebugNode {
            kind: DebugKind::Field,
            label: "value".to_string(),
            field: Some("value".to_string()),
            children: vec![leaf("$gt", 1, 5)],
            ..leaf("", 1, 5)
        };
        let root = DebugNode {
            kind: DebugKind::Logical,
            label: "OR".to_string(),
            value: None,
            children: vec![field, leaf("matches", 0, 5)],
            ..leaf("", 1, 5)
        };
        let stats = DebugStats {
            matched: 1,
            total: 5,
            percentage: 20.0,
            elapsed: Duration::from_millis(2),
            conditions_evaluated: 10,
        };
        (root, stats)
    }

    #[test]
    fn plain_render() {
        let (root, stats) = tree();
        let out = render(&root, &stats, &RenderOptions::default());
        let expected = "\
OR  1/5 (20.0%)
├── value  1/5 (20.0%)
│   └── $gt  1/5 (20.0%)
└── matches  0/5 (0.0%)
matched 1 of 5 items (20.0%), 10 conditions evaluated";
        assert_eq!(out, expected);
    }

    #[test]
    fn verbose_and_timings() {
        let (root, stats) = tree();
        let options = RenderOptions {
            verbose: true,
            show_timings: true,
            colorize: false,
        };
        let out = render(&root, &stats, &options);
        assert!(out.contains("$gt 35 [comparison]"));
        assert!(out.contains("1.500ms"));
        assert!(out.ends_with("in 2.000ms"));
    }

    #[test]
    fn colorize_emits_ansi() {
        let (root, stats) = tree();
        let plain = render(&root, &stats, &RenderOptions::default());
        let colored = render(
            &root,
            &stats,
            &RenderOptions {
                colorize: true,
                ..RenderOptions::default()
            },
        );
        assert!(!plain.contains('\u{1b}'));
        assert!(colored.contains('\u{1b}'));
        assert!(console::strip_ansi_codes(&colored).contains("OR  1/5"));
    }
}
