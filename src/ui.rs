use chrono::Datelike;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::config::{BIO_WIDTH, VERSION};
use crate::content::{MapArt, HIGHLIGHT_GLYPH};
use crate::state::{Page, Phase};
use crate::theme::{self, Theme, EMBER};
use crate::ui_state::Scene;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// About page: map, gap, bio side by side
const MAP_GAP: u16 = 14;
const MIN_GAP: u16 = 4;
const MIN_BIO_WIDTH: u16 = 16;

// Links page box
const LINKS_WIDTH: u16 = 72;
const LINKS_HEIGHT: u16 = 13;
const LABEL_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
struct Palette {
    bg: Color,
    fg: Color,
    muted: Color,
    accent: Color,
    border: Color,
}

impl Palette {
    fn from_theme(theme: &Theme) -> Self {
        Self {
            bg: theme::color(theme.bg),
            fg: theme::color(theme.fg),
            muted: theme::color(theme.fg_muted),
            accent: theme::color(theme.accent),
            border: theme::color(theme.border),
        }
    }
}

pub fn draw(frame: &mut Frame, scene: &Scene) {
    let palette = Palette::from_theme(&EMBER);
    let area = frame.area();

    // Fill entire background
    let bg = Block::default().style(Style::default().bg(palette.bg).fg(palette.fg));
    frame.render_widget(bg, area);

    match scene.state.phase {
        Phase::Loading => draw_loading(frame, area, scene.state.animation_frame, &palette),
        Phase::Main => draw_main(frame, area, scene, &palette),
    }
}

fn draw_loading(frame: &mut Frame, area: Rect, anim_frame: u32, palette: &Palette) {
    let spinner = SPINNER_FRAMES[anim_frame as usize % SPINNER_FRAMES.len()];
    let line = Line::from(vec![
        Span::styled(spinner, Style::default().fg(palette.accent)),
        Span::raw("  "),
        Span::styled("Initializing", Style::default().fg(palette.muted)),
    ]);

    let row = Rect {
        x: area.x,
        y: area.y + area.height / 2,
        width: area.width,
        height: area.height.min(1),
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), row);
}

fn draw_main(frame: &mut Frame, area: Rect, scene: &Scene, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Page
            Constraint::Length(1), // Footer
        ])
        .split(area);

    if scene.view.chrome_visible() {
        draw_header(frame, chunks[0], scene, palette);
        draw_footer(frame, chunks[2], scene, palette);
    }

    match scene.state.current_page {
        Page::About => draw_about(frame, chunks[1], scene, palette),
        Page::Links => draw_links(frame, chunks[1], scene, palette),
    }
}

fn draw_header(frame: &mut Frame, area: Rect, scene: &Scene, palette: &Palette) {
    if area.height < 2 {
        return;
    }
    let row = Rect {
        x: area.x.saturating_add(2),
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: 1,
    }
    .intersection(area);

    let mut tabs = Vec::new();
    for (index, page) in Page::ALL.iter().enumerate() {
        let color = if index == scene.state.selected_nav_index {
            palette.accent
        } else {
            palette.muted
        };
        tabs.push(Span::styled(page.title(), Style::default().fg(color)));
        tabs.push(Span::raw("   "));
    }
    frame.render_widget(Paragraph::new(Line::from(tabs)), row);

    let motto = shimmer(&scene.content.motto, scene.state.animation_frame, palette);
    frame.render_widget(Paragraph::new(Line::from(motto)).alignment(Alignment::Right), row);
}

/// A soft highlight sweeping left to right across the text.
fn shimmer(text: &str, anim_frame: u32, palette: &Palette) -> Vec<Span<'static>> {
    let len = text.chars().count() as f64;
    let head = (anim_frame as f64 / 2.0) % (len + 12.0);

    text.chars()
        .enumerate()
        .map(|(index, ch)| {
            let distance = (index as f64 - head).abs();
            let t = (1.0 - distance / 4.0).max(0.0) * 0.6;
            Span::styled(
                ch.to_string(),
                Style::default().fg(blend(palette.accent, palette.fg, t)),
            )
        })
        .collect()
}

fn blend(from: Color, to: Color, t: f64) -> Color {
    match (from, to) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ => from,
    }
}

fn draw_footer(frame: &mut Frame, area: Rect, scene: &Scene, palette: &Palette) {
    let row = Rect {
        x: area.x.saturating_add(2),
        y: area.y,
        width: area.width.saturating_sub(4),
        height: area.height.min(1),
    }
    .intersection(area);

    let muted = Style::default().fg(palette.muted);
    let key = |text: &'static str| Span::styled(text, Style::default().fg(palette.accent));
    let label = |text: &'static str| Span::styled(text, muted);

    let version = Paragraph::new(format!("v{VERSION}")).style(muted);
    frame.render_widget(version, row);

    let mut shortcuts = vec![key("tab"), label(" page  ")];
    if scene.state.current_page == Page::Links {
        shortcuts.extend([
            key("↑↓"),
            label(" select  "),
            key("enter/space"),
            label(" open  "),
        ]);
    }
    shortcuts.extend([key("q"), label(" quit")]);
    frame.render_widget(
        Paragraph::new(Line::from(shortcuts)).alignment(Alignment::Center),
        row,
    );

    let signature = Line::from(vec![
        Span::styled(scene.content.owner.clone(), Style::default().fg(palette.accent)),
        Span::styled(format!(" // {}", chrono::Local::now().year()), muted),
    ]);
    frame.render_widget(Paragraph::new(signature).alignment(Alignment::Right), row);
}

fn draw_about(frame: &mut Frame, area: Rect, scene: &Scene, palette: &Palette) {
    let map = &scene.content.map;
    let map_width = map.width() as u16 + 2;
    let map_height = map.line_count() as u16;

    // Narrow terminals lose the gap first, then bio width
    let spare = area.width.saturating_sub(map_width);
    let gap = MAP_GAP
        .min(spare.saturating_sub(BIO_WIDTH as u16))
        .max(MIN_GAP);
    let bio_width = (BIO_WIDTH as u16)
        .min(spare.saturating_sub(gap))
        .max(MIN_BIO_WIDTH);

    let total_width = map_width + gap + bio_width;
    let total_height = map_height + 3;
    let origin_x = area.x + area.width.saturating_sub(total_width) / 2;
    let origin_y = area.y + area.height.saturating_sub(total_height) / 2;

    // Map, one more line per reveal tick
    let revealed = scene.state.map_reveal_index.min(map.line_count());
    let lines: Vec<Line> = map
        .lines()
        .into_iter()
        .take(revealed)
        .enumerate()
        .map(|(row, text)| map_line(map, row, text, palette))
        .collect();
    let map_area = Rect {
        x: origin_x,
        y: origin_y,
        width: map_width,
        height: map_height,
    }
    .intersection(area);
    frame.render_widget(Paragraph::new(lines), map_area);

    if scene.view.location_visible {
        let (row, col) = map.label_anchor;
        let label_area = Rect {
            x: origin_x.saturating_add(col),
            y: origin_y.saturating_add(row),
            width: map.label.width() as u16,
            height: 1,
        }
        .intersection(area);
        let label = Paragraph::new(map.label.as_str()).style(Style::default().fg(palette.accent));
        frame.render_widget(label, label_area);
    }

    // Bio, centred against the fully revealed height so it never jumps
    let width = bio_width as usize;
    let full_height = scene.content.bio_lines(usize::MAX, width).len() as u16;
    let mut lines: Vec<Line> = scene
        .content
        .bio_lines(scene.state.typewriter_index, width)
        .into_iter()
        .map(|text| Line::from(Span::styled(text, Style::default().fg(palette.fg))))
        .collect();

    let cursor = if scene.state.cursor_visible { "█" } else { " " };
    let cursor = Span::styled(cursor, Style::default().fg(palette.accent));
    match lines.last_mut() {
        Some(last) => last.spans.push(cursor),
        None => lines.push(Line::from(cursor)),
    }

    let bio_area = Rect {
        x: origin_x + map_width + gap,
        y: origin_y + map_height.saturating_sub(full_height) / 2,
        width: bio_width + 1,
        height: full_height.max(1),
    }
    .intersection(area);
    frame.render_widget(Paragraph::new(lines), bio_area);
}

/// One map row with highlight cells replaced by a solid braille block.
fn map_line(map: &MapArt, row: usize, text: &str, palette: &Palette) -> Line<'static> {
    let plain = Style::default().fg(palette.fg);
    let mut spans = Vec::new();
    let mut run = String::new();

    for (col, ch) in text.chars().enumerate() {
        if map.is_highlight(row, col) {
            if !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), plain));
            }
            spans.push(Span::styled(
                HIGHLIGHT_GLYPH.to_string(),
                Style::default().fg(palette.accent),
            ));
        } else {
            run.push(ch);
        }
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, plain));
    }
    Line::from(spans)
}

fn draw_links(frame: &mut Frame, area: Rect, scene: &Scene, palette: &Palette) {
    let rect = centered(area, LINKS_WIDTH, LINKS_HEIGHT);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .padding(Padding::new(2, 0, 1, 0));

    let body = Paragraph::new(link_lines(scene, palette)).block(block);
    frame.render_widget(body, rect);
}

fn link_lines(scene: &Scene, palette: &Palette) -> Vec<Line<'static>> {
    let fg = Style::default().fg(palette.fg);
    let muted = Style::default().fg(palette.muted);
    let accent = Style::default().fg(palette.accent);

    let links = &scene.content.links;
    let title = Line::from(Span::styled("Links", accent.add_modifier(Modifier::BOLD)));
    if links.is_empty() {
        return vec![
            title,
            Line::default(),
            Line::from(Span::styled("No links configured.", muted)),
        ];
    }

    let selected = scene.state.selected_link_index.min(links.len() - 1);
    let mut lines = vec![title, Line::default()];
    for (index, link) in links.iter().enumerate() {
        let label = format!("{:<width$}", link.label, width = LABEL_WIDTH);
        let line = if index == selected {
            Line::from(vec![
                Span::styled("❯ ", accent),
                Span::styled(label, accent.add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(link.value.clone(), fg),
            ])
        } else {
            Line::from(vec![
                Span::raw("  "),
                Span::styled(label, fg),
                Span::raw(" "),
                Span::styled(link.value.clone(), muted),
            ])
        };
        lines.push(line);
    }

    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("Open:", muted),
        Span::raw(" "),
        Span::styled(links[selected].url.clone(), accent),
    ]));

    if let Some(flash) = scene.view.flash {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(flash, accent)));
    }
    lines
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Content, Link};
    use crate::state::AppState;
    use crate::ui_state::{Chrome, View};
    use ratatui::{backend::TestBackend, Terminal};

    fn content() -> Content {
        Content {
            owner: "Tester".to_string(),
            motto: "[motto]".to_string(),
            bio: "hello".to_string(),
            map: MapArt {
                art: "ab\ncd".to_string(),
                highlights: vec![(1, 0)],
                label: "[Home]".to_string(),
                label_anchor: (0, 3),
            },
            links: vec![
                Link::new("One", "one", "https://one.example"),
                Link::new("Two", "two", "https://two.example"),
            ],
        }
    }

    fn main_state() -> AppState {
        AppState {
            phase: Phase::Main,
            ..AppState::default()
        }
    }

    fn render(state: &AppState, view: &View, content: &Content) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let scene = Scene {
            state,
            view,
            content,
        };
        terminal.draw(|frame| draw(frame, &scene)).unwrap();
        terminal
    }

    fn text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_loading_screen_spinner() {
        let state = AppState {
            animation_frame: 3,
            ..AppState::default()
        };
        let screen = text(&render(&state, &View::default(), &content()));
        assert!(screen.contains("⠸  Initializing"));
        assert!(!screen.contains("About"));
    }

    #[test]
    fn test_chrome_hidden_until_revealed() {
        let content = content();
        let hidden = text(&render(&main_state(), &View::default(), &content));
        assert!(!hidden.contains(&format!("v{VERSION}")));
        assert!(!hidden.contains("About"));

        let view = View {
            chrome: Chrome::Visible,
            ..View::default()
        };
        let shown = text(&render(&main_state(), &view, &content));
        assert!(shown.contains(&format!("v{VERSION}")));
        assert!(shown.contains("About"));
        assert!(shown.contains("[motto]"));
        assert!(shown.contains("tab page"));
        assert!(shown.contains("q quit"));
        assert!(!shown.contains("select"));
        assert!(shown.contains("Tester // "));
    }

    #[test]
    fn test_map_reveal_and_highlight() {
        let content = content();
        let mut state = main_state();
        state.map_reveal_index = 1;
        let partial = text(&render(&state, &View::default(), &content));
        assert!(partial.contains("ab"));
        assert!(!partial.contains(HIGHLIGHT_GLYPH));

        state.map_reveal_index = 2;
        let view = View {
            location_visible: true,
            ..View::default()
        };
        let terminal = render(&state, &view, &content);
        let buffer = terminal.backend().buffer();
        let glyph = buffer
            .content()
            .iter()
            .find(|cell| cell.symbol() == HIGHLIGHT_GLYPH.to_string())
            .expect("highlight drawn");
        assert_eq!(glyph.fg, theme::color(EMBER.accent));
        assert!(text(&terminal).contains("[Home]"));
    }

    #[test]
    fn test_location_label_waits_for_full_map() {
        let mut state = main_state();
        state.map_reveal_index = 2;
        let screen = text(&render(&state, &View::default(), &content()));
        assert!(!screen.contains("[Home]"));
    }

    #[test]
    fn test_bio_typewriter_and_cursor() {
        let mut state = main_state();
        state.typewriter_index = 2;
        let screen = text(&render(&state, &View::default(), &content()));
        assert!(screen.contains("• he█"));
        assert!(!screen.contains("hel"));

        state.cursor_visible = false;
        let screen = text(&render(&state, &View::default(), &content()));
        assert!(!screen.contains('█'));
    }

    #[test]
    fn test_links_page_selection_and_flash() {
        let mut state = main_state();
        state.current_page = Page::Links;
        state.selected_nav_index = 1;
        state.selected_link_index = 1;
        let view = View {
            chrome: Chrome::Visible,
            navigation_enabled: true,
            flash: Some("Copied to clipboard"),
            ..View::default()
        };
        let screen = text(&render(&state, &view, &content()));
        assert!(screen.contains("❯ Two"));
        assert!(screen.contains("  One"));
        assert!(screen.contains("Open: https://two.example"));
        assert!(screen.contains("Copied to clipboard"));
        assert!(screen.contains("enter/space open"));
    }

    #[test]
    fn test_links_page_empty() {
        let mut state = main_state();
        state.current_page = Page::Links;
        let content = Content {
            links: Vec::new(),
            ..content()
        };
        let screen = text(&render(&state, &View::default(), &content));
        assert!(screen.contains("No links configured."));
        assert!(!screen.contains("Open:"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(3, 2)).unwrap();
        let content = content();
        let mut state = main_state();
        state.map_reveal_index = 2;
        let view = View {
            chrome: Chrome::Visible,
            location_visible: true,
            ..View::default()
        };
        let scene = Scene {
            state: &state,
            view: &view,
            content: &content,
        };
        terminal.draw(|frame| draw(frame, &scene)).unwrap();
    }
}
