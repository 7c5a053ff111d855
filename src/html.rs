//! Web renderer: the same scene the terminal draws, as an HTML fragment.
//!
//! The fragment replaces the page body wholesale on every frame. Tabs carry
//! `data-page` and link rows carry `data-link` so the page script can turn
//! clicks and hovers back into protocol messages.

use chrono::Datelike;

use crate::config::{BIO_WIDTH, VERSION};
use crate::content::{MapArt, HIGHLIGHT_GLYPH};
use crate::state::{Page, Phase};
use crate::ui_state::Scene;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const LABEL_WIDTH: usize = 12;

pub fn render(scene: &Scene) -> String {
    match scene.state.phase {
        Phase::Loading => loading(scene.state.animation_frame),
        Phase::Main => main_screen(scene),
    }
}

/// Escapes text for use in element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn loading(anim_frame: u32) -> String {
    let spinner = SPINNER_FRAMES[anim_frame as usize % SPINNER_FRAMES.len()];
    format!(
        r#"<div class="loading-screen"><span class="spinner">{spinner}</span><span class="loading-text">Initializing</span></div>"#
    )
}

fn main_screen(scene: &Scene) -> String {
    let mut out = String::from(r#"<div class="app">"#);
    if scene.view.chrome_visible() {
        out.push_str(&header(scene));
    }
    out.push_str(r#"<div class="main-content">"#);
    match scene.state.current_page {
        Page::About => out.push_str(&about(scene)),
        Page::Links => out.push_str(&links(scene)),
    }
    out.push_str("</div>");
    if scene.view.chrome_visible() {
        out.push_str(&footer(scene));
    }
    out.push_str("</div>");
    out
}

fn header(scene: &Scene) -> String {
    let tabs: String = Page::ALL
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let active = if index == scene.state.selected_nav_index {
                " active"
            } else {
                ""
            };
            format!(
                r#"<span class="header-tab{active}" data-page="{}">{}</span>"#,
                page.slug(),
                page.title()
            )
        })
        .collect();

    format!(
        r#"<div class="header"><div class="header-tabs">{tabs}</div><div class="header-motto">{}</div></div>"#,
        escape(&scene.content.motto)
    )
}

fn footer(scene: &Scene) -> String {
    let shortcuts = if scene.state.current_page == Page::Links {
        r#"<span class="shortcut-key">tab</span> page  <span class="shortcut-key">↑↓</span> select  <span class="shortcut-key">enter</span> open"#
    } else {
        r#"<span class="shortcut-key">tab</span> page"#
    };
    format!(
        r#"<div class="footer"><span class="footer-version">v{VERSION}</span><span class="footer-shortcuts">{shortcuts}</span><span class="footer-sig"><span class="sig-accent">{}</span> // {}</span></div>"#,
        escape(&scene.content.owner),
        chrono::Local::now().year()
    )
}

fn about(scene: &Scene) -> String {
    let map = &scene.content.map;
    let revealed = scene.state.map_reveal_index.min(map.line_count());

    let mut out = String::from(r#"<div class="about-page"><div class="about-map"><pre class="map-pre">"#);
    for (row, line) in map.lines().into_iter().take(revealed).enumerate() {
        out.push_str(&map_row(map, row, line));
        out.push('\n');
    }
    out.push_str("</pre>");
    if scene.view.location_visible {
        let (row, col) = map.label_anchor;
        out.push_str(&format!(
            r#"<div class="location-label" style="top: calc({row} * 1lh); left: {col}ch">{}</div>"#,
            escape(&map.label)
        ));
    }
    out.push_str("</div>");

    let bio = scene
        .content
        .bio_lines(scene.state.typewriter_index, BIO_WIDTH)
        .iter()
        .map(|line| escape(line))
        .collect::<Vec<_>>()
        .join("\n");
    let cursor = if scene.state.cursor_visible { "visible" } else { "hidden" };
    out.push_str(&format!(
        r#"<div class="about-bio"><pre class="bio-pre">{bio}<span class="cursor {cursor}">█</span></pre></div></div>"#
    ));
    out
}

fn map_row(map: &MapArt, row: usize, line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for (col, ch) in line.chars().enumerate() {
        if map.is_highlight(row, col) {
            out.push_str(&format!(r#"<span class="highlight">{HIGHLIGHT_GLYPH}</span>"#));
        } else {
            out.push_str(&escape(ch.encode_utf8(&mut [0; 4])));
        }
    }
    out
}

fn links(scene: &Scene) -> String {
    let links = &scene.content.links;
    let mut out = String::from(r#"<div class="links-page"><div class="links-box"><div class="links-title">Links</div>"#);

    if links.is_empty() {
        out.push_str(r#"<div class="links-empty">No links configured.</div></div></div>"#);
        return out;
    }

    let selected = scene.state.selected_link_index.min(links.len() - 1);
    out.push_str(r#"<div class="links-list">"#);
    for (index, link) in links.iter().enumerate() {
        let (class, indicator) = if index == selected {
            ("link-row selected", "❯")
        } else {
            ("link-row", "\u{00A0}")
        };
        let pad = LABEL_WIDTH.saturating_sub(link.label.chars().count());
        out.push_str(&format!(
            r#"<a class="{class}" href="{url}" target="_blank" rel="noopener noreferrer" data-link="{index}"><span class="link-indicator">{indicator}</span><span class="link-label">{label}{pad}</span><span class="link-value">{value}</span></a>"#,
            url = escape(&link.url),
            label = escape(&link.label),
            pad = "\u{00A0}".repeat(pad),
            value = escape(&link.value),
        ));
    }
    out.push_str("</div>");

    out.push_str(&format!(
        r#"<div class="links-url">Open: <span class="links-url-value">{}</span></div>"#,
        escape(&links[selected].url)
    ));
    if let Some(flash) = scene.view.flash {
        out.push_str(&format!(r#"<div class="links-flash">{}</div>"#, escape(flash)));
    }
    out.push_str("</div></div>");
    out
}
