//! Markdown rendering of reconstructed pages

use crate::pdf::layout::{is_paragraph_break, line_text, LayoutConfig, LineInfo, PageLayout};

const H1_RATIO: f32 = 1.6;
const H2_RATIO: f32 = 1.25;
const BULLETS: [char; 5] = ['•', '◦', '▪', '‣', '–'];
const PAGE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, PartialEq)]
enum Block {
    Heading(usize, String),
    ListItem(String),
    Paragraph(String),
}

/// Median line height over the whole document (body text size)
fn body_height(pages: &[PageLayout]) -> f32 {
    let mut heights: Vec<f32> = pages
        .iter()
        .flat_map(|p| p.lines.iter())
        .filter(|l| l.avg_height > 0.0)
        .map(|l| l.avg_height)
        .collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    heights[heights.len() / 2]
}

fn heading_level(line: &LineInfo, body: f32) -> Option<usize> {
    if body <= 0.0 {
        return None;
    }
    let ratio = line.avg_height / body;
    if ratio >= H1_RATIO {
        Some(1)
    } else if ratio >= H2_RATIO {
        Some(2)
    } else {
        None
    }
}

fn page_blocks(layout: &PageLayout, body: f32, config: &LayoutConfig) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut prev: Option<&LineInfo> = None;

    let flush = |paragraph: &mut Vec<String>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    for line in &layout.lines {
        let text = line_text(line, layout.space_threshold);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(p) = prev {
            if p.y <= line.y || is_paragraph_break(p, line, config.paragraph_threshold) {
                flush(&mut paragraph, &mut blocks);
            }
        }
        prev = Some(line);

        if let Some(level) = heading_level(line, body) {
            flush(&mut paragraph, &mut blocks);
            // Wrapped headings continue the previous heading block
            if let Some(Block::Heading(last_level, last)) = blocks.last_mut() {
                if *last_level == level && blocks_adjacent(layout, line) {
                    last.push(' ');
                    last.push_str(text);
                    continue;
                }
            }
            blocks.push(Block::Heading(level, text.to_string()));
            continue;
        }

        if let Some(rest) = text.strip_prefix(|c: char| BULLETS.contains(&c)) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem(rest.trim_start().to_string()));
            continue;
        }

        paragraph.push(text.to_string());
    }
    flush(&mut paragraph, &mut blocks);

    blocks
}

/// A heading line directly follows another heading line of the same size
fn blocks_adjacent(layout: &PageLayout, line: &LineInfo) -> bool {
    layout
        .lines
        .iter()
        .position(|l| std::ptr::eq(l, line))
        .and_then(|i| i.checked_sub(1))
        .map(|i| {
            let prev = &layout.lines[i];
            (prev.avg_height - line.avg_height).abs() < 0.5
                && prev.y > line.y
                && prev.y - line.y <= line.avg_height * 1.5
        })
        .unwrap_or(false)
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_list = false;

    for block in blocks {
        match block {
            Block::ListItem(text) => {
                let item = format!("- {}", text);
                if in_list {
                    if let Some(last) = out.last_mut() {
                        last.push('\n');
                        last.push_str(&item);
                        continue;
                    }
                }
                out.push(item);
                in_list = true;
            }
            Block::Heading(level, text) => {
                out.push(format!("{} {}", "#".repeat(*level), text));
                in_list = false;
            }
            Block::Paragraph(text) => {
                out.push(text.clone());
                in_list = false;
            }
        }
    }

    out.join("\n\n")
}

/// Render pages as Markdown: headings by relative glyph size, paragraphs by
/// vertical spacing, bullet lines as list items, pages split by a rule
pub fn render_markdown(pages: &[PageLayout], config: &LayoutConfig) -> String {
    let body = body_height(pages);

    pages
        .iter()
        .map(|page| render_blocks(&page_blocks(page, body, config)))
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
