//! Layout reconstruction from positioned characters
//!
//! PDFium reports characters with bounding boxes in page space (origin at the
//! bottom-left). These helpers group them into reading-order lines, which the
//! text and Markdown renderers consume.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Character information for layout extraction
#[derive(Debug, Clone)]
pub struct CharInfo {
    /// The character
    pub char: char,
    /// X coordinate (left)
    pub x: f32,
    /// Y coordinate (top)
    pub y: f32,
    /// Character width
    pub width: f32,
    /// Character height (used for font size estimation)
    pub height: f32,
}

/// Line information after grouping characters
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    /// Characters with their left and right edges
    pub chars: Vec<(char, f32, f32)>,
    /// Y coordinate of the line (top)
    pub y: f32,
    /// Average character height (font size proxy)
    pub avg_height: f32,
    /// Leftmost edge
    pub min_x: f32,
    /// Rightmost edge
    pub max_x: f32,
}

/// Reconstructed page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Page number (1-indexed)
    pub page: u32,
    /// Lines in reading order
    pub lines: Vec<LineInfo>,
    /// Horizontal gap that separates words on this page
    pub space_threshold: f32,
}

/// Layout heuristics
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Line spacing multiplier for paragraph detection
    pub paragraph_threshold: f32,
    /// Minimum horizontal gap for column detection
    pub column_gap: f32,
    /// Reorder two-column pages
    pub detect_columns: bool,
    /// Drop centred, oversized short lines
    pub filter_watermarks: bool,
    /// Derive tolerances from the median glyph height
    pub dynamic_thresholds: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            paragraph_threshold: 1.5,
            column_gap: 30.0,
            detect_columns: true,
            filter_watermarks: true,
            dynamic_thresholds: true,
        }
    }
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Build the layout of one page from its characters
pub fn layout_page(
    page: u32,
    chars: Vec<CharInfo>,
    page_width: f32,
    config: &LayoutConfig,
) -> PageLayout {
    let chars: Vec<CharInfo> = chars
        .into_iter()
        .filter(|c| !c.char.is_control())
        .collect();

    let (y_tolerance, space_threshold) = if config.dynamic_thresholds {
        calculate_dynamic_thresholds(&chars)
    } else {
        (5.0, 2.0)
    };

    let mut lines = group_into_lines(chars, y_tolerance);

    if config.filter_watermarks {
        lines = filter_watermarks(lines, page_width);
    }

    if config.detect_columns {
        lines = reorder_columns(lines, config.column_gap);
    }

    PageLayout {
        page,
        lines,
        space_threshold,
    }
}

/// Calculate (y tolerance, space threshold) from the font size distribution
pub fn calculate_dynamic_thresholds(chars: &[CharInfo]) -> (f32, f32) {
    let mut heights: Vec<f32> = chars
        .iter()
        .filter(|c| c.height > 0.0)
        .map(|c| c.height)
        .collect();

    if heights.is_empty() {
        return (5.0, 2.0);
    }

    heights.sort_by(|a, b| cmp_f32(*a, *b));
    let median_height = heights[heights.len() / 2];

    // Baseline jitter stays well under half a glyph; word gaps exceed a fifth
    let y_tolerance = median_height * 0.4;
    let space_threshold = median_height * 0.2;

    (y_tolerance.max(2.0), space_threshold.max(1.0))
}

/// Group characters into lines based on Y-coordinate proximity
pub fn group_into_lines(chars: Vec<CharInfo>, y_tolerance: f32) -> Vec<LineInfo> {
    if chars.is_empty() {
        return Vec::new();
    }

    // Top to bottom, then left to right
    let mut sorted_chars = chars;
    sorted_chars.sort_by(|a, b| cmp_f32(b.y, a.y).then_with(|| cmp_f32(a.x, b.x)));

    let mut lines: Vec<LineInfo> = Vec::new();
    let mut current_chars: Vec<CharInfo> = Vec::new();
    let mut current_y: Option<f32> = None;

    for char_info in sorted_chars {
        match current_y {
            Some(cur_y) if (cur_y - char_info.y).abs() <= y_tolerance => {
                current_chars.push(char_info);
            }
            _ => {
                if !current_chars.is_empty() {
                    lines.push(create_line_info(std::mem::take(&mut current_chars)));
                }
                current_y = Some(char_info.y);
                current_chars.push(char_info);
            }
        }
    }

    if !current_chars.is_empty() {
        lines.push(create_line_info(current_chars));
    }

    lines
}

fn create_line_info(chars: Vec<CharInfo>) -> LineInfo {
    let avg_height = if chars.is_empty() {
        0.0
    } else {
        chars.iter().map(|c| c.height).sum::<f32>() / chars.len() as f32
    };

    let min_x = chars.iter().map(|c| c.x).fold(f32::MAX, f32::min);
    let max_x = chars.iter().map(|c| c.x + c.width).fold(f32::MIN, f32::max);
    let y = chars.first().map(|c| c.y).unwrap_or(0.0);

    let mut chars: Vec<(char, f32, f32)> = chars
        .into_iter()
        .map(|c| (c.char, c.x, c.x + c.width))
        .collect();
    chars.sort_by(|a, b| cmp_f32(a.1, b.1));

    LineInfo {
        chars,
        y,
        avg_height,
        min_x,
        max_x,
    }
}

/// Filter out watermarks (centered, oversized, short text)
pub fn filter_watermarks(lines: Vec<LineInfo>, page_width: f32) -> Vec<LineInfo> {
    if page_width <= 0.0 || lines.len() < 2 {
        return lines;
    }

    let avg_font_height: f32 = lines.iter().map(|l| l.avg_height).sum::<f32>() / lines.len() as f32;

    let page_center = page_width / 2.0;
    let center_tolerance = page_width * 0.2;

    lines
        .into_iter()
        .filter(|line| {
            let line_center = (line.min_x + line.max_x) / 2.0;
            let is_centered = (line_center - page_center).abs() < center_tolerance;
            let is_short = line.chars.len() < 30;
            // Headings are large too; watermarks dwarf the body text
            let is_huge = line.avg_height > avg_font_height * 3.0;

            !(is_centered && is_short && is_huge)
        })
        .collect()
}

/// Detect a dominant column separator and emit the left column first
pub fn reorder_columns(lines: Vec<LineInfo>, column_gap: f32) -> Vec<LineInfo> {
    if lines.len() < 4 {
        return lines;
    }

    // Gaps between adjacent glyphs inside a line hint at a gutter
    let mut gap_histogram: HashMap<i32, usize> = HashMap::new();
    let mut gapped_lines = 0usize;
    for line in &lines {
        let mut found = false;
        for window in line.chars.windows(2) {
            let gap = window[1].1 - window[0].2;
            if gap >= column_gap {
                let mid = ((window[0].2 + window[1].1) / 2.0) as i32;
                *gap_histogram.entry((mid / 10) * 10).or_insert(0) += 1;
                found = true;
            }
        }
        if found {
            gapped_lines += 1;
        }
    }

    // A gutter must show up in most lines
    if gapped_lines * 2 < lines.len() {
        return lines;
    }

    let separator = match gap_histogram
        .iter()
        .max_by_key(|(bucket, count)| (**count, -**bucket))
        .map(|(bucket, _)| *bucket as f32 + 5.0)
    {
        Some(s) => s,
        None => return lines,
    };

    let mut left_column: Vec<LineInfo> = Vec::new();
    let mut right_column: Vec<LineInfo> = Vec::new();

    for line in lines {
        let (left, right): (Vec<_>, Vec<_>) =
            line.chars.iter().cloned().partition(|(_, x, _)| *x < separator);
        if !left.is_empty() {
            left_column.push(rebuild_line(left, &line));
        }
        if !right.is_empty() {
            right_column.push(rebuild_line(right, &line));
        }
    }

    left_column.extend(right_column);
    left_column
}

fn rebuild_line(chars: Vec<(char, f32, f32)>, template: &LineInfo) -> LineInfo {
    let min_x = chars.iter().map(|c| c.1).fold(f32::MAX, f32::min);
    let max_x = chars.iter().map(|c| c.2).fold(f32::MIN, f32::max);
    LineInfo {
        chars,
        y: template.y,
        avg_height: template.avg_height,
        min_x,
        max_x,
    }
}

/// Text of a single line, with spaces inserted at word gaps
pub fn line_text(line: &LineInfo, space_threshold: f32) -> String {
    let mut result = String::new();
    let mut prev_right: Option<f32> = None;

    for &(c, left, right) in &line.chars {
        if let Some(pr) = prev_right {
            if left - pr > space_threshold && c != ' ' && !result.ends_with(' ') {
                result.push(' ');
            }
        }
        if c == ' ' && (result.is_empty() || result.ends_with(' ')) {
            prev_right = Some(right);
            continue;
        }
        result.push(c);
        prev_right = Some(right);
    }

    result.trim_end().to_string()
}

/// True when the vertical gap between two lines marks a paragraph break
pub fn is_paragraph_break(prev: &LineInfo, line: &LineInfo, threshold: f32) -> bool {
    let line_gap = prev.y - line.y;
    let normal_gap = prev.avg_height.max(line.avg_height);
    normal_gap > 0.0 && line_gap > normal_gap * threshold
}

/// Plain text of a page; paragraphs separated by a blank line
pub fn page_text(layout: &PageLayout, config: &LayoutConfig) -> String {
    let mut result = String::new();
    let mut prev: Option<&LineInfo> = None;

    for line in &layout.lines {
        let text = line_text(line, layout.space_threshold);
        if text.is_empty() {
            continue;
        }
        if let Some(p) = prev {
            result.push('\n');
            // Column reordering can jump upwards; only downward gaps count
            if p.y > line.y && is_paragraph_break(p, line, config.paragraph_threshold) {
                result.push('\n');
            }
        }
        result.push_str(&text);
        prev = Some(line);
    }

    result
}
