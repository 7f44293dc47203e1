//! Plain terminal output for the CLI surfaces.
//!
//! Only the header bar is colored (with the theme's navigation colors);
//! everything else is plain text so output stays pipe-friendly.
use std::borrow::Cow;
use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};

use duorou::model::{Banner, CatalogEntry};
use duorou::projection::{highlight, AnnotatedEntry, CategoryBucket, Page};
use duorou::surface::DisplaySettings;
use duorou::theme::{FontSize, ThemeName};
use duorou::util::{display_width, pad_to_width, strip_control_chars, truncate_to_width};

const FALLBACK_WIDTH: u16 = 80;
const TITLE_WIDTH: usize = 24;
const CATEGORY_WIDTH: usize = 12;

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols)
        .unwrap_or(FALLBACK_WIDTH) as usize
}

fn rgb(hex: Option<(u8, u8, u8)>, fallback: Color) -> Color {
    hex.map_or(fallback, |(r, g, b)| Color::Rgb { r, g, b })
}

/// Full-width title bar in the theme's navigation colors.
pub fn header(out: &mut impl Write, display: &DisplaySettings, title: &str) -> io::Result<()> {
    let width = terminal_width();
    let text = pad_to_width(&format!(" {title}"), width);
    queue!(
        out,
        SetBackgroundColor(rgb(display.navigation.background_rgb(), Color::White)),
        SetForegroundColor(rgb(display.navigation.front_rgb(), Color::Black)),
        Print(text),
        ResetColor,
        Print("\n"),
    )?;
    out.flush()
}

pub fn stale_notice(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "(使用缓存数据: network unavailable, showing cached catalog)")
}

fn entry_line(row: &AnnotatedEntry<'_>, keyword: Option<&str>) -> String {
    let mark = if row.is_collected { "★" } else { " " };
    let title = strip_control_chars(&row.entry.title);
    let title = match keyword {
        Some(keyword) => highlight(&title, keyword)
            .iter()
            .map(|s| {
                if s.matched {
                    format!("[{}]", s.text)
                } else {
                    s.text.to_string()
                }
            })
            .collect::<String>(),
        None => title.into_owned(),
    };
    let category = if row.entry.is_uncategorized() {
        Cow::Borrowed("未分类")
    } else {
        strip_control_chars(&row.entry.category)
    };
    format!(
        "{mark} {}  {}  {}",
        pad_to_width(&title, TITLE_WIDTH),
        pad_to_width(&category, CATEGORY_WIDTH),
        strip_control_chars(&row.entry.id)
    )
}

/// One page of entries, with a pager footer.
pub fn entries(
    out: &mut impl Write,
    page: &Page<AnnotatedEntry<'_>>,
    keyword: Option<&str>,
) -> io::Result<()> {
    if page.items.is_empty() {
        return writeln!(out, "暂无数据 (no entries)");
    }
    for row in &page.items {
        writeln!(out, "{}", entry_line(row, keyword))?;
    }
    writeln!(
        out,
        "-- page {} · {} total{} --",
        page.page,
        page.total,
        if page.has_more { " · more with --page" } else { "" }
    )
}

pub fn categories(out: &mut impl Write, buckets: &[CategoryBucket]) -> io::Result<()> {
    if buckets.len() <= 1 {
        return writeln!(out, "暂无分类 (no categories)");
    }
    let name_width = buckets
        .iter()
        .map(|b| display_width(&b.label))
        .max()
        .unwrap_or(0)
        .min(TITLE_WIDTH);
    for bucket in buckets {
        writeln!(
            out,
            "{} {}  {:>4}   duorou list {}",
            bucket.icon,
            pad_to_width(&strip_control_chars(&bucket.label), name_width),
            bucket.count,
            bucket.key
        )?;
    }
    Ok(())
}

pub fn detail(out: &mut impl Write, row: &AnnotatedEntry<'_>) -> io::Result<()> {
    let entry: &CatalogEntry = row.entry;
    writeln!(
        out,
        "{} {}",
        if row.is_collected { "★" } else { "☆" },
        strip_control_chars(&entry.title)
    )?;
    writeln!(out, "  id:       {}", strip_control_chars(&entry.id))?;
    if !entry.is_uncategorized() {
        writeln!(out, "  category: {}", strip_control_chars(&entry.category))?;
    }
    if !entry.image_ref.is_empty() {
        writeln!(out, "  image:    {}", strip_control_chars(&entry.image_ref))?;
    }
    if let Some(description) = &entry.description {
        writeln!(out, "  {}", strip_control_chars(description))?;
    }
    if !entry.tags.is_empty() {
        writeln!(out, "  tags:     {}", strip_control_chars(&entry.tags.join(", ")))?;
    }
    if !entry.articles.is_empty() {
        writeln!(out, "  articles:")?;
        let width = terminal_width().saturating_sub(6);
        for article in &entry.articles {
            writeln!(
                out,
                "    - {}",
                truncate_to_width(&strip_control_chars(&article.title), width)
            )?;
            writeln!(out, "      {}", strip_control_chars(&article.url))?;
        }
    }
    Ok(())
}

pub fn settings(out: &mut impl Write, display: &DisplaySettings) -> io::Result<()> {
    writeln!(out, "theme:")?;
    for theme in ThemeName::KNOWN {
        let marker = if theme == display.theme { "●" } else { "○" };
        writeln!(
            out,
            "  {marker} {:<7} {} {}",
            theme.as_str(),
            theme.navigation_colors().background_color,
            theme.label()
        )?;
    }
    if let ThemeName::Unknown(name) = &display.theme {
        writeln!(
            out,
            "  ● {} (unrecognized, default colors)",
            strip_control_chars(name)
        )?;
    }
    writeln!(out, "font size:")?;
    for size in FontSize::ALL {
        let marker = if size == display.font_size { "●" } else { "○" };
        writeln!(out, "  {marker} {:<7} {}pt", size.as_str(), size.points())?;
    }
    Ok(())
}

pub fn banners(out: &mut impl Write, banners: &[Banner]) -> io::Result<()> {
    let width = terminal_width().saturating_sub(4);
    for (i, banner) in banners.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, strip_control_chars(&banner.title))?;
        writeln!(
            out,
            "   {}",
            truncate_to_width(&strip_control_chars(&banner.image), width)
        )?;
    }
    Ok(())
}
