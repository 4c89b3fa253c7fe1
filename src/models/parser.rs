//! 章节文本解析
//!
//! 识别首个非空行上的显式标题标记；没有标记时使用文件名（去掉扩展名）作为标题。
//! 支持的标记：`# 标题`、`Title: 标题` / `标题：标题`、`Chapter 12 ...`、`第十二章 ...`。

use regex::Regex;
use std::sync::OnceLock;

use crate::models::item::{Item, ParsedContent};

/// 标题解析器
pub trait ContentParser: Send + Sync {
    fn parse(&self, item: &Item, use_item_name_as_title: bool) -> ParsedContent;
}

/// 可以从文件名上去掉的扩展名
const KNOWN_EXTENSIONS: [&str; 3] = [".txt", ".md", ".text"];

/// 默认章节解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct ChapterParser;

fn prefixed_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:#{1,6}\s+|(?i:title)\s*[:：]\s*|标题\s*[:：]\s*)(?P<title>.+)$")
            .expect("static regex")
    })
}

fn chapter_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?i:chapter)\s+\d+\b|第\s*[0-9一二三四五六七八九十百千万零〇两]+\s*[章节回卷]).*$")
            .expect("static regex")
    })
}

/// 去掉已知扩展名（不区分大小写）
pub fn strip_known_extension(name: &str) -> &str {
    for ext in KNOWN_EXTENSIONS {
        if name.len() > ext.len() {
            let cut = name.len() - ext.len();
            if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(ext) {
                return &name[..cut];
            }
        }
    }
    name
}

/// 识别标题行，返回去掉标记前缀后的标题
fn title_from_marker(line: &str) -> Option<String> {
    if let Some(caps) = prefixed_title_regex().captures(line) {
        let title = caps["title"].trim();
        return (!title.is_empty()).then(|| title.to_string());
    }
    chapter_heading_regex()
        .is_match(line)
        .then(|| line.to_string())
}

impl ContentParser for ChapterParser {
    fn parse(&self, item: &Item, use_item_name_as_title: bool) -> ParsedContent {
        let text = item.content().replace("\r\n", "\n").replace('\r', "\n");
        let fallback_title = strip_known_extension(item.name()).trim().to_string();

        if use_item_name_as_title {
            return ParsedContent {
                title: fallback_title,
                body: text.trim().to_string(),
            };
        }

        let mut lines = text.lines();
        let first = lines.by_ref().find(|line| !line.trim().is_empty());

        match first.map(str::trim).and_then(title_from_marker) {
            Some(title) => ParsedContent {
                title,
                body: lines.collect::<Vec<_>>().join("\n").trim().to_string(),
            },
            None => ParsedContent {
                title: fallback_title,
                body: text.trim().to_string(),
            },
        }
    }
}
