use crate::models::config::LayoutConfig;
use crate::models::ocr_result::{Point, TextToken};
use crate::models::record::{Field, Mode, RowDetails, RowIssue, RowRecord, TeamComposition};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// First digit run after the leading non-digits, as in "Lv. 42"
static LEVEL_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^0-9]*([0-9]+)").unwrap());

/// Digits with optional thousands separators
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9,]*[0-9][0-9,]*$").unwrap());

/// Rectangle of the row image in fractions of its width and height.
/// Ranges are half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

impl Zone {
    pub fn contains(&self, point: Point, width: f64, height: f64) -> bool {
        self.x.contains(&(point.x / width)) && self.y.contains(&(point.y / height))
    }
}

const LOW: f64 = f64::NEG_INFINITY;
const HIGH: f64 = f64::INFINITY;

/// Fixed lookup for glyphs the recogniser confuses with digits
pub fn correct_glyphs(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'o' | 'O' => '0',
            'l' | 'I' | 'i' => '1',
            'z' | 'Z' => '2',
            's' | 'S' => '5',
            'b' | 'B' => '8',
            'g' | 'G' | 'q' | 'Q' => '9',
            other => other,
        })
        .collect()
}

/// Level digits of an "lv" token, falling back to glyph correction
pub fn level_digits(text: &str) -> Option<String> {
    if let Some(caps) = LEVEL_DIGITS.captures(text) {
        return Some(caps[1].to_string());
    }

    let corrected = correct_glyphs(text.get(2..).unwrap_or(""));
    (!corrected.is_empty() && corrected.chars().all(|c| c.is_ascii_digit())).then_some(corrected)
}

pub fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text)
}

/// Joins damage fragments already in left-to-right order, dropping the
/// trailing character of a fragment when the next one starts with it
pub fn merge_fragments(fragments: &[&str]) -> String {
    let mut merged = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        let mut piece = *fragment;
        if let (Some(last), Some(next)) = (piece.chars().last(), fragments.get(i + 1)) {
            if next.starts_with(last) {
                piece = &piece[..piece.len() - last.len_utf8()];
            }
        }
        merged.push_str(piece);
    }
    merged.replace(',', "")
}

/// Outcome of the boss level search
#[derive(Debug, Clone, PartialEq)]
enum LevelScan {
    Found { index: usize, digits: String },
    Rejected { raw: String },
    Absent,
}

/// Typed fields read from one row's text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedText {
    pub commander_name: Option<String>,
    pub commander_damage: Option<u64>,
    pub boss_level: Option<u32>,
    /// Overall rows only
    pub boss_name: Option<String>,
    /// Boss-Specific rows only
    pub unit_level: Option<String>,
    pub issues: Vec<RowIssue>,
}

impl ParsedText {
    pub fn into_overall(self) -> (RowRecord, Vec<RowIssue>) {
        let record = RowRecord {
            commander_name: self.commander_name,
            commander_damage: self.commander_damage,
            boss_level: self.boss_level,
            details: RowDetails::Overall {
                boss_name: self.boss_name,
            },
        };
        (record, self.issues)
    }

    pub fn into_boss_specific(self, team: TeamComposition) -> (RowRecord, Vec<RowIssue>) {
        let record = RowRecord {
            commander_name: self.commander_name,
            commander_damage: self.commander_damage,
            boss_level: self.boss_level,
            details: RowDetails::BossSpecific {
                team,
                unit_level: self.unit_level,
            },
        };
        (record, self.issues)
    }
}

/// Turns positioned OCR tokens of one row into typed fields
#[derive(Debug, Clone)]
pub struct ResultParser {
    layout: LayoutConfig,
}

impl ResultParser {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn parse(&self, mode: Mode, tokens: &[TextToken], width: u32, height: u32) -> ParsedText {
        match mode {
            Mode::Overall => self.parse_overall(tokens, width, height),
            Mode::BossSpecific => self.parse_boss_specific(tokens, width, height),
        }
    }

    /// Name and level top-left, damage top-right, boss name bottom-left
    pub fn parse_overall(&self, tokens: &[TextToken], width: u32, height: u32) -> ParsedText {
        let half = self.layout.half;
        let frame = Frame::new(width, height);
        let mut parsed = ParsedText::default();
        let remaining = self.take_boss_level(tokens, &frame, &mut parsed);

        let upper_left = Zone { x: LOW..half, y: LOW..half };
        let upper_right = Zone { x: half..HIGH, y: LOW..half };
        let lower_left = Zone { x: LOW..half, y: half..HIGH };

        parsed.commander_name = longest(frame.within(&remaining, &upper_left));

        let damage: Vec<&TextToken> = frame
            .within(&remaining, &upper_right)
            .filter(|t| is_numeric(&t.text))
            .collect();
        parsed.commander_damage = read_damage(damage, &mut parsed.issues);

        let boss_parts = left_to_right(frame.within(&remaining, &lower_left).collect());
        if !boss_parts.is_empty() {
            parsed.boss_name = Some(boss_parts.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "));
        }

        parsed
    }

    /// Left half split into thirds: name on top, damage in the middle;
    /// unit levels across the bottom third
    pub fn parse_boss_specific(&self, tokens: &[TextToken], width: u32, height: u32) -> ParsedText {
        let LayoutConfig {
            half,
            upper_tertile,
            lower_tertile,
        } = self.layout;
        let frame = Frame::new(width, height);
        let mut parsed = ParsedText::default();
        let remaining = self.take_boss_level(tokens, &frame, &mut parsed);

        let top_left = Zone { x: LOW..half, y: LOW..upper_tertile };
        let middle_left = Zone { x: LOW..half, y: upper_tertile..lower_tertile };
        let bottom = Zone { x: LOW..HIGH, y: lower_tertile..HIGH };

        parsed.commander_name = longest(frame.within(&remaining, &top_left));

        let damage: Vec<&TextToken> = frame
            .within(&remaining, &middle_left)
            .filter(|t| is_numeric(&t.text))
            .collect();
        parsed.commander_damage = read_damage(damage, &mut parsed.issues);

        parsed.unit_level = most_common(frame.within(&remaining, &bottom));
        parsed
    }

    /// Removes the boss level token from a copy of `tokens`
    fn take_boss_level<'a>(&self, tokens: &'a [TextToken], frame: &Frame, parsed: &mut ParsedText) -> Vec<&'a TextToken> {
        let upper_left = Zone {
            x: LOW..self.layout.half,
            y: LOW..self.layout.half,
        };
        let mut remaining: Vec<&TextToken> = tokens.iter().collect();

        match scan_boss_level(tokens, frame, &upper_left) {
            LevelScan::Found { index, digits } => {
                remaining.remove(index);
                match digits.parse::<u32>() {
                    Ok(level) => parsed.boss_level = Some(level),
                    Err(_) => parsed.issues.push(RowIssue::UnparseableField {
                        field: Field::BossLevel,
                        raw: digits,
                    }),
                }
            }
            LevelScan::Rejected { raw } => parsed.issues.push(RowIssue::UnparseableField {
                field: Field::BossLevel,
                raw,
            }),
            LevelScan::Absent => {}
        }
        remaining
    }
}

/// Row image size used to turn pixel positions into fractions
struct Frame {
    width: f64,
    height: f64,
}

impl Frame {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f64,
            height: height.max(1) as f64,
        }
    }

    fn contains(&self, zone: &Zone, token: &TextToken) -> bool {
        zone.contains(token.polygon.top_left(), self.width, self.height)
    }

    fn within<'a, 'z>(&'z self, tokens: &'z [&'a TextToken], zone: &'z Zone) -> impl Iterator<Item = &'a TextToken> + 'z {
        tokens.iter().copied().filter(move |t| self.contains(zone, t))
    }
}

/// First "lv" token in `zone` whose level reads as digits. Tokens that fail
/// correction are skipped, and the first of them is reported when nothing
/// else matches.
fn scan_boss_level(tokens: &[TextToken], frame: &Frame, zone: &Zone) -> LevelScan {
    let mut rejected: Option<String> = None;

    for (index, token) in tokens.iter().enumerate() {
        if !frame.contains(zone, token) {
            continue;
        }
        let prefix: String = token.text.chars().take(2).collect();
        if !prefix.eq_ignore_ascii_case("lv") {
            continue;
        }

        match level_digits(&token.text) {
            Some(digits) => return LevelScan::Found { index, digits },
            None => {
                rejected.get_or_insert_with(|| token.text.clone());
            }
        }
    }

    match rejected {
        Some(raw) => LevelScan::Rejected { raw },
        None => LevelScan::Absent,
    }
}

fn left_to_right(mut tokens: Vec<&TextToken>) -> Vec<&TextToken> {
    tokens.sort_by(|a, b| a.polygon.left_x().total_cmp(&b.polygon.left_x()));
    tokens
}

fn read_damage(fragments: Vec<&TextToken>, issues: &mut Vec<RowIssue>) -> Option<u64> {
    if fragments.is_empty() {
        return None;
    }

    let ordered = left_to_right(fragments);
    let texts: Vec<&str> = ordered.iter().map(|t| t.text.as_str()).collect();
    let digits = merge_fragments(&texts);

    match digits.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            issues.push(RowIssue::UnparseableField {
                field: Field::CommanderDamage,
                raw: texts.join(" "),
            });
            None
        }
    }
}

/// Longest text by character count; the earliest wins a tie
fn longest<'a>(tokens: impl Iterator<Item = &'a TextToken>) -> Option<String> {
    let mut best: Option<&TextToken> = None;
    for token in tokens {
        if best.map_or(true, |b| token.text.chars().count() > b.text.chars().count()) {
            best = Some(token);
        }
    }
    best.map(|t| t.text.clone())
}

/// Most frequent text; the earliest first occurrence wins a tie
fn most_common<'a>(tokens: impl Iterator<Item = &'a TextToken>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for token in tokens {
        match counts.iter_mut().find(|(text, _)| *text == token.text.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((token.text.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (text, count) in counts {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((text, count));
        }
    }
    best.map(|(text, _)| text.to_string())
}
