//! Result table with a lossless CSV round trip.
//!
//! Null fields are written as an unquoted empty cell, empty strings as `""`,
//! so both survive a read back. Team compositions are JSON arrays, or the
//! unquoted marker `N/A` when the portraits could not be read.

use crate::error::{ReaderError, Result};
use crate::models::record::{Mode, RowDetails, RowRecord, TeamComposition};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

const OVERALL_HEADER: [&str; 4] = ["Commander Name", "Commander Damage", "Boss Name", "Boss Level"];
const BOSS_SPECIFIC_HEADER: [&str; 5] = [
    "Commander Name",
    "Commander Damage",
    "Team Composition",
    "Boss Level",
    "Unit Level",
];
const UNAVAILABLE: &str = "N/A";

/// One parsed CSV cell; quoting is kept so null and empty stay distinct
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    quoted: bool,
}

impl Cell {
    fn is_null(&self) -> bool {
        !self.quoted && self.text.is_empty()
    }
}

/// Rows of one screenshot, all of the same mode
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    mode: Mode,
    rows: Vec<RowRecord>,
}

impl ResultTable {
    pub fn new(mode: Mode) -> Self {
        Self { mode, rows: Vec::new() }
    }

    pub fn from_records<I>(mode: Mode, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = RowRecord>,
    {
        let mut table = Self::new(mode);
        for record in records {
            table.push(record)?;
        }
        Ok(table)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn push(&mut self, record: RowRecord) -> Result<()> {
        if record.mode() != self.mode {
            return Err(ReaderError::Table {
                line: self.rows.len() + 2,
                message: format!("{} row in a {} table", record.mode(), self.mode),
            });
        }
        self.rows.push(record);
        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let header: &[&str] = match self.mode {
            Mode::Overall => &OVERALL_HEADER,
            Mode::BossSpecific => &BOSS_SPECIFIC_HEADER,
        };

        let mut out = header.join(",");
        out.push('\n');

        for row in &self.rows {
            let mut cells = vec![text_cell(&row.commander_name), number_cell(row.commander_damage)];
            match &row.details {
                RowDetails::Overall { boss_name } => {
                    cells.push(text_cell(boss_name));
                    cells.push(number_cell(row.boss_level));
                }
                RowDetails::BossSpecific { team, unit_level } => {
                    cells.push(team_cell(team));
                    cells.push(number_cell(row.boss_level));
                    cells.push(text_cell(unit_level));
                }
            }
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    pub fn from_csv(text: &str) -> Result<Self> {
        let mut records = parse_records(text)?.into_iter();

        let (_, header) = records.next().ok_or_else(|| ReaderError::Table {
            line: 1,
            message: "missing header".to_string(),
        })?;
        let names: Vec<&str> = header.iter().map(|c| c.text.as_str()).collect();
        let mode = if names == OVERALL_HEADER {
            Mode::Overall
        } else if names == BOSS_SPECIFIC_HEADER {
            Mode::BossSpecific
        } else {
            return Err(ReaderError::Table {
                line: 1,
                message: format!("unknown header {:?}", names),
            });
        };

        let mut table = Self::new(mode);
        for (line, cells) in records {
            table.rows.push(parse_row(mode, line, &cells)?);
        }
        Ok(table)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_csv())?;
        info!("Wrote {} rows to {:?}", self.rows.len(), path.as_ref());
        Ok(())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv(&std::fs::read_to_string(path)?)
    }

    /// Human-readable listing; missing damage and level show as 0
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            let name = row.commander_name.as_deref().unwrap_or("?");
            let _ = write!(
                out,
                "{:>2}. {:<20} {:>15}  Lv {:>3}",
                i + 1,
                name,
                row.display_damage(),
                row.display_boss_level()
            );
            match &row.details {
                RowDetails::Overall { boss_name } => {
                    let _ = write!(out, "  {}", boss_name.as_deref().unwrap_or(""));
                }
                RowDetails::BossSpecific { team, unit_level } => {
                    let team = match team {
                        TeamComposition::Matched(ids) => ids.join(", "),
                        TeamComposition::Unavailable => UNAVAILABLE.to_string(),
                    };
                    let _ = write!(out, "  [{}]  {}", team, unit_level.as_deref().unwrap_or(""));
                }
            }
            out.push('\n');
        }
        out
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn text_cell(value: &Option<String>) -> String {
    match value {
        None => String::new(),
        Some(s) if s.is_empty() || s == UNAVAILABLE || s.contains([',', '"', '\n', '\r']) => quote(s),
        Some(s) => s.clone(),
    }
}

fn number_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn team_cell(team: &TeamComposition) -> String {
    match team {
        TeamComposition::Unavailable => UNAVAILABLE.to_string(),
        TeamComposition::Matched(ids) => {
            // Serializing a list of strings cannot fail
            quote(&serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string()))
        }
    }
}

/// Split into records of cells, honouring quoted delimiters and newlines.
/// Each record carries the line number it starts on; blank lines are skipped.
fn parse_records(text: &str) -> Result<Vec<(usize, Vec<Cell>)>> {
    let mut records = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while chars.peek().is_some() {
        let start_line = line;
        let mut cells = Vec::new();

        loop {
            let mut cell = Cell { text: String::new(), quoted: false };

            if chars.peek() == Some(&'"') {
                chars.next();
                cell.quoted = true;
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            cell.text.push('"');
                        }
                        Some('"') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            cell.text.push(c);
                        }
                        None => {
                            return Err(ReaderError::Table {
                                line: start_line,
                                message: "unterminated quoted field".to_string(),
                            })
                        }
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' || c == '\n' || c == '\r' {
                        break;
                    }
                    cell.text.push(c);
                    chars.next();
                }
            }
            cells.push(cell);

            match chars.next() {
                Some(',') => continue,
                Some('\r') => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    break;
                }
                Some('\n') => {
                    line += 1;
                    break;
                }
                None => break,
                Some(c) => {
                    return Err(ReaderError::Table {
                        line,
                        message: format!("unexpected {:?} after quoted field", c),
                    })
                }
            }
        }

        let blank = cells.len() == 1 && cells[0].is_null();
        if !blank {
            records.push((start_line, cells));
        }
    }
    Ok(records)
}

fn parse_row(mode: Mode, line: usize, cells: &[Cell]) -> Result<RowRecord> {
    let expected = match mode {
        Mode::Overall => OVERALL_HEADER.len(),
        Mode::BossSpecific => BOSS_SPECIFIC_HEADER.len(),
    };
    if cells.len() != expected {
        return Err(ReaderError::Table {
            line,
            message: format!("expected {} fields, found {}", expected, cells.len()),
        });
    }

    let text = |cell: &Cell| (!cell.is_null()).then(|| cell.text.clone());

    let record = match mode {
        Mode::Overall => RowRecord {
            commander_name: text(&cells[0]),
            commander_damage: parse_number(&cells[1], line)?,
            boss_level: parse_number(&cells[3], line)?,
            details: RowDetails::Overall {
                boss_name: text(&cells[2]),
            },
        },
        Mode::BossSpecific => RowRecord {
            commander_name: text(&cells[0]),
            commander_damage: parse_number(&cells[1], line)?,
            boss_level: parse_number(&cells[3], line)?,
            details: RowDetails::BossSpecific {
                team: parse_team(&cells[2], line)?,
                unit_level: text(&cells[4]),
            },
        },
    };
    Ok(record)
}

fn parse_number<T: std::str::FromStr>(cell: &Cell, line: usize) -> Result<Option<T>> {
    if cell.is_null() {
        return Ok(None);
    }
    cell.text.parse().map(Some).map_err(|_| ReaderError::Table {
        line,
        message: format!("not a number: {:?}", cell.text),
    })
}

fn parse_team(cell: &Cell, line: usize) -> Result<TeamComposition> {
    if !cell.quoted && cell.text == UNAVAILABLE {
        return Ok(TeamComposition::Unavailable);
    }
    serde_json::from_str(&cell.text)
        .map(TeamComposition::Matched)
        .map_err(|e| ReaderError::Table {
            line,
            message: format!("bad team composition {:?}: {}", cell.text, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overall(name: Option<&str>, damage: Option<u64>, boss: Option<&str>, level: Option<u32>) -> RowRecord {
        RowRecord {
            commander_name: name.map(String::from),
            commander_damage: damage,
            boss_level: level,
            details: RowDetails::Overall {
                boss_name: boss.map(String::from),
            },
        }
    }

    fn boss_specific(team: TeamComposition, unit_level: Option<&str>) -> RowRecord {
        RowRecord {
            commander_name: Some("Nova".to_string()),
            commander_damage: Some(987_654_321),
            boss_level: Some(12),
            details: RowDetails::BossSpecific {
                team,
                unit_level: unit_level.map(String::from),
            },
        }
    }

    #[test]
    fn test_overall_round_trip_keeps_nulls() {
        let mut table = ResultTable::new(Mode::Overall);
        table.push(overall(Some("CmdrX"), Some(100000), Some("Big Boss"), Some(42))).unwrap();
        table.push(overall(None, None, None, None)).unwrap();
        table.push(overall(Some(""), Some(0), Some("Gate, Keeper \"II\""), Some(3))).unwrap();
        table.push(overall(Some("N/A"), None, Some("two\nlines"), None)).unwrap();

        let csv = table.to_csv();
        let restored = ResultTable::from_csv(&csv).unwrap();
        assert_eq!(restored, table, "round trip must be lossless:\n{}", csv);
    }

    #[test]
    fn test_boss_specific_round_trip() {
        let mut table = ResultTable::new(Mode::BossSpecific);
        let team = TeamComposition::Matched(vec!["anis".into(), "rapi, sr".into(), "ne\"on".into()]);
        table.push(boss_specific(team, Some("Lv.160"))).unwrap();
        table.push(boss_specific(TeamComposition::Unavailable, None)).unwrap();
        table.push(boss_specific(TeamComposition::Matched(vec![]), Some(""))).unwrap();

        let restored = ResultTable::from_csv(&table.to_csv()).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_csv_layout() {
        let mut table = ResultTable::new(Mode::Overall);
        table.push(overall(Some("CmdrX"), None, Some(""), Some(7))).unwrap();

        assert_eq!(
            table.to_csv(),
            "Commander Name,Commander Damage,Boss Name,Boss Level\nCmdrX,,\"\",7\n"
        );
    }

    #[test]
    fn test_unavailable_team_is_unquoted_marker() {
        let mut table = ResultTable::new(Mode::BossSpecific);
        table.push(boss_specific(TeamComposition::Unavailable, Some("Lv.1"))).unwrap();

        let csv = table.to_csv();
        assert!(csv.lines().nth(1).unwrap().contains(",N/A,"), "got {}", csv);
    }

    #[test]
    fn test_crlf_input() {
        let csv = "Commander Name,Commander Damage,Boss Name,Boss Level\r\nA,5,B,1\r\n";
        let table = ResultTable::from_csv(csv).unwrap();
        assert_eq!(table.rows(), &[overall(Some("A"), Some(5), Some("B"), Some(1))]);
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let mut table = ResultTable::new(Mode::Overall);
        assert!(table.push(boss_specific(TeamComposition::Unavailable, None)).is_err());
    }

    #[test]
    fn test_bad_input_reports_line() {
        let wrong_header = "Name,Damage\nA,1\n";
        assert!(matches!(ResultTable::from_csv(wrong_header), Err(ReaderError::Table { line: 1, .. })));

        let bad_number = "Commander Name,Commander Damage,Boss Name,Boss Level\nA,1,B,1\nC,lots,D,2\n";
        assert!(matches!(ResultTable::from_csv(bad_number), Err(ReaderError::Table { line: 3, .. })));

        let short_row = "Commander Name,Commander Damage,Boss Name,Boss Level\nA,1\n";
        assert!(matches!(ResultTable::from_csv(short_row), Err(ReaderError::Table { line: 2, .. })));

        let unterminated = "Commander Name,Commander Damage,Boss Name,Boss Level\n\"A,1,B,1\n";
        assert!(matches!(ResultTable::from_csv(unterminated), Err(ReaderError::Table { .. })));
    }

    #[test]
    fn test_text_rendering_uses_display_defaults() {
        let mut table = ResultTable::new(Mode::Overall);
        table.push(overall(Some("CmdrX"), None, Some("Boss"), None)).unwrap();

        let text = table.to_text();
        assert!(text.contains("CmdrX"));
        assert!(text.contains(" 0  Lv   0"), "got {:?}", text);
        assert_eq!(table.rows()[0].commander_damage, None);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("raid_table_{}.csv", std::process::id()));
        let mut table = ResultTable::new(Mode::Overall);
        table.push(overall(Some("A"), Some(1), None, Some(2))).unwrap();

        table.write_csv(&path).unwrap();
        assert_eq!(ResultTable::read_csv(&path).unwrap(), table);
        std::fs::remove_file(&path).unwrap();
    }
}
