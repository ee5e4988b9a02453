use crate::error::Result;
use crate::models::config::{AppConfig, SegmentationConfig};
use crate::models::record::{Mode, RowIssue, RowOutcome, TeamComposition};
use crate::models::roi::Roi;
use crate::services::export::ResultTable;
use crate::services::ocr::{OcrEngine, ParsedText, ResultParser};
use crate::services::vision::{
    MenuLocator, PortraitMatcher, PortraitSegmenter, ReferenceLibrary, RowSplitter, RowTemplates,
};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything read from one screenshot
#[derive(Debug, Clone)]
pub struct ScreenshotReport {
    pub mode: Mode,
    /// Panel rectangle inside the screenshot
    pub panel: Roi,
    /// One outcome per detected row, top to bottom
    pub rows: Vec<RowOutcome>,
}

impl ScreenshotReport {
    pub fn table(&self) -> Result<ResultTable> {
        ResultTable::from_records(self.mode, self.rows.iter().map(|row| row.record.clone()))
    }

    pub fn issue_count(&self) -> usize {
        self.rows.iter().map(|row| row.issues.len()).sum()
    }
}

/// Screenshot to records: panel, rows, then text and portraits per row
pub struct ResultsReader {
    menu: MenuLocator,
    splitter: RowSplitter,
    templates: RowTemplates,
    segmenter: PortraitSegmenter,
    matcher: PortraitMatcher,
    parser: ResultParser,
    engine: Arc<dyn OcrEngine>,
    segmentation: SegmentationConfig,
}

impl ResultsReader {
    /// Fails when the reference library is empty
    pub fn new(
        config: &AppConfig,
        library: Arc<ReferenceLibrary>,
        templates: RowTemplates,
        engine: Arc<dyn OcrEngine>,
    ) -> Result<Self> {
        Ok(Self {
            menu: MenuLocator::new(config.menu.clone()),
            splitter: RowSplitter::new(config.rows.clone()),
            templates,
            segmenter: PortraitSegmenter::new(config.segmentation.clone()),
            matcher: PortraitMatcher::new(library, &config.matcher)?,
            parser: ResultParser::new(config.layout),
            engine,
            segmentation: config.segmentation.clone(),
        })
    }

    /// Panel geometry failures abort the screenshot; every other problem is
    /// attached to the row it happened in
    pub fn read_screenshot(&self, screenshot: &DynamicImage, mode: Mode) -> Result<ScreenshotReport> {
        let (panel_roi, panel) = self.menu.crop_panel(screenshot)?;
        info!("Panel {}x{} at ({}, {})", panel_roi.width, panel_roi.height, panel_roi.x, panel_roi.y);

        let rows = self.splitter.split(&panel, self.templates.get(mode))?;
        if rows.is_empty() {
            info!("No rows detected in panel");
        } else {
            info!("Detected {} rows", rows.len());
        }

        Ok(ScreenshotReport {
            mode,
            panel: panel_roi,
            rows: self.read_rows(&rows, mode),
        })
    }

    /// Rows are read in parallel; output keeps the input order
    pub fn read_rows(&self, rows: &[RgbImage], mode: Mode) -> Vec<RowOutcome> {
        rows.par_iter()
            .enumerate()
            .map(|(index, row)| self.read_row(index, row, mode))
            .collect()
    }

    pub fn read_row(&self, index: usize, row: &RgbImage, mode: Mode) -> RowOutcome {
        let parsed = match self.engine.detect_text(row) {
            Ok(tokens) => self.parser.parse(mode, &tokens, row.width(), row.height()),
            Err(e) => ParsedText {
                issues: vec![RowIssue::OcrFailed(e.to_string())],
                ..ParsedText::default()
            },
        };

        let (record, issues) = match mode {
            Mode::Overall => parsed.into_overall(),
            Mode::BossSpecific => {
                let (team, team_issue) = self.read_team(row);
                let (record, mut issues) = parsed.into_boss_specific(team);
                issues.extend(team_issue);
                (record, issues)
            }
        };

        for issue in &issues {
            warn!("Row {}: {}", index + 1, issue);
        }

        RowOutcome { index, record, issues }
    }

    /// Team composition from the row portraits, left to right
    fn read_team(&self, row: &RgbImage) -> (TeamComposition, Option<RowIssue>) {
        let mut portraits = match self.segmenter.segment(row) {
            Ok(portraits) => portraits,
            Err(e) => return (TeamComposition::Unavailable, Some(RowIssue::PortraitsFailed(e.to_string()))),
        };

        debug!("Segmented {} portraits", portraits.len());
        let expected = self.segmentation.expected_portraits;
        if portraits.len() != expected {
            return (
                TeamComposition::Unavailable,
                Some(RowIssue::PortraitCountMismatch {
                    expected,
                    found: portraits.len(),
                }),
            );
        }

        portraits.sort_by_key(|p| p.roi.x);
        // Leftmost portrait is the boss icon
        let skip = usize::from(self.segmentation.skip_first_portrait);

        let matched: Result<Vec<String>> = portraits
            .get(skip..)
            .unwrap_or_default()
            .par_iter()
            .map(|p| {
                let probe = DynamicImage::ImageRgb8(p.image.clone());
                self.matcher.identify(&probe).map(|m| m.id)
            })
            .collect();

        match matched {
            Ok(ids) => {
                debug!("Team: {:?}", ids);
                (TeamComposition::Matched(ids), None)
            }
            Err(e) => (TeamComposition::Unavailable, Some(RowIssue::PortraitsFailed(e.to_string()))),
        }
    }
}
