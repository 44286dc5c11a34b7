use std::fmt::Display;

use image::GrayImage;
use log::info;
use logging_timer::time;
use serde::Serialize;

use crate::{
    calibration::{calibrate, calibrate_parallel, transfer},
    classify::{classify_marks, deviation_threshold},
    config::{ConfigError, GradingConfig},
    features::extract_bubble_features,
    image_utils::{preprocess_image, PreprocessedImage},
    rows::group_rows,
    score::score_answers,
    types::{AnswerVector, BubbleFeature, CalibrationParams, Circle, Row, ScoreResult, SheetKind},
};

/// Everything observed about one sheet while grading it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedSheet {
    pub kind: SheetKind,
    #[serde(skip_serializing)]
    pub image: GrayImage,
    pub circles: Vec<Circle>,
    pub rows: Vec<Row>,
    /// Classified answers; the template is never classified.
    pub answers: Option<Vec<AnswerVector>>,
}

impl InterpretedSheet {
    /// Bubble features in row-major order.
    pub fn features(&self) -> Vec<BubbleFeature> {
        self.rows.iter().flatten().copied().collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub score: ScoreResult,
    pub calibration: CalibrationParams,
    pub deviation_threshold: f64,
    pub template: InterpretedSheet,
    pub key: InterpretedSheet,
    pub student: InterpretedSheet,
}

impl GradeReport {
    pub fn sheets(&self) -> [&InterpretedSheet; 3] {
        [&self.template, &self.key, &self.student]
    }
}

pub type GradeResult = Result<GradeReport, GradeError>;

#[derive(Debug, Clone, PartialEq)]
pub enum GradeError {
    Decode(SheetKind),
    CalibrationNotFound,
    TransferDetectionFailed(SheetKind),
    RowInconsistency(SheetKind),
    InvalidConfig(ConfigError),
}

impl Display for GradeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeError::Decode(kind) => write!(f, "{} sheet: unable to decode image", kind),
            GradeError::CalibrationNotFound => write!(
                f,
                "template sheet: circle detection could not be calibrated to the expected bubble count"
            ),
            GradeError::TransferDetectionFailed(kind) => write!(
                f,
                "{} sheet: expected bubble count not found with the template calibration",
                kind
            ),
            GradeError::RowInconsistency(kind) => write!(
                f,
                "{} sheet: bubbles could not be grouped into consistent rows",
                kind
            ),
            GradeError::InvalidConfig(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for GradeError {}

fn load_sheet(bytes: &[u8], kind: SheetKind) -> Result<PreprocessedImage, GradeError> {
    preprocess_image(bytes).ok_or(GradeError::Decode(kind))
}

fn group_sheet_rows(
    binary: &GrayImage,
    circles: &[Circle],
    kind: SheetKind,
    config: &GradingConfig,
) -> Result<Vec<Row>, GradeError> {
    let features = extract_bubble_features(binary, circles);
    group_rows(&features, config.rows.eps, config.rows.fallback_eps)
        .ok_or(GradeError::RowInconsistency(kind))
}

/// Locates and classifies the bubbles of a filled sheet using the template's
/// calibration and deviation threshold.
#[time]
fn interpret_filled_sheet(
    image: PreprocessedImage,
    kind: SheetKind,
    calibration: &CalibrationParams,
    threshold: f64,
    config: &GradingConfig,
) -> Result<InterpretedSheet, GradeError> {
    let circles = transfer(
        &image.smoothed,
        config.expected_bubbles(),
        calibration,
        &config.search,
    )
    .ok_or(GradeError::TransferDetectionFailed(kind))?;
    info!("{} sheet: found {} bubbles", kind, circles.len());

    let rows = group_sheet_rows(&image.binary, &circles, kind, config)?;
    let answers = classify_marks(&rows, config.options as usize, threshold)
        .ok_or(GradeError::RowInconsistency(kind))?;

    Ok(InterpretedSheet {
        kind,
        image: image.gray,
        circles,
        rows,
        answers: Some(answers),
    })
}

/// Grades a student sheet against an answer key, using a blank template of
/// the same form to calibrate bubble detection.
#[time]
pub fn grade(template: &[u8], key: &[u8], student: &[u8], config: &GradingConfig) -> GradeResult {
    config.validate().map_err(GradeError::InvalidConfig)?;
    let expected = config.expected_bubbles();
    let options = config.options as usize;

    let (template_image, (key_image, student_image)) = rayon::join(
        || load_sheet(template, SheetKind::Template),
        || {
            rayon::join(
                || load_sheet(key, SheetKind::Key),
                || load_sheet(student, SheetKind::Student),
            )
        },
    );
    let template_image = template_image?;
    let key_image = key_image?;
    let student_image = student_image?;

    let calibration = if config.parallel_search {
        calibrate_parallel(&template_image.smoothed, expected, &config.search)
    } else {
        calibrate(&template_image.smoothed, expected, &config.search)
    }
    .ok_or(GradeError::CalibrationNotFound)?;
    info!(
        "template sheet: found {} bubbles (mode radius {})",
        calibration.circles.len(),
        calibration.mode_radius
    );

    let template_rows = group_sheet_rows(
        &template_image.binary,
        &calibration.circles,
        SheetKind::Template,
        config,
    )?;
    let threshold = deviation_threshold(&template_rows, options)
        .ok_or(GradeError::RowInconsistency(SheetKind::Template))?;

    let (key_result, student_result) = rayon::join(
        || {
            interpret_filled_sheet(
                key_image,
                SheetKind::Key,
                &calibration.params,
                threshold,
                config,
            )
        },
        || {
            interpret_filled_sheet(
                student_image,
                SheetKind::Student,
                &calibration.params,
                threshold,
                config,
            )
        },
    );
    let key_sheet = key_result?;
    let student_sheet = student_result?;

    let score = score_answers(
        key_sheet.answers.as_deref().unwrap_or_default(),
        student_sheet.answers.as_deref().unwrap_or_default(),
    );
    info!("score: {} / {}", score.total, config.questions);

    Ok(GradeReport {
        score,
        calibration: calibration.params,
        deviation_threshold: threshold,
        template: InterpretedSheet {
            kind: SheetKind::Template,
            image: template_image.gray,
            circles: calibration.circles,
            rows: template_rows,
            answers: None,
        },
        key: key_sheet,
        student: student_sheet,
    })
}
