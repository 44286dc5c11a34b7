use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{interpret::GradeReport, types::BubbleFeature, types::SheetKind};

/// File name of the bubble export for a sheet, e.g. `key_bubbles.json`.
pub fn bubbles_file_name(kind: SheetKind) -> String {
    format!("{}_bubbles.json", kind)
}

/// Writes bubble features as a JSON array of
/// `{x, y, r, blackCount, whiteCount}` records.
pub fn write_bubble_features<W: Write>(writer: W, features: &[BubbleFeature]) -> io::Result<()> {
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, features)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Exports the bubbles of all three sheets into `dir`, returning the paths
/// written.
pub fn export_report_bubbles(dir: &Path, report: &GradeReport) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    report
        .sheets()
        .iter()
        .map(|sheet| -> io::Result<PathBuf> {
            let path = dir.join(bubbles_file_name(sheet.kind));
            let file = BufWriter::new(File::create(&path)?);
            write_bubble_features(file, &sheet.features())?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bubble_features() {
        let features = [BubbleFeature {
            x: 30,
            y: 40,
            r: 9,
            black_count: 70,
            white_count: 180,
        }];

        let mut out = Vec::new();
        write_bubble_features(&mut out, &features).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"x": 30, "y": 40, "r": 9, "blackCount": 70, "whiteCount": 180}
            ])
        );
    }

    #[test]
    fn test_export_report_bubbles() {
        use crate::config::GradingConfig;
        use crate::interpret::grade;
        use crate::test_utils::{encode_png, render_sheet, SheetLayout};

        let layout = SheetLayout::new(2, 2);
        let template = encode_png(&render_sheet(&layout, &[]));
        let report = grade(&template, &template, &template, &GradingConfig::new(2, 2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = export_report_bubbles(dir.path(), &report).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("template_bubbles.json"),
                dir.path().join("key_bubbles.json"),
                dir.path().join("student_bubbles.json"),
            ]
        );

        let exported: Vec<BubbleFeature> =
            serde_json::from_slice(&std::fs::read(&paths[1]).unwrap()).unwrap();
        assert_eq!(exported, report.key.features());
    }
}
