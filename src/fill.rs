use crate::deck::{Paragraph, Run, RunFont, Table, TextFrame};
use crate::error::{GenerationReport, WarnCode};
use crate::format::ERROR_SENTINEL;
use crate::mapping::{CellContent, CellRule, Style};
use crate::record::{RecordContext, Resolved, display_value};

/// Writes `new_text` into a frame. With an empty pattern the whole frame
/// is overwritten; with a marker pattern only paragraphs containing it are
/// rewritten. Either way the affected paragraph collapses to a single run
/// that inherits the font of the paragraph's first original run, so the
/// template's formatting survives the substitution.
pub fn set_text(frame: &mut TextFrame, pattern: &str, new_text: &str, style: Option<Style>) {
    if pattern.is_empty() {
        let font = first_font(frame);
        frame.paragraphs = vec![Paragraph {
            runs: vec![Run {
                text: new_text.to_string(),
                font,
            }],
        }];
    } else {
        for paragraph in &mut frame.paragraphs {
            let text = paragraph.text();
            if !text.contains(pattern) {
                continue;
            }
            let font = paragraph
                .runs
                .first()
                .map(|r| r.font.clone())
                .unwrap_or_default();
            paragraph.runs = vec![Run {
                text: text.replace(pattern, new_text),
                font,
            }];
        }
    }
    if let Some(style) = style {
        apply_style(frame, style);
    }
}

fn first_font(frame: &TextFrame) -> RunFont {
    frame
        .paragraphs
        .iter()
        .flat_map(|p| p.runs.first())
        .next()
        .map(|r| r.font.clone())
        .unwrap_or_default()
}

// Style overrides hit every run so repeated fills stay idempotent.
fn apply_style(frame: &mut TextFrame, style: Style) {
    for paragraph in &mut frame.paragraphs {
        for run in &mut paragraph.runs {
            if let Some(family) = style.family {
                run.font.family = Some(family.to_string());
            }
            if let Some(size) = style.size {
                run.font.size = Some(size);
            }
            if let Some(bold) = style.bold {
                run.font.bold = Some(bold);
            }
        }
    }
}

/// Applies one table's cell rules against a record. Out-of-bounds cells
/// and formatter failures degrade to warnings; the rest of the table
/// still fills.
pub fn fill_table(
    table_name: &str,
    table: &mut Table,
    cells: &[CellRule],
    ctx: &RecordContext<'_>,
    report: &mut GenerationReport,
) {
    for rule in cells {
        if rule.row >= table.rows || rule.col >= table.cols {
            report.warn(
                WarnCode::CellOutOfBounds,
                format!(
                    "{}[{},{}] outside {}x{} table",
                    table_name, rule.row, rule.col, table.rows, table.cols
                ),
            );
            continue;
        }
        let text = match &rule.content {
            CellContent::Header(label) => (*label).to_string(),
            CellContent::Data { path, formatter } => {
                let resolved = ctx.resolve_spec(path);
                match formatter {
                    Some(formatter) => match formatter.apply(&resolved, ctx) {
                        Ok(text) => text,
                        Err(err) => {
                            report.warn(
                                WarnCode::FormatterFailed,
                                format!(
                                    "{} at {}[{},{}]: {}",
                                    formatter.as_str(),
                                    table_name,
                                    rule.row,
                                    rule.col,
                                    err.message
                                ),
                            );
                            ERROR_SENTINEL.to_string()
                        }
                    },
                    None => unformatted(&resolved),
                }
            }
        };
        if let Some(cell) = table.cell_mut(rule.row, rule.col) {
            set_text(&mut cell.frame, "", &text, Some(rule.style));
        }
    }
}

/// Display for a resolved value with no formatter attached.
pub fn unformatted(resolved: &Resolved) -> String {
    match resolved {
        Resolved::One(value) => display_value(value),
        Resolved::Many(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(display_value)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(", ")
        }
    }
}
