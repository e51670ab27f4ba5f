use crate::clone::clone_page;
use crate::debug::DebugLogger;
use crate::deck::{Deck, ElementKind};
use crate::error::{GenerationReport, WarnCode};
use crate::fill::{fill_table, set_text, unformatted};
use crate::format::ERROR_SENTINEL;
use crate::images::{ImageFetcher, normalize_source, place_image};
use crate::locate::{find, target_frame_mut};
use crate::mapping::{MappingRule, RuleSet, TargetLocator};
use crate::record::RecordContext;
use serde_json::Value;

pub struct AssembleParams<'a> {
    pub rules: &'a RuleSet,
    pub fetcher: &'a dyn ImageFetcher,
    pub image_base: &'a str,
    pub fetch_timeout_ms: u64,
    pub strip_placeholders: &'a [String],
    pub debug: Option<&'a DebugLogger>,
}

/// Runs the whole fill over a parsed deck: cover rules against document
/// fields on page 0, then one detail page per record replicated from
/// page 1. The caller guarantees at least two template pages and one
/// record. Output is always 1 + N pages.
pub fn assemble(
    deck: &mut Deck,
    records: &[Value],
    fields: &Value,
    shared_image: Option<&str>,
    params: &AssembleParams<'_>,
) -> GenerationReport {
    let mut report = GenerationReport {
        record_count: records.len(),
        ..GenerationReport::default()
    };

    let cover_ctx = RecordContext::cover(fields);
    for rule in &params.rules.cover {
        apply_rule(deck, 0, rule, &cover_ctx, params, &mut report);
    }

    // Only the cover and the first detail page survive; replicas are
    // cloned from the pristine detail template before any record touches
    // it, so record order can never bleed between pages.
    deck.pages.truncate(2);
    for _ in 1..records.len() {
        clone_page(deck, 1, params.strip_placeholders, &mut report);
    }

    let shared_bytes = shared_image
        .and_then(|raw| normalize_source(raw, params.image_base))
        .and_then(|url| {
            match params.fetcher.fetch(&url, params.fetch_timeout_ms) {
                Ok(bytes) => {
                    debug_event(params, "image.shared_fetched", &url);
                    Some((url, bytes))
                }
                Err(err) => {
                    report.warn(
                        WarnCode::ImageFetchFailed,
                        format!("shared image {}: {}", url, err.message),
                    );
                    None
                }
            }
        });

    for (index, record) in records.iter().enumerate() {
        let page = 1 + index;
        if !record.is_object() {
            report.warn(
                WarnCode::RecordFailed,
                format!("record {} is not an object", index),
            );
            debug_event(params, "record.failed", &index.to_string());
            continue;
        }
        let ctx = RecordContext {
            data: record,
            fields,
            sequence: index + 1,
        };
        for rule in &params.rules.detail {
            apply_rule(deck, page, rule, &ctx, params, &mut report);
        }
        for table_rule in &params.rules.tables {
            let locator = TargetLocator::Name(table_rule.table);
            let Some(crate::locate::Target::Node(node)) = find(deck, page, &locator) else {
                report.warn(
                    WarnCode::TargetNotFound,
                    format!("table {} on page {}", table_rule.table, page),
                );
                continue;
            };
            match &mut deck.element_mut(node).kind {
                ElementKind::Table(table) => {
                    fill_table(table_rule.table, table, &table_rule.cells, &ctx, &mut report);
                }
                _ => {
                    report.warn(
                        WarnCode::TargetNotText,
                        format!("{} on page {} is not a table", table_rule.table, page),
                    );
                }
            }
        }
    }

    // The shared image lands on every detail page, including pages whose
    // record was skipped.
    if let Some((url, bytes)) = &shared_bytes {
        let locator = TargetLocator::Name(params.rules.shared_image_element);
        for page in 1..deck.pages.len() {
            match find(deck, page, &locator) {
                Some(target) => {
                    place_image(deck, target, url, bytes.clone(), &mut report);
                }
                None => {
                    report.warn(
                        WarnCode::TargetNotFound,
                        format!(
                            "{} on page {}",
                            params.rules.shared_image_element, page
                        ),
                    );
                }
            }
        }
    }

    report.page_count = deck.pages.len();
    report
}

fn apply_rule(
    deck: &mut Deck,
    page: usize,
    rule: &MappingRule,
    ctx: &RecordContext<'_>,
    params: &AssembleParams<'_>,
    report: &mut GenerationReport,
) {
    let Some(target) = find(deck, page, &rule.target) else {
        report.warn(
            WarnCode::TargetNotFound,
            format!("{} on page {}", rule.target.describe(), page),
        );
        debug_event(params, "rule.target_missing", &rule.target.describe());
        return;
    };

    let resolved = ctx.resolve_spec(&rule.path);
    let text = match &rule.formatter {
        Some(formatter) => match formatter.apply(&resolved, ctx) {
            Ok(text) => text,
            Err(err) => {
                report.warn(
                    WarnCode::FormatterFailed,
                    format!(
                        "{} for {}: {}",
                        formatter.as_str(),
                        rule.target.describe(),
                        err.message
                    ),
                );
                debug_event(params, "formatter.error", formatter.as_str());
                if rule.is_image {
                    return;
                }
                ERROR_SENTINEL.to_string()
            }
        },
        None => unformatted(&resolved),
    };

    if rule.is_image {
        // An empty or absent source is a normal record shape, not a fault.
        let Some(url) = normalize_source(&text, params.image_base) else {
            debug_event(params, "image.no_source", &rule.target.describe());
            return;
        };
        match params.fetcher.fetch(&url, params.fetch_timeout_ms) {
            Ok(bytes) => {
                debug_event(params, "image.fetched", &url);
                place_image(deck, target, &url, bytes, report);
            }
            Err(err) => {
                report.warn(
                    WarnCode::ImageFetchFailed,
                    format!("{}: {}", url, err.message),
                );
            }
        }
        return;
    }

    let pattern = match &rule.target {
        TargetLocator::Marker(marker) => *marker,
        _ => "",
    };
    match target_frame_mut(deck, target) {
        Some(frame) => set_text(frame, pattern, &text, rule.style),
        None => {
            report.warn(
                WarnCode::TargetNotText,
                format!("{} on page {} has no text frame", rule.target.describe(), page),
            );
        }
    }
}

fn debug_event(params: &AssembleParams<'_>, kind: &str, detail: &str) {
    if let Some(logger) = params.debug {
        logger.event(kind, detail);
    }
}
