use crate::record::{RecordContext, Resolved, display_value, value_f64};
use serde_json::Value;
use std::fmt;

/// Written into a target when a formatter fails; generation continues.
pub const ERROR_SENTINEL: &str = "오류";
/// The "no data" display used by formatters whose input is absent.
pub const NO_DATA: &str = "정보 없음";

const NO_CONTENT: &str = "내용 없음";
const NO_REMARK: &str = "특이사항 없음";
const FEE_UNKNOWN: &str = "확인 어려움";
const PRICE_UNKNOWN: &str = "가격 정보 없음";

/// One pyeong in square meters. The reference data pipeline carried three
/// slightly different divisors; every conversion here goes through this one.
pub const PYEONG_DIVISOR: f64 = 3.3058;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterError {
    pub message: String,
}

impl FormatterError {
    fn new(message: impl Into<String>) -> FormatterError {
        FormatterError {
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "formatter error: {}", self.message)
    }
}

impl std::error::Error for FormatterError {}

/// Closed set of display formatters. Each is pure: the same resolved
/// input and context always produce the same string, and failure is a
/// `FormatterError` the caller replaces with the error sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// `"20201020"` -> `"2020년 10월"`.
    DateYearMonth,
    /// `n` -> `"n세대"`.
    HouseholdCount,
    /// `n` -> `"n층"`.
    FloorCount,
    /// `(method, fuel)` -> `"method, fuel"`, or whichever is present.
    HeatingInfo,
    /// `(building, "12/15")` -> `"building 12층"`; 저층/중층/고층 pass through.
    DongHo,
    /// m² with two decimals, `"-"` when unparsable.
    AreaM2,
    /// m² converted to pyeong, two decimals, `"-"` when unparsable.
    AreaPyeong,
    /// `162.12` -> `"162.12㎡ (49.0평)"`.
    AreaWithPyeong,
    /// `(rooms, baths)` -> `"rooms / baths"` with `"0"` defaults.
    RoomBath,
    /// `(warrant, rent, warrant_text, rent_text)` -> `"1억 / 500 (만원)"`.
    PriceSummary,
    /// Non-empty value passes through, otherwise `"확인 어려움"`.
    ManagementFee,
    /// `(move_in_date, negotiable_yn)` move-in availability.
    MoveIn,
    /// `(division, name)` + record sequence -> `"No.3 [division] name"`.
    SequenceTitle,
    /// The record's 1-based sequence number.
    SequenceNumber,
    /// First candidate with a non-empty, non-"정보 없음" display.
    FirstNonEmpty,
    /// `(tags, description, manual_note)` remark synthesis.
    NoteSummary,
    /// Floor-plan entry passes only when its image type is `"14"`.
    FloorPlanType14,
}

impl Formatter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formatter::DateYearMonth => "date_year_month",
            Formatter::HouseholdCount => "household_count",
            Formatter::FloorCount => "floor_count",
            Formatter::HeatingInfo => "heating_info",
            Formatter::DongHo => "dong_ho",
            Formatter::AreaM2 => "area_m2",
            Formatter::AreaPyeong => "area_pyeong",
            Formatter::AreaWithPyeong => "area_with_pyeong",
            Formatter::RoomBath => "room_bath",
            Formatter::PriceSummary => "price_summary",
            Formatter::ManagementFee => "management_fee",
            Formatter::MoveIn => "move_in",
            Formatter::SequenceTitle => "sequence_title",
            Formatter::SequenceNumber => "sequence_number",
            Formatter::FirstNonEmpty => "first_non_empty",
            Formatter::NoteSummary => "note_summary",
            Formatter::FloorPlanType14 => "floor_plan_type14",
        }
    }

    pub fn apply(&self, resolved: &Resolved, ctx: &RecordContext<'_>) -> Result<String, FormatterError> {
        match self {
            Formatter::DateYearMonth => Ok(date_year_month(&display_value(one(resolved)?))),
            Formatter::HouseholdCount => Ok(suffixed(one(resolved)?, "세대")),
            Formatter::FloorCount => Ok(suffixed(one(resolved)?, "층")),
            Formatter::HeatingInfo => {
                let values = many(resolved, 2)?;
                let method = display_value(&values[0]);
                let fuel = display_value(&values[1]);
                Ok(match (method.is_empty(), fuel.is_empty()) {
                    (false, false) => format!("{}, {}", method, fuel),
                    (false, true) => method,
                    (true, false) => fuel,
                    (true, true) => String::new(),
                })
            }
            Formatter::DongHo => {
                let values = many(resolved, 2)?;
                let building = display_value(&values[0]);
                let floor = floor_display(&display_value(&values[1]));
                Ok(format!("{} {}", building, floor).trim().to_string())
            }
            Formatter::AreaM2 => Ok(match value_f64(one(resolved)?) {
                Some(v) => format!("{:.2}", v),
                None => "-".to_string(),
            }),
            Formatter::AreaPyeong => Ok(match value_f64(one(resolved)?) {
                Some(v) => format!("{:.2}", v / PYEONG_DIVISOR),
                None => "-".to_string(),
            }),
            Formatter::AreaWithPyeong => {
                let value = one(resolved)?;
                Ok(match value_f64(value) {
                    Some(v) if v > 0.0 => {
                        format!("{}㎡ ({:.1}평)", trim_float(v), v / PYEONG_DIVISOR)
                    }
                    _ => String::new(),
                })
            }
            Formatter::RoomBath => {
                let values = many(resolved, 2)?;
                let rooms = non_empty_or(&display_value(&values[0]), "0");
                let baths = non_empty_or(&display_value(&values[1]), "0");
                Ok(format!("{} / {}", rooms, baths))
            }
            Formatter::PriceSummary => price_summary(many(resolved, 4)?),
            Formatter::ManagementFee => {
                let display = display_value(one(resolved)?);
                Ok(if display.is_empty() {
                    FEE_UNKNOWN.to_string()
                } else {
                    display
                })
            }
            Formatter::MoveIn => {
                let values = many(resolved, 2)?;
                let date = display_value(&values[0]);
                let negotiable = display_value(&values[1]);
                if date.trim() == "즉시입주" {
                    return Ok("즉시입주".to_string());
                }
                if negotiable.eq_ignore_ascii_case("y") {
                    return Ok("입주협의가능".to_string());
                }
                if !date.trim().is_empty() {
                    return Ok(date);
                }
                Ok(NO_DATA.to_string())
            }
            Formatter::SequenceTitle => {
                let values = many(resolved, 2)?;
                let division = non_empty_or(&display_value(&values[0]), "N/A");
                let name = non_empty_or(&display_value(&values[1]), "N/A");
                Ok(format!("No.{} [{}] {}", ctx.sequence, division, name))
            }
            Formatter::SequenceNumber => Ok(ctx.sequence.to_string()),
            Formatter::FirstNonEmpty => {
                let values = many(resolved, 1)?;
                for value in values {
                    let display = display_value(value);
                    if !display.is_empty() && display != NO_DATA {
                        return Ok(display);
                    }
                }
                Ok(NO_CONTENT.to_string())
            }
            Formatter::NoteSummary => {
                let values = many(resolved, 3)?;
                let manual = display_value(&values[2]);
                if !manual.is_empty() && manual != NO_DATA {
                    return Ok(manual);
                }
                if let Some(tags) = values[0].as_array() {
                    let joined = display_value(&values[0]);
                    if !tags.is_empty() && !joined.is_empty() {
                        return Ok(joined);
                    }
                }
                let description = display_value(&values[1]);
                if !description.is_empty() && description != NO_DATA {
                    return Ok(truncate_chars(&description, 100));
                }
                Ok(NO_REMARK.to_string())
            }
            Formatter::FloorPlanType14 => {
                let entry = one(resolved)?;
                let Some(map) = entry.as_object() else {
                    return Ok(String::new());
                };
                let image_type = map.get("imageType").map(display_value).unwrap_or_default();
                let source = map.get("imageSrc").map(display_value).unwrap_or_default();
                Ok(if image_type == "14" { source } else { String::new() })
            }
        }
    }
}

fn one(resolved: &Resolved) -> Result<&Value, FormatterError> {
    match resolved {
        Resolved::One(value) => Ok(value),
        Resolved::Many(_) => Err(FormatterError::new("expected a single value, got a tuple")),
    }
}

fn many(resolved: &Resolved, min_len: usize) -> Result<&[Value], FormatterError> {
    match resolved {
        Resolved::Many(values) if values.len() >= min_len => Ok(values),
        Resolved::Many(values) => Err(FormatterError::new(format!(
            "expected at least {} values, got {}",
            min_len,
            values.len()
        ))),
        Resolved::One(_) => Err(FormatterError::new("expected a tuple, got a single value")),
    }
}

fn suffixed(value: &Value, unit: &str) -> String {
    let display = display_value(value);
    if display.is_empty() {
        NO_DATA.to_string()
    } else {
        format!("{}{}", display, unit)
    }
}

fn non_empty_or(display: &str, default: &str) -> String {
    if display.is_empty() {
        default.to_string()
    } else {
        display.to_string()
    }
}

fn date_year_month(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() < 6 || !raw.chars().take(6).all(|c| c.is_ascii_digit()) {
        return NO_DATA.to_string();
    }
    let year = &raw[0..4];
    let month = match raw[4..6].parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => m,
        _ => return NO_DATA.to_string(),
    };
    format!("{}년 {}월", year, month)
}

fn floor_display(raw: &str) -> String {
    if raw.contains("저층") || raw.contains("중층") || raw.contains("고층") {
        return raw.split('/').next().unwrap_or(raw).to_string();
    }
    if let Some((level, _total)) = raw.split_once('/') {
        return format!("{}층", level);
    }
    raw.to_string()
}

fn price_summary(values: &[Value]) -> Result<String, FormatterError> {
    let warrant = positive_amount(&values[0])
        .or_else(|| parse_man_amount(&display_value(&values[2])).filter(|v| *v > 0));
    let rent = positive_amount(&values[1])
        .or_else(|| parse_man_amount(&display_value(&values[3])).filter(|v| *v > 0));

    let formatted_warrant = warrant.map(format_man_amount);
    let formatted_rent = rent.map(group_digits);

    Ok(match (formatted_warrant, formatted_rent) {
        (Some(w), Some(r)) => format!("{} / {} (만원)", w, r),
        (Some(w), None) => format!("{} (만원)", w),
        (None, Some(r)) => format!(" / {} (만원)", r),
        (None, None) => PRICE_UNKNOWN.to_string(),
    })
}

fn positive_amount(value: &Value) -> Option<i64> {
    let v = value_f64(value)?;
    if v > 0.0 { Some(v.trunc() as i64) } else { None }
}

/// Canonical parse of a 만원-denominated amount string: an optional 억
/// (ten-thousand) multiplier segment plus a comma-grouped remainder.
/// `"1억 2,000"` -> 12000, `"1억"` -> 10000, `"3,500"` -> 3500.
pub fn parse_man_amount(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some((left, right)) = raw.split_once('억') {
        let eok = parse_grouped(left)?;
        let right = right.trim();
        let remainder = if right.is_empty() {
            0
        } else {
            parse_grouped(right)?
        };
        Some(eok.saturating_mul(10_000).saturating_add(remainder))
    } else {
        parse_grouped(raw)
    }
}

fn parse_grouped(raw: &str) -> Option<i64> {
    let mut out: i64 = 0;
    let mut seen = false;
    for ch in raw.chars() {
        if ch == ',' || ch.is_whitespace() {
            continue;
        }
        let digit = ch.to_digit(10)? as i64;
        out = out.saturating_mul(10).saturating_add(digit);
        seen = true;
    }
    if seen { Some(out) } else { None }
}

/// `12000` -> `"1억 2,000"`, `10000` -> `"1억"`, `3500` -> `"3,500"`.
pub fn format_man_amount(amount: i64) -> String {
    if amount >= 10_000 {
        let eok = amount / 10_000;
        let remainder = amount % 10_000;
        if remainder > 0 {
            format!("{}억 {}", eok, group_digits(remainder))
        } else {
            format!("{}억", eok)
        }
    } else {
        group_digits(amount)
    }
}

fn group_digits(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    let offset = digits.len() % 3;
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && idx % 3 == offset % 3 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// Up to two decimals with trailing zeros trimmed: 162.12, 59.5, 84.
fn trim_float(value: f64) -> String {
    let mut out = format!("{:.2}", value);
    while out.contains('.') && (out.ends_with('0') || out.ends_with('.')) {
        out.pop();
    }
    out
}

fn truncate_chars(raw: &str, limit: usize) -> String {
    if raw.chars().count() <= limit {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(limit).collect();
    out.push_str("...");
    out
}
