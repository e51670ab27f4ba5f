//! Deterministic template filling and page replication for slide-deck
//! style reports.
//!
//! A deck template carries two pages: a cover and a detail layout. A
//! [`DeckFill`] run substitutes document fields into the cover, then
//! replicates the detail page once per data record and fills each copy
//! through a declarative [`mapping::RuleSet`]. One run over N records
//! always yields 1 + N pages.
//!
//! Anything that would merely degrade a page (a missing target, a
//! formatter fed the wrong shape, an unfetchable image) is absorbed into
//! the [`GenerationReport`]; only structural problems abort the run.
//!
//! ```no_run
//! use deckfill::DeckFill;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), deckfill::DeckFillError> {
//! let engine = DeckFill::builder().build()?;
//! let template = std::fs::read("template.deck.xml")?;
//! let records = vec![json!({"articleDetail": {"aptName": "은마아파트"}})];
//! let fields = json!({"documentTitle": "매물 브리핑"});
//! let output = engine.generate(&template, &records, &fields, None)?;
//! std::fs::write("out.deck.xml", &output.bytes)?;
//! # Ok(())
//! # }
//! ```

mod assemble;
mod clone;
mod debug;
mod fill;
mod locate;

pub mod deck;
pub mod error;
pub mod format;
pub mod images;
pub mod mapping;
pub mod record;
pub mod template;
pub mod types;

pub use error::{DeckFillError, GenerationReport, WarnCode, Warning};
pub use images::{FetchError, ImageFetcher, NoFetch};
pub use mapping::RuleSet;

use assemble::AssembleParams;
use debug::DebugLogger;
use images::DEFAULT_IMAGE_BASE;
use serde_json::Value;
use std::path::{Path, PathBuf};

const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// The configured engine. Construct through [`DeckFill::builder`].
pub struct DeckFill {
    rules: RuleSet,
    fetcher: Box<dyn ImageFetcher>,
    image_base: String,
    fetch_timeout_ms: u64,
    strip_placeholders: Vec<String>,
    debug: Option<DebugLogger>,
}

pub struct GenerationOutput {
    pub bytes: Vec<u8>,
    pub report: GenerationReport,
}

impl DeckFill {
    pub fn builder() -> DeckFillBuilder {
        DeckFillBuilder::new()
    }

    /// Fills a template against `records` and document `fields` and
    /// returns the serialized deck plus the degradation report.
    /// `shared_image` is fetched once and placed on every detail page.
    pub fn generate(
        &self,
        template: &[u8],
        records: &[Value],
        fields: &Value,
        shared_image: Option<&str>,
    ) -> Result<GenerationOutput, DeckFillError> {
        let mut deck = template::parse(template)?;
        if deck.pages.len() < 2 {
            return Err(DeckFillError::MissingDetailPage);
        }
        if records.is_empty() {
            return Err(DeckFillError::NoRecords);
        }
        let params = AssembleParams {
            rules: &self.rules,
            fetcher: self.fetcher.as_ref(),
            image_base: &self.image_base,
            fetch_timeout_ms: self.fetch_timeout_ms,
            strip_placeholders: &self.strip_placeholders,
            debug: self.debug.as_ref(),
        };
        let report = assemble::assemble(&mut deck, records, fields, shared_image, &params);
        if let Some(logger) = &self.debug {
            logger.emit_summary("generate");
        }
        let bytes = template::serialize(&deck)?;
        Ok(GenerationOutput { bytes, report })
    }

    /// As [`generate`](DeckFill::generate), writing the result to disk.
    /// A partially written file is removed on failure.
    pub fn generate_to_path(
        &self,
        template: &[u8],
        records: &[Value],
        fields: &Value,
        shared_image: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<GenerationReport, DeckFillError> {
        let output = self.generate(template, records, fields, shared_image)?;
        let path = path.as_ref();
        if let Err(err) = std::fs::write(path, &output.bytes) {
            let _ = std::fs::remove_file(path);
            return Err(err.into());
        }
        Ok(output.report)
    }
}

pub struct DeckFillBuilder {
    rules: Option<RuleSet>,
    fetcher: Option<Box<dyn ImageFetcher>>,
    image_base: String,
    fetch_timeout_ms: u64,
    strip_placeholders: Vec<String>,
    debug_path: Option<PathBuf>,
}

impl DeckFillBuilder {
    fn new() -> DeckFillBuilder {
        DeckFillBuilder {
            rules: None,
            fetcher: None,
            image_base: DEFAULT_IMAGE_BASE.to_string(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            strip_placeholders: vec![
                "Title Placeholder".to_string(),
                "Subtitle Placeholder".to_string(),
            ],
            debug_path: None,
        }
    }

    /// Replaces the built-in [`RuleSet::standard`] mapping.
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Installs an image fetcher. Without one, image rules degrade to
    /// `IMAGE_FETCH_FAILED` warnings.
    pub fn fetcher(mut self, fetcher: Box<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Origin for root-relative image paths.
    pub fn image_base(mut self, base: impl Into<String>) -> Self {
        self.image_base = base.into();
        self
    }

    pub fn fetch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = timeout_ms;
        self
    }

    /// Adds an element-name prefix dropped from replicated pages.
    pub fn strip_placeholder(mut self, prefix: impl Into<String>) -> Self {
        self.strip_placeholders.push(prefix.into());
        self
    }

    /// Enables the line-delimited JSON trace at `path`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<DeckFill, DeckFillError> {
        let rules = self.rules.unwrap_or_else(RuleSet::standard);
        if rules.is_empty() {
            return Err(DeckFillError::EmptyRuleSet);
        }
        if !self.image_base.starts_with("http://") && !self.image_base.starts_with("https://") {
            return Err(DeckFillError::InvalidConfiguration(format!(
                "image base {} is not an http(s) origin",
                self.image_base
            )));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(DeckFillError::InvalidConfiguration(
                "fetch timeout must be positive".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(DeckFill {
            rules,
            fetcher: self.fetcher.unwrap_or(Box::new(NoFetch)),
            image_base: self.image_base,
            fetch_timeout_ms: self.fetch_timeout_ms,
            strip_placeholders: self.strip_placeholders,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Deck, ElementKind};
    use crate::locate::{Target, find};
    use crate::mapping::TargetLocator;
    use base64::Engine;
    use serde_json::json;
    use std::cell::RefCell;

    // 1x1 transparent PNG.
    const TINY_PNG_B64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    struct StubFetcher {
        calls: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn boxed() -> Box<StubFetcher> {
            Box::new(StubFetcher {
                calls: RefCell::new(Vec::new()),
            })
        }
    }

    impl ImageFetcher for StubFetcher {
        fn fetch(&self, url: &str, _timeout_ms: u64) -> Result<Vec<u8>, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            Ok(base64::engine::general_purpose::STANDARD
                .decode(TINY_PNG_B64)
                .unwrap())
        }
    }

    fn table_xml(name: &str, rows: usize, cols: usize) -> String {
        let widths = vec!["2000"; cols].join(",");
        let mut out = format!(
            "<table name=\"{}\" x=\"0\" y=\"0\" w=\"6000\" h=\"3000\" rows=\"{}\" cols=\"{}\" col-widths=\"{}\">",
            name, rows, cols, widths
        );
        for _ in 0..rows {
            out.push_str("<row h=\"600\">");
            for _ in 0..cols {
                out.push_str("<cell><p><r></r></p></cell>");
            }
            out.push_str("</row>");
        }
        out.push_str("</table>");
        out
    }

    fn sample_template() -> Vec<u8> {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<deck width=\"12192000\" height=\"6858000\">\n",
        );
        // Cover page.
        xml.push_str("<page background=\"FFFFFF\">");
        xml.push_str(
            "<textbox name=\"txt_doc_title\" x=\"0\" y=\"0\" w=\"6000\" h=\"400\"><p><r size=\"40\">{{document_title}}</r></p></textbox>",
        );
        xml.push_str(&table_xml("txt_client_name", 1, 1));
        xml.push_str(
            "<textbox name=\"txt_company\" x=\"0\" y=\"800\" w=\"6000\" h=\"400\"><p><r>담당: {{company_name}}</r></p></textbox>",
        );
        xml.push_str("</page>\n");
        // Detail page.
        xml.push_str("<page>");
        xml.push_str(
            "<textbox name=\"txt_property_title\" x=\"0\" y=\"0\" w=\"6000\" h=\"400\"><p><r size=\"32\">층 표제</r></p></textbox>",
        );
        xml.push_str(
            "<textbox name=\"txt_property_page\" x=\"11000\" y=\"6400\" w=\"500\" h=\"300\"><p><r>0</r></p></textbox>",
        );
        xml.push_str("<image name=\"img_complex_view\" x=\"0\" y=\"500\" w=\"3000\" h=\"2000\"/>");
        xml.push_str(
            "<image name=\"img_complex_floorplan\" x=\"3100\" y=\"500\" w=\"3000\" h=\"2000\"/>",
        );
        xml.push_str("<image name=\"img_map\" x=\"6200\" y=\"500\" w=\"3000\" h=\"2000\"/>");
        xml.push_str(&table_xml("tbl_complex_info", 5, 2));
        xml.push_str(&table_xml("tbl_property_detail_1", 5, 2));
        xml.push_str(&table_xml("tbl_property_detail_2", 5, 2));
        xml.push_str("</page>\n</deck>\n");
        xml.into_bytes()
    }

    fn sample_record(apt_name: &str) -> Value {
        json!({
            "articleDetail": {
                "divisionName": "강남구",
                "aptName": apt_name,
                "exposureAddress": "서울 강남구 대치동 316",
                "aptUseApproveYmd": "19791120",
                "aptHouseholdCount": "4424",
                "aptHeatMethodTypeName": "개별난방",
                "aptHeatFuelTypeName": "도시가스",
                "buildingName": "3동",
                "roomCount": "3",
                "bathroomCount": "1",
                "moveInTypeName": "즉시입주",
                "tagList": ["역세권", "대단지"],
                "grandPlanList": [{"imageType": "14", "imageSrc": "/plan/a.png"}]
            },
            "articleAddition": {
                "representativeImgUrl": "//img.example.com/rep.jpg",
                "floorInfo": "5/14",
                "direction": "남향",
                "dealOrWarrantPrc": "1억",
                "rentPrc": "500"
            },
            "articleFloor": {"buildingHighestFloor": "14"},
            "articleSpace": {"supplySpace": 76.79, "exclusiveSpace": 59.5},
            "articlePrice": {"warrantPrice": 10000, "rentPrice": 500}
        })
    }

    fn sample_fields() -> Value {
        json!({
            "documentTitle": "매물 브리핑",
            "clientName": "김영희",
            "companyName": "한빛공인중개사"
        })
    }

    fn text_of(deck: &Deck, page: usize, name: &'static str) -> String {
        match find(deck, page, &TargetLocator::Name(name)) {
            Some(Target::Node(id)) => deck.element(id).frame().unwrap().text(),
            other => panic!("{} on page {}: {:?}", name, page, other),
        }
    }

    fn cell_text(deck: &Deck, page: usize, table: &'static str, row: usize, col: usize) -> String {
        let Some(Target::Node(id)) = find(deck, page, &TargetLocator::Name(table)) else {
            panic!("table {} missing on page {}", table, page);
        };
        match &deck.element(id).kind {
            ElementKind::Table(t) => t.cell(row, col).unwrap().frame.text(),
            other => panic!("{} is not a table: {:?}", table, other),
        }
    }

    #[test]
    fn three_records_make_four_pages() {
        let engine = DeckFill::builder().fetcher(StubFetcher::boxed()).build().unwrap();
        let records = vec![
            sample_record("은마아파트"),
            sample_record("래미안"),
            sample_record("힐스테이트"),
        ];
        let output = engine
            .generate(
                &sample_template(),
                &records,
                &sample_fields(),
                Some("/map/area.png"),
            )
            .unwrap();
        assert_eq!(output.report.page_count, 4);
        assert_eq!(output.report.record_count, 3);
        assert!(output.report.warnings.is_empty(), "{:?}", output.report.warnings);

        let deck = template::parse(&output.bytes).unwrap();
        assert_eq!(deck.pages.len(), 4);

        // Cover substitutions.
        assert_eq!(text_of(&deck, 0, "txt_doc_title"), "매물 브리핑");
        assert_eq!(text_of(&deck, 0, "txt_company"), "담당: 한빛공인중개사");
        assert_eq!(cell_text(&deck, 0, "txt_client_name", 0, 0), "김영희");

        // Detail titles carry the 1-based sequence.
        assert_eq!(text_of(&deck, 1, "txt_property_title"), "No.1 [강남구] 은마아파트");
        assert_eq!(text_of(&deck, 2, "txt_property_title"), "No.2 [강남구] 래미안");
        assert_eq!(text_of(&deck, 3, "txt_property_title"), "No.3 [강남구] 힐스테이트");
        assert_eq!(text_of(&deck, 3, "txt_property_page"), "3");

        // Table content.
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 0, 0), "단지주소");
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 1, 1), "1979년 11월");
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 2, 1), "4424세대");
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 3, 1), "14층");
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 4, 1), "개별난방, 도시가스");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_1", 0, 1), "3동 5층");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_1", 3, 1), "3 / 1");
        assert_eq!(cell_text(&deck, 2, "tbl_property_detail_2", 0, 1), "1억 / 500 (만원)");
        assert_eq!(cell_text(&deck, 2, "tbl_property_detail_2", 2, 1), "즉시입주");
        assert_eq!(cell_text(&deck, 2, "tbl_property_detail_2", 4, 1), "역세권, 대단지");

        // Every detail page got its images, including the shared map.
        for page in 1..4 {
            for name in ["img_complex_view", "img_complex_floorplan", "img_map"] {
                let Some(Target::Node(id)) = find(&deck, page, &TargetLocator::Name(name)) else {
                    panic!("{} missing on page {}", name, page);
                };
                match &deck.element(id).kind {
                    ElementKind::Image { resource, .. } => {
                        assert!(deck.resource(resource.as_deref().unwrap()).is_some());
                    }
                    other => panic!("{} on page {}: {:?}", name, page, other),
                }
            }
        }
        // One payload, one stored resource.
        assert_eq!(deck.resources.len(), 1);
    }

    #[test]
    fn structural_errors_abort() {
        let engine = DeckFill::builder().build().unwrap();
        let one_page = b"<deck width=\"1\" height=\"1\"><page/></deck>".to_vec();
        assert!(matches!(
            engine.generate(&one_page, &[sample_record("x")], &sample_fields(), None),
            Err(DeckFillError::MissingDetailPage)
        ));
        assert!(matches!(
            engine.generate(&sample_template(), &[], &sample_fields(), None),
            Err(DeckFillError::NoRecords)
        ));
        assert!(matches!(
            engine.generate(b"garbage", &[sample_record("x")], &sample_fields(), None),
            Err(DeckFillError::TemplateUnreadable(_))
        ));
    }

    #[test]
    fn missing_targets_degrade_to_warnings() {
        let engine = DeckFill::builder().fetcher(StubFetcher::boxed()).build().unwrap();
        let mut xml = String::from_utf8(sample_template()).unwrap();
        xml = xml.replace("txt_property_title", "txt_renamed");
        let output = engine
            .generate(xml.as_bytes(), &[sample_record("은마아파트")], &sample_fields(), None)
            .unwrap();
        assert_eq!(output.report.page_count, 2);
        assert_eq!(output.report.count(WarnCode::TargetNotFound), 1);
    }

    #[test]
    fn default_fetcher_reports_fetch_failures() {
        let engine = DeckFill::builder().build().unwrap();
        let output = engine
            .generate(
                &sample_template(),
                &[sample_record("은마아파트")],
                &sample_fields(),
                Some("/map/area.png"),
            )
            .unwrap();
        // Representative, floor plan, and shared map all fail to fetch.
        assert_eq!(output.report.count(WarnCode::ImageFetchFailed), 3);
        let deck = template::parse(&output.bytes).unwrap();
        assert_eq!(deck.pages.len(), 2);
        assert!(deck.resources.is_empty());
    }

    #[test]
    fn empty_record_fills_defaults() {
        let engine = DeckFill::builder().build().unwrap();
        let output = engine
            .generate(&sample_template(), &[json!({})], &sample_fields(), None)
            .unwrap();
        let deck = template::parse(&output.bytes).unwrap();
        assert_eq!(text_of(&deck, 1, "txt_property_title"), "No.1 [N/A] N/A");
        assert_eq!(cell_text(&deck, 1, "tbl_complex_info", 2, 1), "정보 없음");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_2", 0, 1), "가격 정보 없음");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_2", 1, 1), "확인 어려움");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_2", 3, 1), "내용 없음");
        assert_eq!(cell_text(&deck, 1, "tbl_property_detail_2", 4, 1), "특이사항 없음");
    }

    #[test]
    fn non_object_record_is_skipped() {
        let engine = DeckFill::builder().build().unwrap();
        let records = vec![sample_record("은마아파트"), json!(null)];
        let output = engine
            .generate(&sample_template(), &records, &sample_fields(), None)
            .unwrap();
        assert_eq!(output.report.page_count, 3);
        assert_eq!(output.report.count(WarnCode::RecordFailed), 1);
        let deck = template::parse(&output.bytes).unwrap();
        // The skipped record's page keeps the template text.
        assert_eq!(text_of(&deck, 2, "txt_property_title"), "층 표제");
    }

    #[test]
    fn shared_image_reaches_skipped_record_pages() {
        let engine = DeckFill::builder().fetcher(StubFetcher::boxed()).build().unwrap();
        let records = vec![sample_record("은마아파트"), json!(null)];
        let output = engine
            .generate(
                &sample_template(),
                &records,
                &sample_fields(),
                Some("/map/area.png"),
            )
            .unwrap();
        assert_eq!(output.report.count(WarnCode::RecordFailed), 1);
        let deck = template::parse(&output.bytes).unwrap();
        // Page 2's record was skipped, but the map is per-page, not
        // per-record.
        for page in 1..3 {
            let Some(Target::Node(id)) = find(&deck, page, &TargetLocator::Name("img_map")) else {
                panic!("img_map missing on page {}", page);
            };
            match &deck.element(id).kind {
                ElementKind::Image { resource, .. } => {
                    assert!(deck.resource(resource.as_deref().unwrap()).is_some());
                }
                other => panic!("img_map on page {}: {:?}", page, other),
            }
        }
    }

    #[test]
    fn builder_validates_configuration() {
        assert!(matches!(
            DeckFill::builder().image_base("ftp://x").build(),
            Err(DeckFillError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DeckFill::builder().fetch_timeout_ms(0).build(),
            Err(DeckFillError::InvalidConfiguration(_))
        ));
        let empty = RuleSet {
            cover: Vec::new(),
            detail: Vec::new(),
            tables: Vec::new(),
            shared_image_element: "img_map",
        };
        assert!(matches!(
            DeckFill::builder().rules(empty).build(),
            Err(DeckFillError::EmptyRuleSet)
        ));
    }
}
