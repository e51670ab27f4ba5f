use crate::format::Formatter;
use crate::record::PathSpec;

/// Default font family applied by the standard rule set.
pub const GOTHIC: &str = "나눔고딕";

/// How a rule finds its target on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLocator {
    /// Exact element name, groups searched depth-first.
    Name(&'static str),
    /// Placeholder text such as `{{document_title}}`; trimmed-exact match
    /// first, raw substring as a fallback.
    Marker(&'static str),
    /// A cell of a named table.
    Cell {
        table: &'static str,
        row: usize,
        col: usize,
    },
}

impl TargetLocator {
    pub fn describe(&self) -> String {
        match self {
            TargetLocator::Name(name) => format!("name={}", name),
            TargetLocator::Marker(marker) => format!("marker={}", marker),
            TargetLocator::Cell { table, row, col } => {
                format!("cell={}[{},{}]", table, row, col)
            }
        }
    }
}

/// Font overrides applied to every run the rule writes. `None` fields
/// leave the template's formatting alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Style {
    pub family: Option<&'static str>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
}

impl Style {
    pub const fn gothic(size: f32) -> Style {
        Style {
            family: Some(GOTHIC),
            size: Some(size),
            bold: None,
        }
    }

    pub const fn gothic_bold(size: f32) -> Style {
        Style {
            family: Some(GOTHIC),
            size: Some(size),
            bold: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub target: TargetLocator,
    pub path: PathSpec,
    pub formatter: Option<Formatter>,
    pub is_image: bool,
    pub style: Option<Style>,
}

impl MappingRule {
    pub fn text(target: TargetLocator, path: PathSpec) -> MappingRule {
        MappingRule {
            target,
            path,
            formatter: None,
            is_image: false,
            style: None,
        }
    }

    pub fn formatted(mut self, formatter: Formatter) -> MappingRule {
        self.formatter = Some(formatter);
        self
    }

    pub fn styled(mut self, style: Style) -> MappingRule {
        self.style = Some(style);
        self
    }

    pub fn image(target: TargetLocator, path: PathSpec) -> MappingRule {
        MappingRule {
            target,
            path,
            formatter: None,
            is_image: true,
            style: None,
        }
    }
}

/// What a table cell receives: a fixed header label or record data.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Header(&'static str),
    Data {
        path: PathSpec,
        formatter: Option<Formatter>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellRule {
    pub row: usize,
    pub col: usize,
    pub content: CellContent,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRule {
    pub table: &'static str,
    pub cells: Vec<CellRule>,
}

/// The full declarative mapping: cover rules run once against document
/// fields, detail and table rules run once per record.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub cover: Vec<MappingRule>,
    pub detail: Vec<MappingRule>,
    pub tables: Vec<TableRule>,
    /// Element name that receives the run-wide shared image on every
    /// detail page, fetched once.
    pub shared_image_element: &'static str,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.cover.is_empty() && self.detail.is_empty() && self.tables.is_empty()
    }

    /// The built-in mapping for the apartment listing deck.
    pub fn standard() -> RuleSet {
        RuleSet {
            cover: vec![
                MappingRule::text(
                    TargetLocator::Marker("{{document_title}}"),
                    PathSpec::Single("documentTitle"),
                )
                .styled(Style::gothic_bold(24.0)),
                MappingRule::text(
                    TargetLocator::Cell {
                        table: "txt_client_name",
                        row: 0,
                        col: 0,
                    },
                    PathSpec::Single("clientName"),
                )
                .styled(Style::gothic(18.0)),
                MappingRule::text(
                    TargetLocator::Marker("{{company_name}}"),
                    PathSpec::Single("companyName"),
                )
                .styled(Style::gothic(16.0)),
            ],
            detail: vec![
                MappingRule::text(
                    TargetLocator::Name("txt_property_title"),
                    PathSpec::Tuple(&["articleDetail.divisionName", "articleDetail.aptName"]),
                )
                .formatted(Formatter::SequenceTitle)
                .styled(Style::gothic_bold(18.0)),
                MappingRule::text(
                    TargetLocator::Name("txt_property_page"),
                    PathSpec::Literal(""),
                )
                .formatted(Formatter::SequenceNumber)
                .styled(Style::gothic(10.0)),
                MappingRule::image(
                    TargetLocator::Name("img_complex_view"),
                    PathSpec::Single("articleAddition.representativeImgUrl"),
                ),
                MappingRule::image(
                    TargetLocator::Name("img_complex_floorplan"),
                    PathSpec::Single("articleDetail.grandPlanList[0]"),
                )
                .formatted(Formatter::FloorPlanType14),
            ],
            tables: vec![
                TableRule {
                    table: "tbl_complex_info",
                    cells: labelled_rows(&[
                        ("단지주소", PathSpec::Single("articleDetail.exposureAddress"), None),
                        (
                            "준공연도",
                            PathSpec::Single("articleDetail.aptUseApproveYmd"),
                            Some(Formatter::DateYearMonth),
                        ),
                        (
                            "총세대수",
                            PathSpec::Single("articleDetail.aptHouseholdCount"),
                            Some(Formatter::HouseholdCount),
                        ),
                        (
                            "총층수",
                            PathSpec::Single("articleFloor.buildingHighestFloor"),
                            Some(Formatter::FloorCount),
                        ),
                        (
                            "난방방식",
                            PathSpec::Tuple(&[
                                "articleDetail.aptHeatMethodTypeName",
                                "articleDetail.aptHeatFuelTypeName",
                            ]),
                            Some(Formatter::HeatingInfo),
                        ),
                    ]),
                },
                TableRule {
                    table: "tbl_property_detail_1",
                    cells: labelled_rows(&[
                        (
                            "동·호수",
                            PathSpec::Tuple(&[
                                "articleDetail.buildingName",
                                "articleAddition.floorInfo",
                            ]),
                            Some(Formatter::DongHo),
                        ),
                        (
                            "계약면적",
                            PathSpec::Single("articleSpace.supplySpace"),
                            Some(Formatter::AreaWithPyeong),
                        ),
                        (
                            "전용면적",
                            PathSpec::Single("articleSpace.exclusiveSpace"),
                            Some(Formatter::AreaWithPyeong),
                        ),
                        (
                            "방수/욕실수",
                            PathSpec::Tuple(&["articleDetail.roomCount", "articleDetail.bathroomCount"]),
                            Some(Formatter::RoomBath),
                        ),
                        ("방향", PathSpec::Single("articleAddition.direction"), None),
                    ]),
                },
                TableRule {
                    table: "tbl_property_detail_2",
                    cells: labelled_rows(&[
                        (
                            "보증금/월세",
                            PathSpec::Tuple(&[
                                "articlePrice.warrantPrice",
                                "articlePrice.rentPrice",
                                "articleAddition.dealOrWarrantPrc",
                                "articleAddition.rentPrc",
                            ]),
                            Some(Formatter::PriceSummary),
                        ),
                        (
                            "기본관리비",
                            PathSpec::Single("administrationCostInfo.chargeCodeType"),
                            Some(Formatter::ManagementFee),
                        ),
                        (
                            "입주가능일",
                            PathSpec::Tuple(&[
                                "articleDetail.moveInTypeName",
                                "articleDetail.moveInDiscussionPossibleYn",
                            ]),
                            Some(Formatter::MoveIn),
                        ),
                        (
                            "참고사항",
                            PathSpec::Tuple(&[
                                "articleDetail.articleFeatureDescription",
                                "userRemarks",
                            ]),
                            Some(Formatter::FirstNonEmpty),
                        ),
                        (
                            "비고",
                            PathSpec::Tuple(&[
                                "articleDetail.tagList",
                                "articleDetail.detailDescription",
                                "userNotes",
                            ]),
                            Some(Formatter::NoteSummary),
                        ),
                    ]),
                },
            ],
            shared_image_element: "img_map",
        }
    }
}

// Two-column layout: header literal in column 0, data in column 1,
// one table row per entry.
fn labelled_rows(entries: &[(&'static str, PathSpec, Option<Formatter>)]) -> Vec<CellRule> {
    let mut cells = Vec::with_capacity(entries.len() * 2);
    for (row, (label, path, formatter)) in entries.iter().enumerate() {
        cells.push(CellRule {
            row,
            col: 0,
            content: CellContent::Header(label),
            style: Style::gothic_bold(10.0),
        });
        cells.push(CellRule {
            row,
            col: 1,
            content: CellContent::Data {
                path: *path,
                formatter: *formatter,
            },
            style: Style::gothic(10.0),
        });
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rule_set_is_well_formed() {
        let rules = RuleSet::standard();
        assert!(!rules.is_empty());
        assert_eq!(rules.cover.len(), 3);
        assert_eq!(rules.tables.len(), 3);
        for table in &rules.tables {
            assert_eq!(table.cells.len(), 10);
            for cell in &table.cells {
                assert!(cell.row < 5);
                assert!(cell.col < 2);
                if cell.col == 0 {
                    assert!(matches!(cell.content, CellContent::Header(_)));
                }
            }
        }
        let image_rules: Vec<&MappingRule> =
            rules.detail.iter().filter(|r| r.is_image).collect();
        assert_eq!(image_rules.len(), 2);
    }

    #[test]
    fn locator_description_is_stable() {
        assert_eq!(TargetLocator::Name("txt_a").describe(), "name=txt_a");
        assert_eq!(
            TargetLocator::Cell {
                table: "tbl_x",
                row: 1,
                col: 0
            }
            .describe(),
            "cell=tbl_x[1,0]"
        );
    }
}
