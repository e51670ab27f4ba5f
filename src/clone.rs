use crate::deck::{Deck, Element, ElementKind, NodeId, Page, TextFrame};
use crate::error::{GenerationReport, WarnCode};

/// Structurally clones a page and appends the copy, returning its index.
/// Every element is re-created as a fresh arena node, so filling the
/// clone never touches the source. Elements that cannot be copied intact
/// are replaced by a name-preserving text box and reported.
pub fn clone_page(
    deck: &mut Deck,
    page_index: usize,
    strip_prefixes: &[String],
    report: &mut GenerationReport,
) -> usize {
    let source = deck.pages[page_index].clone();
    let mut elements = Vec::with_capacity(source.elements.len());
    for id in source.elements {
        if stripped(&deck.element(id).name, strip_prefixes) {
            continue;
        }
        elements.push(clone_element(deck, id, strip_prefixes, report));
    }
    deck.pages.push(Page {
        background: source.background,
        elements,
    });
    deck.pages.len() - 1
}

fn clone_element(
    deck: &mut Deck,
    id: NodeId,
    strip_prefixes: &[String],
    report: &mut GenerationReport,
) -> NodeId {
    let element = deck.element(id).clone();
    let kind = match element.kind {
        ElementKind::TextBox(frame) => ElementKind::TextBox(frame),
        ElementKind::Table(table) => {
            if table.is_consistent() {
                ElementKind::Table(table)
            } else {
                report.warn(
                    WarnCode::CloneSubstitute,
                    format!("table {} has a ragged cell grid", element.name),
                );
                ElementKind::TextBox(TextFrame::plain("[table could not be copied]"))
            }
        }
        ElementKind::Image { resource, source } => {
            let dangling = resource
                .as_deref()
                .is_some_and(|r| deck.resource(r).is_none());
            if dangling {
                report.warn(
                    WarnCode::CloneSubstitute,
                    format!("image {} references a missing resource", element.name),
                );
                ElementKind::TextBox(TextFrame::default())
            } else {
                ElementKind::Image { resource, source }
            }
        }
        ElementKind::Group { children } => {
            let mut cloned = Vec::with_capacity(children.len());
            for child in children {
                if stripped(&deck.element(child).name, strip_prefixes) {
                    continue;
                }
                cloned.push(clone_element(deck, child, strip_prefixes, report));
            }
            ElementKind::Group { children: cloned }
        }
    };
    deck.push_element(Element {
        name: element.name,
        rect: element.rect,
        kind,
    })
}

fn stripped(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Table;
    use crate::types::{Rect, Size};

    fn two_box_deck() -> Deck {
        let mut deck = Deck::new(Size::widescreen());
        let a = deck.push_element(Element::text_box(
            "txt_title",
            Rect::ZERO,
            TextFrame::plain("제목"),
        ));
        let b = deck.push_element(Element::text_box(
            "Title Placeholder 1",
            Rect::ZERO,
            TextFrame::plain("click to edit"),
        ));
        deck.pages.push(Page {
            background: None,
            elements: vec![a, b],
        });
        deck
    }

    #[test]
    fn clone_is_independent_of_source() {
        let mut deck = two_box_deck();
        let mut report = GenerationReport::default();
        let copy = clone_page(&mut deck, 0, &[], &mut report);
        assert_eq!(copy, 1);

        let cloned_id = deck.pages[1].elements[0];
        assert_ne!(cloned_id, deck.pages[0].elements[0]);
        deck.element_mut(cloned_id).frame_mut().unwrap().paragraphs =
            vec![crate::deck::Paragraph::plain("바뀜")];

        let original_id = deck.pages[0].elements[0];
        assert_eq!(deck.element(original_id).frame().unwrap().text(), "제목");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn strip_prefixes_drop_placeholders() {
        let mut deck = two_box_deck();
        let mut report = GenerationReport::default();
        let copy = clone_page(
            &mut deck,
            0,
            &["Title Placeholder".to_string()],
            &mut report,
        );
        assert_eq!(deck.pages[copy].elements.len(), 1);
        assert_eq!(
            deck.element(deck.pages[copy].elements[0]).name,
            "txt_title"
        );
    }

    #[test]
    fn group_children_are_recloned() {
        let mut deck = Deck::new(Size::widescreen());
        let inner = deck.push_element(Element::text_box(
            "txt_inner",
            Rect::ZERO,
            TextFrame::plain("x"),
        ));
        let group = deck.push_element(Element {
            name: "grp".to_string(),
            rect: Rect::ZERO,
            kind: ElementKind::Group {
                children: vec![inner],
            },
        });
        deck.pages.push(Page {
            background: None,
            elements: vec![group],
        });
        let mut report = GenerationReport::default();
        let copy = clone_page(&mut deck, 0, &[], &mut report);
        let cloned_group = deck.pages[copy].elements[0];
        match &deck.element(cloned_group).kind {
            ElementKind::Group { children } => {
                assert_eq!(children.len(), 1);
                assert_ne!(children[0], inner);
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn dangling_image_degrades_to_text_box() {
        let mut deck = Deck::new(Size::widescreen());
        let img = deck.push_element(Element {
            name: "img_map".to_string(),
            rect: Rect::new(1, 2, 3, 4),
            kind: ElementKind::Image {
                resource: Some("deadbeef".to_string()),
                source: None,
            },
        });
        deck.pages.push(Page {
            background: None,
            elements: vec![img],
        });
        let mut report = GenerationReport::default();
        let copy = clone_page(&mut deck, 0, &[], &mut report);
        let cloned = deck.element(deck.pages[copy].elements[0]);
        assert_eq!(cloned.name, "img_map");
        assert_eq!(cloned.rect, Rect::new(1, 2, 3, 4));
        assert!(matches!(cloned.kind, ElementKind::TextBox(_)));
        assert_eq!(report.count(WarnCode::CloneSubstitute), 1);
    }

    #[test]
    fn ragged_table_is_substituted() {
        let mut deck = Deck::new(Size::widescreen());
        let mut table = Table::new(2, 2);
        table.cells.pop();
        let id = deck.push_element(Element {
            name: "tbl_bad".to_string(),
            rect: Rect::ZERO,
            kind: ElementKind::Table(table),
        });
        deck.pages.push(Page {
            background: None,
            elements: vec![id],
        });
        let mut report = GenerationReport::default();
        let copy = clone_page(&mut deck, 0, &[], &mut report);
        let cloned = deck.element(deck.pages[copy].elements[0]);
        match &cloned.kind {
            ElementKind::TextBox(frame) => {
                assert_eq!(frame.text(), "[table could not be copied]")
            }
            other => panic!("expected substitute text box, got {:?}", other),
        }
        assert_eq!(report.count(WarnCode::CloneSubstitute), 1);
    }
}
