use crate::deck::{Deck, ElementKind, NodeId, TextFrame};
use crate::mapping::TargetLocator;

/// A resolved fill target: a whole element or one table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    Cell { node: NodeId, row: usize, col: usize },
}

pub fn find(deck: &Deck, page_index: usize, locator: &TargetLocator) -> Option<Target> {
    let page = deck.pages.get(page_index)?;
    match locator {
        TargetLocator::Name(name) => {
            find_by_name(deck, &page.elements, name).map(Target::Node)
        }
        TargetLocator::Marker(marker) => find_by_marker(deck, &page.elements, marker),
        TargetLocator::Cell { table, row, col } => {
            let node = find_by_name(deck, &page.elements, table)?;
            match &deck.element(node).kind {
                ElementKind::Table(t) if *row < t.rows && *col < t.cols => Some(Target::Cell {
                    node,
                    row: *row,
                    col: *col,
                }),
                _ => None,
            }
        }
    }
}

/// Exact name match, groups searched depth-first in declaration order.
pub fn find_by_name(deck: &Deck, elements: &[NodeId], name: &str) -> Option<NodeId> {
    for &id in elements {
        let element = deck.element(id);
        if element.name == name {
            return Some(id);
        }
        if let ElementKind::Group { children } = &element.kind {
            if let Some(found) = find_by_name(deck, children, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Marker search over every text-bearing surface of the page. A
/// trimmed-exact match anywhere wins over the first substring match, so
/// a box holding only the placeholder is preferred to prose mentioning it.
pub fn find_by_marker(deck: &Deck, elements: &[NodeId], marker: &str) -> Option<Target> {
    let mut surfaces = Vec::new();
    collect_text_surfaces(deck, elements, &mut surfaces);
    surfaces
        .iter()
        .find(|(_, text)| text.trim() == marker)
        .or_else(|| surfaces.iter().find(|(_, text)| text.contains(marker)))
        .map(|(target, _)| *target)
}

fn collect_text_surfaces(deck: &Deck, elements: &[NodeId], out: &mut Vec<(Target, String)>) {
    for &id in elements {
        let element = deck.element(id);
        match &element.kind {
            ElementKind::TextBox(frame) => out.push((Target::Node(id), frame.text())),
            ElementKind::Table(table) => {
                for row in 0..table.rows {
                    for col in 0..table.cols {
                        if let Some(cell) = table.cell(row, col) {
                            out.push((Target::Cell { node: id, row, col }, cell.frame.text()));
                        }
                    }
                }
            }
            ElementKind::Group { children } => collect_text_surfaces(deck, children, out),
            ElementKind::Image { .. } => {}
        }
    }
}

/// The writable text frame behind a target, if it has one. Images,
/// groups, and whole tables do not.
pub fn target_frame_mut(deck: &mut Deck, target: Target) -> Option<&mut TextFrame> {
    match target {
        Target::Node(id) => deck.element_mut(id).frame_mut(),
        Target::Cell { node, row, col } => match &mut deck.element_mut(node).kind {
            ElementKind::Table(table) => table.cell_mut(row, col).map(|c| &mut c.frame),
            _ => None,
        },
    }
}
