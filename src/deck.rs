use crate::types::{Color, Emu, Rect, Size};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Index into the deck's node arena. Node ids are only ever produced by
/// `Deck::push_element` and stay valid for the life of the deck; nothing
/// is removed from the arena, pages just stop referring to a node.
pub type NodeId = usize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFont {
    pub family: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub font: RunFont,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Run {
        Run {
            text: text.into(),
            font: RunFont::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Paragraph {
        Paragraph {
            runs: vec![Run::plain(text)],
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            out.push_str(&run.text);
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn plain(text: impl Into<String>) -> TextFrame {
        TextFrame {
            paragraphs: vec![Paragraph::plain(text)],
        }
    }

    /// Paragraph texts joined with newlines, the way the text appears.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (idx, paragraph) in self.paragraphs.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str(&paragraph.text());
        }
        out
    }

    pub fn is_blank(&self) -> bool {
        self.paragraphs.iter().all(|p| p.text().trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub fill: Option<Color>,
    pub frame: TextFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: usize,
    pub cols: usize,
    pub col_widths: Vec<Emu>,
    pub row_heights: Vec<Emu>,
    // Row-major; length must stay rows * cols.
    pub cells: Vec<Cell>,
}

impl Table {
    pub fn new(rows: usize, cols: usize) -> Table {
        Table {
            rows,
            cols,
            col_widths: vec![Emu::ZERO; cols],
            row_heights: vec![Emu::ZERO; rows],
            cells: vec![Cell::default(); rows * cols],
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get_mut(row * self.cols + col)
    }

    pub fn is_consistent(&self) -> bool {
        self.cells.len() == self.rows * self.cols
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    TextBox(TextFrame),
    Table(Table),
    Image {
        // Content-addressed id into the deck's resource map. A cloned
        // image whose resource went missing degrades to a text box.
        resource: Option<String>,
        source: Option<String>,
    },
    Group {
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub rect: Rect,
    pub kind: ElementKind,
}

impl Element {
    pub fn text_box(name: impl Into<String>, rect: Rect, frame: TextFrame) -> Element {
        Element {
            name: name.into(),
            rect,
            kind: ElementKind::TextBox(frame),
        }
    }

    pub fn frame(&self) -> Option<&TextFrame> {
        match &self.kind {
            ElementKind::TextBox(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn frame_mut(&mut self) -> Option<&mut TextFrame> {
        match &mut self.kind {
            ElementKind::TextBox(frame) => Some(frame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub background: Option<Color>,
    pub elements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Deck {
    pub page_size: Size,
    pub nodes: Vec<Element>,
    pub pages: Vec<Page>,
    pub resources: BTreeMap<String, ImageResource>,
}

impl Deck {
    pub fn new(page_size: Size) -> Deck {
        Deck {
            page_size,
            nodes: Vec::new(),
            pages: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn push_element(&mut self, element: Element) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(element);
        id
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id]
    }

    pub fn element_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id]
    }

    /// Stores image bytes under their SHA-256 and returns the id.
    /// Identical payloads share one resource entry.
    pub fn add_resource(&mut self, content_type: &str, data: Vec<u8>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let id = format!("{:x}", hasher.finalize());
        self.resources.entry(id.clone()).or_insert(ImageResource {
            content_type: content_type.to_string(),
            data,
        });
        id
    }

    pub fn resource(&self, id: &str) -> Option<&ImageResource> {
        self.resources.get(id)
    }
}
