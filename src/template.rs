use crate::deck::{
    Cell, Deck, Element, ElementKind, ImageResource, NodeId, Page, Paragraph, Run, RunFont, Table,
    TextFrame,
};
use crate::error::DeckFillError;
use crate::types::{Color, Emu, Rect, Size};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use roxmltree::{Document, Node};
use std::fmt::Write as _;

// Template and output documents share one XML dialect:
//
//   <deck width=".." height="..">
//     <resources>
//       <resource id=".." type="image/png">BASE64</resource>
//     </resources>
//     <page [background="RRGGBB"]>
//       <textbox name x y w h><p><r ..attrs>text</r></p></textbox>
//       <table name x y w h rows cols col-widths="..">
//         <row h=".."><cell [fill]><p>..</p></cell></row>
//       </table>
//       <image name x y w h [resource] [source]/>
//       <group name x y w h>..</group>
//     </page>
//   </deck>

pub fn parse(bytes: &[u8]) -> Result<Deck, DeckFillError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DeckFillError::TemplateUnreadable(format!("not utf-8: {}", e)))?;
    let doc = Document::parse(text)
        .map_err(|e| DeckFillError::TemplateUnreadable(format!("bad xml: {}", e)))?;
    let root = doc.root_element();
    if root.tag_name().name() != "deck" {
        return Err(DeckFillError::TemplateUnreadable(format!(
            "root element is <{}>, expected <deck>",
            root.tag_name().name()
        )));
    }
    let page_size = Size {
        width: Emu::new(attr_i64(root, "width")?),
        height: Emu::new(attr_i64(root, "height")?),
    };
    let mut deck = Deck::new(page_size);

    for resources in root.children().filter(|n| n.has_tag_name("resources")) {
        for node in resources.children().filter(|n| n.has_tag_name("resource")) {
            let id = attr(node, "id")?.to_string();
            let content_type = attr(node, "type")?.to_string();
            let payload: String = node
                .text()
                .unwrap_or("")
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let data = BASE64.decode(payload).map_err(|e| {
                DeckFillError::TemplateUnreadable(format!("resource {}: {}", id, e))
            })?;
            deck.resources.insert(id, ImageResource { content_type, data });
        }
    }

    for page_node in root.children().filter(|n| n.has_tag_name("page")) {
        let background = match page_node.attribute("background") {
            Some(raw) => Some(Color::from_hex(raw).ok_or_else(|| {
                DeckFillError::TemplateUnreadable(format!("bad page background {}", raw))
            })?),
            None => None,
        };
        let mut elements = Vec::new();
        for child in page_node.children().filter(|n| n.is_element()) {
            elements.push(parse_element(&mut deck, child)?);
        }
        deck.pages.push(Page {
            background,
            elements,
        });
    }
    Ok(deck)
}

fn parse_element(deck: &mut Deck, node: Node<'_, '_>) -> Result<NodeId, DeckFillError> {
    let name = attr(node, "name")?.to_string();
    let rect = Rect {
        x: Emu::new(attr_i64(node, "x")?),
        y: Emu::new(attr_i64(node, "y")?),
        width: Emu::new(attr_i64(node, "w")?),
        height: Emu::new(attr_i64(node, "h")?),
    };
    let kind = match node.tag_name().name() {
        "textbox" => ElementKind::TextBox(parse_frame(node)?),
        "table" => ElementKind::Table(parse_table(node, &name)?),
        "image" => {
            let resource = node.attribute("resource").map(str::to_string);
            if let Some(id) = &resource {
                if deck.resource(id).is_none() {
                    return Err(DeckFillError::TemplateUnreadable(format!(
                        "image {} references unknown resource {}",
                        name, id
                    )));
                }
            }
            ElementKind::Image {
                resource,
                source: node.attribute("source").map(str::to_string),
            }
        }
        "group" => {
            let mut children = Vec::new();
            for child in node.children().filter(|n| n.is_element()) {
                children.push(parse_element(deck, child)?);
            }
            ElementKind::Group { children }
        }
        other => {
            return Err(DeckFillError::TemplateUnreadable(format!(
                "unknown element <{}>",
                other
            )));
        }
    };
    Ok(deck.push_element(Element { name, rect, kind }))
}

fn parse_frame(node: Node<'_, '_>) -> Result<TextFrame, DeckFillError> {
    let mut paragraphs = Vec::new();
    for p in node.children().filter(|n| n.has_tag_name("p")) {
        let mut runs = Vec::new();
        for r in p.children().filter(|n| n.has_tag_name("r")) {
            runs.push(Run {
                text: r.text().unwrap_or("").to_string(),
                font: parse_font(r)?,
            });
        }
        paragraphs.push(Paragraph { runs });
    }
    Ok(TextFrame { paragraphs })
}

fn parse_font(node: Node<'_, '_>) -> Result<RunFont, DeckFillError> {
    let size = match node.attribute("size") {
        Some(raw) => Some(raw.parse::<f32>().map_err(|_| {
            DeckFillError::TemplateUnreadable(format!("bad run size {}", raw))
        })?),
        None => None,
    };
    let color = match node.attribute("color") {
        Some(raw) => Some(Color::from_hex(raw).ok_or_else(|| {
            DeckFillError::TemplateUnreadable(format!("bad run color {}", raw))
        })?),
        None => None,
    };
    Ok(RunFont {
        family: node.attribute("family").map(str::to_string),
        size,
        bold: attr_flag(node, "bold")?,
        italic: attr_flag(node, "italic")?,
        underline: attr_flag(node, "underline")?,
        color,
    })
}

fn parse_table(node: Node<'_, '_>, name: &str) -> Result<Table, DeckFillError> {
    let rows = attr_i64(node, "rows")? as usize;
    let cols = attr_i64(node, "cols")? as usize;
    let mut table = Table::new(rows, cols);

    if let Some(raw) = node.attribute("col-widths") {
        let widths: Result<Vec<Emu>, DeckFillError> = raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map(Emu::new)
                    .map_err(|_| {
                        DeckFillError::TemplateUnreadable(format!(
                            "table {}: bad column width {}",
                            name, part
                        ))
                    })
            })
            .collect();
        let widths = widths?;
        if widths.len() != cols {
            return Err(DeckFillError::TemplateUnreadable(format!(
                "table {}: {} column widths for {} columns",
                name,
                widths.len(),
                cols
            )));
        }
        table.col_widths = widths;
    }

    let row_nodes: Vec<Node<'_, '_>> = node.children().filter(|n| n.has_tag_name("row")).collect();
    if row_nodes.len() != rows {
        return Err(DeckFillError::TemplateUnreadable(format!(
            "table {}: {} row elements for {} rows",
            name,
            row_nodes.len(),
            rows
        )));
    }
    for (row_idx, row) in row_nodes.iter().enumerate() {
        if let Some(raw) = row.attribute("h") {
            table.row_heights[row_idx] = Emu::new(raw.parse::<i64>().map_err(|_| {
                DeckFillError::TemplateUnreadable(format!(
                    "table {}: bad row height {}",
                    name, raw
                ))
            })?);
        }
        let cell_nodes: Vec<Node<'_, '_>> =
            row.children().filter(|n| n.has_tag_name("cell")).collect();
        if cell_nodes.len() != cols {
            return Err(DeckFillError::TemplateUnreadable(format!(
                "table {}: row {} has {} cells for {} columns",
                name,
                row_idx,
                cell_nodes.len(),
                cols
            )));
        }
        for (col_idx, cell_node) in cell_nodes.iter().enumerate() {
            let fill = match cell_node.attribute("fill") {
                Some(raw) => Some(Color::from_hex(raw).ok_or_else(|| {
                    DeckFillError::TemplateUnreadable(format!(
                        "table {}: bad cell fill {}",
                        name, raw
                    ))
                })?),
                None => None,
            };
            if let Some(cell) = table.cell_mut(row_idx, col_idx) {
                *cell = Cell {
                    fill,
                    frame: parse_frame(*cell_node)?,
                };
            }
        }
    }
    Ok(table)
}

fn attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, DeckFillError> {
    node.attribute(name).ok_or_else(|| {
        DeckFillError::TemplateUnreadable(format!(
            "<{}> missing attribute {}",
            node.tag_name().name(),
            name
        ))
    })
}

fn attr_i64(node: Node<'_, '_>, name: &str) -> Result<i64, DeckFillError> {
    let raw = attr(node, name)?;
    raw.parse::<i64>().map_err(|_| {
        DeckFillError::TemplateUnreadable(format!(
            "<{}> attribute {}={} is not an integer",
            node.tag_name().name(),
            name,
            raw
        ))
    })
}

fn attr_flag(node: Node<'_, '_>, name: &str) -> Result<Option<bool>, DeckFillError> {
    match node.attribute(name) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(DeckFillError::TemplateUnreadable(format!(
            "<{}> attribute {}={} is not a flag",
            node.tag_name().name(),
            name,
            other
        ))),
    }
}

pub fn serialize(deck: &Deck) -> Result<Vec<u8>, DeckFillError> {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<deck width=\"{}\" height=\"{}\">",
        deck.page_size.width.value(),
        deck.page_size.height.value()
    );
    if !deck.resources.is_empty() {
        out.push_str("<resources>\n");
        for (id, resource) in &deck.resources {
            let _ = writeln!(
                out,
                "<resource id=\"{}\" type=\"{}\">{}</resource>",
                xml_escape(id),
                xml_escape(&resource.content_type),
                BASE64.encode(&resource.data)
            );
        }
        out.push_str("</resources>\n");
    }
    for page in &deck.pages {
        match page.background {
            Some(color) => {
                let _ = writeln!(out, "<page background=\"{}\">", color.to_hex());
            }
            None => out.push_str("<page>\n"),
        }
        for &id in &page.elements {
            write_element(deck, id, &mut out)?;
        }
        out.push_str("</page>\n");
    }
    out.push_str("</deck>\n");
    Ok(out.into_bytes())
}

fn write_element(deck: &Deck, id: NodeId, out: &mut String) -> Result<(), DeckFillError> {
    let element = deck.element(id);
    let geometry = format!(
        "name=\"{}\" x=\"{}\" y=\"{}\" w=\"{}\" h=\"{}\"",
        xml_escape(&element.name),
        element.rect.x.value(),
        element.rect.y.value(),
        element.rect.width.value(),
        element.rect.height.value()
    );
    match &element.kind {
        ElementKind::TextBox(frame) => {
            let _ = writeln!(out, "<textbox {}>", geometry);
            write_frame(frame, out);
            out.push_str("</textbox>\n");
        }
        ElementKind::Table(table) => {
            let widths: Vec<String> = table
                .col_widths
                .iter()
                .map(|w| w.value().to_string())
                .collect();
            let _ = writeln!(
                out,
                "<table {} rows=\"{}\" cols=\"{}\" col-widths=\"{}\">",
                geometry,
                table.rows,
                table.cols,
                widths.join(",")
            );
            for row in 0..table.rows {
                let height = table
                    .row_heights
                    .get(row)
                    .copied()
                    .unwrap_or(Emu::ZERO);
                let _ = writeln!(out, "<row h=\"{}\">", height.value());
                for col in 0..table.cols {
                    let Some(cell) = table.cell(row, col) else {
                        return Err(DeckFillError::Serialization(format!(
                            "table {} is missing cell [{},{}]",
                            element.name, row, col
                        )));
                    };
                    match cell.fill {
                        Some(color) => {
                            let _ = writeln!(out, "<cell fill=\"{}\">", color.to_hex());
                        }
                        None => out.push_str("<cell>\n"),
                    }
                    write_frame(&cell.frame, out);
                    out.push_str("</cell>\n");
                }
                out.push_str("</row>\n");
            }
            out.push_str("</table>\n");
        }
        ElementKind::Image { resource, source } => {
            if let Some(id) = resource {
                if deck.resource(id).is_none() {
                    return Err(DeckFillError::Serialization(format!(
                        "image {} references unknown resource {}",
                        element.name, id
                    )));
                }
            }
            let _ = write!(out, "<image {}", geometry);
            if let Some(id) = resource {
                let _ = write!(out, " resource=\"{}\"", xml_escape(id));
            }
            if let Some(url) = source {
                let _ = write!(out, " source=\"{}\"", xml_escape(url));
            }
            out.push_str("/>\n");
        }
        ElementKind::Group { children } => {
            let _ = writeln!(out, "<group {}>", geometry);
            for &child in children {
                write_element(deck, child, out)?;
            }
            out.push_str("</group>\n");
        }
    }
    Ok(())
}

fn write_frame(frame: &TextFrame, out: &mut String) {
    for paragraph in &frame.paragraphs {
        out.push_str("<p>");
        for run in &paragraph.runs {
            out.push_str("<r");
            if let Some(family) = &run.font.family {
                let _ = write!(out, " family=\"{}\"", xml_escape(family));
            }
            if let Some(size) = run.font.size {
                let _ = write!(out, " size=\"{}\"", size);
            }
            if let Some(bold) = run.font.bold {
                let _ = write!(out, " bold=\"{}\"", bold);
            }
            if let Some(italic) = run.font.italic {
                let _ = write!(out, " italic=\"{}\"", italic);
            }
            if let Some(underline) = run.font.underline {
                let _ = write!(out, " underline=\"{}\"", underline);
            }
            if let Some(color) = run.font.color {
                let _ = write!(out, " color=\"{}\"", color.to_hex());
            }
            out.push('>');
            out.push_str(&xml_escape(&run.text));
            out.push_str("</r>");
        }
        out.push_str("</p>\n");
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
