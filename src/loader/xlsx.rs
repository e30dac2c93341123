//! Minimal `.xlsx` reader.
//!
//! Opens the zip package, resolves sheet names through the workbook part and
//! its relationships, and parses worksheet XML into a sparse grid of cell
//! values. Formulas are not evaluated; their cached values are used.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::dataset::DateSystem;
use crate::error::LoadError;

const CONTENT_TYPES: &str = "[Content_Types].xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

// Worksheet size limits of the xlsx format.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// A single cell value as stored in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }
}

/// Cells of a worksheet keyed by zero-based row, then column. Only cells
/// present in the sheet XML are stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: BTreeMap<usize, BTreeMap<usize, CellValue>>,
}

impl Grid {
    pub fn insert(&mut self, row: usize, col: usize, value: CellValue) {
        self.rows.entry(row).or_default().insert(col, value);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(&row)?.get(&col)
    }

    /// Rows holding at least one cell, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &BTreeMap<usize, CellValue>)> {
        self.rows.iter().map(|(row, cells)| (*row, cells))
    }
}

#[derive(Debug, Clone)]
struct SheetDescriptor {
    name: String,
    rel_id: Option<String>,
    sheet_id: Option<u32>,
}

/// An opened workbook package.
pub struct XlsxWorkbook {
    archive: ZipArchive<File>,
    sheets: Vec<SheetDescriptor>,
    relationships: HashMap<String, String>,
    shared_strings: Vec<String>,
    date_system: DateSystem,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let path_str = path.display().to_string();
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path_str.clone(),
            source,
        })?;

        let mut archive = ZipArchive::new(file).map_err(|e| LoadError::NotAWorkbook {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        if archive.by_name(CONTENT_TYPES).is_err() {
            return Err(LoadError::NotAWorkbook {
                path: path_str,
                reason: format!("missing {CONTENT_TYPES}"),
            });
        }

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?.ok_or_else(|| {
            LoadError::NotAWorkbook {
                path: path_str.clone(),
                reason: format!("missing {WORKBOOK_PART}"),
            }
        })?;
        let (sheets, date_system) = parse_workbook_xml(&workbook_xml)?;

        let relationships = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        debug!(
            path = %path_str,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            ?date_system,
            "Opened workbook"
        );

        Ok(Self {
            archive,
            sheets,
            relationships,
            shared_strings,
            date_system,
        })
    }

    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// Reads the named worksheet into a grid.
    pub fn read_sheet(&mut self, name: &str) -> Result<Grid, LoadError> {
        let (index, sheet) = self
            .sheets
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
            .ok_or_else(|| {
                let available: Vec<&str> = self.sheet_names().collect();
                debug!(sheet = name, ?available, "Sheet not found");
                LoadError::MissingSheet(name.to_string())
            })?;

        let target = resolve_sheet_target(sheet, &self.relationships, index);
        let xml = read_part(&mut self.archive, &target)?.ok_or_else(|| LoadError::PartRead {
            part: target.clone(),
            reason: format!("worksheet for sheet '{name}' is missing"),
        })?;

        parse_sheet_xml(&xml, &self.shared_strings, &target)
    }
}

fn read_part(archive: &mut ZipArchive<File>, part: &str) -> Result<Option<Vec<u8>>, LoadError> {
    let mut entry = match archive.by_name(part) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(part_err(part, e)),
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| part_err(part, e))?;
    Ok(Some(bytes))
}

fn part_err(part: &str, reason: impl Display) -> LoadError {
    LoadError::PartRead {
        part: part.to_string(),
        reason: reason.to_string(),
    }
}

fn xml_err(part: &str, reason: impl Display) -> LoadError {
    LoadError::Xml {
        part: part.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_workbook_xml(xml: &[u8]) -> Result<(Vec<SheetDescriptor>, DateSystem), LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date_system = DateSystem::Excel1900;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name", WORKBOOK_PART)?;
                let rel_id = attr_value(&e, b"r:id", WORKBOOK_PART)?;
                let sheet_id = attr_value(&e, b"sheetId", WORKBOOK_PART)?
                    .and_then(|id| id.parse::<u32>().ok());
                if let Some(name) = name {
                    sheets.push(SheetDescriptor {
                        name,
                        rel_id,
                        sheet_id,
                    });
                }
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"workbookPr" =>
            {
                let flag = attr_value(&e, b"date1904", WORKBOOK_PART)?;
                if matches!(flag.as_deref(), Some("1") | Some("true")) {
                    date_system = DateSystem::Excel1904;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(WORKBOOK_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, date_system))
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_value(&e, b"Id", WORKBOOK_RELS_PART)?;
                let target = attr_value(&e, b"Target", WORKBOOK_RELS_PART)?;
                let rel_type = attr_value(&e, b"Type", WORKBOOK_RELS_PART)?;
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with("/worksheet") {
                        map.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"si" => {
                current.clear();
                in_si = true;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            // Phonetic runs duplicate the text in another script.
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"rPh" => {
                reader
                    .read_to_end(e.name())
                    .map_err(|e| xml_err(SHARED_STRINGS_PART, e))?;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" && in_si => {
                current.push_str(&read_text(&mut reader, &e, SHARED_STRINGS_PART)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
                in_si = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(SHARED_STRINGS_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn resolve_sheet_target(
    sheet: &SheetDescriptor,
    relationships: &HashMap<String, String>,
    index: usize,
) -> String {
    if let Some(target) = sheet.rel_id.as_ref().and_then(|id| relationships.get(id)) {
        return normalize_target(target);
    }

    let guessed = sheet
        .sheet_id
        .map(|id| format!("xl/worksheets/sheet{id}.xml"))
        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
    normalize_target(&guessed)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{trimmed}")
    }
}

fn parse_sheet_xml(xml: &[u8], shared_strings: &[String], part: &str) -> Result<Grid, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut grid = Grid::default();

    // Fallback positions for writers that omit `r` attributes.
    let mut current_row: usize = 0;
    let mut next_col: usize = 0;
    let mut seen_row = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"row" => {
                current_row = match attr_value(&e, b"r", part)? {
                    Some(r) => match r.trim().parse::<usize>() {
                        Ok(n) if (1..=MAX_ROWS).contains(&n) => n - 1,
                        _ => return Err(xml_err(part, format!("invalid row number '{r}'"))),
                    },
                    None if seen_row => current_row + 1,
                    None => 0,
                };
                seen_row = true;
                next_col = 0;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                let (row, col) = match attr_value(&e, b"r", part)? {
                    Some(address) => address_to_index(&address).ok_or_else(|| {
                        xml_err(part, format!("invalid cell address '{address}'"))
                    })?,
                    None => (current_row, next_col),
                };
                if row >= MAX_ROWS || col >= MAX_COLS {
                    return Err(xml_err(
                        part,
                        format!("cell at row {} column {} is outside the sheet", row + 1, col + 1),
                    ));
                }
                next_col = col + 1;
                if let Some(value) = parse_cell(&mut reader, &e, shared_strings, part)? {
                    grid.insert(row, col, value);
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                if let Some(address) = attr_value(&e, b"r", part)? {
                    if let Some((_, col)) = address_to_index(&address) {
                        next_col = col + 1;
                    }
                } else {
                    next_col += 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(grid)
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    shared_strings: &[String],
    part: &str,
) -> Result<Option<CellValue>, LoadError> {
    let cell_type = attr_value(start, b"t", part)?;
    let mut value_text: Option<String> = None;
    let mut inline_text: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                value_text = Some(read_text(reader, &e, part)?);
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"f" => {
                reader.read_to_end(e.name()).map_err(|e| xml_err(part, e))?;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"is" => {
                inline_text = Some(read_inline_string(reader, part)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"c" => break,
            Ok(Event::Eof) => return Err(xml_err(part, "unexpected EOF inside cell")),
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(text) = inline_text {
        return Ok(Some(CellValue::Text(text)));
    }

    let Some(raw) = value_text else {
        return Ok(None);
    };
    let trimmed = raw.trim();

    let value = match cell_type.as_deref() {
        Some("s") => {
            let idx = trimmed
                .parse::<usize>()
                .map_err(|e| xml_err(part, format!("bad shared string index '{trimmed}': {e}")))?;
            let text = shared_strings.get(idx).ok_or_else(|| {
                xml_err(part, format!("shared string index {idx} out of bounds"))
            })?;
            CellValue::Text(text.clone())
        }
        Some("b") => match trimmed {
            "1" => CellValue::Bool(true),
            "0" => CellValue::Bool(false),
            _ => return Ok(None),
        },
        Some("e") => CellValue::Error(trimmed.to_string()),
        Some("str") | Some("inlineStr") => CellValue::Text(raw),
        _ => match trimmed.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) if trimmed.is_empty() => return Ok(None),
            Err(_) => CellValue::Text(trimmed.to_string()),
        },
    };

    Ok(Some(value))
}

fn read_inline_string(reader: &mut Reader<&[u8]>, part: &str) -> Result<String, LoadError> {
    let mut buf = Vec::new();
    let mut value = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                value.push_str(&read_text(reader, &e, part)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"is" => break,
            Ok(Event::Eof) => return Err(xml_err(part, "unexpected EOF inside inline string")),
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(value)
}

/// Text content up to the matching end tag, with entities resolved.
fn read_text(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    part: &str,
) -> Result<String, LoadError> {
    let raw = reader
        .read_text(start.name())
        .map_err(|e| xml_err(part, e))?;
    let unescaped = quick_xml::escape::unescape(&raw).map_err(|e| xml_err(part, e))?;
    Ok(unescaped.into_owned())
}

fn attr_value(element: &BytesStart<'_>, key: &[u8], part: &str) -> Result<Option<String>, LoadError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_err(part, e))?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|e| xml_err(part, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Converts an `A1`-style address to zero-based `(row, col)`.
///
/// Addresses beyond the xlsx limits (`XFD1048576`) are rejected.
fn address_to_index(address: &str) -> Option<(usize, usize)> {
    let address = address.trim().replace('$', "");
    let split = address.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = address.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic())
    {
        return None;
    }

    let col = letters.bytes().fold(0usize, |acc, b| {
        acc * 26 + usize::from(b.to_ascii_uppercase() - b'A') + 1
    });
    let row: usize = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLS {
        return None;
    }
    Some((row - 1, col - 1))
}
