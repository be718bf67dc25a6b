//! Thin helpers over `quick-xml` and `zip` used by the xlsx loader.
use std::{
    borrow::Cow,
    io::{BufRead, BufReader, Read, Seek},
};

use quick_xml::{
    Reader,
    escape::resolve_xml_entity,
    events::{BytesRef, BytesStart, Event},
};
use zip::{ZipArchive, read::ZipFile, result::ZipError};

use crate::{ImportError, ResultImport};

/// XML reader configured for SpreadsheetML parts.
pub(super) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(super) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        Self {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, `None` at end of document.
    pub(super) fn next(&mut self) -> ResultImport<Option<Event<'_>>> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Loops over the events of a reader, matching each against the given arms.
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

pub(super) use match_xml_events;

/// Unescaped value of an attribute, if present.
pub(super) fn attribute<'a>(node: &'a BytesStart<'a>, name: &str) -> ResultImport<Option<Cow<'a, str>>> {
    match node.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?)),
        None => Ok(None),
    }
}

/// Appends the text behind an entity or character reference.
pub(super) fn push_reference(text: &mut String, reference: &BytesRef) -> ResultImport<()> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| ImportError::Workbook(format!("invalid character reference &{raw};")))?;
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(ImportError::Workbook(format!("unknown entity &{raw};")));
    }
    Ok(())
}

/// Zip lookups tolerant to case and path separator differences.
pub(super) trait ZipHelper<R: Read + Seek> {
    fn file(&mut self, name: &str) -> ResultImport<Option<ZipFile<'_, R>>>;

    fn xml_reader(&mut self, name: &str) -> ResultImport<Option<XmlReader<BufReader<ZipFile<'_, R>>>>> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}

impl<R: Read + Seek> ZipHelper<R> for ZipArchive<R> {
    fn file(&mut self, name: &str) -> ResultImport<Option<ZipFile<'_, R>>> {
        let pattern = name.replace('\\', "/");
        let path = self
            .file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(str::to_owned);
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(file) => Ok(file),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

/// Resolves a relationship target against the folder of the part that
/// declares it. Absolute targets start at the package root.
pub(super) fn resolve_target(base_folder: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_folder.split('/').filter(|part| !part.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Folder of a part path, e.g. `xl/worksheets` for `xl/worksheets/sheet1.xml`.
pub(super) fn folder_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(folder, _)| folder)
}

/// Relationship part path of a part, e.g.
/// `xl/worksheets/_rels/sheet1.xml.rels` for `xl/worksheets/sheet1.xml`.
pub(super) fn relationships_path(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((folder, file)) => format!("{folder}/_rels/{file}.rels"),
        None => format!("_rels/{path}.rels"),
    }
}
