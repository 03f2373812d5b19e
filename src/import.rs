use crate::codec;
use crate::error::LineError;
use crate::gtfs_reader::Fixup;
use crate::progress::Progress;
use crate::{Container, Error, GtfsReader, TableSchema};
use chrono::Utc;
use log::{debug, info, warn};
use regex::Captures;
use std::fs::File;
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Size above which a chunk of lines is handed to the parser
const CHUNK_SIZE: usize = 50_000;

const BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Serves the content of a file by chunks of whole lines, with the table's fixups applied
///
/// A chunk always ends on a line break (or at the end of the file), so that it
/// never splits a character nor a single-line row. A fixup pattern only sees
/// one chunk and should not span several lines.
struct FixupReader<'a, R> {
    source: R,
    table_name: &'a str,
    fixups: &'a [Fixup],
    chunk: Vec<u8>,
    pos: usize,
    exhausted: bool,
}

impl<'a, R: BufRead> FixupReader<'a, R> {
    fn new(source: R, table_name: &'a str, fixups: &'a [Fixup]) -> Self {
        FixupReader {
            source,
            table_name,
            fixups,
            chunk: Vec::with_capacity(CHUNK_SIZE),
            pos: 0,
            exhausted: false,
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        self.chunk.clear();
        self.pos = 0;
        while self.chunk.len() < CHUNK_SIZE {
            if self.source.read_until(b'\n', &mut self.chunk)? == 0 {
                self.exhausted = true;
                break;
            }
        }
        if !self.fixups.is_empty() && !self.chunk.is_empty() {
            self.apply_fixups();
        }
        Ok(())
    }

    fn apply_fixups(&mut self) {
        let chunk = std::mem::take(&mut self.chunk);
        self.chunk = match String::from_utf8(chunk) {
            Ok(text) => self.fixed(text).into_bytes(),
            Err(e) => {
                // lines that are not UTF-8 are left as is, the row parser rejects them
                let mut fixed = Vec::with_capacity(e.as_bytes().len());
                for line in e.as_bytes().split_inclusive(|b| *b == b'\n') {
                    match std::str::from_utf8(line) {
                        Ok(text) => fixed.extend(self.fixed(text.to_owned()).into_bytes()),
                        Err(_) => fixed.extend_from_slice(line),
                    }
                }
                fixed
            }
        };
    }

    fn fixed(&self, mut text: String) -> String {
        for fixup in self.fixups {
            let table_name = self.table_name;
            let replaced = fixup.regex.replace_all(&text, |caps: &Captures| {
                let mut replacement = String::new();
                caps.expand(&fixup.replacement, &mut replacement);
                info!(
                    "fixup of '{}': '{}' replaced by '{}'",
                    table_name, &caps[0], replacement
                );
                replacement
            });
            if let std::borrow::Cow::Owned(replaced) = replaced {
                text = replaced;
            }
        }
        text
    }
}

impl<R: BufRead> BufRead for FixupReader<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.chunk.len() && !self.exhausted {
            self.next_chunk()?;
        }
        Ok(&self.chunk[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.chunk.len());
    }
}

impl<R: BufRead> Read for FixupReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

fn skip_bom<R: BufRead>(reader: &mut R) -> io::Result<()> {
    if reader.fill_buf()?.starts_with(&BOM) {
        reader.consume(BOM.len());
    }
    Ok(())
}

/// Builds the container of `table` from `<directory>/<table>.txt`
///
/// A missing directory or file gives an empty container.
pub(crate) fn import_table(
    directory: Option<&Path>,
    table: &TableSchema,
    options: &GtfsReader,
) -> Result<Container, Error> {
    let file_name = table.file_name();
    let path = match directory {
        Some(directory) => directory.join(&file_name),
        None => return Ok(Container::empty(&table.indexing)),
    };
    if !path.is_file() {
        info!("no file '{}', table '{}' is empty", file_name, table.name);
        return Ok(Container::empty(&table.indexing));
    }

    let now = Utc::now();
    let file = File::open(&path).map_err(|e| Error::named_io(&file_name, e))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);
    let mut source = BufReader::new(file);
    skip_bom(&mut source).map_err(|e| Error::named_io(&file_name, e))?;

    let fixups = options.fixups_of(&table.name);
    let container = read_rows(
        FixupReader::new(source, &table.name, fixups),
        table,
        options,
        total,
    )?;

    debug!(
        "table '{}' imported: {} records in {} ms",
        table.name,
        container.len(),
        Utc::now().signed_duration_since(now).num_milliseconds()
    );
    Ok(container)
}

/// A physical line of a file, with its terminator
struct Line {
    number: u64,
    content: Vec<u8>,
}

/// Groups the lines of a file into rows
///
/// A row goes on over the following lines while one of its quoted fields is
/// open. Lines given back with [Rows::replay_after_first] are served again
/// before the rest of the file.
struct Rows<R> {
    source: R,
    replay: VecDeque<Line>,
    lines_read: u64,
    bytes_read: u64,
}

impl<R: BufRead> Rows<R> {
    fn new(source: R) -> Self {
        Rows {
            source,
            replay: VecDeque::new(),
            lines_read: 0,
            bytes_read: 0,
        }
    }

    fn next_line(&mut self) -> io::Result<Option<Line>> {
        if let Some(line) = self.replay.pop_front() {
            return Ok(Some(line));
        }
        let mut content = Vec::new();
        let read = self.source.read_until(b'\n', &mut content)?;
        if read == 0 {
            return Ok(None);
        }
        self.lines_read += 1;
        self.bytes_read += read as u64;
        Ok(Some(Line {
            number: self.lines_read,
            content,
        }))
    }

    fn next_row(&mut self) -> io::Result<Option<Vec<Line>>> {
        let first = match self.next_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let mut open = has_odd_quotes(&first.content);
        let mut lines = vec![first];
        while open {
            match self.next_line()? {
                Some(line) => {
                    open ^= has_odd_quotes(&line.content);
                    lines.push(line);
                }
                None => break,
            }
        }
        Ok(Some(lines))
    }

    /// Keeps the first line of `lines` and gives the others back
    fn replay_after_first(&mut self, lines: &mut Vec<Line>) {
        for line in lines.drain(1..).rev() {
            self.replay.push_front(line);
        }
    }
}

fn has_odd_quotes(content: &[u8]) -> bool {
    content.iter().filter(|b| **b == b'"').count() % 2 == 1
}

/// Fields of the records found in `lines`, a well framed row gives exactly one
fn parse(lines: &[Line], trim_fields: bool) -> Result<Vec<csv::StringRecord>, csv::Error> {
    let content: Vec<u8> = lines
        .iter()
        .flat_map(|line| line.content.iter().copied())
        .collect();
    let mut builder = codec::reader_builder(trim_fields);
    builder.has_headers(false);
    let mut reader = builder.from_reader(content.as_slice());
    reader.records().collect()
}

fn fits(parsed: &Result<Vec<csv::StringRecord>, csv::Error>, width: usize) -> bool {
    matches!(parsed, Ok(records) if records.len() == 1 && records[0].len() == width)
}

fn read_header<R: BufRead>(rows: &mut Rows<R>, file_name: &str) -> Result<Option<Vec<String>>, Error> {
    while let Some(lines) = rows.next_row().map_err(|e| Error::named_io(file_name, e))? {
        let records = parse(&lines, false).map_err(|e| Error::csv(file_name, e))?;
        if let Some(header) = records.into_iter().next() {
            if header.iter().any(|h| !h.trim().is_empty()) {
                return Ok(Some(header.iter().map(|h| h.trim().to_owned()).collect()));
            }
        }
    }
    Ok(None)
}

fn read_rows<R: BufRead>(
    source: R,
    table: &TableSchema,
    options: &GtfsReader,
    total: u64,
) -> Result<Container, Error> {
    let file_name = table.file_name();
    let mut container = Container::empty(&table.indexing);
    let mut rows = Rows::new(source);

    let header = match read_header(&mut rows, &file_name)? {
        Some(header) => header,
        None => {
            info!("file '{}' has no header, table '{}' is empty", file_name, table.name);
            return Ok(container);
        }
    };
    let missing: Vec<String> = table
        .indexing
        .required_fields()
        .into_iter()
        .filter(|field| !header.iter().any(|h| h.as_str() == *field))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingIndexColumns {
            file_name,
            columns: missing,
        });
    }

    let mut progress = Progress::new(format!("import {}", table.name), total);
    let mut skipped = 0;
    while let Some(mut lines) = rows.next_row().map_err(|e| Error::named_io(&file_name, e))? {
        let mut parsed = parse(&lines, options.trim_fields);
        if lines.len() > 1 && !fits(&parsed, header.len()) {
            // an unterminated quote must not swallow the rows after it
            rows.replay_after_first(&mut lines);
            parsed = parse(&lines, options.trim_fields);
        }
        let line = lines[0].number;
        progress.update(rows.bytes_read);

        let row = match parsed {
            Ok(records) => match records.into_iter().next() {
                Some(row) => row,
                None => continue,
            },
            Err(e) if options.strict => return Err(Error::csv(&file_name, e)),
            Err(e) => {
                warn!("skipping row {} of '{}': {}", line, file_name, e);
                skipped += 1;
                continue;
            }
        };

        if row.len() == 1 && row[0].trim().is_empty() && header.len() != 1 {
            continue;
        }
        if row.len() != header.len() {
            let line_in_error = LineError {
                headers: header.clone(),
                values: row.iter().map(String::from).collect(),
            };
            if options.strict {
                return Err(Error::MalformedRow {
                    file_name,
                    line,
                    line_in_error,
                });
            }
            warn!(
                "skipping row {} of '{}': {} fields for {} columns {:?}, values {:?}",
                line,
                file_name,
                line_in_error.values.len(),
                header.len(),
                line_in_error.headers,
                line_in_error.values
            );
            skipped += 1;
            continue;
        }

        let record = codec::row_to_record(row.iter(), &header);
        let replaced = container
            .insert(record)
            .map_err(|e| e.in_table(&table.name))?;
        if replaced.is_some() && matches!(container, Container::Singleton(_)) {
            warn!(
                "'{}' holds a single record, row {} replaces the previous one",
                file_name, line
            );
        }
    }
    progress.finish();

    if skipped > 0 {
        warn!("{} rows of '{}' were skipped", skipped, file_name);
    }

    if let Some(hook) = &options.post_import {
        for record in container.iter_mut() {
            hook(&table.name, record);
        }
        container.refresh_identities();
    }
    Ok(container)
}
