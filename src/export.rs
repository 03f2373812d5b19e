use crate::codec;
use crate::gtfs_reader::PreExportHook;
use crate::progress::Progress;
use crate::schema::file_name_of;
use crate::{Container, Error, Gtfs, Record};
use log::info;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Declared columns, then the fields of `sample` that are not declared, in their order
pub(crate) fn header_of(declared: &[String], sample: Option<&Record>) -> Vec<String> {
    let mut columns = declared.to_vec();
    if let Some(sample) = sample {
        for field in sample.fields() {
            if !columns.iter().any(|c| c == field) {
                columns.push(field.to_owned());
            }
        }
    }
    columns
}

/// `record` as the pre-export hook turns it, the stored record is left untouched
fn prepared<'r>(hook: Option<&PreExportHook>, table_name: &str, record: &'r Record) -> Cow<'r, Record> {
    match hook {
        Some(hook) => {
            let mut record = record.clone();
            hook(table_name, &mut record);
            Cow::Owned(record)
        }
        None => Cow::Borrowed(record),
    }
}

fn check_output(gtfs: &Gtfs, output: &Path) -> Result<(), Error> {
    let invalid = |reason: &str| Error::InvalidOutputPath {
        path: format!("{}", output.display()),
        reason: reason.to_owned(),
    };
    if !output.exists() {
        return Ok(());
    }
    if !output.is_dir() {
        return Err(invalid("it is not a directory"));
    }
    if let Some(source) = gtfs.path() {
        let output = output
            .canonicalize()
            .map_err(|e| Error::named_io(&format!("{}", output.display()), e))?;
        let source = source
            .canonicalize()
            .map_err(|e| Error::named_io(&format!("{}", source.display()), e))?;
        if source.starts_with(&output) {
            return Err(invalid("it would delete the source directory"));
        }
    }
    Ok(())
}

/// Recreates `output` and writes every table in it, see [Gtfs::export]
pub(crate) fn export_all(gtfs: &Gtfs, output: &Path) -> Result<(), Error> {
    check_output(gtfs, output)?;
    let output_name = format!("{}", output.display());
    if output.exists() {
        fs::remove_dir_all(output).map_err(|e| Error::named_io(&output_name, e))?;
    }
    fs::create_dir_all(output).map_err(|e| Error::named_io(&output_name, e))?;

    for name in gtfs.table_names() {
        match gtfs.loaded_table(&name) {
            Some(table) => write_table(gtfs, &name, &table.read(), output)?,
            None => copy_table(gtfs, &name, output)?,
        }
    }
    Ok(())
}

fn copy_table(gtfs: &Gtfs, name: &str, output: &Path) -> Result<(), Error> {
    let file_name = file_name_of(name);
    match gtfs.path().map(|p| p.join(&file_name)) {
        Some(source) if source.is_file() => {
            fs::copy(&source, output.join(&file_name))
                .map_err(|e| Error::named_io(&file_name, e))?;
            info!("table '{}' copied", name);
        }
        _ => info!("table '{}' skipped, there is no file to copy", name),
    }
    Ok(())
}

fn write_table(gtfs: &Gtfs, name: &str, container: &Container, output: &Path) -> Result<(), Error> {
    let file_name = file_name_of(name);
    let hook = gtfs.reader.pre_export.as_ref();
    let declared = gtfs.schema().columns_of(name).unwrap_or_default();
    let sample = container.sample().map(|r| prepared(hook, name, r));
    let columns = header_of(declared, sample.as_deref());

    let file = File::create(output.join(&file_name)).map_err(|e| Error::named_io(&file_name, e))?;
    let mut writer = codec::writer_builder().from_writer(BufWriter::new(file));
    writer
        .write_record(&columns)
        .map_err(|e| Error::csv(&file_name, e))?;

    let mut progress = Progress::new(format!("export {}", name), container.len() as u64);
    for (done, record) in container.iter().enumerate() {
        let record = prepared(hook, name, record);
        let row = codec::record_to_row(&record, &columns);
        writer
            .write_record(row.iter().map(|field| field.as_bytes()))
            .map_err(|e| Error::csv(&file_name, e))?;
        progress.update(done as u64 + 1);
    }
    progress.finish();
    writer.flush().map_err(|e| Error::named_io(&file_name, e))?;

    info!("table '{}' exported: {} records", name, container.len());
    Ok(())
}
