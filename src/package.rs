//! Packager: bundle rendered files into an in-memory zip archive.

use crate::error::AppError;
use crate::model::RenderedFile;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What an archive holds; decides the suggested download name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveName {
    Table(i64),
    Batch(DateTime<Utc>),
}

impl ArchiveName {
    pub fn filename(&self) -> String {
        match self {
            ArchiveName::Table(table_id) => format!("codegen_table_{}.zip", table_id),
            ArchiveName::Batch(at) => format!("codegen_batch_{}.zip", at.format("%Y%m%d%H%M%S")),
        }
    }
}

/// Zip `files` (one UTF-8 member per `file_path`). A repeated path keeps the last content.
pub fn pack(files: &[RenderedFile], name: ArchiveName) -> Result<(Vec<u8>, String), AppError> {
    let filename = name.filename();
    let mut members: BTreeMap<&str, &str> = BTreeMap::new();
    for f in files {
        if members.insert(f.file_path.as_str(), f.content.as_str()).is_some() {
            tracing::warn!(path = %f.file_path, artifact = %f.artifact, "duplicate archive member; keeping the last");
        }
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for (path, content) in &members {
        writer.start_file(*path, options)?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| AppError::Archive(format!("{}: {}", path, e)))?;
    }
    let bytes = writer.finish()?.into_inner();
    tracing::debug!(members = members.len(), bytes = bytes.len(), filename = %filename, "archive built");
    Ok((bytes, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn file(path: &str, content: &str) -> RenderedFile {
        RenderedFile {
            artifact: "entity".into(),
            file_path: path.into(),
            content: content.into(),
        }
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut f = archive.by_name(name).unwrap();
        let mut s = String::new();
        f.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn one_member_per_path() {
        let (bytes, name) = pack(
            &[file("app/a/entity.rs", "a"), file("app/b/entity.rs", "b")],
            ArchiveName::Table(3),
        )
        .unwrap();
        assert_eq!(name, "codegen_table_3.zip");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(read_entry(&mut archive, "app/b/entity.rs"), "b");
    }

    #[test]
    fn duplicate_path_keeps_last() {
        let (bytes, _) = pack(&[file("x.rs", "first"), file("x.rs", "second")], ArchiveName::Table(1)).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(read_entry(&mut archive, "x.rs"), "second");
    }

    #[test]
    fn empty_input_is_a_valid_archive() {
        let (bytes, _) = pack(&[], ArchiveName::Table(1)).unwrap();
        assert_eq!(ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 0);
    }

    #[test]
    fn batch_name_carries_timestamp() {
        let at = DateTime::parse_from_rfc3339("2024-05-06T07:08:09Z").unwrap().with_timezone(&Utc);
        assert_eq!(ArchiveName::Batch(at).filename(), "codegen_batch_20240506070809.zip");
    }
}
