//! Already downloaded QC tarballs, laid out as `{root}/{studyId}/{fileName}`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use serde_json::{Number, Value};

use super::record::Metrics;
use super::VariantCallingError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// `SN` summary lines of a bamstat file that are collected, and their key.
const BAMSTAT_FIELDS: [(&str, &str); 1] = [("insert size standard deviation", "insert_size_sd")];

#[derive(Debug, Clone, Default)]
pub struct QcArchiveStore {
    root: Option<PathBuf>,
}

impl QcArchiveStore {
    pub fn new(root: Option<PathBuf>) -> Self {
        QcArchiveStore { root }
    }

    /// Location of a tarball, if it has been downloaded.
    pub fn locate(&self, study_id: &str, file_name: &str) -> Option<PathBuf> {
        let path = self.root.as_ref()?.join(study_id).join(file_name);
        if path.is_file() {
            Some(path)
        } else {
            debug!("QC tarball {} not downloaded", path.display());
            None
        }
    }

    /// The `metrics` object of the bundled `*.extra_info.json`. Empty when
    /// the tarball is missing or carries no extra info.
    pub fn extra_info_metrics(
        &self,
        study_id: &str,
        file_name: &str,
    ) -> Result<Metrics, VariantCallingError> {
        let Some(path) = self.locate(study_id, file_name) else {
            return Ok(Metrics::new());
        };
        let mut metrics = Metrics::new();
        for_each_member(&path, |name, member| {
            if !name.ends_with(".extra_info.json") {
                return Ok(false);
            }
            let extra_info: Value = serde_json::from_reader(member).map_err(|source| {
                VariantCallingError::ExtraInfo {
                    path: path.clone(),
                    source,
                }
            })?;
            if let Some(found) = extra_info.get("metrics").and_then(Value::as_object) {
                metrics = found.clone();
            }
            Ok(true)
        })?;
        Ok(metrics)
    }

    /// Summary numbers from the bundled `*.aln.cram.bamstat` files.
    pub fn bamstat_metrics(
        &self,
        study_id: &str,
        file_name: &str,
    ) -> Result<Metrics, VariantCallingError> {
        let Some(path) = self.locate(study_id, file_name) else {
            return Ok(Metrics::new());
        };
        let mut metrics = Metrics::new();
        for_each_member(&path, |name, member| {
            if name.ends_with(".aln.cram.bamstat") {
                parse_bamstat(BufReader::new(member), &mut metrics)?;
            }
            Ok(false)
        })?;
        Ok(metrics)
    }
}

/// Open a tar archive, gzip compressed or not.
fn open_archive(path: &Path) -> Result<tar::Archive<Box<dyn Read>>, VariantCallingError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let compressed = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))?;

    let reader: Box<dyn Read> = if compressed {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(tar::Archive::new(reader))
}

/// Call `visit` with the file name and contents of each regular member until
/// it returns `true`.
fn for_each_member<F>(path: &Path, mut visit: F) -> Result<(), VariantCallingError>
where
    F: FnMut(&str, &mut dyn Read) -> Result<bool, VariantCallingError>,
{
    let mut archive = open_archive(path)?;
    let entries = archive
        .entries()
        .map_err(|source| VariantCallingError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
    for entry in entries {
        let mut entry = entry.map_err(|source| VariantCallingError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();
        if visit(&name, &mut entry)? {
            break;
        }
    }
    Ok(())
}

fn parse_number(raw: &str) -> Option<Value> {
    if raw.contains('.') || raw.contains('e') {
        raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
    } else {
        raw.parse::<i64>().ok().map(|n| Value::Number(n.into()))
    }
}

/// Collect the [`BAMSTAT_FIELDS`] from `SN` lines such as
/// `SN\tinsert size standard deviation:\t52.1`.
pub fn parse_bamstat<R: BufRead>(reader: R, metrics: &mut Metrics) -> Result<(), VariantCallingError> {
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with("SN\t") {
            continue;
        }
        let cleaned = line.replace(':', "");
        let cols: Vec<&str> = cleaned.trim().split('\t').collect();
        let (Some(field), Some(raw)) = (cols.get(1), cols.get(2)) else {
            continue;
        };
        let Some((_, key)) = BAMSTAT_FIELDS.iter().find(|(name, _)| name == field) else {
            continue;
        };
        if let Some(value) = parse_number(raw.trim()) {
            metrics.insert(key.to_string(), value);
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::{self, File};
    use std::path::Path;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    /// Write a gzipped tarball at `path` holding `members` as `(name, contents)`.
    pub fn write_tgz(path: &Path, members: &[(&str, &str)]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_tgz;
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_parse_bamstat() {
        let text = "# comment\n\
SN\traw total sequences:\t1000\n\
SN\tinsert size standard deviation:\t52.1\n\
RL\t100\t5\n";
        let mut metrics = Metrics::new();
        parse_bamstat(Cursor::new(text), &mut metrics).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["insert_size_sd"], json!(52.1));

        let mut metrics = Metrics::new();
        parse_bamstat(
            Cursor::new("SN\tinsert size standard deviation:\t48\n"),
            &mut metrics,
        )
        .unwrap();
        assert_eq!(metrics["insert_size_sd"], json!(48));
    }

    #[test]
    fn test_extra_info_metrics_from_tarball() {
        let dir = tempdir().unwrap();
        write_tgz(
            &dir.path().join("TEST-CA/t1.sanger.contamination.tgz"),
            &[
                ("out/readme.txt", "nothing"),
                (
                    "out/t1.extra_info.json",
                    r#"{"metrics": {"sample_id": "SA1", "contamination": 0.02}}"#,
                ),
            ],
        );
        let store = QcArchiveStore::new(Some(dir.path().to_path_buf()));

        let metrics = store
            .extra_info_metrics("TEST-CA", "t1.sanger.contamination.tgz")
            .unwrap();
        assert_eq!(metrics["sample_id"], json!("SA1"));
        assert_eq!(metrics["contamination"], json!(0.02));
    }

    #[test]
    fn test_bamstat_metrics_from_tarball() {
        let dir = tempdir().unwrap();
        write_tgz(
            &dir.path().join("TEST-CA/t1.qc_metrics.tgz"),
            &[(
                "t1.aln.cram.bamstat",
                "SN\tinsert size standard deviation:\t61.5\n",
            )],
        );
        let store = QcArchiveStore::new(Some(dir.path().to_path_buf()));
        let metrics = store.bamstat_metrics("TEST-CA", "t1.qc_metrics.tgz").unwrap();
        assert_eq!(metrics["insert_size_sd"], json!(61.5));
    }

    #[test]
    fn test_missing_tarball_gives_empty_metrics() {
        let dir = tempdir().unwrap();
        let store = QcArchiveStore::new(Some(dir.path().to_path_buf()));
        assert!(store.extra_info_metrics("TEST-CA", "nope.tgz").unwrap().is_empty());
        assert!(QcArchiveStore::default()
            .bamstat_metrics("TEST-CA", "nope.tgz")
            .unwrap()
            .is_empty());
    }
}
