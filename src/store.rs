//! Saving and loading [`Results`] records in a keyed archive file.
//!
//! An archive is a single file holding any number of results records, each stored under a key of
//! the form `<group>/<run name>` (or just `<run name>` if there is no group). Records are
//! write-once: saving under a key which is already present leaves the stored record untouched.
use crate::options::{ModelOptions, canonical_run_name};
use crate::results::Results;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Identifies a file as a results archive
const ARCHIVE_MAGIC: &[u8; 8] = b"SGRSLT\x00\x01";

/// The zstd compression level used for compressed records
const COMPRESSION_LEVEL: i32 = 3;

/// Separates a group from the rest of a key
pub const GROUP_SEPARATOR: char = '/';

/// A single stored record
#[derive(Serialize, Deserialize)]
struct ArchiveEntry {
    compressed: bool,
    data: Vec<u8>,
}

impl ArchiveEntry {
    fn encode(results: &Results, compress: bool) -> Result<Self> {
        let bytes = bincode::serialize(results)?;
        let data = if compress {
            zstd::stream::encode_all(bytes.as_slice(), COMPRESSION_LEVEL)?
        } else {
            bytes
        };

        Ok(Self {
            compressed: compress,
            data,
        })
    }

    fn decode(&self) -> Result<Results> {
        let results = if self.compressed {
            let bytes = zstd::stream::decode_all(self.data.as_slice())?;
            bincode::deserialize(&bytes)?
        } else {
            bincode::deserialize(&self.data)?
        };

        Ok(results)
    }
}

/// The contents of an archive file
#[derive(Serialize, Deserialize, Default)]
struct Archive {
    entries: IndexMap<String, ArchiveEntry>,
}

impl Archive {
    /// Read an archive from disk
    fn read(file_path: &Path) -> Result<Self> {
        let file = File::open(file_path)
            .with_context(|| format!("Could not open results file {}", file_path.display()))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; ARCHIVE_MAGIC.len()];
        reader.read_exact(&mut magic).with_context(|| {
            format!("{} is not a results file", file_path.display())
        })?;
        ensure!(
            &magic == ARCHIVE_MAGIC,
            "{} is not a results file",
            file_path.display()
        );

        bincode::deserialize_from(reader)
            .with_context(|| format!("Results file {} is corrupt", file_path.display()))
    }

    /// Read an archive from disk, or start a new one if the file doesn't exist
    fn read_or_new(file_path: &Path) -> Result<Self> {
        if file_path.exists() {
            Self::read(file_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the archive to disk.
    ///
    /// The data is written to a temporary file in the same folder, which then replaces the
    /// original, so an interrupted write leaves the old archive intact.
    fn write(&self, file_path: &Path) -> Result<()> {
        let dir = match file_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Could not create temporary file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            writer.write_all(ARCHIVE_MAGIC)?;
            bincode::serialize_into(&mut writer, self)?;
            writer.flush()?;
        }
        temp.persist(file_path)
            .with_context(|| format!("Could not write results file {}", file_path.display()))?;

        Ok(())
    }
}

/// Normalise a group name so that it is either empty or ends with [`GROUP_SEPARATOR`]
pub fn normalise_group(group: &str) -> String {
    if group.is_empty() || group.ends_with(GROUP_SEPARATOR) {
        group.to_string()
    } else {
        format!("{group}{GROUP_SEPARATOR}")
    }
}

/// The archive key for a run
pub fn archive_key(run_name: &str, group: &str) -> String {
    normalise_group(group) + run_name
}

/// The result of a call to [`save_results`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No results file was given, so nothing was saved
    NoFile,
    /// The results were written
    Saved,
    /// A record with the same key already exists and was left unchanged
    AlreadyExists,
}

/// Save results under the given run name.
///
/// If a record with the same key is already stored, a warning is emitted and nothing is written.
///
/// # Arguments
///
/// * `results` - The results to save
/// * `run_name` - Name of the run
/// * `file_path` - The archive file, which is created if needed. If `None`, nothing is saved.
/// * `group` - Optional group prefix (may be empty)
/// * `compress` - Whether to compress the stored record
pub fn save_results(
    results: &Results,
    run_name: &str,
    file_path: Option<&Path>,
    group: &str,
    compress: bool,
) -> Result<SaveOutcome> {
    let Some(file_path) = file_path else {
        return Ok(SaveOutcome::NoFile);
    };

    let key = archive_key(run_name, group);
    let mut archive = Archive::read_or_new(file_path)?;
    if archive.entries.contains_key(&key) {
        warn!(
            "The run {key} already exists in {} (use a new run name or delete the old data first)",
            file_path.display()
        );
        return Ok(SaveOutcome::AlreadyExists);
    }

    archive
        .entries
        .insert(key.clone(), ArchiveEntry::encode(results, compress)?);
    archive.write(file_path)?;
    info!("Saved run {key} to {}", file_path.display());

    Ok(SaveOutcome::Saved)
}

/// List the keys stored in an archive.
///
/// If `group` is non-empty, only keys within that group are returned.
pub fn list_results(file_path: &Path, group: &str) -> Result<Vec<String>> {
    let archive = Archive::read(file_path)?;
    let prefix = normalise_group(group);

    Ok(archive
        .entries
        .into_keys()
        .filter(|key| key.starts_with(&prefix))
        .collect())
}

/// Load the results stored under the given run name.
///
/// # Returns
///
/// The results, or `None` (after reporting the absence) if there is no such run.
pub fn load_results(run_name: &str, file_path: &Path, group: &str) -> Result<Option<Results>> {
    let key = archive_key(run_name, group);
    let archive = Archive::read(file_path)?;
    let Some(entry) = archive.entries.get(&key) else {
        warn!("No run named {key} in {}", file_path.display());
        return Ok(None);
    };

    let results = entry
        .decode()
        .with_context(|| format!("Could not decode run {key}"))?;

    Ok(Some(results))
}

/// Load the results of the run with the given options.
///
/// The run name is reconstructed from the options merged with the defaults.
pub fn load_results_for_options(
    options: &ModelOptions,
    file_path: &Path,
    group: &str,
) -> Result<Option<Results>> {
    load_results(&canonical_run_name(options), file_path, group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, results};
    use crate::options::OptionValue;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_normalise_group() {
        assert_eq!(normalise_group(""), "");
        assert_eq!(normalise_group("europe"), "europe/");
        assert_eq!(normalise_group("europe/"), "europe/");
        assert_eq!(archive_key("run1", "europe"), "europe/run1");
        assert_eq!(archive_key("run1", ""), "run1");
    }

    #[rstest]
    fn test_save_no_file(results: Results) {
        assert_eq!(
            save_results(&results, "run1", None, "", true).unwrap(),
            SaveOutcome::NoFile
        );
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_save_load_round_trip(results: Results, #[case] compress: bool) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");

        assert_eq!(
            save_results(&results, "run1", Some(&file_path), "", compress).unwrap(),
            SaveOutcome::Saved
        );
        let loaded = load_results("run1", &file_path, "").unwrap().unwrap();
        assert_eq!(loaded, results);
    }

    #[rstest]
    fn test_save_existing_key(results: Results) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");
        save_results(&results, "run1", Some(&file_path), "", true).unwrap();
        let before = fs::read(&file_path).unwrap();

        let mut changed = results.clone();
        changed.system_cost[0] = 1e6;
        assert_eq!(
            save_results(&changed, "run1", Some(&file_path), "", true).unwrap(),
            SaveOutcome::AlreadyExists
        );

        // File is untouched and the first record wins
        assert_eq!(fs::read(&file_path).unwrap(), before);
        let loaded = load_results("run1", &file_path, "").unwrap().unwrap();
        assert_eq!(loaded, results);
    }

    #[rstest]
    fn test_save_several_runs(results: Results) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");
        for run_name in ["run1", "run2"] {
            save_results(&results, run_name, Some(&file_path), "", true).unwrap();
        }
        save_results(&results, "run1", Some(&file_path), "europe", false).unwrap();

        assert_eq!(
            list_results(&file_path, "").unwrap(),
            ["run1", "run2", "europe/run1"]
        );
        assert_eq!(list_results(&file_path, "europe").unwrap(), ["europe/run1"]);
        assert!(
            load_results("run1", &file_path, "europe/")
                .unwrap()
                .is_some()
        );
    }

    #[rstest]
    fn test_load_missing_run(results: Results) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");
        save_results(&results, "run1", Some(&file_path), "", true).unwrap();

        assert!(load_results("run2", &file_path, "").unwrap().is_none());
        assert!(load_results("run1", &file_path, "europe").unwrap().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(load_results("run1", &dir.path().join("nonexistent.sgr"), "").is_err());
    }

    #[test]
    fn test_load_not_archive() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");
        fs::write(&file_path, "hello, world").unwrap();
        assert_error!(
            list_results(&file_path, ""),
            format!("{} is not a results file", file_path.display())
        );
    }

    #[rstest]
    fn test_load_for_options(results: Results) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("results.sgr");
        save_results(&results, "carbontax=50", Some(&file_path), "", true).unwrap();

        let options: ModelOptions = [("carbontax".to_string(), OptionValue::Float(50.0))]
            .into_iter()
            .collect();
        let loaded = load_results_for_options(&options, &file_path, "")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, results);
        assert!(
            load_results_for_options(&ModelOptions::new(), &file_path, "")
                .unwrap()
                .is_none()
        );
    }
}
