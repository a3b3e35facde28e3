use crate::models::{CoercionError, FlagStatus, FlagValue};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, BufWriter, Write};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Member of Sober's config.json that holds the fastflags.
pub const FLAGS_SECTION: &str = "fflags";

/// Ordered flag name → value mapping.
pub type FlagMap = IndexMap<String, FlagValue>;

/// Errors that can occur while reading, editing or writing flags
#[derive(Error, Debug)]
pub enum FlagError {
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: Utf8PathBuf, reason: String },

    #[error("Invalid value for {key}: {source}")]
    TypeCoercion {
        key: String,
        #[source]
        source: CoercionError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FlagError {
    fn io(path: &Utf8Path, source: io::Error) -> Self {
        FlagError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn parse(path: &Utf8Path, reason: impl ToString) -> Self {
        FlagError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Repository for Sober's fastflags.
///
/// Holds the flags of `config.json` in memory together with the rest of that
/// document, so Sober's own settings survive a save untouched. Edits only
/// touch memory until [`save()`](Self::save) writes the whole document back
/// through a temporary file and an atomic rename; Sober reads the file
/// independently and must never see a half-written version.
#[derive(Debug, Clone)]
pub struct FlagRepository {
    config_path: Utf8PathBuf,
    /// config.json as last read, `None` until read; its flags section is replaced on save
    document: Option<Map<String, Value>>,
    flags: FlagMap,
    status: FlagStatus,
}

impl FlagRepository {
    pub fn new(config_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            document: None,
            flags: FlagMap::new(),
            status: FlagStatus::Unloaded,
        }
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    pub fn status(&self) -> FlagStatus {
        self.status
    }

    pub fn flags(&self) -> &FlagMap {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Read flags from the config file.
    ///
    /// A missing file is an empty mapping, not an error.
    ///
    /// # Returns
    /// The number of flags loaded
    pub fn load(&mut self) -> Result<usize, FlagError> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Flag config not found at {}, starting with no flags",
                self.config_path
            );
            self.document = Some(Map::new());
            self.flags = FlagMap::new();
            self.status = FlagStatus::Loaded;
            return Ok(0);
        }

        // The stale section stays in `document` to keep its position; save() overwrites it
        let document = read_json_object(&self.config_path)?;
        let flags = match document.get(FLAGS_SECTION) {
            None => FlagMap::new(),
            Some(Value::Object(section)) => parse_flag_map(&self.config_path, section.clone())?,
            Some(_) => {
                return Err(FlagError::parse(
                    &self.config_path,
                    format!("\"{}\" must be a JSON object", FLAGS_SECTION),
                ));
            }
        };

        self.document = Some(document);
        self.flags = flags;
        self.status = FlagStatus::Loaded;

        tracing::info!("Loaded {} flags from {}", self.flags.len(), self.config_path);
        Ok(self.flags.len())
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.flags.get(key)
    }

    /// Set a flag from user-entered text.
    ///
    /// Existing flags keep their type: the text is coerced to it and the
    /// edit is rejected with [`FlagError::TypeCoercion`] if that fails, leaving
    /// the old value in place. Unknown keys are created with a type inferred
    /// from the literal.
    ///
    /// # Returns
    /// The value now stored for `key`
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<FlagValue, FlagError> {
        let value = match self.flags.get(key) {
            Some(current) => current
                .kind()
                .coerce(raw)
                .map_err(|source| FlagError::TypeCoercion {
                    key: key.to_string(),
                    source,
                })?,
            None => {
                let inferred = FlagValue::infer(raw);
                tracing::debug!("Creating flag {} as {}", key, inferred.kind());
                inferred
            }
        };

        self.flags.insert(key.to_string(), value.clone());
        self.status = FlagStatus::Modified;
        tracing::debug!("Set {} = {}", key, value);
        Ok(value)
    }

    /// Remove a flag, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<FlagValue> {
        let removed = self.flags.shift_remove(key);
        if removed.is_some() {
            self.status = FlagStatus::Modified;
            tracing::debug!("Removed flag {}", key);
        }
        removed
    }

    /// Keys containing `term`, compared case-insensitively.
    ///
    /// The returned search borrows the repository and can be iterated as many
    /// times as needed.
    pub fn search(&self, term: &str) -> FlagSearch<'_> {
        FlagSearch {
            flags: &self.flags,
            needle: term.to_lowercase(),
        }
    }

    /// Write the flags back into the config file atomically.
    ///
    /// When the file was never loaded, its current contents are read first
    /// so Sober's other settings are kept.
    pub fn save(&mut self) -> Result<(), FlagError> {
        let mut document = match &self.document {
            Some(document) => document.clone(),
            None if self.config_path.exists() => read_json_object(&self.config_path)?,
            None => Map::new(),
        };
        document.insert(FLAGS_SECTION.to_string(), flags_to_json(&self.flags));

        write_json_atomically(&self.config_path, &Value::Object(document.clone()))?;
        self.document = Some(document);
        self.status = FlagStatus::Saved;

        tracing::info!("Saved {} flags to {}", self.flags.len(), self.config_path);
        Ok(())
    }

    /// Replace the in-memory flags with those of a flat JSON file.
    ///
    /// # Returns
    /// The number of flags imported
    pub fn import_from(&mut self, path: &Utf8Path) -> Result<usize, FlagError> {
        let imported = read_flag_file(path)?;
        let count = imported.len();

        self.flags = imported;
        self.status = FlagStatus::Modified;

        tracing::info!("Imported {} flags from {}", count, path);
        Ok(count)
    }

    /// Add the flags of a flat JSON file on top of the current ones.
    ///
    /// Keys present in both take the imported value.
    ///
    /// # Returns
    /// The number of flags imported
    pub fn merge_from(&mut self, path: &Utf8Path) -> Result<usize, FlagError> {
        let imported = read_flag_file(path)?;
        let count = imported.len();

        self.flags.extend(imported);
        self.status = FlagStatus::Modified;

        tracing::info!("Merged {} flags from {}", count, path);
        Ok(count)
    }

    /// Write the in-memory flags to a flat JSON file.
    pub fn export_to(&self, path: &Utf8Path) -> Result<(), FlagError> {
        write_json_atomically(path, &flags_to_json(&self.flags))?;
        tracing::info!("Exported {} flags to {}", self.flags.len(), path);
        Ok(())
    }
}

/// Lazy, restartable search over flag keys.
#[derive(Debug, Clone)]
pub struct FlagSearch<'a> {
    flags: &'a FlagMap,
    needle: String,
}

impl<'a> FlagSearch<'a> {
    /// Start a fresh pass over the matching keys.
    pub fn iter(&self) -> FlagSearchIter<'a, '_> {
        FlagSearchIter {
            keys: self.flags.keys(),
            needle: &self.needle,
        }
    }
}

impl<'a, 's> IntoIterator for &'s FlagSearch<'a> {
    type Item = &'a str;
    type IntoIter = FlagSearchIter<'a, 's>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`FlagSearch::iter`].
#[derive(Debug, Clone)]
pub struct FlagSearchIter<'a, 's> {
    keys: indexmap::map::Keys<'a, String, FlagValue>,
    needle: &'s str,
}

impl<'a> Iterator for FlagSearchIter<'a, '_> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = self.needle;
        self.keys
            .by_ref()
            .map(String::as_str)
            .find(|key| needle.is_empty() || key.to_lowercase().contains(needle))
    }
}

fn flags_to_json(flags: &FlagMap) -> Value {
    let map = flags
        .iter()
        .map(|(key, value)| (key.clone(), flag_to_json(value)))
        .collect();
    Value::Object(map)
}

fn flag_to_json(value: &FlagValue) -> Value {
    // Non-finite floats never get past coercion; serde_json maps them to null
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn read_json_object(path: &Utf8Path) -> Result<Map<String, Value>, FlagError> {
    let contents = fs::read_to_string(path).map_err(|e| FlagError::io(path, e))?;
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FlagError::parse(path, "expected a JSON object")),
        Err(e) => Err(FlagError::parse(path, e)),
    }
}

fn read_flag_file(path: &Utf8Path) -> Result<FlagMap, FlagError> {
    let object = read_json_object(path)?;
    parse_flag_map(path, object)
}

/// Convert a JSON object into flags, rejecting nested values and null.
fn parse_flag_map(path: &Utf8Path, object: Map<String, Value>) -> Result<FlagMap, FlagError> {
    object
        .into_iter()
        .map(|(key, value)| {
            // Above i64::MAX the untagged enum would fall through to a lossy float
            if let Value::Number(n) = &value {
                if n.is_u64() && n.as_i64().is_none() {
                    return Err(FlagError::parse(
                        path,
                        format!("flag {} is out of range for an integer: {}", key, n),
                    ));
                }
            }

            let flag = serde_json::from_value::<FlagValue>(value).map_err(|_| {
                FlagError::parse(
                    path,
                    format!("flag {} must be a boolean, number or string", key),
                )
            })?;
            Ok((key, flag))
        })
        .collect()
}

/// Serialize `value` with 4-space indentation and atomically replace `path`.
fn write_json_atomically(path: &Utf8Path, value: &Value) -> Result<(), FlagError> {
    write_atomically(path, |writer| {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
        value.serialize(&mut serializer).map_err(io::Error::from)?;
        writer.write_all(b"\n")
    })
}

/// Write through a temporary file in the target's directory, then rename it over the target.
///
/// If `write` fails the temporary file is discarded and the target is left
/// exactly as it was.
fn write_atomically<F>(path: &Utf8Path, write: F) -> Result<(), FlagError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| FlagError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| FlagError::io(parent, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer).map_err(|e| FlagError::io(path, e))?;
        writer.flush().map_err(|e| FlagError::io(path, e))?;
    }

    // Keep the permissions of the file being replaced
    if let Ok(metadata) = fs::metadata(path) {
        if let Err(e) = temp.as_file().set_permissions(metadata.permissions()) {
            tracing::debug!("Could not copy permissions of {}: {}", path, e);
        }
    }

    temp.as_file().sync_all().map_err(|e| FlagError::io(path, e))?;
    temp.persist(path).map_err(|e| FlagError::io(path, e.error))?;
    Ok(())
}
