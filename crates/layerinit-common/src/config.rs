//! Boot option model and the static field table that decodes boot
//! parameters into it.
//!
//! Every recognised key maps to exactly one [`Field`] entry: its name and a
//! typed setter carrying the compiled-in default. The setter's variant fixes
//! the coercion rule, so the compiler verifies that each option receives the
//! type it stores.

use std::path::PathBuf;

use serde::Serialize;

use crate::constants::{DEFAULT_CMD, DEFAULT_DIRS, DEFAULT_MOUNT, PARAM_PREFIX};
use crate::error::{LayerInitError, Result};
use crate::types::BootParams;

/// Resolved layerinit configuration.
///
/// Built once per boot from [`Options::default`] overridden by boot
/// parameters and local flags; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    /// Device backing the persistent data store.
    pub data: String,
    /// Filesystem type of [`Options::data`].
    #[serde(rename = "datafstype")]
    pub data_fs_type: String,
    /// Mountpoint of the data store.
    pub mount: PathBuf,
    /// Absolute directories converted to overlays, in mount order.
    pub dirs: Vec<PathBuf>,
    /// Real init executable.
    pub cmd: PathBuf,
    /// Back the data store with tmpfs instead of [`Options::data`].
    pub volatile: bool,
}

impl Default for Options {
    fn default() -> Self {
        let mut options = Self {
            data: String::new(),
            data_fs_type: String::new(),
            mount: PathBuf::new(),
            dirs: Vec::new(),
            cmd: PathBuf::new(),
            volatile: false,
        };
        for field in FIELDS {
            field.setter.reset(&mut options);
        }
        options
    }
}

/// Where the data store comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource<'a> {
    /// Memory-backed tmpfs.
    Volatile,
    /// A block device with a known filesystem type.
    Device {
        /// Device path.
        device: &'a str,
        /// Filesystem type.
        fstype: &'a str,
    },
}

impl Options {
    /// Resolves options from compiled-in defaults and `params`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Decode`] if any recognised parameter cannot
    /// be coerced, or [`LayerInitError::Config`] if the result is invalid.
    pub fn resolve(params: &BootParams) -> Result<Self> {
        let mut options = Self::default();
        options.apply(params)?;
        Ok(options)
    }

    /// Overrides fields with the recognised entries of `params`.
    ///
    /// Keys outside the `layerinit.` namespace are ignored. Spellings that
    /// normalise to the same key are one parameter: their values are
    /// gathered in order of appearance before the field is set.
    ///
    /// # Errors
    ///
    /// Same as [`Options::resolve`].
    pub fn apply(&mut self, params: &BootParams) -> Result<()> {
        let mut grouped: Vec<(&Field, Vec<&str>)> = Vec::new();
        for (raw_key, value) in params.iter() {
            let Some(key) = normalize_key(raw_key) else {
                continue;
            };
            let Some(field) = FIELDS.iter().find(|field| field.key == key) else {
                tracing::debug!(key = raw_key, "ignoring unknown boot parameter");
                continue;
            };
            match grouped.iter_mut().find(|(seen, _)| seen.key == field.key) {
                Some((_, values)) => values.push(value),
                None => grouped.push((field, vec![value])),
            }
        }
        for (field, values) in &grouped {
            field.setter.apply(self, field.key, values)?;
        }
        self.validate()
    }

    /// Selects the data store source.
    ///
    /// When `volatile` is set the device fields are never inspected.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Config`] when not volatile and either
    /// `data` or `datafstype` is empty.
    pub fn data_source(&self) -> Result<DataSource<'_>> {
        if self.volatile {
            return Ok(DataSource::Volatile);
        }
        if self.data.is_empty() || self.data_fs_type.is_empty() {
            return Err(LayerInitError::config(
                "data and datafstype must be specified unless volatile is set",
            ));
        }
        Ok(DataSource::Device {
            device: &self.data,
            fstype: &self.data_fs_type,
        })
    }

    /// Renders the options as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.mount.as_os_str().is_empty() {
            return Err(LayerInitError::config("mount must not be empty"));
        }
        if let Some(dir) = self.dirs.iter().find(|dir| !dir.is_absolute()) {
            return Err(LayerInitError::decode(
                "dirs",
                format!("{} is not an absolute path", dir.display()),
            ));
        }
        Ok(())
    }
}

/// Strips the namespace prefix and folds case and separators.
///
/// Returns `None` for keys outside the namespace.
fn normalize_key(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let rest = lower.strip_prefix(PARAM_PREFIX)?;
    Some(rest.chars().filter(|c| !matches!(c, '-' | '_')).collect())
}

/// Typed setter; the variant selects the coercion rule and carries the
/// compiled-in default.
enum Setter {
    Text {
        set: fn(&mut Options, String),
        default: &'static str,
    },
    List {
        set: fn(&mut Options, Vec<String>),
        default: &'static [&'static str],
    },
    Flag {
        set: fn(&mut Options, bool),
        default: bool,
    },
}

impl Setter {
    fn apply(&self, options: &mut Options, key: &str, values: &[&str]) -> Result<()> {
        match self {
            Self::Text { set, .. } => set(options, single(key, values)?.to_owned()),
            Self::List { set, .. } => set(options, split_list(values)),
            Self::Flag { set, .. } => set(options, parse_bool(key, single(key, values)?)?),
        }
        Ok(())
    }

    fn reset(&self, options: &mut Options) {
        match self {
            Self::Text { set, default } => set(options, (*default).to_owned()),
            Self::List { set, default } => {
                set(options, default.iter().map(|dir| (*dir).to_owned()).collect());
            }
            Self::Flag { set, default } => set(options, *default),
        }
    }
}

struct Field {
    key: &'static str,
    setter: Setter,
}

const FIELDS: &[Field] = &[
    Field {
        key: "data",
        setter: Setter::Text {
            set: |o, v| o.data = v,
            default: "",
        },
    },
    Field {
        key: "datafstype",
        setter: Setter::Text {
            set: |o, v| o.data_fs_type = v,
            default: "",
        },
    },
    Field {
        key: "mount",
        setter: Setter::Text {
            set: |o, v| o.mount = PathBuf::from(v),
            default: DEFAULT_MOUNT,
        },
    },
    Field {
        key: "dirs",
        setter: Setter::List {
            set: |o, v| o.dirs = v.into_iter().map(PathBuf::from).collect(),
            default: DEFAULT_DIRS,
        },
    },
    Field {
        key: "cmd",
        setter: Setter::Text {
            set: |o, v| o.cmd = PathBuf::from(v),
            default: DEFAULT_CMD,
        },
    },
    Field {
        key: "volatile",
        setter: Setter::Flag {
            set: |o, v| o.volatile = v,
            default: false,
        },
    },
];

fn single<'a>(key: &str, values: &[&'a str]) -> Result<&'a str> {
    match values {
        [only] => Ok(*only),
        many => Err(LayerInitError::decode(
            key,
            format!("expected a single value, got {}", many.len()),
        )),
    }
}

fn split_list(values: &[&str]) -> Vec<String> {
    values
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses systemd-style boolean tokens.
///
/// # Errors
///
/// Returns [`LayerInitError::Decode`] for any token outside
/// `true/yes/1/on` and `false/no/0/off`.
pub fn parse_bool(key: &str, token: &str) -> Result<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(LayerInitError::decode(
            key,
            format!("invalid boolean value: {token:?}"),
        )),
    }
}
