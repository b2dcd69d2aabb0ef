//! layered property sources and the flattened [Properties] mapping
//!
//! A [PropertyStore] is an ordered list of layers. Each layer wraps a [PropertySource] and can be switched off.
//! [PropertyStore::build] loads every enabled layer in order and lays it over the previous ones, so a key defined
//! by a later layer replaces the same key from an earlier one.
//!
//! The usual order (see [crate::config::BuildConfig::property_store]) is
//! 1. [SystemProperties] (optional)
//! 2. [ProjectProperties] (optional)
//! 3. inline properties
//! 4. [PropertiesFile]
use crate::encoding::{Encoding, EncodingError, UnsupportedEncoding};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Flattened, read-only key/value mapping
///
/// Keys are case-sensitive. Iteration follows insertion order, a key replaced by a later layer keeps the position
/// where it was first defined.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, String>);

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Lay `other` over `self`, last writer wins
    pub(crate) fn overlay(&mut self, other: Properties) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Properties {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Utility macro to create [Properties]
///
/// ```
/// # use propsub::properties;
/// let properties = properties! {
///     "name" => "world",
///     "greeting" => "hello ${name}",
/// };
/// assert_eq!(properties.get("name"), Some("world"));
/// ```
///
/// ```
/// # use propsub::properties;
/// assert!(properties!().is_empty());
/// ```
#[macro_export]
macro_rules! properties {
    () => {
        $crate::properties::Properties::default()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        [$(($key.to_string(), $value.to_string())),+]
            .into_iter()
            .collect::<$crate::properties::Properties>()
    };
}

/// Something that can contribute a layer of properties
pub trait PropertySource {
    fn load(&self) -> Result<Properties, ConfigurationError>;
}

impl PropertySource for Properties {
    fn load(&self) -> Result<Properties, ConfigurationError> {
        Ok(self.clone())
    }
}

/// Environment and platform of the running process
///
/// Environment variables are exposed with an `env.` prefix (`${env.HOME}`), variables that aren't valid unicode are
/// skipped. Platform properties use the well known names `os.name`, `os.arch`, `os.family`, `file.separator`,
/// `path.separator`, `line.separator`, `user.dir` and `user.home`.
#[derive(Debug, Default)]
pub struct SystemProperties;

impl PropertySource for SystemProperties {
    fn load(&self) -> Result<Properties, ConfigurationError> {
        let mut entries: Vec<(String, String)> = vec![
            ("os.name".into(), std::env::consts::OS.into()),
            ("os.arch".into(), std::env::consts::ARCH.into()),
            ("os.family".into(), std::env::consts::FAMILY.into()),
            (
                "file.separator".into(),
                std::path::MAIN_SEPARATOR.to_string(),
            ),
            (
                "path.separator".into(),
                if cfg!(windows) { ";" } else { ":" }.into(),
            ),
            (
                "line.separator".into(),
                if cfg!(windows) { "\r\n" } else { "\n" }.into(),
            ),
        ];

        if let Ok(cwd) = std::env::current_dir() {
            entries.push(("user.dir".into(), cwd.display().to_string()));
        }

        let home = std::env::var(if cfg!(windows) { "USERPROFILE" } else { "HOME" });
        if let Ok(home) = home {
            entries.push(("user.home".into(), home));
        }

        for (key, value) in std::env::vars_os() {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => entries.push((format!("env.{key}"), value)),
                (key, _) => tracing::trace!(?key, "skipping non-unicode environment variable"),
            }
        }

        Ok(entries.into_iter().collect())
    }
}

/// Properties describing the project being built
///
/// `name` and `version` are available as `project.name` and `project.version`, the project's own property table
/// is added as-is and may override them.
#[derive(Debug, Default, Clone, derive_new::new)]
pub struct ProjectProperties {
    pub name: Option<String>,
    pub version: Option<String>,
    pub properties: Properties,
}

impl PropertySource for ProjectProperties {
    fn load(&self) -> Result<Properties, ConfigurationError> {
        let mut result: Properties = [
            ("project.name", self.name.as_ref()),
            ("project.version", self.version.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value.clone())))
        .collect();

        result.overlay(self.properties.clone());
        Ok(result)
    }
}

/// An external property file, see [crate::properties_file] for the supported formats
#[derive(Debug, Clone, derive_new::new)]
pub struct PropertiesFile {
    pub path: PathBuf,
    pub encoding: Encoding,
}

impl PropertySource for PropertiesFile {
    fn load(&self) -> Result<Properties, ConfigurationError> {
        crate::properties_file::load(&self.path, self.encoding)
    }
}

struct Layer {
    name: &'static str,
    enabled: bool,
    source: Box<dyn PropertySource>,
}

/// Ordered property layers
#[derive(Default)]
pub struct PropertyStore {
    layers: Vec<Layer>,
}

impl PropertyStore {
    /// Append a layer; it takes precedence over all layers added before
    pub fn layer(
        mut self,
        name: &'static str,
        enabled: bool,
        source: impl PropertySource + 'static,
    ) -> Self {
        self.layers.push(Layer {
            name,
            enabled,
            source: Box::new(source),
        });
        self
    }

    /// Load all enabled layers and merge them
    ///
    /// Fails on the first layer that can't be loaded, no partial mapping is returned.
    pub fn build(&self) -> Result<Properties, ConfigurationError> {
        let mut result = Properties::default();

        for layer in &self.layers {
            if !layer.enabled {
                tracing::debug!(layer = layer.name, "layer disabled");
                continue;
            }

            let properties = layer.source.load()?;
            tracing::debug!(layer = layer.name, count = properties.len(), "applying layer");
            result.overlay(properties);
        }

        tracing::info!(count = result.len(), "properties loaded");
        Ok(result)
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.layers.iter().map(|l| (l.name, l.enabled)))
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error(transparent)]
    UnsupportedEncoding(#[from] UnsupportedEncoding),
    #[error("Could not read {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not decode {}", path.display())]
    Undecodable {
        path: PathBuf,
        #[source]
        source: EncodingError,
    },
    #[error("Could not parse {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}
