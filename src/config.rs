//! Script compilation configuration and the refinement context built from it.
//!
//! A configuration is an ordered key→value mapping. Keys are typed at the
//! API surface ([`ConfigKey`]) and identified by name on the wire, so a
//! whole configuration marshals across the process boundary as data.

use std::{fmt, marker::PhantomData};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{diagnostics::SourcePosition, error::Result};

/// Typed key into a [`CompilationConfiguration`] entry.
///
/// Keys are unique by name; the type parameter only pins the serde shape of
/// the stored value.
pub struct ConfigKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ConfigKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ConfigKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ConfigKey<T> {}

impl<T> fmt::Debug for ConfigKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for ConfigKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered key→value mapping describing how a script unit is compiled.
///
/// Insertion order is preserved and significant: refinement handlers run in
/// the order they were registered, and entries render in the order they
/// were set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationConfiguration {
    entries: Vec<(String, Value)>,
}

impl CompilationConfiguration {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Typed lookup. Returns `None` when the key is absent or the stored
    /// value does not have the key's shape.
    pub fn get<T: DeserializeOwned>(&self, key: ConfigKey<T>) -> Option<T> {
        let value = self.get_raw(key.name())?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    /// Typed insert. Replaces an existing entry in place, keeping its
    /// original position; new keys append at the end.
    pub fn set<T: Serialize>(&mut self, key: ConfigKey<T>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.insert_raw(key.name(), value);
        Ok(())
    }

    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_raw(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Handle to the source text of one script unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSource {
    pub name: String,
    pub text: String,
}

impl ScriptSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// An annotation discovered in the script so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourcePosition>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Everything a refinement handler may consult for one call.
///
/// Built fresh by the caller per call, passed by value across the boundary
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementContext {
    pub configuration: CompilationConfiguration,
    pub script: ScriptSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collected_annotations: Vec<Annotation>,
}

impl RefinementContext {
    pub const fn new(configuration: CompilationConfiguration, script: ScriptSource) -> Self {
        Self {
            configuration,
            script,
            collected_annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.collected_annotations = annotations;
        self
    }
}

/// The three points in script processing where external logic may adjust
/// the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefinementStage {
    BeforeParsing,
    OnAnnotations,
    BeforeCompiling,
}

impl RefinementStage {
    pub const ALL: [Self; 3] = [Self::BeforeParsing, Self::OnAnnotations, Self::BeforeCompiling];

    /// Wire key for this stage.
    pub const fn key(self) -> &'static str {
        match self {
            Self::BeforeParsing => "beforeParsing",
            Self::OnAnnotations => "onAnnotations",
            Self::BeforeCompiling => "beforeCompiling",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.key() == key)
    }
}

impl fmt::Display for RefinementStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Stage discriminator as carried across the process boundary.
///
/// Unlike [`RefinementStage`] this can hold a key the receiving side does
/// not know; the dispatcher rejects those with a diagnostic rather than a
/// fault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageKey(String);

impl StageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a known stage, if it is one.
    pub fn stage(&self) -> Option<RefinementStage> {
        RefinementStage::from_key(&self.0)
    }
}

impl From<RefinementStage> for StageKey {
    fn from(stage: RefinementStage) -> Self {
        Self(stage.key().to_string())
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
