//! Settings for the `mg` generator itself.
//!
//! These are knobs for _how_ a generation pass runs (file names, output directories, thread
//! counts). The build configuration of projects is declared in the workspace file, never here.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, RwLock,
};

use compact_str::CompactString;
use mg_ore::assert_none;

/// A single generator setting, declared statically and registered into a [`ConfigSet`].
pub struct Config<V: ConfigType> {
    name: &'static str,
    desc: &'static str,
    default: V,
}

impl<V: ConfigType> Config<V> {
    /// Declare a new [`Config`] with a default value.
    pub const fn new(name: &'static str, desc: &'static str, default: V) -> Self {
        Config {
            name,
            desc,
            default,
        }
    }

    /// Name this setting is registered and overridden by.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the current value of this [`Config`] from the provided [`ConfigSet`].
    ///
    /// # Panics
    ///
    /// * If this [`Config`] was never registered with the [`ConfigSetBuilder`]. That is a
    ///   programming error, not a user error.
    pub fn read(&self, set: &ConfigSet) -> V::Stored {
        let Some(entry) = set.configs.get(self.name) else {
            panic!("tried to read unregistered config {}", self.name);
        };
        V::read_shared(&entry.value)
    }
}

/// A cheaply cloneable, thread-safe set of [`Config`] values.
///
/// Clones share storage, an update through one clone is observed by all of them.
#[derive(Clone, Debug)]
pub struct ConfigSet {
    configs: Arc<BTreeMap<CompactString, ConfigSetEntry>>,
}

impl ConfigSet {
    /// Returns a new [`ConfigSetBuilder`].
    pub fn builder() -> ConfigSetBuilder {
        ConfigSetBuilder::default()
    }

    /// Update `config` in this [`ConfigSet`] with the specified value.
    ///
    /// # Panics
    ///
    /// * If `config` was not previously registered with the original [`ConfigSetBuilder`].
    pub fn update<V: ConfigType>(&self, config: &'static Config<V>, value: V) {
        let Some(entry) = self.configs.get(config.name) else {
            panic!("tried to update unregistered config {}", config.name);
        };
        entry.value.store(value.to_dyn());
    }

    /// Update the [`Config`] named `name`, parsing `value` into the right type.
    ///
    /// # Errors
    ///
    /// * If no config named `name` exists in this set.
    /// * If the config specified by `name` cannot parse `value`.
    pub fn try_update(&self, name: &str, value: &str) -> Result<(), anyhow::Error> {
        let entry = self
            .configs
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no setting named '{name}' exists"))?;
        entry
            .value
            .store_parsed(value)
            .map_err(|err| anyhow::anyhow!("invalid value '{value}' for setting '{name}': {err}"))
    }

    /// Applies a batch of `name = value` overrides, stopping at the first failure.
    pub fn apply_overrides<'a, I>(&self, overrides: I) -> Result<(), anyhow::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in overrides {
            self.try_update(name, value)?;
        }
        Ok(())
    }

    /// Returns the names of all registered settings, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.configs.keys().map(|name| name.as_str())
    }
}

impl fmt::Display for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, entry) in &*self.configs {
            writeln!(f, "{} => {}\n\t└─ '{}'", name, entry.value, entry.desc)?;
        }
        Ok(())
    }
}

/// Single entry within a [`ConfigSet`].
#[derive(Clone, Debug)]
struct ConfigSetEntry {
    value: SharedValue,
    desc: &'static str,
}

/// A builder for a [`ConfigSet`].
#[derive(Default, Debug)]
pub struct ConfigSetBuilder {
    configs: BTreeMap<CompactString, (DynValue, &'static str)>,
}

impl ConfigSetBuilder {
    /// Register a [`Config`] into this [`ConfigSetBuilder`] with its default value.
    ///
    /// # Panics
    ///
    /// * If a [`Config`] with the same name was already registered.
    pub fn register<V: ConfigType>(&mut self, config: &'static Config<V>) -> &mut Self {
        let value = config.default.to_dyn();
        let prev = self
            .configs
            .insert(CompactString::const_new(config.name), (value, config.desc));
        assert_none!(prev, "config '{}' registered more than once", config.name);
        self
    }

    /// Consumes this [`ConfigSetBuilder`] constructing a [`ConfigSet`].
    pub fn build(self) -> ConfigSet {
        let configs = self
            .configs
            .into_iter()
            .map(|(name, (value, desc))| {
                let entry = ConfigSetEntry {
                    value: value.into_shared(),
                    desc,
                };
                (name, entry)
            })
            .collect();
        ConfigSet {
            configs: Arc::new(configs),
        }
    }
}

/// Types that can be the value of a [`Config`].
pub trait ConfigType {
    /// The type handed back when reading from a [`ConfigSet`].
    type Stored;

    fn to_dyn(&self) -> DynValue;
    fn read_shared(val: &SharedValue) -> Self::Stored;
}

impl ConfigType for bool {
    type Stored = bool;

    fn to_dyn(&self) -> DynValue {
        DynValue::Bool(*self)
    }

    fn read_shared(val: &SharedValue) -> bool {
        let SharedValue::Bool(val) = val else {
            panic!("programming error, found {val:?} for bool")
        };
        val.load(Ordering::SeqCst)
    }
}

impl ConfigType for u64 {
    type Stored = u64;

    fn to_dyn(&self) -> DynValue {
        DynValue::U64(*self)
    }

    fn read_shared(val: &SharedValue) -> u64 {
        let SharedValue::U64(val) = val else {
            panic!("programming error, found {val:?} for u64")
        };
        val.load(Ordering::SeqCst)
    }
}

impl ConfigType for &str {
    type Stored = CompactString;

    fn to_dyn(&self) -> DynValue {
        DynValue::String(CompactString::new(self))
    }

    fn read_shared(val: &SharedValue) -> CompactString {
        let SharedValue::String(val) = val else {
            panic!("programming error, found {val:?} for string")
        };
        let read_lock = val.read().expect("SharedValue::String lock poisoned");
        read_lock.clone()
    }
}

/// "Type erased" setting values.
///
/// An enum instead of a `Box<dyn Value>` keeps the set of supported types closed and easy to
/// match on.
#[derive(Debug)]
pub enum DynValue {
    Bool(bool),
    U64(u64),
    String(CompactString),
}

impl DynValue {
    fn into_shared(self) -> SharedValue {
        match self {
            DynValue::Bool(val) => SharedValue::Bool(Arc::new(AtomicBool::new(val))),
            DynValue::U64(val) => SharedValue::U64(Arc::new(AtomicU64::new(val))),
            DynValue::String(val) => SharedValue::String(Arc::new(RwLock::new(val))),
        }
    }
}

/// Shareable instance of a [`DynValue`].
#[derive(Clone, Debug)]
pub enum SharedValue {
    Bool(Arc<AtomicBool>),
    U64(Arc<AtomicU64>),
    String(Arc<RwLock<CompactString>>),
}

impl SharedValue {
    fn store(&self, value: DynValue) {
        match (self, value) {
            (SharedValue::Bool(shared), DynValue::Bool(val)) => shared.store(val, Ordering::SeqCst),
            (SharedValue::U64(shared), DynValue::U64(val)) => shared.store(val, Ordering::SeqCst),
            (SharedValue::String(shared), DynValue::String(val)) => {
                let mut write_lock = shared.write().expect("SharedValue::String lock poisoned");
                *write_lock = val;
            }
            (shared, val) => unreachable!("tried to update shared {shared:?} with {val:?}"),
        }
    }

    fn store_parsed(&self, value: &str) -> Result<(), anyhow::Error> {
        match self {
            SharedValue::Bool(shared) => {
                // Accept the same spellings we accept from environment variables.
                let val = match value.to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => true,
                    "false" | "0" | "no" | "off" => false,
                    other => anyhow::bail!("expected a boolean, found '{other}'"),
                };
                shared.store(val, Ordering::SeqCst);
            }
            SharedValue::U64(shared) => {
                let val: u64 = value.parse()?;
                shared.store(val, Ordering::SeqCst);
            }
            SharedValue::String(shared) => {
                let mut write_lock = shared.write().expect("SharedValue::String lock poisoned");
                write_lock.clear();
                write_lock.push_str(value);
            }
        }
        Ok(())
    }
}

impl fmt::Display for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedValue::Bool(val) => write!(f, "{}", val.load(Ordering::SeqCst)),
            SharedValue::U64(val) => write!(f, "{}", val.load(Ordering::SeqCst)),
            SharedValue::String(val) => {
                let read_lock = val.read().expect("SharedValue::String lock poisoned");
                write!(f, "'{}'", *read_lock)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static TEST_FLAG: Config<bool> = Config::new("test_flag", "A test flag.", true);
    static TEST_DIR: Config<&'static str> = Config::new("test_dir", "A test directory.", "_out");
    static TEST_THREADS: Config<u64> = Config::new("test_threads", "A test count.", 0);

    fn test_set() -> ConfigSet {
        let mut builder = ConfigSet::builder();
        builder
            .register(&TEST_FLAG)
            .register(&TEST_DIR)
            .register(&TEST_THREADS);
        builder.build()
    }

    #[test]
    fn smoketest_read_defaults() {
        let set = test_set();
        assert!(TEST_FLAG.read(&set));
        assert_eq!(TEST_DIR.read(&set), "_out");
        assert_eq!(TEST_THREADS.read(&set), 0);
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            vec!["test_dir", "test_flag", "test_threads"]
        );
    }

    #[test]
    fn smoketest_update_is_shared() {
        let set = test_set();
        let set_2 = set.clone();

        set.update(&TEST_FLAG, false);
        assert!(!TEST_FLAG.read(&set_2));

        set.update(&TEST_DIR, "_generated");
        assert_eq!(TEST_DIR.read(&set_2), "_generated");
    }

    #[test]
    fn smoketest_parse_overrides() {
        let set = test_set();
        set.apply_overrides([("test_flag", "off"), ("test_threads", "8")])
            .unwrap();
        assert!(!TEST_FLAG.read(&set));
        assert_eq!(TEST_THREADS.read(&set), 8);

        assert!(set.try_update("test_threads", "many").is_err());
        assert!(set.try_update("test_flag", "maybe").is_err());
        assert!(set.try_update("not_a_setting", "1").is_err());
    }

    #[test]
    #[should_panic(expected = "registered more than once")]
    fn smoketest_double_register() {
        let mut builder = ConfigSet::builder();
        builder.register(&TEST_FLAG).register(&TEST_FLAG);
    }
}
