//! Name to acoustic resolution with caching.

use crate::acoustic::{Acoustic, AcousticKind};
use crate::builder::SoundBuilder;
use crate::compiler::{AcousticCompiler, AcousticError};
use crate::registry::SoundRegistry;
use crate::SoundCategory;
use mdambient_core::{RegistryKey, DEFAULT_NAMESPACE};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fragment that resolves to the null acoustic on purpose.
const NOT_EMITTER: &str = "not_emitter";

/// Owns every compiled acoustic and the cache of resolved definitions.
///
/// Resolution never fails: a fragment that names neither an acoustic nor a
/// registered sound is logged once and dropped, and a definition with no
/// usable fragment resolves to the shared null acoustic.
#[derive(Debug)]
pub struct AcousticLibrary {
    sounds: SoundRegistry,
    compiled: BTreeMap<String, Arc<Acoustic>>,
    warned: BTreeSet<String>,
    null: Arc<Acoustic>,
}

impl AcousticLibrary {
    /// Empty library over a sound registry.
    pub fn new(sounds: SoundRegistry) -> Self {
        Self {
            sounds,
            compiled: BTreeMap::new(),
            warned: BTreeSet::new(),
            null: Arc::new(Acoustic::null()),
        }
    }

    /// Library seeded with a simple acoustic for every registered sound.
    pub fn from_registry(sounds: SoundRegistry) -> Self {
        let mut library = Self::new(sounds);
        library.initialize_from_registry();
        library
    }

    /// Sound registry backing the library.
    pub fn sounds(&self) -> &SoundRegistry {
        &self.sounds
    }

    /// The shared null acoustic.
    pub fn null(&self) -> Arc<Acoustic> {
        Arc::clone(&self.null)
    }

    /// Add a simple acoustic for each registered sound that has no entry yet.
    pub fn initialize_from_registry(&mut self) {
        let keys: Vec<RegistryKey> = self.sounds.iter().map(|e| e.key.clone()).collect();
        for key in keys {
            if !self.compiled.contains_key(&key.to_string()) {
                let acoustic = self.simple_for(key.clone());
                self.add(&key, acoustic);
            }
        }
    }

    /// Add or replace an acoustic.
    pub fn add(&mut self, name: &RegistryKey, acoustic: Arc<Acoustic>) {
        self.compiled.insert(name.to_string(), acoustic);
    }

    /// Compile a JSON document and add every acoustic it defines. Returns the
    /// number added.
    pub fn load_json(&mut self, namespace: &str, json: &str) -> Result<usize, AcousticError> {
        let acoustics = AcousticCompiler::new(namespace, &self.sounds).compile_str(json)?;
        let count = acoustics.len();
        for acoustic in acoustics {
            let name = acoustic.name().clone();
            self.add(&name, Arc::new(acoustic));
        }
        debug!(namespace, count, "Loaded acoustics");
        Ok(count)
    }

    /// Cached acoustic for an exact name.
    pub fn get(&self, name: &RegistryKey) -> Option<Arc<Acoustic>> {
        self.compiled.get(&name.to_string()).cloned()
    }

    /// Resolve a possibly composite definition such as
    /// `"@block.lava.pop, waterfall/2"`.
    ///
    /// Fragments are lower-cased, qualified with `namespace` (`@` selects
    /// `minecraft`) and sorted before the cache lookup, so equivalent
    /// spellings share one acoustic.
    pub fn resolve(&mut self, namespace: &str, definition: &str) -> Arc<Acoustic> {
        let mut fragments: Vec<RegistryKey> = Vec::new();
        for fragment in definition.split(',') {
            if fragment.trim().is_empty() {
                continue;
            }
            match RegistryKey::resolve(namespace, fragment) {
                Ok(key) => fragments.push(key),
                Err(err) => self.warn_once(fragment.trim(), &err.to_string()),
            }
        }
        fragments.sort();
        let normalized = fragments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        if let Some(hit) = self.compiled.get(&normalized) {
            return Arc::clone(hit);
        }
        let name = match fragments.as_slice() {
            [single] => single.clone(),
            _ => RegistryKey::local("ad_hoc"),
        };
        let result = self.parse_fragments(name, &fragments);
        self.compiled.insert(normalized, Arc::clone(&result));
        result
    }

    /// Resolve a name that is written in the default namespace.
    pub fn resolve_default(&mut self, definition: &str) -> Arc<Acoustic> {
        self.resolve(DEFAULT_NAMESPACE, definition)
    }

    /// Resolve a named acoustic, compiling `definition` under that name when
    /// the name is not cached yet.
    pub fn resolve_named(&mut self, name: &RegistryKey, definition: Option<&str>) -> Arc<Acoustic> {
        if let Some(hit) = self.get(name) {
            return hit;
        }
        let fragments: Vec<RegistryKey> = match definition {
            Some(def) => def
                .split(',')
                .filter(|f| !f.trim().is_empty())
                .filter_map(|f| match RegistryKey::resolve(name.namespace(), f) {
                    Ok(key) => Some(key),
                    Err(err) => {
                        self.warn_once(f.trim(), &err.to_string());
                        None
                    }
                })
                .collect(),
            None => vec![name.clone()],
        };
        let result = self.parse_fragments(name.clone(), &fragments);
        self.add(name, Arc::clone(&result));
        result
    }

    fn parse_fragments(&mut self, name: RegistryKey, fragments: &[RegistryKey]) -> Arc<Acoustic> {
        let mut found: Vec<Arc<Acoustic>> = Vec::new();
        for key in fragments {
            match self.generate(key) {
                Some(acoustic) => found.push(acoustic),
                None => self.warn_once(&key.to_string(), "acoustic not found"),
            }
        }
        match found.len() {
            0 => self.null(),
            1 => found.remove(0),
            _ => Arc::new(Acoustic::new(name, AcousticKind::Simultaneous(found))),
        }
    }

    fn generate(&mut self, key: &RegistryKey) -> Option<Arc<Acoustic>> {
        if key.path() == NOT_EMITTER {
            return Some(self.null());
        }
        // A cached null only records an earlier failed lookup.
        if let Some(hit) = self.get(key).filter(|hit| !hit.is_null()) {
            return Some(hit);
        }
        if self.sounds.contains(key) {
            let acoustic = self.simple_for(key.clone());
            self.add(key, Arc::clone(&acoustic));
            return Some(acoustic);
        }
        None
    }

    fn simple_for(&self, key: RegistryKey) -> Arc<Acoustic> {
        Arc::new(Acoustic::simple(SoundBuilder::registered(
            &self.sounds,
            key,
            SoundCategory::Neutral,
        )))
    }

    fn warn_once(&mut self, fragment: &str, reason: &str) {
        if self.warned.insert(fragment.to_string()) {
            warn!(fragment, reason, "Unresolved acoustic");
        }
    }

    /// `name -> acoustic` lines, sorted.
    pub fn dump(&self) -> Vec<String> {
        self.compiled
            .iter()
            .map(|(name, acoustic)| format!("{name} -> {acoustic}"))
            .collect()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> AcousticLibrary {
        AcousticLibrary::new(SoundRegistry::with_defaults())
    }

    #[test]
    fn resolve_is_idempotent_across_spellings() {
        let mut lib = library();
        let a = lib.resolve("mdambient", "@block.lava.pop,@BLOCK.FIRE.AMBIENT");
        let b = lib.resolve("mdambient", "minecraft:block.fire.ambient, @block.lava.pop");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(a.kind(), AcousticKind::Simultaneous(c) if c.len() == 2));
    }

    #[test]
    fn registered_sound_becomes_simple_acoustic() {
        let mut lib = library();
        let a = lib.resolve("mdambient", "@entity.player.breath");
        assert!(matches!(a.kind(), AcousticKind::Simple(_)));
        assert!(lib.get(&RegistryKey::minecraft("entity.player.breath")).is_some());
    }

    #[test]
    fn unknown_fragments_are_dropped() {
        let mut lib = library();
        let only_unknown = lib.resolve("mdambient", "nothing/here");
        assert!(only_unknown.is_null());
        assert!(Arc::ptr_eq(&only_unknown, &lib.null()));

        let mixed = lib.resolve("mdambient", "nothing/here,@block.lava.pop");
        assert!(matches!(mixed.kind(), AcousticKind::Simple(_)));

        let bad_chars = lib.resolve("mdambient", "Spaces are bad!");
        assert!(bad_chars.is_null());
    }

    #[test]
    fn composites_do_not_depend_on_resolution_order() {
        let mut fresh = library();
        let direct = fresh.resolve("mdambient", "@block.lava.pop,nothing/here");

        let mut warmed = library();
        assert!(warmed.resolve("mdambient", "nothing/here").is_null());
        let after = warmed.resolve("mdambient", "@block.lava.pop,nothing/here");

        assert!(matches!(direct.kind(), AcousticKind::Simple(_)));
        assert!(matches!(after.kind(), AcousticKind::Simple(_)));
        assert_eq!(direct.name(), after.name());
    }

    #[test]
    fn not_emitter_is_null() {
        let mut lib = library();
        assert!(lib.resolve("mdambient", "not_emitter").is_null());
    }

    #[test]
    fn compiled_acoustics_take_precedence() {
        let mut lib = library();
        let n = lib
            .load_json(
                "mdambient",
                r#"{ "block.lava.pop": { "name": "@block.lava.pop", "volume": 20 } }"#,
            )
            .unwrap();
        assert_eq!(n, 1);
        let a = lib.resolve("mdambient", "block.lava.pop");
        let AcousticKind::Simple(factory) = a.kind() else {
            panic!("expected simple");
        };
        assert_eq!(factory.builder().volume_range(), (0.2, 0.2));
    }

    #[test]
    fn resolve_named_caches_under_name() {
        let mut lib = library();
        let name = RegistryKey::local("fire.big");
        let a = lib.resolve_named(&name, Some("@block.fire.ambient,@block.lava.ambient"));
        let b = lib.resolve_named(&name, None);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), &name);
    }

    #[test]
    fn initialize_adds_every_sound() {
        let lib = AcousticLibrary::from_registry(SoundRegistry::with_defaults());
        assert_eq!(lib.len(), SoundRegistry::with_defaults().len());
        assert!(lib.dump().iter().all(|l| l.contains("(simple)")));
    }
}
