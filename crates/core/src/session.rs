use anyhow::Context;
use drum_program::{EffectChain, Program};
use drum_project::{FileStore, KeyValueStore, LoadError, SaveError, SaveService, Snapshot};

use crate::config::Config;

/// The live, editable program together with the service that persists it.
///
/// Everything that edits or saves the program goes through `&mut Session`,
/// so callers serialize access themselves.
pub struct Session<S: KeyValueStore = FileStore> {
    program: Program,
    effects: EffectChain,
    service: SaveService<S>,
}

impl Session<FileStore> {
    /// Start a session backed by the preferences file named in `config`.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let path = config
            .preferences_file()
            .context("no data directory for preferences")?;
        let store = FileStore::open(&path)
            .with_context(|| format!("failed to open preferences {}", path.display()))?;
        log::debug!("using preferences at {}", path.display());
        Ok(Self::new(config.pad_count, store))
    }
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(pad_count: usize, store: S) -> Self {
        Self {
            program: Program::new(pad_count),
            effects: EffectChain::new(),
            service: SaveService::new(store),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    pub fn service(&self) -> &SaveService<S> {
        &self.service
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.program, &self.effects)
    }

    pub fn save(&mut self, slot: u32) -> Result<(), SaveError> {
        self.service.save(slot, &self.program, &self.effects)
    }

    pub fn load(&mut self, slot: u32) -> Result<(), LoadError> {
        self.service.load(slot, &mut self.program, &mut self.effects)
    }

    pub fn save_slot(&mut self, slot: u32) -> bool {
        self.service.save_slot(slot, &self.program, &self.effects)
    }

    pub fn load_slot(&mut self, slot: u32) -> bool {
        self.service
            .load_slot(slot, &mut self.program, &mut self.effects)
    }

    pub fn has_save(&self, slot: u32) -> bool {
        self.service.has_save(slot)
    }

    /// The current program as a transport string.
    pub fn export_string(&self) -> String {
        self.service.current_to_string(&self.program, &self.effects)
    }

    /// Replace the current program with one exported by [`export_string`](Self::export_string).
    pub fn import_string(&mut self, text: &str) -> Result<(), LoadError> {
        self.service
            .string_to_current(text, &mut self.program, &mut self.effects)
    }
}
