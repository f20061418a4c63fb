//! Slot-based save and load of the live program.

use crate::{
    Base64Transport, KeyValueStore, LoadError, SAVE_PREFIX, SaveError, Snapshot, TextTransport,
    decode, encode,
};
use drum_program::{EffectChain, Program};

/// Store key for a save slot.
pub fn slot_key(slot: u32) -> String {
    format!("{}.{}", SAVE_PREFIX, slot)
}

/// Saves and restores programs through a string store.
///
/// Live state is passed in by the caller. A failed load never writes to it:
/// the envelope is fully decoded and validated into a [`Snapshot`] before any
/// field is applied.
pub struct SaveService<S, T = Base64Transport> {
    store: S,
    transport: T,
}

impl<S: KeyValueStore> SaveService<S> {
    pub fn new(store: S) -> Self {
        Self::with_transport(store, Base64Transport)
    }
}

impl<S: KeyValueStore, T: TextTransport> SaveService<S, T> {
    pub fn with_transport(store: S, transport: T) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Serialize the program into a transport string.
    pub fn current_to_string(&self, program: &Program, effects: &EffectChain) -> String {
        self.transport.encode(&encode(program, effects))
    }

    /// Replace live state with the program held in `text`.
    pub fn string_to_current(
        &self,
        text: &str,
        program: &mut Program,
        effects: &mut EffectChain,
    ) -> Result<(), LoadError> {
        self.restore(text, program, effects)
            .inspect_err(|e| log::warn!("failed to apply program string: {e}"))
    }

    /// Decode `text` without touching any live state.
    pub fn parse(&self, text: &str, pad_count: usize) -> Result<Snapshot, LoadError> {
        let bytes = self.transport.decode(text)?;
        decode(&bytes, pad_count)
            .map_err(LoadError::from)
            .inspect_err(|e| log::warn!("failed to parse program string: {e}"))
    }

    fn restore(
        &self,
        text: &str,
        program: &mut Program,
        effects: &mut EffectChain,
    ) -> Result<(), LoadError> {
        let bytes = self.transport.decode(text)?;
        let snapshot = decode(&bytes, program.pad_count())?;
        snapshot.apply(program, effects)?;
        Ok(())
    }

    /// The raw transport string stored in a slot.
    pub fn raw_save(&self, slot: u32) -> Option<String> {
        self.store.load(&slot_key(slot))
    }

    pub fn has_save(&self, slot: u32) -> bool {
        self.raw_save(slot).is_some()
    }

    /// Write the program to `slot` and flush the store.
    ///
    /// If the flush fails the slot goes back to what it held before, so a
    /// later flush cannot persist a save that was reported as failed.
    pub fn save(
        &mut self,
        slot: u32,
        program: &Program,
        effects: &EffectChain,
    ) -> Result<(), SaveError> {
        let key = slot_key(slot);
        let data = self.current_to_string(program, effects);
        let previous = self.store.load(&key);

        self.store.save(&key, data);
        if let Err(e) = self.store.flush() {
            match previous {
                Some(value) => self.store.save(&key, value),
                None => self.store.remove(&key),
            }
            log::error!("failed to save slot {slot}: {e}");
            return Err(e.into());
        }

        log::info!("saved program to slot {slot}");
        Ok(())
    }

    /// Load `slot` into live state. On any error live state is unchanged.
    pub fn load(
        &self,
        slot: u32,
        program: &mut Program,
        effects: &mut EffectChain,
    ) -> Result<(), LoadError> {
        let Some(text) = self.raw_save(slot) else {
            log::debug!("slot {slot} is empty");
            return Err(LoadError::Missing { slot });
        };
        self.restore(&text, program, effects)
            .inspect_err(|e| log::warn!("failed to load slot {slot}: {e}"))?;
        log::info!("loaded program from slot {slot}");
        Ok(())
    }

    /// [`save`](Self::save) for callers that only need success or failure.
    /// The cause is logged.
    pub fn save_slot(&mut self, slot: u32, program: &Program, effects: &EffectChain) -> bool {
        self.save(slot, program, effects).is_ok()
    }

    /// [`load`](Self::load) for callers that only need success or failure.
    /// The cause is logged.
    pub fn load_slot(&self, slot: u32, program: &mut Program, effects: &mut EffectChain) -> bool {
        self.load(slot, program, effects).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CorruptionError, FileStore, MemoryStore, StoreError, TransportError};
    use drum_program::EffectKind;
    use std::sync::{Mutex, OnceLock};
    use tempfile::tempdir;

    /// Test logger that keeps every record so tests can check what was logged.
    struct CaptureLogger {
        inner: env_logger::Logger,
        lines: Mutex<Vec<String>>,
    }

    impl CaptureLogger {
        fn lines_containing(&self, needle: &str) -> Vec<String> {
            self.lines
                .lock()
                .expect("log lines")
                .iter()
                .filter(|line| line.contains(needle))
                .cloned()
                .collect()
        }
    }

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.lines
                .lock()
                .expect("log lines")
                .push(format!("{} {}", record.level(), record.args()));
            self.inner.log(record);
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }

    static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

    fn init_logger() -> &'static CaptureLogger {
        let logger = LOGGER.get_or_init(|| CaptureLogger {
            inner: env_logger::builder().is_test(true).build(),
            lines: Mutex::new(Vec::new()),
        });
        if log::set_logger(logger).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
        logger
    }

    fn scenario_state() -> (Program, EffectChain) {
        let mut program = Program::new(8);
        program.set_raw_banks(0x0000_ABCD);
        program.set_tempo(128);
        program.set_tempo_multiplier(2);
        program.set_active_voice(3);

        let mut effects = EffectChain::new();
        effects.set_enabled_raw(0b0001);
        let comp = effects.effect_mut(EffectKind::Compressor);
        comp.set_config(0, 0.5);
        comp.set_config(1, -3.0);

        (program, effects)
    }

    /// Store whose flush always fails.
    struct BrokenStore(MemoryStore);

    impl KeyValueStore for BrokenStore {
        fn load(&self, key: &str) -> Option<String> {
            self.0.load(key)
        }

        fn save(&mut self, key: &str, value: String) {
            self.0.save(key, value);
        }

        fn remove(&mut self, key: &str) {
            self.0.remove(key);
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn test_slot_key_format() {
        assert_eq!(slot_key(0), "PREF-drum-save-v0.2.0");
        assert_eq!(slot_key(5), "PREF-drum-save-v0.2.5");
    }

    #[test]
    fn test_scenario_save_and_load_slot_five() {
        init_logger();
        let (program, effects) = scenario_state();
        let mut service = SaveService::new(MemoryStore::new());

        assert!(service.save_slot(5, &program, &effects));
        assert_eq!(service.store().flush_count(), 1);
        assert!(service.has_save(5));

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        assert!(service.load_slot(5, &mut live, &mut live_fx));

        assert_eq!(live, program);
        assert_eq!(live.raw_banks(), 0x0000_ABCD);
        assert_eq!(live.tempo(), 128);
        assert_eq!(live.tempo_multiplier(), 2);
        assert_eq!(live.active_voice(), 3);
        assert!(live.pads().iter().all(|pad| pad.volume == 1.0));
        assert_eq!(live_fx.enabled_raw(), 0b0001);
        let comp = live_fx.effect(EffectKind::Compressor);
        assert_eq!(comp.config(0), Some(0.5));
        assert_eq!(comp.config(1), Some(-3.0));
    }

    #[test]
    fn test_slots_are_isolated() {
        init_logger();
        let mut service = SaveService::new(MemoryStore::new());

        let (first, first_fx) = scenario_state();
        let mut second = Program::new(8);
        second.set_tempo(90);
        second.set_volume(3, 0.2);
        let mut second_fx = EffectChain::new();
        second_fx.set_enabled(EffectKind::Reverb, true);

        assert!(service.save_slot(0, &first, &first_fx));
        assert!(service.save_slot(1, &second, &second_fx));

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();

        service.load(0, &mut live, &mut live_fx).expect("load 0");
        assert_eq!(live, first);
        assert_eq!(live_fx.enabled_raw(), 0b0001);

        service.load(1, &mut live, &mut live_fx).expect("load 1");
        assert_eq!(live, second);
        assert_eq!(live_fx.enabled_raw(), 0b1000);
    }

    #[test]
    fn test_missing_slot_leaves_state_untouched() {
        init_logger();
        let service = SaveService::new(MemoryStore::new());
        let (mut live, mut live_fx) = scenario_state();
        let before = (live.clone(), live_fx.clone());

        let err = service.load(3, &mut live, &mut live_fx).unwrap_err();
        assert!(matches!(err, LoadError::Missing { slot: 3 }));
        assert!(!service.load_slot(3, &mut live, &mut live_fx));

        assert_eq!((live, live_fx), before);
    }

    #[test]
    fn test_bad_tail_leaves_state_untouched() {
        init_logger();
        let mut store = MemoryStore::new();
        let (program, effects) = scenario_state();

        let mut bytes = encode(&program, &effects);
        let last = bytes.len() - 1;
        bytes[last] = b'X';
        store.save(&slot_key(2), Base64Transport.encode(&bytes));
        let service = SaveService::new(store);

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        let before = (live.clone(), live_fx.clone());

        let err = service.load(2, &mut live, &mut live_fx).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corrupt(CorruptionError::TailMismatch { .. })
        ));
        assert_eq!((live, live_fx), before);
    }

    #[test]
    fn test_malformed_transport_string_is_rejected() {
        init_logger();
        let mut store = MemoryStore::new();
        store.save(&slot_key(0), "%%% definitely not base64 %%%".to_string());
        let service = SaveService::new(store);

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        let err = service.load(0, &mut live, &mut live_fx).unwrap_err();

        assert!(matches!(err, LoadError::Transport(TransportError::Decode(_))));
        assert_eq!(live, Program::new(8));
    }

    #[test]
    fn test_load_with_other_pad_count_is_rejected() {
        init_logger();
        let (program, effects) = scenario_state();
        let mut service = SaveService::new(MemoryStore::new());
        assert!(service.save_slot(0, &program, &effects));

        let mut live = Program::new(4);
        let mut live_fx = EffectChain::new();
        assert!(!service.load_slot(0, &mut live, &mut live_fx));
        assert_eq!(live, Program::new(4));
    }

    #[test]
    fn test_failed_flush_reports_failure() {
        init_logger();
        let (program, effects) = scenario_state();
        let mut service = SaveService::new(BrokenStore(MemoryStore::new()));

        let err = service.save(0, &program, &effects).unwrap_err();
        assert!(matches!(err, SaveError::Store(StoreError::Io(_))));
        assert!(!service.save_slot(0, &program, &effects));
    }

    #[test]
    fn test_failed_flush_does_not_leave_new_slot() {
        init_logger();
        let (program, effects) = scenario_state();
        let mut service = SaveService::new(BrokenStore(MemoryStore::new()));

        assert!(!service.save_slot(4, &program, &effects));
        assert!(!service.has_save(4));
        assert!(service.store().0.is_empty());
    }

    #[test]
    fn test_failed_flush_restores_previous_save() {
        init_logger();
        let mut store = MemoryStore::new();
        store.save(&slot_key(1), "previous".to_string());
        let (program, effects) = scenario_state();
        let mut service = SaveService::new(BrokenStore(store));

        assert!(!service.save_slot(1, &program, &effects));
        assert_eq!(service.raw_save(1).as_deref(), Some("previous"));
    }

    #[test]
    fn test_unwritable_file_store_save_is_not_visible() {
        init_logger();
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").expect("write");
        let (program, effects) = scenario_state();

        let store = FileStore::open(blocker.join("preferences.json")).expect("open");
        let mut service = SaveService::new(store);

        assert!(!service.save_slot(6, &program, &effects));
        assert!(!service.has_save(6));
    }

    #[test]
    fn test_failures_are_logged_once_with_cause() {
        let logger = init_logger();
        let (program, effects) = scenario_state();

        let mut broken = SaveService::new(BrokenStore(MemoryStore::new()));
        assert!(broken.save(43, &program, &effects).is_err());
        let saved = logger.lines_containing("slot 43");
        assert_eq!(saved.len(), 1, "{saved:?}");
        assert!(saved[0].starts_with("ERROR"), "{saved:?}");
        assert!(saved[0].contains("disk full"), "{saved:?}");

        let mut bytes = encode(&program, &effects);
        let last = bytes.len() - 1;
        bytes[last] = b'X';
        let mut store = MemoryStore::new();
        store.save(&slot_key(42), Base64Transport.encode(&bytes));
        let service = SaveService::new(store);

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        assert!(!service.load_slot(42, &mut live, &mut live_fx));
        let loaded = logger.lines_containing("slot 42");
        assert_eq!(loaded.len(), 1, "{loaded:?}");
        assert!(loaded[0].starts_with("WARN"), "{loaded:?}");
        assert!(loaded[0].contains("tail"), "{loaded:?}");

        let err = service
            .string_to_current("!!not-base64!!", &mut live, &mut live_fx)
            .unwrap_err();
        assert!(matches!(err, LoadError::Transport(_)));
        assert!(!logger
            .lines_containing("failed to apply program string")
            .is_empty());
    }

    #[test]
    fn test_string_roundtrip_without_store() {
        let (program, effects) = scenario_state();
        let service = SaveService::new(MemoryStore::new());

        let text = service.current_to_string(&program, &effects);
        assert!(text.is_ascii());

        let snapshot = service.parse(&text, 8).expect("parse");
        assert_eq!(snapshot, Snapshot::capture(&program, &effects));

        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        service
            .string_to_current(&text, &mut live, &mut live_fx)
            .expect("apply");
        assert_eq!(live, program);
    }

    #[test]
    fn test_file_store_slots_survive_reopen() {
        init_logger();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("preferences.json");
        let (program, effects) = scenario_state();

        let mut service = SaveService::new(FileStore::open(&path).expect("open"));
        assert!(service.save_slot(5, &program, &effects));
        drop(service);

        let service = SaveService::new(FileStore::open(&path).expect("reopen"));
        let mut live = Program::new(8);
        let mut live_fx = EffectChain::new();
        assert!(service.load_slot(5, &mut live, &mut live_fx));
        assert_eq!(live, program);
    }
}
