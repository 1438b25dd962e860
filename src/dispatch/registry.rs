//! Callback registry: one slot per sensor kind plus lifecycle hooks

use std::collections::HashMap;

use super::callback::{Callback, ConnectionHook, ErrorHook};
use crate::types::SensorKind;

#[derive(Clone, Default)]
pub(crate) struct CallbackRegistry {
    callbacks: HashMap<SensorKind, Callback>,
    pub(crate) on_connect: Option<ConnectionHook>,
    pub(crate) on_disconnect: Option<ConnectionHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl CallbackRegistry {
    /// Install `callback` for `kind`, returning the one it replaces.
    pub(crate) fn register(&mut self, kind: SensorKind, callback: Callback) -> Option<Callback> {
        self.callbacks.insert(kind, callback)
    }

    pub(crate) fn unregister(&mut self, kind: SensorKind) -> Option<Callback> {
        self.callbacks.remove(&kind)
    }

    pub(crate) fn get(&self, kind: SensorKind) -> Option<Callback> {
        self.callbacks.get(&kind).cloned()
    }

    pub(crate) fn kinds(&self) -> Vec<SensorKind> {
        let mut kinds: Vec<_> = self.callbacks.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_registration_wins() {
        let mut registry = CallbackRegistry::default();
        assert!(registry.register(SensorKind::Imu, Callback::sync(|_, _| Ok(()))).is_none());

        let replaced = registry.register(
            SensorKind::Imu,
            Callback::suspending(|_, _| async { Ok::<_, anyhow::Error>(()) }),
        );
        assert!(matches!(replaced, Some(Callback::Sync(_))));
        assert!(registry.get(SensorKind::Imu).is_some_and(|c| c.is_suspending()));
    }

    #[test]
    fn unregister_empties_the_slot() {
        let mut registry = CallbackRegistry::default();
        registry.register(SensorKind::Gps, Callback::sync(|_, _| Ok(())));
        registry.register(SensorKind::Camera, Callback::sync(|_, _| Ok(())));
        assert_eq!(registry.kinds(), vec![SensorKind::Gps, SensorKind::Camera]);

        assert!(registry.unregister(SensorKind::Gps).is_some());
        assert!(registry.get(SensorKind::Gps).is_none());
        assert!(registry.unregister(SensorKind::Gps).is_none());
    }
}
