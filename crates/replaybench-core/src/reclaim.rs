// Scoped control of memory reclamation
//
// A measured segment starts with a forced collection and runs with automatic
// collection suspended. The guard restores automatic collection when it is
// dropped, whether the segment finished or bailed out with an error.

use crate::traits::MemoryReclaimController;

/// Controller for targets without a tracing collector
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReclaimer;

impl MemoryReclaimController for NoopReclaimer {
    fn force_collect_now(&self) {}
    fn pause(&self) {}
    fn resume(&self) {}
}

/// Automatic collection suspended for the guard's lifetime
#[must_use = "automatic collection resumes as soon as the pause is dropped"]
pub struct CollectionPause<'a> {
    controller: &'a dyn MemoryReclaimController,
    forced: u64,
}

impl<'a> CollectionPause<'a> {
    /// Force a collection, then suspend automatic collection
    pub fn begin(controller: &'a dyn MemoryReclaimController) -> Self {
        let mut pause = Self {
            controller,
            forced: 0,
        };
        pause.collect();
        pause
    }

    /// Force another collection and stay suspended
    pub fn collect(&mut self) {
        self.controller.force_collect_now();
        self.controller.pause();
        self.forced += 1;
        tracing::trace!(forced = self.forced, "Forced collection");
    }

    /// Forced collections issued through this guard, including the initial one
    pub fn forced(&self) -> u64 {
        self.forced
    }
}

impl Drop for CollectionPause<'_> {
    fn drop(&mut self) {
        self.controller.resume();
    }
}
