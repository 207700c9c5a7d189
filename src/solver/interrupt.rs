use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cancellation flag shared between a running search and whoever wants to stop it, such as a
/// signal handler or another thread. The search polls it once per decision.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Interrupt {
        Interrupt::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
