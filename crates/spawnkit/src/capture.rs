//! Stream capture selection

bitflags::bitflags! {
    /// Which standard streams of the child are kept by the manager.
    ///
    /// Output streams that are not captured are still drained so the child
    /// never stalls on a full pipe; their bytes are discarded. Without `IN`
    /// the child's stdin is closed right after spawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capture: u8 {
        const OUT = 1 << 1;
        const ERR = 1 << 2;
        const IN = 1 << 3;
    }
}

impl Capture {
    /// Capture nothing
    pub const NONE: Self = Self::empty();
}

impl Default for Capture {
    fn default() -> Self {
        Capture::OUT | Capture::ERR | Capture::IN
    }
}
