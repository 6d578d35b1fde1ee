//! Power control collaborator

/// Machine power switch.
pub trait Power: Send + Sync {
    /// Power the machine off. Real implementations do not return; the
    /// dispatcher treats the call as final either way.
    fn power_off(&self);
}
