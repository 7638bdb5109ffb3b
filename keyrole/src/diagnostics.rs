/// Counters of conditions that never fail a tick but are worth reporting to the host.
///
/// All counters wrap on overflow.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Keys that could not be tracked because the pending set was full
    pub pending_key_overflows: u32,
    /// Entries of the immediate execution queue overwritten before they were applied
    pub immediate_queue_overflows: u32,
    /// Scancodes dropped because their report had no free slot
    pub report_slot_overflows: u32,
    /// Send semaphores released by timeout instead of by a transfer completion
    pub forced_semaphore_releases: u32,
    /// Ticks that recomputed the reports
    pub update_counter: u32,
}

impl Diagnostics {
    pub(crate) fn count(counter: &mut u32) {
        *counter = counter.wrapping_add(1);
    }
}
