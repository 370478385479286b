use crate::domain::PeakRecord;

impl PeakRecord {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Replace the current peak only when `candidate` is strictly greater.
    ///
    /// Ties keep the incumbent: among equal counts the first one offered wins, so the chosen day
    /// depends on processing order. Returns whether the record was replaced.
    pub fn offer(&mut self, candidate: PeakRecord) -> bool {
        if candidate.count > self.count {
            *self = candidate;
            true
        } else {
            false
        }
    }
}
