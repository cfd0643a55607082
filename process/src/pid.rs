//! Process identifiers.

/// Process ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// Nothing ever has this pid.
    pub const INVALID: Pid = Pid(0);

    /// The first process, seeded at bootstrap.
    pub const BOOTUP: Pid = Pid(1);

    /// Create a Pid from a raw value
    pub const fn from_u32(val: u32) -> Self {
        Pid(val)
    }

    /// Get the raw ID value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Slot this pid hashes to in a table of `capacity` slots.
    pub(crate) fn slot(&self, capacity: usize) -> usize {
        self.0 as usize % capacity
    }
}

impl core::fmt::Display for Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(val: u32) -> Self {
        Pid(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_pids() {
        assert_eq!(Pid::INVALID.as_u32(), 0);
        assert_eq!(Pid::BOOTUP.as_u32(), 1);
        assert!(Pid::INVALID < Pid::BOOTUP);
    }

    #[test]
    fn test_slot_hashing() {
        assert_eq!(Pid(2).slot(128), 2);
        assert_eq!(Pid(130).slot(128), 2);
        assert_eq!(Pid(127).slot(128), 127);
    }
}
