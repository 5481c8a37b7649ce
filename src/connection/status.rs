use bitflags::bitflags;

bitflags! {
    /// Status mask returned by [`Sender::send`](super::Sender::send).
    ///
    /// The bit values are part of the wire-compatible contract:
    /// `OK = 0`, `DISPLACEMENT_IN_QUEUE = 1`, `NO_RECEIVERS = 2`,
    /// `ERROR = -1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SendStatus: i32 {
        /// The ring was full; the oldest queued element was dropped to make
        /// room for this one.
        const DISPLACEMENT_IN_QUEUE = 1;
        /// No receiver was registered at push time; the element was queued
        /// anyway and may be displaced before anyone attaches.
        const NO_RECEIVERS = 2;
    }
}

impl SendStatus {
    /// Successful send with nothing to report.
    pub const OK: Self = Self::empty();

    /// Reserved for unusable sender handles. A live [`Sender`](super::Sender)
    /// never returns this; the value exists for bit-compatibility only.
    pub const ERROR: Self = Self::from_bits_retain(-1);

    pub fn displaced(&self) -> bool {
        self.contains(Self::DISPLACEMENT_IN_QUEUE)
    }

    pub fn no_receivers(&self) -> bool {
        self.contains(Self::NO_RECEIVERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_are_wire_exact() {
        assert_eq!(SendStatus::OK.bits(), 0);
        assert_eq!(SendStatus::DISPLACEMENT_IN_QUEUE.bits(), 1);
        assert_eq!(SendStatus::NO_RECEIVERS.bits(), 2);
        assert_eq!(SendStatus::ERROR.bits(), -1);

        let both = SendStatus::DISPLACEMENT_IN_QUEUE | SendStatus::NO_RECEIVERS;
        assert_eq!(both.bits(), 3);
        assert!(both.displaced());
        assert!(both.no_receivers());
        assert!(!SendStatus::OK.displaced());
    }
}
