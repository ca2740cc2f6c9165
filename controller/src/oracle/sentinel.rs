/// Circuit breaker fed by the sequencer's uptime status.
///
/// Borrows and premature liquidations are only allowed once the sequencer has
/// been up for longer than the grace period, giving positions a window to be
/// topped up after an outage.
pub trait OracleSentinel {
    fn is_up(&self) -> bool;

    /// Seconds elapsed at `now` since the last transition to "up".
    fn seconds_since_up(&self, now: u64) -> u64;

    fn grace_period(&self) -> u64;

    fn is_borrow_allowed(&self, now: u64) -> bool {
        self.is_operation_allowed(now)
    }

    fn is_liquidation_allowed(&self, now: u64) -> bool {
        self.is_operation_allowed(now)
    }

    fn is_operation_allowed(&self, now: u64) -> bool {
        self.is_up() && self.seconds_since_up(now) > self.grace_period()
    }
}

/// Sentinel tracking the last up/down transition of a sequencer feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencerSentinel {
    up: bool,
    last_transition: u64,
    grace_period: u64,
}

impl SequencerSentinel {
    /// A sentinel whose sequencer came up at `up_since`.
    pub fn new(grace_period: u64, up_since: u64) -> Self {
        SequencerSentinel {
            up: true,
            last_transition: up_since,
            grace_period,
        }
    }

    /// Records a status report; the transition clock only restarts when the status flips.
    pub fn set_status(&mut self, up: bool, timestamp: u64) {
        if self.up != up {
            self.up = up;
            self.last_transition = timestamp;
        }
    }

    pub fn set_grace_period(&mut self, grace_period: u64) {
        self.grace_period = grace_period;
    }
}

impl OracleSentinel for SequencerSentinel {
    fn is_up(&self) -> bool {
        self.up
    }

    fn seconds_since_up(&self, now: u64) -> u64 {
        if self.up {
            now.saturating_sub(self.last_transition)
        } else {
            0
        }
    }

    fn grace_period(&self) -> u64 {
        self.grace_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_period_restarts_on_recovery() {
        let mut sentinel = SequencerSentinel::new(3_600, 0);
        assert!(sentinel.is_borrow_allowed(3_601));

        sentinel.set_status(false, 4_000);
        assert!(!sentinel.is_borrow_allowed(4_100));
        assert!(!sentinel.is_liquidation_allowed(10_000));

        sentinel.set_status(true, 5_000);
        assert!(!sentinel.is_borrow_allowed(8_600));
        assert!(sentinel.is_borrow_allowed(8_601));

        // repeated "up" reports keep the original transition time
        sentinel.set_status(true, 8_000);
        assert_eq!(sentinel.seconds_since_up(8_601), 3_601);
    }
}
