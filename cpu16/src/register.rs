//! Edge-triggered 16-bit storage: the plain [`Register`] and the program
//! counter, which adds load/increment/reset control inputs.

use crate::bits::Word;

/// A word of state with a *current* and *next* value. Reads return the
/// current value; writes stage into `next`; [`Register::tick`] promotes
/// `next` to `current`. Multiple writes within one cycle collapse to the
/// last one that asserted `load`; readers only ever see the post-tick
/// value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Register {
    current: Word,
    next: Word,
}

impl Register {
    pub fn new() -> Register {
        Register { current: 0, next: 0 }
    }

    pub fn with_value(value: Word) -> Register {
        Register { current: value, next: value }
    }

    /// Returns the pre-tick value.
    pub fn read(&self) -> Word {
        self.current
    }

    /// Stages `value` into `next` when `load` is set.
    pub fn write(&mut self, value: Word, load: bool) {
        if load {
            self.next = value;
        }
    }

    /// Promotes the staged value. Idempotent if `write` was never called
    /// this cycle: `next` already equals `current`.
    pub fn tick(&mut self) {
        self.current = self.next;
    }
}

/// The program counter: a register with three control inputs, fixed
/// priority `reset > load > inc > hold`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pc {
    register: Register,
}

impl Pc {
    /// Initial value is 0, so the first fetch targets address 0.
    pub fn new() -> Pc {
        Pc { register: Register::new() }
    }

    pub fn read(&self) -> Word {
        self.register.read()
    }

    /// Stages the next PC value according to `reset > load > inc > hold`.
    pub fn step(&mut self, load_value: Word, load: bool, inc: bool, reset: bool) {
        let current = self.register.read();
        let next = if reset {
            0
        } else if load {
            load_value
        } else if inc {
            current.wrapping_add(1)
        } else {
            current
        };
        self.register.write(next, true);
    }

    pub fn tick(&mut self) {
        self.register.tick();
    }

    /// Immediately overrides the PC to `value`, bypassing the staged
    /// load/tick cycle. Used by an external reset line, which must be
    /// visible to the very next fetch rather than waiting a tick behind a
    /// normal staged write.
    pub fn force_to(&mut self, value: Word) {
        self.register = Register::with_value(value);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_after_write_before_tick_returns_pre_write_value() {
        let mut r = Register::with_value(7);
        r.write(42, true);
        assert_eq!(r.read(), 7);
        r.tick();
        assert_eq!(r.read(), 42);
    }

    #[test]
    fn write_without_load_is_ignored() {
        let mut r = Register::with_value(7);
        r.write(42, false);
        r.tick();
        assert_eq!(r.read(), 7);
    }

    #[test]
    fn last_load_wins_within_one_cycle() {
        let mut r = Register::new();
        r.write(1, true);
        r.write(2, true);
        r.tick();
        assert_eq!(r.read(), 2);
    }

    #[test]
    fn pc_priority_reset_over_load_over_inc() {
        let mut pc = Pc::new();
        pc.step(1234, true, true, true);
        pc.tick();
        assert_eq!(pc.read(), 0, "reset wins over load and inc");

        let mut pc = Pc::new();
        pc.step(1234, true, true, false);
        pc.tick();
        assert_eq!(pc.read(), 1234, "load wins over inc");

        let mut pc = Pc::new();
        pc.step(0, false, true, false);
        pc.tick();
        assert_eq!(pc.read(), 1);
    }

    #[test]
    fn pc_holds_when_nothing_asserted() {
        let mut pc = Pc::new();
        pc.step(9999, true, false, false);
        pc.tick();
        assert_eq!(pc.read(), 9999);
        pc.step(0, false, false, false);
        pc.tick();
        assert_eq!(pc.read(), 9999);
    }
}
