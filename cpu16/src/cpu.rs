//! The CPU decoder: the single component that interprets an instruction
//! word each cycle and drives every other part of the machine.
//!
//! [`Cpu::step`] is purely combinational: it only stages writes into the
//! registers, PC, memory, and disk passed to it. Nothing becomes visible
//! until the caller ticks every one of those components (see
//! [`crate::emulator::Emulator::tick`], which does so in the order the
//! component design calls for).

use crate::alu::{alu, AluOp};
use crate::bits::Word;
use crate::disk::HardDisk;
use crate::error::DiskRangeError;
use crate::memory::Memory;
use crate::opcodes::{move_hdd_sub, primary, selector, stack_sub, POINTER_BIT};
use crate::register::{Pc, Register};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    zero: bool,
    negative: bool,
    overflow: bool,
}

/// The five addressable registers, the PC, latched status flags, and the
/// sticky shutdown bit.
pub struct Cpu {
    a: Register,
    b: Register,
    c: Register,
    d: Register,
    sp: Register,
    pc: Pc,
    flags: Flags,
    shutdown: bool,
}

struct Operand {
    value: Word,
    /// Set when the specifier named a register directly (pointer bit
    /// clear): the register a writeback should land in.
    register: Option<RegisterName>,
    /// Set when the specifier's pointer bit was set: the memory address a
    /// writeback should land at.
    address: Option<Word>,
    /// True when the specifier's selector was constant-next-word, whether
    /// or not the pointer bit was also set, since either form consumes
    /// the instruction word immediately following this one.
    consumed_word: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterName {
    A,
    B,
    C,
    D,
    Sp,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            a: Register::new(),
            b: Register::new(),
            c: Register::new(),
            d: Register::new(),
            sp: Register::new(),
            pc: Pc::new(),
            flags: Flags::default(),
            shutdown: false,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub fn pc(&self) -> Word {
        self.pc.read()
    }

    pub fn register(&self, name: &str) -> Option<Word> {
        match name {
            "a" => Some(self.a.read()),
            "b" => Some(self.b.read()),
            "c" => Some(self.c.read()),
            "d" => Some(self.d.read()),
            "sp" => Some(self.sp.read()),
            _ => None,
        }
    }

    /// Forces PC to 0, visible to the very next fetch. This is the
    /// emulator driver's external reset line, not the ISA's `reset`
    /// opcode (which reaches the same place by decoding a word, see
    /// [`primary::RESET`] below).
    pub fn assert_reset(&mut self) {
        self.pc.force_to(0);
    }

    fn resolve(&self, spec: u8, constant: Word, sp_eff: Word, memory: &Memory) -> Operand {
        let pointer = spec & POINTER_BIT != 0;
        let sel = spec & 0b0111;
        let consumed_word = sel == selector::CONSTANT;

        let (direct_value, register) = match sel {
            selector::A => (self.a.read(), Some(RegisterName::A)),
            selector::B => (self.b.read(), Some(RegisterName::B)),
            selector::C => (self.c.read(), Some(RegisterName::C)),
            selector::D => (self.d.read(), Some(RegisterName::D)),
            selector::SP => (sp_eff, Some(RegisterName::Sp)),
            selector::CONSTANT => (constant, None),
            _ => (0, None),
        };

        if pointer {
            Operand {
                value: memory.read(direct_value),
                register: None,
                address: Some(direct_value),
                consumed_word,
            }
        } else {
            Operand {
                value: direct_value,
                register,
                address: None,
                consumed_word,
            }
        }
    }

    fn writeback(&mut self, operand: &Operand, value: Word, memory: &mut Memory) {
        match (operand.register, operand.address) {
            (Some(name), _) => self.write_register(name, value),
            (None, Some(address)) => memory.write(address, value, true),
            (None, None) => {}
        }
    }

    fn write_register(&mut self, name: RegisterName, value: Word) {
        match name {
            RegisterName::A => self.a.write(value, true),
            RegisterName::B => self.b.write(value, true),
            RegisterName::C => self.c.write(value, true),
            RegisterName::D => self.d.write(value, true),
            RegisterName::Sp => self.sp.write(value, true),
        }
    }

    /// Runs one combinational cycle. `memory` and `disk` receive staged
    /// writes only; the caller must tick them afterward. Returns an error
    /// only when an `hddread`/`hddwrite`/`hddsector` operand falls outside
    /// the disk's backing store.
    pub fn step(&mut self, memory: &mut Memory, disk: &mut HardDisk) -> Result<(), DiskRangeError> {
        if self.shutdown {
            return Ok(());
        }

        let pc = self.pc.read();
        let instruction = memory.read(pc);

        let primary = ((instruction >> 12) & 0xF) as u8;
        let sub = ((instruction >> 8) & 0xF) as u8;
        let a_spec = ((instruction >> 4) & 0xF) as u8;
        let b_spec = (instruction & 0xF) as u8;

        // A specifier whose selector is constant-next-word consumes the
        // word immediately following the instruction; the target's word
        // (if any) comes first, then the source's, matching the order the
        // parser appends their trailing stream items in.
        let target_consumes_word = a_spec & 0b0111 == selector::CONSTANT;
        let target_constant = memory.read(pc.wrapping_add(1));
        let source_constant = memory.read(
            pc.wrapping_add(1)
                .wrapping_add(if target_consumes_word { 1 } else { 0 }),
        );

        let is_pop_class = primary == self::primary::STACK && sub & 0b1000 == 0;
        let sp_eff = if is_pop_class {
            self.sp.read().wrapping_add(1)
        } else {
            self.sp.read()
        };

        let target = self.resolve(a_spec, target_constant, sp_eff, memory);
        let source = self.resolve(b_spec, source_constant, sp_eff, memory);

        let mut next_pc = pc
            .wrapping_add(1)
            .wrapping_add(if target.consumed_word { 1 } else { 0 })
            .wrapping_add(if source.consumed_word { 1 } else { 0 });

        match primary {
            self::primary::RESET => {
                next_pc = 0;
            }
            self::primary::SHUTDOWN => {
                self.shutdown = true;
            }
            self::primary::MOVE_HDD => match sub {
                move_hdd_sub::MOVE => {
                    self.writeback(&target, source.value, memory);
                }
                move_hdd_sub::HDDREAD => {
                    let word = disk.access(source.value, false, 0, false)?;
                    self.writeback(&target, word, memory);
                }
                move_hdd_sub::HDDWRITE => {
                    disk.access(target.value, false, source.value, true)?;
                }
                move_hdd_sub::HDDSECTOR => {
                    disk.access(source.value, true, 0, false)?;
                }
                _ => {}
            },
            self::primary::STACK => {
                let sp = self.sp.read();
                match sub {
                    stack_sub::POP => {
                        let value = memory.read(sp);
                        self.writeback(&target, value, memory);
                        self.sp.write(sp.wrapping_add(1), true);
                    }
                    stack_sub::RETURN => {
                        let value = memory.read(sp);
                        self.sp.write(sp.wrapping_add(1), true);
                        next_pc = value;
                    }
                    stack_sub::PUSH => {
                        let new_sp = sp.wrapping_sub(1);
                        memory.write(new_sp, source.value, true);
                        self.sp.write(new_sp, true);
                    }
                    stack_sub::CALL => {
                        let new_sp = sp.wrapping_sub(1);
                        memory.write(new_sp, next_pc, true);
                        self.sp.write(new_sp, true);
                        next_pc = source.value;
                    }
                    _ => {}
                }
            }
            self::primary::JUMP => next_pc = source.value,
            self::primary::JUMP_NEG => {
                if self.flags.negative {
                    next_pc = source.value;
                }
            }
            self::primary::JUMP_ZERO => {
                if self.flags.zero {
                    next_pc = source.value;
                }
            }
            self::primary::JUMP_OVERFLOW => {
                if self.flags.overflow {
                    next_pc = source.value;
                }
            }
            self::primary::ALU_COMPARE => {
                let result = alu(target.value, source.value, AluOp::from_bits(sub));
                self.flags = Flags {
                    zero: result.zero,
                    negative: result.negative,
                    overflow: result.overflow,
                };
            }
            self::primary::ALU_WRITEBACK => {
                let result = alu(target.value, source.value, AluOp::from_bits(sub));
                self.flags = Flags {
                    zero: result.zero,
                    negative: result.negative,
                    overflow: result.overflow,
                };
                self.writeback(&target, result.value, memory);
            }
            _ => {}
        }

        self.pc.step(next_pc, true, false, false);
        Ok(())
    }

    /// Promotes every staged register/PC write. Memory and the disk tick
    /// separately (the emulator driver owns that ordering).
    pub fn tick(&mut self) {
        self.a.tick();
        self.b.tick();
        self.c.tick();
        self.d.tick();
        self.sp.tick();
        self.pc.tick();
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}
