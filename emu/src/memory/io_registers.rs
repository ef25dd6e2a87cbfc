//! Memory-mapped I/O register accessors: byte, halfword and word views
//! into a shared backing store, with per-register access behavior and
//! change subscribers.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

pub type IoRegisterCallback = Box<dyn FnMut(u32)>;

/// Access behavior of one mapped register.
#[derive(Clone)]
pub enum IoRegisterKind {
    ReadWrite,
    /// Writes are ignored and logged.
    ReadOnly,
    /// Reads return zero; the written value stays in the backing store for
    /// the hardware side.
    WriteOnly,
    /// A written 1-bit clears the corresponding stored bit and can never
    /// set one. Applied per byte.
    WriteToClear,
    /// The masked bits of the first byte survive writes untouched.
    PartiallyReadOnly { read_only_mask: u8 },
    /// Reads come from a live counter shared with the timer unit; writes
    /// land in the backing store as the reload value.
    TimerBacked(Rc<Cell<u16>>),
    /// Mapped but wired to nothing.
    Unused,
}

struct IoRegister {
    name: &'static str,
    offset: usize,
    width: usize,
    kind: IoRegisterKind,
    callbacks: Vec<IoRegisterCallback>,
}

/// The register collection: owns the backing bytes, a byte-to-register map
/// and the register descriptors. Accesses wider than a register compose
/// with the sibling mapped at the following offset.
pub struct IoRegisters {
    backing: Vec<u8>,
    map: Vec<Option<usize>>,
    registers: Vec<IoRegister>,
}

impl IoRegisters {
    pub fn new(size: usize) -> Self {
        Self {
            backing: vec![0; size],
            map: vec![None; size],
            registers: Vec::new(),
        }
    }

    /// The GBA-shaped map this crate is built around. Timer counter
    /// registers read through the shared cells passed in.
    pub fn gba(timers: &[Rc<Cell<u16>>; 4]) -> Self {
        let mut io = Self::new(0x400);
        io.add_register("DISPCNT", 0x000, 2, IoRegisterKind::ReadWrite);
        io.add_register(
            "DISPSTAT",
            0x004,
            2,
            IoRegisterKind::PartiallyReadOnly {
                read_only_mask: 0b111,
            },
        );
        io.add_register("VCOUNT", 0x006, 2, IoRegisterKind::ReadOnly);
        for (index, name) in [
            "BG0HOFS", "BG0VOFS", "BG1HOFS", "BG1VOFS", "BG2HOFS", "BG2VOFS", "BG3HOFS",
            "BG3VOFS",
        ]
        .into_iter()
        .enumerate()
        {
            io.add_register(name, 0x010 + index * 2, 2, IoRegisterKind::WriteOnly);
        }
        for (index, name) in ["TM0CNT_L", "TM1CNT_L", "TM2CNT_L", "TM3CNT_L"]
            .into_iter()
            .enumerate()
        {
            io.add_register(
                name,
                0x100 + index * 4,
                2,
                IoRegisterKind::TimerBacked(Rc::clone(&timers[index])),
            );
            io.add_register(
                ["TM0CNT_H", "TM1CNT_H", "TM2CNT_H", "TM3CNT_H"][index],
                0x102 + index * 4,
                2,
                IoRegisterKind::ReadWrite,
            );
        }
        io.add_register("SIODATA32", 0x120, 4, IoRegisterKind::Unused);
        io.add_register("IE", 0x200, 2, IoRegisterKind::ReadWrite);
        io.add_register("IF", 0x202, 2, IoRegisterKind::WriteToClear);
        io.add_register("IME", 0x208, 2, IoRegisterKind::ReadWrite);
        io.add_register("POSTFLG", 0x300, 1, IoRegisterKind::ReadWrite);
        io.add_register("HALTCNT", 0x301, 1, IoRegisterKind::WriteOnly);
        io
    }

    /// Maps a register over `width` bytes starting at `offset`. Overlaps
    /// are a construction bug.
    pub fn add_register(
        &mut self,
        name: &'static str,
        offset: usize,
        width: usize,
        kind: IoRegisterKind,
    ) {
        assert!(matches!(width, 1 | 2 | 4), "unsupported width {width}");
        let index = self.registers.len();
        for position in offset..offset + width {
            assert!(
                self.map[position].is_none(),
                "byte {position:#05X} already mapped"
            );
            self.map[position] = Some(index);
        }
        self.registers.push(IoRegister {
            name,
            offset,
            width,
            kind,
            callbacks: Vec::new(),
        });
    }

    /// Registers a subscriber on the register mapped at `offset`, invoked
    /// with the register's current full value after every committed write.
    pub fn add_callback(&mut self, offset: usize, callback: impl FnMut(u32) + 'static) {
        let index = self.map[offset]
            .unwrap_or_else(|| panic!("no register mapped at {offset:#05X}"));
        self.registers[index].callbacks.push(Box::new(callback));
    }

    /// Device-side store: bypasses the access-control kinds so hardware
    /// can update read-only and write-to-clear registers. No callbacks.
    pub fn store(&mut self, offset: usize, value: u8) {
        self.backing[offset] = value;
    }

    fn mapped_byte(&self, offset: usize) -> u8 {
        let Some(index) = self.map.get(offset).copied().flatten() else {
            return 0;
        };
        let register = &self.registers[index];
        match &register.kind {
            IoRegisterKind::WriteOnly => 0,
            IoRegisterKind::TimerBacked(counter) => {
                let relative = offset - register.offset;
                counter
                    .get()
                    .to_le_bytes()
                    .get(relative)
                    .copied()
                    .unwrap_or(0)
            }
            _ => self.backing[offset],
        }
    }

    pub fn read_byte(&self, offset: usize) -> u8 {
        self.mapped_byte(offset)
    }

    pub fn read_half_word(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.mapped_byte(offset), self.mapped_byte(offset + 1)])
    }

    pub fn read_word(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.mapped_byte(offset),
            self.mapped_byte(offset + 1),
            self.mapped_byte(offset + 2),
            self.mapped_byte(offset + 3),
        ])
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.write_span(offset, &[value]);
    }

    pub fn write_half_word(&mut self, offset: usize, value: u16) {
        self.write_span(offset, &value.to_le_bytes());
    }

    pub fn write_word(&mut self, offset: usize, value: u32) {
        self.write_span(offset, &value.to_le_bytes());
    }

    /// Full value of one register as its subscribers see it.
    fn register_value(&self, index: usize) -> u32 {
        let register = &self.registers[index];
        if let IoRegisterKind::TimerBacked(counter) = &register.kind {
            return u32::from(counter.get());
        }
        let mut value = 0_u32;
        for relative in 0..register.width {
            value |= u32::from(self.backing[register.offset + relative]) << (relative * 8);
        }
        value
    }

    fn write_span(&mut self, offset: usize, bytes: &[u8]) {
        // Registers that committed at least one byte, in offset order; a
        // span across two registers notifies both.
        let mut touched = Vec::new();
        for (step, &byte) in bytes.iter().enumerate() {
            let position = offset + step;
            let Some(index) = self.map.get(position).copied().flatten() else {
                continue;
            };
            if self.write_mapped_byte(index, position, byte) && !touched.contains(&index) {
                touched.push(index);
            }
        }
        for index in touched {
            let value = self.register_value(index);
            for callback in &mut self.registers[index].callbacks {
                callback(value);
            }
        }
    }

    fn write_mapped_byte(&mut self, index: usize, position: usize, byte: u8) -> bool {
        let relative = position - self.registers[index].offset;
        let kind = self.registers[index].kind.clone();
        match kind {
            IoRegisterKind::ReadOnly => {
                debug!(
                    "ignoring write to read-only register {}",
                    self.registers[index].name
                );
                false
            }
            IoRegisterKind::Unused => {
                debug!("ignoring write to unused register byte {position:#05X}");
                false
            }
            IoRegisterKind::WriteToClear => {
                self.backing[position] &= !byte;
                true
            }
            IoRegisterKind::PartiallyReadOnly { read_only_mask } if relative == 0 => {
                self.backing[position] =
                    (self.backing[position] & read_only_mask) | (byte & !read_only_mask);
                true
            }
            _ => {
                self.backing[position] = byte;
                true
            }
        }
    }
}
