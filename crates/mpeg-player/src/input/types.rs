use serde::{Deserialize, Serialize};

/// Controller button bits.
pub mod buttons {
    pub const C: u32 = 1 << 0;
    pub const B: u32 = 1 << 1;
    pub const A: u32 = 1 << 2;
    pub const START: u32 = 1 << 3;
    pub const DPAD_UP: u32 = 1 << 4;
    pub const DPAD_DOWN: u32 = 1 << 5;
    pub const DPAD_LEFT: u32 = 1 << 6;
    pub const DPAD_RIGHT: u32 = 1 << 7;
    pub const Z: u32 = 1 << 8;
    pub const Y: u32 = 1 << 9;
    pub const X: u32 = 1 << 10;
    pub const D: u32 = 1 << 11;

    /// A+B+X+Y+START held together and nothing else: software reset.
    pub const RESET_COMBO: u32 = A | B | X | Y | START;
}

/// Keyboard scan code (USB HID usage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub u8);

impl Key {
    pub const A: Key = Key(0x04);
    pub const Q: Key = Key(0x14);
    pub const ENTER: Key = Key(0x28);
    pub const ESCAPE: Key = Key(0x29);
    pub const BACKSPACE: Key = Key(0x2a);
    pub const TAB: Key = Key(0x2b);
    pub const SPACE: Key = Key(0x2c);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub buttons: u32,
}

/// Keys currently held, one bit per scan code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardState {
    down: [u64; 4],
}

impl KeyboardState {
    pub fn press(&mut self, key: Key) {
        self.down[usize::from(key.0 / 64)] |= 1u64 << (key.0 % 64);
    }

    pub fn release(&mut self, key: Key) {
        self.down[usize::from(key.0 / 64)] &= !(1u64 << (key.0 % 64));
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.down[usize::from(key.0 / 64)] & (1u64 << (key.0 % 64)) != 0
    }

    pub fn clear(&mut self) {
        self.down = [0; 4];
    }
}

/// State of every attached input device at one instant.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub controllers: Vec<ControllerState>,
    pub keyboards: Vec<KeyboardState>,
}

impl InputSnapshot {
    pub fn clear(&mut self) {
        self.controllers.clear();
        self.keyboards.clear();
    }
}

/// Source of device snapshots, polled once per playback tick.
pub trait InputDevices {
    /// Replace `snapshot` with the current state of all attached devices.
    fn poll(&mut self, snapshot: &mut InputSnapshot);
}

/// No devices attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputDevices for NoInput {
    fn poll(&mut self, snapshot: &mut InputSnapshot) {
        snapshot.clear();
    }
}

impl<T: InputDevices + ?Sized> InputDevices for &mut T {
    fn poll(&mut self, snapshot: &mut InputSnapshot) {
        (**self).poll(snapshot);
    }
}
