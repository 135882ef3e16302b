pub mod cancel;
pub mod types;

pub use cancel::{CancelPolicy, CancelReason, CancelSpec};
pub use types::{
    ControllerState, InputDevices, InputSnapshot, Key, KeyboardState, NoInput, buttons,
};
