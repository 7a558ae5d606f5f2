//! PIR motion sensor on a Raspberry Pi GPIO pin.

use super::{HardwareError, MotionSensor};
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Latched rising-edge flag, set from the interrupt thread and cleared on read
#[derive(Clone, Default)]
pub struct EdgeLatch {
    flag: Arc<AtomicBool>,
}

impl EdgeLatch {
    /// Record an edge
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Return whether an edge was recorded since the last call, and clear it
    #[must_use]
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

/// HC-SR501 style PIR sensor wired to a BCM input pin.
///
/// Rising edges are caught by an asynchronous interrupt so that short pulses
/// between two polls are not lost.
pub struct PirSensor {
    pin: Mutex<InputPin>,
    pin_number: u8,
    latch: EdgeLatch,
}

impl PirSensor {
    /// Claim `pin_number` as input and arm the rising-edge interrupt.
    ///
    /// # Errors
    ///
    /// Returns a `HardwareError::Gpio` if the GPIO peripheral or the pin is
    /// unavailable.
    pub fn new(pin_number: u8) -> Result<Self, HardwareError> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(pin_number)?.into_input();
        let latch = EdgeLatch::default();

        let interrupt_latch = latch.clone();
        pin.set_async_interrupt(Trigger::RisingEdge, None, move |_event: Event| {
            interrupt_latch.trigger();
        })?;

        info!(pin = pin_number, "PIR sensor armed on rising edge");

        Ok(Self {
            pin: Mutex::new(pin),
            pin_number,
            latch,
        })
    }

    /// BCM number of the claimed pin
    #[must_use]
    pub const fn pin_number(&self) -> u8 {
        self.pin_number
    }
}

impl MotionSensor for PirSensor {
    fn poll(&self) -> Result<bool, HardwareError> {
        Ok(self.latch.take())
    }
}

impl Drop for PirSensor {
    fn drop(&mut self) {
        let pin = self.pin.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = pin.clear_async_interrupt() {
            warn!(pin = self.pin_number, "Failed to clear PIR interrupt: {e}");
        }
        // InputPin resets the pin mode on drop
        debug!(pin = self.pin_number, "PIR sensor released");
    }
}
