//! Laser Controller Firmware: Main Entry Point
//!
//! Hexagonal architecture, single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartSerial       HardwareAdapter         LogEventSink         │
//! │  (SerialPort)     (Pwm+Interlock+         (EventSink)          │
//! │                    OneShot+StatusLed)     MonotonicClock       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            LaserController (pure logic)                │    │
//! │  │  Decoder · FSM · Watchdog · PWM · Interlock · Pulse    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use laserctl::adapters::hardware::HardwareAdapter;
use laserctl::adapters::log_sink::LogEventSink;
use laserctl::adapters::time::MonotonicClock;
use laserctl::adapters::uart::UartSerial;
use laserctl::app::service::LaserController;
use laserctl::config::LaserConfig;
use laserctl::drivers::interlock_lines::InterlockLines;
use laserctl::drivers::ledc::LedcPwm;
use laserctl::drivers::one_shot::EspOneShot;
use laserctl::drivers::status_led::StatusLed;
use laserctl::drivers::hw_init;

/// Main loop period.  The decoder handles one byte per tick, so this also
/// bounds the serial throughput.
const TICK_MS: u32 = 1;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  laserctl v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = LaserConfig::default();

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals(&config) {
        // Outputs are in an unknown state; refuse to run.
        log::error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // Kill switch (GPIO9) and supercon enable (GPIO10).
    let kill_switch = PinDriver::output(pins.gpio9)?;
    let power_enable = PinDriver::output(pins.gpio10)?;

    // ── 3. Host link on UART1 ─────────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart1,
        pins.gpio21,
        pins.gpio20,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.serial_baud)),
    )?;
    let mut serial = UartSerial::new(uart);

    // ── 4. Construct adapters ─────────────────────────────────
    let mut hw = HardwareAdapter::new(
        LedcPwm::new(),
        InterlockLines::new(kill_switch, power_enable),
        EspOneShot::new(),
        StatusLed::new(config.use_rgb_led),
    );
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    // ── 5. Controller bring-up ────────────────────────────────
    let mut controller = LaserController::new(config);
    if let Err(e) = controller.start(clock.now_ms(), &mut hw, &mut sink) {
        // Locked regardless; a later '1' retries the attach.
        warn!("bring-up incomplete: {}", e);
    }
    info!("Entering main loop (tick={}ms)", TICK_MS);

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        controller.tick(clock.now_ms(), &mut serial, &mut hw, &mut sink);
        FreeRtos::delay_ms(TICK_MS);
    }
}
