//! GPIO / peripheral pin assignments for the ESP32-C3 laser driver board.
//!
//! Single source of truth.  Every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Laser outputs (LEDC PWM capable)
// ---------------------------------------------------------------------------

/// 405 nm diode driver gate (MOSFET / TTL input).
pub const LASER_405_GPIO: i32 = 8;
/// 445 nm diode driver input.  Without PWM the stage runs at full power.
pub const LASER_445_GPIO: i32 = 2;
/// Nitrogen laser trigger box (external trigger input).
pub const NITROGEN_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Interlock lines
// ---------------------------------------------------------------------------

/// 445 nm kill switch.  LOW = asserted (stage forced off).
pub const KILL_SWITCH_445_GPIO: i32 = 9;
/// Supercon power-enable.  Pulled up on the board, so HIGH = disabled.
pub const SUPERCON_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Relays (active low), sharing pins with the RGB LED, see `LaserConfig::use_rgb_led`
// ---------------------------------------------------------------------------

pub const RELAY_405_GPIO: i32 = 3;
pub const RELAY_445_GPIO: i32 = 1;

pub const LED_R_GPIO: i32 = 1;
pub const LED_G_GPIO: i32 = 3;
/// Blue is unrouted on this board; it aliases red.
pub const LED_B_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Host link (UART1, UART0 is taken by the debug console)
// ---------------------------------------------------------------------------

pub const HOST_UART_RX_GPIO: i32 = 20;
pub const HOST_UART_TX_GPIO: i32 = 21;
pub const HOST_UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// LEDC allocation (ESP32-C3: 6 channels, 4 timers, low-speed mode only)
// ---------------------------------------------------------------------------

pub const LEDC_CH_405: u32 = 0;
pub const LEDC_CH_NITROGEN: u32 = 2;
pub const LEDC_CH_445: u32 = 4;
pub const LEDC_CH_LED_R: u32 = 1;
pub const LEDC_CH_LED_G: u32 = 3;
pub const LEDC_CH_LED_B: u32 = 5;

pub const LEDC_TIMER_405: u32 = 0;
pub const LEDC_TIMER_445: u32 = 1;
pub const LEDC_TIMER_NITROGEN: u32 = 2;
pub const LEDC_TIMER_LED: u32 = 3;
/// LEDC frequency for the RGB status LED (1 kHz, 8-bit).
pub const LED_PWM_FREQ_HZ: u32 = 1_000;
