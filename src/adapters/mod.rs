//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `hardware`  | PwmPort            | ESP32-C3 LEDC                 |
//! |             | InterlockPort      | kill switch / supercon GPIO   |
//! |             | OneShotCounter     | esp_timer one-shot            |
//! |             | StatusLedPort      | RGB LED on LEDC timer 3       |
//! | `log_sink`  | EventSink          | Debug console log output      |
//! | `time`      | (clock)            | ESP32 system timer            |
//! | `uart`      | SerialPort         | UART1 host link               |

pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod uart;
