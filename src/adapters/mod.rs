//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements           | Connects to                      |
//! |-------------|----------------------|----------------------------------|
//! | `hardware`  | AdcPort, OutputPort  | ADC1 via 16:1 mux, 74HC595 chain |
//! | `log_sink`  | EventSink            | Serial log output                |
//! | `console`   | (command source)     | Serial console lines             |
//! | `time`      | (clock)              | esp_timer uptime counter         |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod time;
