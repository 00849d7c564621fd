//! DataSeer Client - Adapters for the external model services
//!
//! - [`DelftClassifier`]: HTTP client for DeLFT text classifiers
//! - [`WapitiLabeler`]: Wapiti CRF tagger run as a child process
//! - [`GatedClassifier`] / [`GatedLabeler`]: bounded-concurrency, timed access
//! - [`Services`]: explicit init/shutdown of all handles

pub mod delft;
pub mod gate;
pub mod services;
pub mod wapiti;

pub use delft::{parse_classifications, DelftClassifier};
pub use gate::{Gate, GatedClassifier, GatedLabeler};
pub use services::Services;
pub use wapiti::WapitiLabeler;
