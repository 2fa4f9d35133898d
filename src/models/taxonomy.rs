//! Category/subcategory catalogue and the variation axes sampled per example.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::TargetMode;

/// A single (category, subcategory) pair from the taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxonomyEntry {
    pub category: String,
    pub subcategory: String,
}

/// One category with its relative sampling weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Relative weight for the fill phase; need not sum to 1 across categories
    pub weight: f64,
    pub subcategories: Vec<String>,
}

/// Immutable taxonomy and variation axes for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Categories in progression order
    pub categories: Vec<Category>,
    pub code_styles: Vec<String>,
    pub complexity_levels: Vec<String>,
    pub platforms: Vec<String>,
    pub integration_patterns: Vec<String>,
    pub use_contexts: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy file {0}: {1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse taxonomy file {0}: {1}")]
    ParseError(PathBuf, toml::de::Error),
    #[error("Invalid taxonomy: {0}")]
    Invalid(String),
}

const CODE_STYLES: &[&str] = &["functional"];

const COMPLEXITY_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

const INTEGRATION_PATTERNS: &[&str] = &["standalone", "with multiple sensors", "in distributed system"];

const USE_CONTEXTS: &[&str] = &[
    "educational setting",
    "hobbyist project",
    "professional monitoring system",
    "research application",
    "industrial automation",
    "smart agriculture",
    "robotics project",
    "wearable technology",
    "interactive art installation",
    "assistive technology",
    "environmental science",
    "home automation",
];

const STANDARD_PLATFORMS: &[&str] = &[
    "Raspberry Pi 4 Model B",
    "Raspberry Pi 3 Model B+",
    "Raspberry Pi Zero W",
    "Raspberry Pi 5",
];

const PICO_PLATFORMS: &[&str] = &["Raspberry Pi Pico"];

const SENSOR_READING: &[&str] = &[
    "temperature sensor", "humidity sensor", "pressure sensor", "light sensor",
    "ultrasonic sensor", "PIR sensor", "soil moisture sensor", "IR sensor",
    "sound sensor", "vibration sensor", "gas sensor", "touch sensor",
    "hall effect sensor", "rain sensor", "water flow sensor", "tilt sensor",
    "flame sensor", "color sensor", "capacitive touch sensor",
    "weight/load cell sensor", "motion sensor", "alcohol sensor",
    "gyroscope sensor", "accelerometer", "magnetometer", "time of flight sensor",
];

const PICO_SENSOR_READING: &[&str] = &[
    "temperature sensor", "humidity sensor", "pressure sensor", "light sensor",
    "ultrasonic sensor", "PIR sensor", "soil moisture sensor", "IR sensor",
    "sound sensor", "vibration sensor", "gas sensor", "touch sensor",
    "hall effect sensor", "rain sensor", "tilt sensor",
    "flame sensor", "color sensor", "capacitive touch sensor",
    "load cell sensor", "motion sensor", "alcohol sensor",
    "gyroscope sensor", "accelerometer", "magnetometer",
];

const ACTUATORS: &[&str] = &[
    "servo motor", "DC motor", "stepper motor", "relay", "solenoid",
    "LED", "buzzer", "speaker", "vibration motor", "fan", "LCD display",
    "OLED screen", "RGB LED", "relay-controlled lamp", "heater", "cooling fan",
    "valve actuator", "electromagnetic lock",
];

const SENSOR_ACTUATOR_COMBO: &[&str] = &[
    "temperature sensor controlling a cooling fan",
    "humidity sensor triggering a dehumidifier",
    "PIR motion sensor activating a light or buzzer",
    "ultrasonic sensor controlling servo for parking assist",
    "soil moisture sensor turning on a water pump",
    "gas sensor activating a ventilation fan",
    "IR sensor triggering a relay to open a door",
    "sound sensor activating an alarm",
    "light sensor adjusting brightness of an LED strip",
    "load cell sensor triggering a locking mechanism",
    "time of flight sensor controlling a gate",
    "rain sensor closing a motorized window",
    "flame sensor activating buzzer and LED",
    "capacitive touch sensor toggling a relay",
];

const FILE_LOGGING: &[&str] = &[
    "log temperature readings to a CSV file",
    "log motion detection timestamps to a text file",
    "log gas sensor values with timestamps",
    "write ultrasonic distance readings to a file every second",
    "create daily sensor log files for multiple sensors",
    "log light and sound levels with date/time",
    "store sensor threshold breaches to a log file",
    "save sensor calibration values to file",
    "record ADC readings from multiple channels into CSV",
    "read configuration threshold values from a JSON file",
];

const INTERRUPT_DRIVEN: &[&str] = &[
    "motion sensor using GPIO interrupt to turn on light",
    "button interrupt to start or stop data logging",
    "vibration sensor triggering a shutdown routine",
    "PIR sensor GPIO interrupt activating buzzer",
    "external interrupt from a tilt switch",
    "IR receiver decoding input via interrupt",
    "hardware timer interrupt for consistent sampling",
    "Hall effect sensor rotation counting with interrupt",
    "ultrasonic trigger using echo pin interrupt",
];

const CAMERA_APPLICATIONS: &[&str] = &[
    "USB camera capturing image every 10 seconds",
    "CSI camera capturing grayscale image and saving",
    "detect object presence and capture image",
    "apply blur filter to image captured via camera",
    "stream camera feed and log frame timestamps",
    "time-lapse photography using CSI camera",
    "save motion-triggered snapshots from camera",
    "capture image and resize to 320x240 before saving",
    "capture and convert image to black and white",
    "camera capture with filename based on timestamp",
];

const NETWORKING: &[&str] = &[
    "send temperature sensor data over UDP",
    "receive command over TCP to activate actuator",
    "post humidity readings to a web server using HTTP",
    "subscribe to MQTT topic to get control signals",
    "send camera image snapshot to server via POST",
    "receive configuration from HTTP API",
    "stream video frames over MJPEG using TCP socket",
    "broadcast light levels over UDP multicast",
    "fetch thresholds for sensors from a cloud endpoint",
    "stream live sensor data over local web server",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn category(name: &str, weight: f64, subcategories: &[&str]) -> Category {
    Category {
        name: name.to_string(),
        weight,
        subcategories: owned(subcategories),
    }
}

impl Taxonomy {
    /// Built-in taxonomy for the given target mode
    pub fn builtin(mode: TargetMode) -> Self {
        match mode {
            TargetMode::Standard => Self {
                categories: vec![
                    category("sensor_reading", 0.25, SENSOR_READING),
                    category("actuators", 0.15, ACTUATORS),
                    category("sensor_actuator_combo", 0.2, SENSOR_ACTUATOR_COMBO),
                    category("file_logging", 0.05, FILE_LOGGING),
                    category("interrupt_driven", 0.10, INTERRUPT_DRIVEN),
                    category("camera_applications", 0.15, CAMERA_APPLICATIONS),
                    category("networking", 0.10, NETWORKING),
                ],
                code_styles: owned(CODE_STYLES),
                complexity_levels: owned(COMPLEXITY_LEVELS),
                platforms: owned(STANDARD_PLATFORMS),
                integration_patterns: owned(INTEGRATION_PATTERNS),
                use_contexts: owned(USE_CONTEXTS),
            },
            TargetMode::Pico => Self {
                categories: vec![
                    category("sensor_reading", 0.3, PICO_SENSOR_READING),
                    category("actuators", 0.3, ACTUATORS),
                    category("sensor_actuator_combo", 0.2, SENSOR_ACTUATOR_COMBO),
                    // The JSON-config entry needs a filesystem the Pico lacks
                    category("file_logging", 0.1, &FILE_LOGGING[..FILE_LOGGING.len() - 1]),
                    category("interrupt_driven", 0.1, INTERRUPT_DRIVEN),
                ],
                code_styles: owned(CODE_STYLES),
                complexity_levels: owned(COMPLEXITY_LEVELS),
                platforms: owned(PICO_PLATFORMS),
                integration_patterns: owned(INTEGRATION_PATTERNS),
                use_contexts: owned(USE_CONTEXTS),
            },
        }
    }

    /// Load a taxonomy from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TaxonomyError::ReadError(path.to_path_buf(), e))?;
        let taxonomy: Taxonomy = toml::from_str(&contents)
            .map_err(|e| TaxonomyError::ParseError(path.to_path_buf(), e))?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Use `file` (relative to `project_root`) when given, else the built-in table
    pub fn resolve(
        project_root: &Path,
        file: Option<&Path>,
        mode: TargetMode,
    ) -> Result<Self, TaxonomyError> {
        match file {
            Some(f) => Self::load_from_file(&project_root.join(f)),
            None => Ok(Self::builtin(mode)),
        }
    }

    /// Check the structural requirements the sampler relies on
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        if self.categories.is_empty() {
            return Err(TaxonomyError::Invalid("no categories defined".to_string()));
        }
        for cat in &self.categories {
            if cat.subcategories.is_empty() {
                return Err(TaxonomyError::Invalid(format!(
                    "category '{}' has no subcategories",
                    cat.name
                )));
            }
            if !cat.weight.is_finite() || cat.weight < 0.0 {
                return Err(TaxonomyError::Invalid(format!(
                    "category '{}' has invalid weight {}",
                    cat.name, cat.weight
                )));
            }
        }
        if self.categories.iter().all(|c| c.weight == 0.0) {
            return Err(TaxonomyError::Invalid("all category weights are zero".to_string()));
        }

        let axes = [
            ("code_styles", &self.code_styles),
            ("complexity_levels", &self.complexity_levels),
            ("platforms", &self.platforms),
            ("integration_patterns", &self.integration_patterns),
            ("use_contexts", &self.use_contexts),
        ];
        for (name, values) in axes {
            if values.is_empty() {
                return Err(TaxonomyError::Invalid(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    /// All (category, subcategory) pairs in taxonomy order
    pub fn entries(&self) -> impl Iterator<Item = TaxonomyEntry> + '_ {
        self.categories.iter().flat_map(|cat| {
            cat.subcategories.iter().map(move |sub| TaxonomyEntry {
                category: cat.name.clone(),
                subcategory: sub.clone(),
            })
        })
    }

    /// Number of (category, subcategory) pairs
    pub fn pair_count(&self) -> usize {
        self.categories.iter().map(|c| c.subcategories.len()).sum()
    }

    /// Serialize to TOML (used by `pigen init`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
