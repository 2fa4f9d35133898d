//! Headers and text patterns the generated code must not use.

use regex::Regex;
use tracing::debug;

use super::headers::included_headers;
use crate::models::TargetMode;

/// Disallowed include targets with the correction sent back to the model
pub const RESTRICTED_HEADERS: &[(&str, &str)] = &[
    ("jsmn.h", "custom library (jsmn.h) should not be used"),
    ("interface/mmal/mmal.h", "MMAL is deprecated and should not be used"),
    ("lws_server.h", "lws_server.h is non-existent"),
    ("mqtt_client.c", "mqtt_client.c is not a valid header"),
    ("mcp3008.h", "mcp3008.h is non-existent"),
    ("mcp3008.c", "mcp3008.c is not a valid header"),
    ("paho-mqtt3as.h", "paho-mqtt3as.h is non-existent"),
    ("pigpiod_if2.h", "pigpiod_if2.h should not be used"),
    ("pigpio_if2.h", "pigpio_if2.h is non-existent"),
    ("config.h", "config.h is non-existent"),
    ("wiringPiPWM.h", "wiringPiPWM.h is non-existent"),
    ("cJSON.h", "use <cjson/CJSON.h> instead of <cJSON.h>"),
    ("rabbitmq-c/amqp.h", "use <amqp.h> instead"),
    ("vl53l1x.h", "vl53l1x.h is non-existent"),
    ("vl53l1x_api.h", "vl53l1x_api.h is non-existent"),
    ("libjpeg/jpeglib.h", "use <jpeglib.h> instead of <libjpeg/jpeglib.h>"),
    ("oled.h", "oled.h is non-existent"),
    ("oled.c", "oled.c is not a valid header"),
    ("dht11.h", "custom or unavailable (dht11.h)"),
    ("lwip/init.h", "lwip/init.h is not available"),
    ("socket.h", "use <sys/socket.h> instead of <socket.h>"),
    ("ws2812spi.h", "ws2812spi.h is non-existent"),
    ("sensor.h", "sensor.h is non-existent"),
    ("paho-mqtt/MQTTClient.h", "may require redirection or update if misused"),
    ("ws2812b.h", "ws2812b.h is non-existent"),
    ("ws2811.h", "ws2811.h is non-existent"),
    ("ws2811/ws2811.h", "ws2811/ws2811.h is not allowed"),
    ("dht22.h", "dht22.h is non-existent"),
    ("VL53L1X.h", "VL53L1X.h is non-existent"),
    ("systemd/sd-daemon.h", "not portable"),
    ("ws2812.h", "ws2812.h is non-existent"),
    ("mcp3008spi.h", "mcp3008spi.h is non-existent"),
    ("mqtt3a.h", "mqtt3a.h is not found"),
    ("rpi_ws281x/ws2811.h", "rpi_ws281x/ws2811.h is not allowed"),
    ("bme68x.h", "bme68x.h is non-standard"),
    ("paho-mqtt3c/MQTTClient.h", "use <paho-mqtt/MQTTClient.h> instead"),
    ("paho-mqtt3a/MQTTClient.h", "use <paho-mqtt/MQTTClient.h> instead"),
    ("dht22Lib.h", "dht22Lib.h is non-existent"),
    ("dhtreader.h", "dhtreader.h is non-existent"),
    ("i2c.h", "i2c.h is non-existent"),
    ("ssd1306_i2c.h", "ssd1306_i2c.h is non-existent"),
    ("hmc5883l_calibration.h", "custom library, not available"),
    ("libgpiod.h", "libgpiod.h should not be used"),
    ("lwip/netconn.h", "lwip/netconn.h is unavailable"),
    ("opencv/cv.h", "OpenCV is C++ only, not valid in plain C"),
    ("libcamera/libcamera.h", "libcamera is C++, not usable in C"),
];

/// Pico SDK headers, forbidden when targeting a full Linux board
pub const PICO_SDK_RESTRICTIONS: &[(&str, &str)] = &[
    ("pico/stdlib.h", "pico SDK headers not suitable for Pi OS"),
    ("hardware/adc.h", "hardware/adc.h is for Pico SDK"),
];

/// Raw-text patterns, matched anywhere in the code
pub const RESTRICTED_PATTERNS: &[(&str, &str)] = &[
    (r"libcamera/libcamera\.h", "libcamera is not supported in plain C"),
    (r"\bopencv\b", "OpenCV references are not supported in C"),
    (r"opencv/cv\.h", "cv.h is deprecated and incompatible with C-only projects"),
    (r"\bcv\.h\b", "cv.h is deprecated and incompatible with C-only projects"),
    (
        r"pkg-config\s+--cflags\s+--libs\s+opencv",
        "pkg-config for OpenCV suggests C++ usage",
    ),
    (r"\bg\+\+", "G++ indicates C++ code, not valid for plain C pipeline"),
];

/// One matched rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Header name or pattern that matched
    pub rule: String,
    pub reason: &'static str,
}

/// Restricted-header table for one target, with patterns compiled once
#[derive(Debug)]
pub struct RestrictedRules {
    headers: Vec<(&'static str, &'static str)>,
    patterns: Vec<(Regex, &'static str)>,
}

impl RestrictedRules {
    pub fn for_mode(mode: TargetMode) -> Self {
        let mut headers = RESTRICTED_HEADERS.to_vec();
        if !mode.is_microcontroller() {
            headers.extend_from_slice(PICO_SDK_RESTRICTIONS);
        }

        let patterns = RESTRICTED_PATTERNS
            .iter()
            .filter_map(|&(pattern, reason)| match Regex::new(pattern) {
                Ok(re) => Some((re, reason)),
                Err(e) => {
                    debug!("Skipping restricted pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self { headers, patterns }
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Every violated rule, headers first, in table order
    pub fn check(&self, code: &str) -> Vec<Violation> {
        let includes = included_headers(code);
        let mut violations: Vec<Violation> = self
            .headers
            .iter()
            .filter(|(header, _)| includes.contains(header))
            .map(|&(header, reason)| Violation {
                rule: header.to_string(),
                reason,
            })
            .collect();

        violations.extend(
            self.patterns
                .iter()
                .filter(|(re, _)| re.is_match(code))
                .map(|(re, reason)| Violation {
                    rule: re.as_str().to_string(),
                    reason: *reason,
                }),
        );
        violations
    }
}

/// Join violations into one corrective sentence
pub fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.reason)
        .collect::<Vec<_>>()
        .join("; ")
}
