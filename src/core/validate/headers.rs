//! Header whitelist: at least one include must name a known C or Pi library.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::TargetMode;

/// Whitelisted headers grouped by what they are for
pub const HEADER_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "standard",
        &[
            "stdio.h", "stdlib.h", "string.h", "stdbool.h", "stdint.h", "time.h", "signal.h",
            "math.h", "limits.h", "ctype.h", "errno.h",
        ],
    ),
    (
        "filesystem",
        &[
            "unistd.h", "fcntl.h", "sys/types.h", "sys/stat.h", "dirent.h", "sys/mman.h",
            "sys/wait.h", "sys/inotify.h",
        ],
    ),
    (
        "gpio_wiringpi",
        &[
            "wiringPi.h", "softPwm.h", "lcd.h", "mcp23017.h", "pcf8591.h", "wiringPiSPI.h",
            "wiringPiI2C.h", "wiringSerial.h", "bcm_host.h", "pigpio.h", "pigpio_if2.h",
            "bcm2835.h",
        ],
    ),
    (
        "serial_device_io",
        &[
            "sys/ioctl.h", "termios.h", "linux/serial.h", "linux/i2c-dev.h",
            "linux/spi/spidev.h", "spidev.h",
        ],
    ),
    (
        "camera_image",
        &[
            "opencv2/core/core_c.h", "opencv2/highgui/highgui_c.h",
            "opencv2/imgproc/imgproc_c.h", "opencv2/imgcodecs/imgcodecs.h",
            "opencv2/videoio/videoio_c.h", "turbojpeg.h", "libavcodec/avcodec.h",
            "libavutil/imgutils.h", "libavutil/opt.h", "libavutil/time.h", "swscale/swscale.h",
        ],
    ),
    (
        "mqtt_amqp",
        &[
            "mosquitto.h", "MQTTClient.h", "paho-mqtt/MQTTClient.h", "amqp.h",
            "amqp_tcp_socket.h", "amqp_framing.h", "rabbitmq-c/amqp.h",
            "rabbitmq-c/tcp_socket.h", "paho-mqtt3as.h",
        ],
    ),
    (
        "networking",
        &[
            "sys/socket.h", "netinet/in.h", "arpa/inet.h", "netdb.h", "net/if.h", "ifaddrs.h",
            "sys/un.h", "sys/select.h", "sys/time.h", "poll.h",
        ],
    ),
    (
        "encryption_security",
        &["openssl/conf.h", "openssl/err.h", "openssl/evp.h", "openssl/ssl.h"],
    ),
    ("http_web", &["microhttpd.h", "libwebsockets.h"]),
    ("data_parsing_json", &["cJSON.h"]),
    ("threads_sync", &["pthread.h", "semaphore.h"]),
    ("logging", &["syslog.h", "sys/resource.h"]),
    (
        "message_queue_ipc",
        &[
            "sys/ipc.h", "sys/msg.h", "mqueue.h", "sys/shm.h", "sys/timerfd.h",
            "sys/signalfd.h",
        ],
    ),
    (
        "misc_system",
        &[
            "assert.h", "stdarg.h", "locale.h", "getopt.h", "sys/utsname.h", "xf86drm.h",
            "xf86drmMode.h", "gbm.h",
        ],
    ),
];

/// Pico SDK headers, whitelisted only when targeting the microcontroller
pub const PICO_SDK_HEADERS: &[&str] = &[
    "pico/stdlib.h",
    "hardware/gpio.h",
    "hardware/adc.h",
    "hardware/i2c.h",
    "hardware/spi.h",
    "hardware/pwm.h",
    "hardware/uart.h",
    "hardware/irq.h",
    "hardware/timer.h",
];

static INCLUDE_DIRECTIVE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*#include\s*[<"]([^>"\n]+)[>"]"#).ok());

/// Targets of every `#include <...>` / `#include "..."` line, in order
pub fn included_headers(code: &str) -> Vec<&str> {
    let Some(re) = INCLUDE_DIRECTIVE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(code)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

/// `header` is `listed` or ends with `/listed`
fn names_header(header: &str, listed: &str) -> bool {
    header == listed
        || header
            .strip_suffix(listed)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Whether an include target references a whitelisted header
pub fn is_whitelisted(header: &str, mode: TargetMode) -> bool {
    if PICO_SDK_HEADERS.iter().any(|h| names_header(header, h)) {
        return mode == TargetMode::Pico;
    }
    HEADER_CATEGORIES
        .iter()
        .flat_map(|(_, headers)| headers.iter())
        .any(|h| names_header(header, h))
}

/// True if at least one include references a whitelisted header
pub fn has_whitelisted_include(code: &str, mode: TargetMode) -> bool {
    included_headers(code)
        .into_iter()
        .any(|header| is_whitelisted(header, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_included_headers() {
        let code = "#include <stdio.h>\n  #include \"wiringPi.h\"\n// #include <ignored.h> too\nint x;";
        assert_eq!(included_headers(code), vec!["stdio.h", "wiringPi.h"]);
    }

    #[test]
    fn test_whitelist_lookup() {
        assert!(is_whitelisted("stdio.h", TargetMode::Standard));
        assert!(is_whitelisted("linux/i2c-dev.h", TargetMode::Standard));
        assert!(is_whitelisted("cjson/cJSON.h", TargetMode::Standard));
        assert!(!is_whitelisted("sensor.h", TargetMode::Standard));
    }

    #[test]
    fn test_pico_headers_only_for_pico() {
        assert!(!is_whitelisted("pico/stdlib.h", TargetMode::Standard));
        assert!(is_whitelisted("pico/stdlib.h", TargetMode::Pico));
        assert!(has_whitelisted_include("#include \"hardware/adc.h\"\n", TargetMode::Pico));
        assert!(!has_whitelisted_include("#include \"pico/stdlib.h\"\n", TargetMode::Standard));
    }

    #[test]
    fn test_whitelist_matches_whole_path_components() {
        assert!(is_whitelisted("cjson/cJSON.h", TargetMode::Standard));
        assert!(!is_whitelisted("mystdio.h", TargetMode::Standard));
        assert!(!is_whitelisted("stdio.hpp", TargetMode::Standard));
    }

    #[test]
    fn test_no_whitelisted_include() {
        assert!(!has_whitelisted_include("#include \"sensor.h\"\nint main(){}", TargetMode::Standard));
        assert!(!has_whitelisted_include("int main(){}", TargetMode::Standard));
    }
}
