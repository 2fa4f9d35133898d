//! Common test utilities

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use pigen::core::ModelGateway;
use pigen::error::SoftFailure;

/// Small program that passes the default validator in standard mode
pub const VALID_C: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <wiringPi.h>

// Read a DS18B20-style temperature sensor value from a GPIO pin
// and print it once per second.
int main(void) {
    /* Use BCM pin numbering */
    if (wiringPiSetupGpio() == -1) {
        fprintf(stderr, "wiringPi setup failed\n");
        return 1;
    }
    pinMode(4, INPUT);
    for (int i = 0; i < 10; i++) {
        // Temperature sensor line level stands in for a reading
        printf("temperature sample %d: %d\n", i, digitalRead(4));
        delay(1000);
    }
    return 0;
}"#;

/// JSON record the model is asked to emit
pub fn record_json(code: &str, build_command: &str) -> String {
    serde_json::json!({
        "category": "Sensor Reading (Raspberry Pi, C Language)",
        "input": "Read a temperature sensor",
        "output": code,
        "explanation": "Polls the sensor pin and prints the level.",
        "tags": "temperature, gpio",
        "file-name": "temperature.c",
        "build-command": build_command,
    })
    .to_string()
}

pub fn valid_response() -> String {
    record_json(VALID_C, "gcc temperature.c -o temperature -lwiringPi")
}

/// Gateway that replays a script, then answers with `fallback` (or nothing)
pub struct MockGateway {
    script: Mutex<VecDeque<Result<String, SoftFailure>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<(String, f32)>>,
}

impl MockGateway {
    pub fn scripted<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, SoftFailure>>,
    {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::scripted([])
        }
    }

    /// Every (prompt, temperature) seen so far
    pub fn calls(&self) -> Vec<(String, f32)> {
        self.calls.lock().unwrap().clone()
    }

    /// Prompts sent at the code-generation temperature
    pub fn generation_prompts(&self, temperature: f32) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, t)| (*t - temperature).abs() < f32::EPSILON)
            .map(|(p, _)| p)
            .collect()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, SoftFailure> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));

        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return reply;
        }
        self.fallback.clone().ok_or(SoftFailure::EmptyResponse)
    }
}

/// Base and enrichment replies that precede the generation attempts
pub fn synthesis_replies() -> Vec<Result<String, SoftFailure>> {
    vec![
        Ok("Write a C program that reads a temperature sensor on a Raspberry Pi.".to_string()),
        Ok("Write a C program that reads a DS18B20 temperature sensor every second and prints the value for a hobbyist weather station.".to_string()),
    ]
}
