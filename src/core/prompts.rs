//! Two-stage prompt synthesis and the final code-generation prompt.
//!
//! Stage one asks the model for a short developer-style task. Stage two asks
//! it to enrich that task with the sampled variation axes and the hard C-only
//! constraints. Each stage has a templated fallback used when the gateway
//! returns nothing.

use tracing::{error, info, warn};

use crate::core::gateway::ModelGateway;
use crate::error::SoftFailure;
use crate::models::{GenerationContext, TargetMode, WorkItem};

/// Constraints shared by the enrichment request and its fallback
const C_ONLY_CONSTRAINTS: &[&str] = &[
    "Code should strictly be in C language and use libraries that support C programming.",
    "Do not use dummy or non-standard libraries (such as sensor.h).",
    "Do not refer to any C++ libraries that cannot be used in a C program.",
    "Use only real, current, publicly available libraries; do not invent headers or use deprecated ones.",
];

const ENRICHED_EXAMPLE: &str = "Write a C program for Raspberry Pi 'version' using the pigpio library to read a digital PIR motion sensor connected to GPIO17. When motion is detected, the program should log the timestamp to a file and blink an LED connected to GPIO27 for 1 second. The program should use procedural programming style, target Raspberry Pi 3 Model B+, and be suitable for a home security system in a smart home setup. It should include proper signal handling for graceful shutdown and validate sensor readings before acting.";

/// Libraries the model should reach for on each target
fn library_hint(mode: TargetMode) -> &'static str {
    match mode {
        TargetMode::Standard => "wiringPi, pigpio, bcm2835, sysfs",
        TargetMode::Pico => "the Raspberry Pi Pico C/C++ SDK (pico/stdlib.h, hardware/gpio.h, hardware/i2c.h, hardware/adc.h)",
    }
}

/// Stage-one request: a short, concrete task for one taxonomy pair
pub fn base_prompt_request(category: &str, subcategory: &str, platform: &str, mode: TargetMode) -> String {
    format!(
        r#"You are a specialized prompt engineer for {target} programming. Create a detailed, creative coding prompt for a C program that uses the {subcategory} {category} on a {platform}.

The prompt should be specific, technical, and highly detailed. Include:
1. The exact type of {subcategory} {category} hardware (e.g., DHT11, BMP180, PIR)
2. Specific C libraries or system calls to use (e.g., {libraries})
3. What the code should accomplish (e.g., read data, log to file, send over UART, control something)
4. Error handling for failed reads or GPIO init or I2C or SPI communication
5. File format for saving results if applicable (only for an example with saving data)
6. Real-world use case for context (e.g., environment monitoring, safety system)
7. Specifically designed for {platform}

Example format to follow:
Write a C program for {platform} to read data from a DHT11 sensor connected to GPIO7 and write the readings to a CSV file named 'sensor_log.csv'.

Further requirements:
Make your prompt interesting, technically accurate, and include an innovative approach or twist that would make this code example stand out.
Avoid buzzwords, over-explaining, or adding advanced goals. Just give a natural developer-style prompt.
Keep the prompt direct, with only relevant information, and no more than two lines.

Provide ONLY the prompt in plain text, formatted as a direct instruction to a C developer. Do not include any meta-commentary or notes about the prompt itself."#,
        target = mode.display_name(),
        category = category,
        subcategory = subcategory,
        platform = platform,
        libraries = library_hint(mode),
    )
}

pub fn fallback_base_prompt(category: &str, subcategory: &str, platform: &str) -> String {
    format!(
        "Write a C program for {} that uses {} ({}).",
        platform, subcategory, category
    )
}

/// Stage-two request: layer the variation axes and constraints onto the base task
pub fn enrichment_request(base_prompt: &str, ctx: &GenerationContext, mode: TargetMode) -> String {
    let mut requirements = vec![
        format!("Code should use {} programming style", ctx.style),
        format!("Complexity level should be {}", ctx.complexity),
        format!("Specifically designed for {}", ctx.platform),
        format!("Should implement {} approach", ctx.integration),
        format!("The use context is: {}", ctx.context),
    ];
    requirements.extend(C_ONLY_CONSTRAINTS.iter().map(|c| c.to_string()));
    requirements.push(format!(
        "For wiring access, I2C, SPI, UART and GPIO usage, use current libraries such as {}.",
        library_hint(mode)
    ));

    let numbered = requirements
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Enhance the following prompt with specific implementation details:

Original prompt: "{base_prompt}"

Add these requirements:
{numbered}

Format your final output like this example (structure only, not content):

{example}

Make the prompt cohesive, technical, and detailed. Ensure it specifies exact libraries, functions, and implementation details.
Format as a direct instruction to a developer. Return ONLY the final enhanced prompt."#,
        base_prompt = base_prompt.trim(),
        numbered = numbered,
        example = ENRICHED_EXAMPLE,
    )
}

/// Base prompt plus the same constraints as a bulleted list
pub fn fallback_enriched_prompt(base_prompt: &str, ctx: &GenerationContext) -> String {
    let mut out = format!("{}\n\nAdditional requirements:\n", base_prompt.trim());
    out.push_str(&format!("- Use {} style\n", ctx.style));
    out.push_str(&format!("- Complexity: {}\n", ctx.complexity));
    out.push_str(&format!("- Target: {}\n", ctx.platform));
    out.push_str(&format!("- Integration: {}\n", ctx.integration));
    out.push_str(&format!("- Context: {}", ctx.context));
    for constraint in C_ONLY_CONSTRAINTS {
        out.push_str("\n- ");
        out.push_str(constraint);
    }
    out
}

/// JSON schema the model must answer with
pub fn output_format_instructions(mode: TargetMode) -> String {
    let mut schema = String::from(
        r#"Respond with a valid JSON object using the following structure: {"category": "Short description of the application", "input": "The original natural language prompt", "output": "The complete C source code as a string", "explanation": "Brief explanation of how the code works (2 - 3 lines)", "tags": "Comma-separated tags (e.g., Raspberry Pi, C, GPIO)", "file-name": "Suggested .c file name", "#,
    );
    schema.push_str(&format!(
        "\"{}\": \"{}\"}}.",
        mode.build_field(),
        mode.build_field_description()
    ));
    if mode == TargetMode::Pico {
        schema.push_str(" For the Raspberry Pi Pico, generate the CMakeLists.txt content only, as gcc cannot be run for the Pico.");
    }
    schema.push_str(" Avoid unnecessary formatting like markdown or triple backticks. Do not add anything to the output field other than the code itself: it must be pure C code without Markdown fences such as ```c.");
    schema
}

/// Final generation prompt; `fail_reason` is the previous attempt's rejection
pub fn generation_prompt(enriched_prompt: &str, mode: TargetMode, fail_reason: Option<&str>) -> String {
    let mut prompt = format!(
        r#"{enriched}

IMPORTANT GENERATION INSTRUCTIONS:
{format}

IMPORTANT CONSIDERATIONS:
Ensure the C code uses proper headers, includes error checking, is realistic for embedded applications, and is written clearly with helpful comments.
Output must be a single raw JSON object without any commentary, explanation, or markdown syntax outside the JSON.
Ensure GPIO, sensor, or communication logic is realistic and platform-specific."#,
        enriched = enriched_prompt.trim(),
        format = output_format_instructions(mode),
    );

    if let Some(reason) = fail_reason.filter(|r| !r.trim().is_empty()) {
        prompt.push_str("\n\nIMPORTANT LAST INSTRUCTIONS:\n");
        prompt.push_str(reason.trim());
    }
    prompt
}

/// Retry reason used when the code passes but the build command is C++
pub fn build_command_reason(platform: &str, mode: TargetMode) -> String {
    match mode {
        TargetMode::Standard => format!(
            "Please generate a valid C build command (gcc, not g++) for the generated C code on {}.",
            platform
        ),
        TargetMode::Pico => format!(
            "Please generate a valid CMakeLists.txt for the generated C code on {} that builds plain C only.",
            platform
        ),
    }
}

/// Drives both synthesis stages through a gateway
pub struct PromptSynthesizer<'a> {
    gateway: &'a dyn ModelGateway,
    mode: TargetMode,
    base_temperature: f32,
    enrichment_temperature: f32,
}

impl<'a> PromptSynthesizer<'a> {
    pub fn new(
        gateway: &'a dyn ModelGateway,
        mode: TargetMode,
        base_temperature: f32,
        enrichment_temperature: f32,
    ) -> Self {
        Self {
            gateway,
            mode,
            base_temperature,
            enrichment_temperature,
        }
    }

    /// Stage one. Blank text counts as no result.
    pub async fn base_prompt(&self, item: &WorkItem, ctx: &GenerationContext) -> Result<String, SoftFailure> {
        let request = base_prompt_request(&item.category, &item.subcategory, &ctx.platform, self.mode);
        non_blank(self.gateway.invoke(&request, self.base_temperature).await)
    }

    /// Stage two
    pub async fn enrich(&self, base_prompt: &str, ctx: &GenerationContext) -> Result<String, SoftFailure> {
        let request = enrichment_request(base_prompt, ctx, self.mode);
        non_blank(self.gateway.invoke(&request, self.enrichment_temperature).await)
    }

    /// Both stages, falling back to templated text on any soft failure.
    ///
    /// Returns (base prompt, enriched prompt).
    pub async fn synthesize(&self, item: &WorkItem, ctx: &GenerationContext) -> (String, String) {
        info!("Generating prompt for {} -> {}", item.category, item.subcategory);

        let base = match self.base_prompt(item, ctx).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!("Failed to generate base prompt ({}). Using fallback.", e);
                fallback_base_prompt(&item.category, &item.subcategory, &ctx.platform)
            }
        };

        let enriched = match self.enrich(&base, ctx).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Prompt enrichment failed ({}). Falling back to base prompt with added details.", e);
                fallback_enriched_prompt(&base, ctx)
            }
        };

        (base, enriched)
    }
}

fn non_blank(result: Result<String, SoftFailure>) -> Result<String, SoftFailure> {
    match result {
        Ok(text) if text.trim().is_empty() => Err(SoftFailure::EmptyResponse),
        other => other,
    }
}
