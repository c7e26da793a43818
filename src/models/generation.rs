use serde::{Deserialize, Serialize};

/// Generation settings shared by every prompt of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub size: String,
    pub n_per_prompt: u32,
    pub negative_prompt: String,
    pub prompt_extend: bool,
    pub watermark: bool,
}

/// One prompt bound to the shared parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub model: String,
    pub size: String,
    pub samples_per_prompt: u32,
    pub extend_prompt: bool,
    pub watermark: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, params: &GenerationParams) -> Self {
        // The service treats an absent negative prompt differently from "".
        let negative_prompt = if params.negative_prompt.trim().is_empty() {
            None
        } else {
            Some(params.negative_prompt.clone())
        };

        Self {
            prompt: prompt.into(),
            negative_prompt,
            model: params.model.clone(),
            size: params.size.clone(),
            samples_per_prompt: params.n_per_prompt,
            extend_prompt: params.prompt_extend,
            watermark: params.watermark,
        }
    }

    pub fn to_body(&self) -> SynthesisRequest {
        SynthesisRequest {
            model: self.model.clone(),
            input: SynthesisInput {
                prompt: self.prompt.clone(),
                negative_prompt: self.negative_prompt.clone(),
            },
            parameters: SynthesisParameters {
                size: self.size.clone(),
                n: self.samples_per_prompt,
                prompt_extend: self.extend_prompt,
                watermark: self.watermark,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub model: String,
    pub input: SynthesisInput,
    pub parameters: SynthesisParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInput {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisParameters {
    pub size: String,
    pub n: u32,
    pub prompt_extend: bool,
    pub watermark: bool,
}
