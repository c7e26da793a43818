use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Text-to-image models served through the async image-synthesis route.
pub fn supported_models() -> Vec<ModelInfo> {
    [
        (
            "wan2.5-t2i-preview",
            "Wan 2.5 T2I Preview",
            "Latest preview model, free-form sizes",
        ),
        (
            "wan2.2-t2i-flash",
            "Wan 2.2 T2I Flash",
            "Fast generation",
        ),
        (
            "wan2.2-t2i-plus",
            "Wan 2.2 T2I Plus",
            "Higher detail and prompt adherence",
        ),
        ("wanx2.1-t2i-turbo", "Wanx 2.1 T2I Turbo", "Fast generation"),
        ("wanx2.1-t2i-plus", "Wanx 2.1 T2I Plus", "Richer detail"),
        ("wanx-v1", "Wanx v1", "First generation model"),
    ]
    .into_iter()
    .map(|(id, name, description)| ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}
