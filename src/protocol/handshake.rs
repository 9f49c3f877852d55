use serde::{Deserialize, Serialize};

use crate::SdkConfig;

/// Registration record sent once, before any other traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "serviceName")]
    pub service_name: String,

    #[serde(rename = "service_no", alias = "instance")]
    pub instance: String,

    pub weight: u8,
}

impl From<&SdkConfig> for RegisterRequest {
    fn from(config: &SdkConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            instance: config.instance.clone(),
            weight: config.weight,
        }
    }
}

/// The remote tier's answer to a [`RegisterRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,

    #[serde(default)]
    pub description: String,
}
