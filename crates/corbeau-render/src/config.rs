// SPDX-License-Identifier: CEPL-1.0
use std::time::Duration;

use serde::Deserialize;

use crate::select::{DeviceRanking, DEFAULT_PREFERENCE};
use crate::types::DeviceClass;

/// Renderer settings, read from the `[render]` table of `corbeau.toml`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// Colour the render pass clears to before the quad is drawn.
    pub clear_color: [f32; 4],
    /// Device classes, best first.
    pub device_preference: Vec<DeviceClass>,
    /// Upper bound for every blocking wait on the GPU.
    pub fence_timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            // a recognisable green for debugging
            clear_color: [0.0, 0.5, 0.0, 1.0],
            device_preference: DEFAULT_PREFERENCE.to_vec(),
            fence_timeout_ms: 1000,
        }
    }
}

impl RendererConfig {
    pub fn fence_timeout(&self) -> Duration {
        Duration::from_millis(self.fence_timeout_ms)
    }

    pub fn ranking(&self) -> DeviceRanking {
        DeviceRanking::from_preference(&self.device_preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults() {
        let cfg: RendererConfig = toml::from_str(
            r#"
            device_preference = ["discrete", "integrated"]
            fence_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.clear_color, RendererConfig::default().clear_color);
        assert_eq!(
            cfg.device_preference,
            vec![DeviceClass::DiscreteGpu, DeviceClass::IntegratedGpu]
        );
        assert_eq!(cfg.fence_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.ranking().rank(DeviceClass::DiscreteGpu), 5);
    }

    #[test]
    fn unknown_class_is_rejected() {
        let res = toml::from_str::<RendererConfig>(r#"device_preference = ["quantum"]"#);
        assert!(res.is_err());
    }
}
