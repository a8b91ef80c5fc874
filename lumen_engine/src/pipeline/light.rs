/// Lights consumed by the additive forward queue

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use crate::error::Result;
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, MemoryUsage, SharedDevice};

/// Light kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Main light, shaded in the base pass
    Directional,
    Point,
    Spot,
}

/// Contents of the forward light uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ForwardLightUniform {
    /// xyz position, w = 1 for spot lights
    pub light_pos: [f32; 4],
    /// rgb color, w = intensity
    pub light_color: [f32; 4],
    /// x size, y range, z cosine of the spot half angle
    pub light_size_range_angle: [f32; 4],
    pub light_dir: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub position: Vec3,
    /// Normalized direction (directional and spot lights)
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Radius of the emitting sphere
    pub size: f32,
    pub range: f32,
    /// Spot half angle in radians
    pub spot_angle: f32,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize_or_zero(),
            color,
            intensity: 1.0,
            size: 0.0,
            range: f32::INFINITY,
            spot_angle: 0.0,
        }
    }

    pub fn point(position: Vec3, color: Vec3, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::ZERO,
            color,
            intensity: 1.0,
            size: 0.15,
            range,
            spot_angle: 0.0,
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, color: Vec3, range: f32, spot_angle: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            direction: direction.normalize_or_zero(),
            spot_angle,
            ..Self::point(position, color, range)
        }
    }

    pub fn to_uniform(&self) -> ForwardLightUniform {
        let spot = if self.light_type == LightType::Spot { 1.0 } else { 0.0 };
        ForwardLightUniform {
            light_pos: self.position.extend(spot).to_array(),
            light_color: self.color.extend(self.intensity).to_array(),
            light_size_range_angle: Vec4::new(self.size, self.range, self.spot_angle.cos(), 0.0).to_array(),
            light_dir: self.direction.extend(0.0).to_array(),
        }
    }

    /// Create the uniform buffer holding this light's forward block
    pub fn create_buffer(&self, device: &SharedDevice) -> Result<Arc<Buffer>> {
        let uniform = self.to_uniform();
        let buffer = Buffer::new(device, BufferDesc::new(
            BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
            MemoryUsage::HOST | MemoryUsage::DEVICE,
            std::mem::size_of::<ForwardLightUniform>() as u64,
        ))?;
        buffer.update(bytemuck::bytes_of(&uniform), None)?;
        Ok(buffer)
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
