//! The two GPU particle buffers.

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::particle::Particle;
use crate::ping_pong::{PingPong, Slot};

use super::context::read_buffer;

/// Particle state on the GPU: two equally sized buffers and a readable bit.
///
/// Both buffers are vertex buffers for the depth pass and storage buffers for
/// the simulation kernel. An empty pool still allocates one zeroed element
/// per buffer so bindings stay valid.
pub struct ParticleBuffers {
    buffers: PingPong<wgpu::Buffer>,
    count: u32,
}

impl ParticleBuffers {
    pub fn new(device: &wgpu::Device, particles: &[Particle]) -> Self {
        let padding = [Particle::zeroed()];
        let contents: &[Particle] = if particles.is_empty() { &padding } else { particles };

        let buffers = PingPong::from_fn(|slot| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match slot {
                    Slot::A => "Particle Buffer A",
                    Slot::B => "Particle Buffer B",
                }),
                contents: bytemuck::cast_slice(contents),
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
        });

        Self {
            buffers,
            count: particles.len() as u32,
        }
    }

    /// Number of live particles (zero for an empty pool).
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Buffer the renderer and the next step read from.
    pub fn readable(&self) -> &wgpu::Buffer {
        self.buffers.readable()
    }

    pub fn readable_slot(&self) -> Slot {
        self.buffers.readable_slot()
    }

    pub fn slot(&self, slot: Slot) -> &wgpu::Buffer {
        self.buffers.slot(slot)
    }

    /// Swap roles after a step has been encoded.
    pub fn flip(&mut self) {
        self.buffers.flip();
    }

    /// Copy the readable buffer back to the CPU.
    pub fn read(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Particle>, GpuError> {
        if self.count == 0 {
            return Ok(Vec::new());
        }
        let size = self.count as u64 * Particle::STRIDE;
        let bytes = read_buffer(device, queue, self.readable(), size)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}
