use candle_core::Device;

/// Request for an execution device, resolved once when the evaluator loads.
#[derive(Debug, Clone, Default)]
pub enum DeviceRequest {
    /// Use CUDA if available, otherwise CPU.
    #[default]
    Default,
    /// Force CPU even if CUDA is available.
    Cpu,
    /// A specific CUDA device by ordinal; CPU when CUDA is missing.
    Cuda(usize),
}

impl DeviceRequest {
    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> anyhow::Result<Device> {
        self.resolve_with(candle_core::utils::cuda_is_available())
    }

    /// Resolve against a known CUDA availability. CPU wins whenever CUDA is
    /// missing or the request forces it.
    pub fn resolve_with(self, cuda_available: bool) -> anyhow::Result<Device> {
        match self {
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Default if !cuda_available => Ok(Device::Cpu),
            DeviceRequest::Default => match Device::new_cuda(0) {
                Ok(device) => Ok(device),
                Err(err) => {
                    tracing::warn!("CUDA reported available but failed to open, using CPU: {err}");
                    Ok(Device::Cpu)
                }
            },
            DeviceRequest::Cuda(_) if !cuda_available => Ok(Device::Cpu),
            DeviceRequest::Cuda(ordinal) => Ok(Device::new_cuda(ordinal)?),
        }
    }
}

/// Return cached device memory after a request. Candle frees buffers on drop,
/// so on GPU this only waits for queued kernels to finish.
pub fn release_device(device: &Device) -> anyhow::Result<()> {
    if !device.is_cpu() {
        device.synchronize()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_request_ignores_gpu() {
        let device = DeviceRequest::Cpu.resolve_with(true).unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn default_falls_back_without_gpu() {
        let device = DeviceRequest::Default.resolve_with(false).unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn cuda_ordinal_falls_back_without_gpu() {
        let device = DeviceRequest::Cuda(3).resolve_with(false).unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn release_on_cpu_is_noop() {
        assert!(release_device(&Device::Cpu).is_ok());
    }
}
