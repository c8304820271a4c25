use candle_core::Device;

/// Forces a device: `cpu`, `cuda`, `metal` or `auto`.
pub const DEVICE_ENV: &str = "UPSCALER_DEVICE";

/// Picks an accelerator when one is compiled in and present, the CPU
/// otherwise. `UPSCALER_DEVICE` overrides the choice.
pub fn select_device() -> candle_core::Result<Device> {
    let requested = std::env::var(DEVICE_ENV)
        .unwrap_or_default()
        .to_ascii_lowercase();

    match requested.as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Device::new_cuda(0),
        "metal" => Device::new_metal(0),
        "" | "auto" => auto(),
        other => {
            tracing::warn!("Ignoring unknown {DEVICE_ENV}={other}, selecting automatically");
            auto()
        }
    }
}

fn auto() -> candle_core::Result<Device> {
    if candle_core::utils::cuda_is_available() {
        return Device::new_cuda(0);
    }
    if candle_core::utils::metal_is_available() {
        return Device::new_metal(0);
    }
    Ok(Device::Cpu)
}

pub fn describe(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}
