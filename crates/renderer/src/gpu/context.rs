use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::error::RendererError;

/// Device, queue, and presentation surface for one window.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    surface_caps: wgpu::SurfaceCapabilities,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: Arc<T>,
        initial_size: PhysicalSize<u32>,
        requested_samples: u32,
        vsync: bool,
    ) -> Result<Self, RendererError>
    where
        T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .map_err(|err| RendererError::context_init("failed to create rendering surface", err))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| RendererError::context_init("failed to find a suitable GPU adapter", err))?;

        let adapter_info = adapter.get_info();
        let is_software = adapter_info.device_type == wgpu::DeviceType::Cpu;
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            is_software,
            "selected GPU adapter"
        );

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(RendererError::ContextInit(
                "surface reports no supported formats".to_string(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(first_format);

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = select_sample_count(
            requested_samples,
            format_features.flags.supported_sample_counts(),
            format_features
                .flags
                .contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
            is_software,
        );

        let mut required_features = wgpu::Features::empty();
        if sample_count > 4 {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("quadspin device"),
            required_features,
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| RendererError::context_init("failed to create GPU device", err))?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let present_mode = pick_present_mode(&surface_caps.present_modes, vsync)
            .unwrap_or(wgpu::PresentMode::Fifo);
        tracing::debug!(?present_mode, vsync, sample_count, ?surface_format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            surface_format,
            surface_caps,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if !is_drawable_size(new_size) {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after the surface was lost.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Enable or disable VSync by reconfiguring the surface present mode.
    /// No-op when the requested mode is already active.
    pub(crate) fn set_vsync(&mut self, enabled: bool) {
        let Some(target_mode) = pick_present_mode(&self.surface_caps.present_modes, enabled)
        else {
            return;
        };

        if target_mode != self.config.present_mode {
            self.config.present_mode = target_mode;
            self.surface.configure(&self.device, &self.config);
            tracing::debug!(
                ?target_mode,
                vsync_enabled = enabled,
                "reconfigured surface present mode"
            );
        }
    }
}

/// Zero-area sizes (for example a minimised window) cannot back a surface.
pub(crate) fn is_drawable_size(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

/// `Fifo` for vsync; otherwise `Immediate`, then `Mailbox`, then `Fifo`.
fn pick_present_mode(available: &[wgpu::PresentMode], vsync: bool) -> Option<wgpu::PresentMode> {
    let has = |mode: wgpu::PresentMode| available.contains(&mode).then_some(mode);
    let preferred = if vsync {
        has(wgpu::PresentMode::Fifo)
    } else {
        has(wgpu::PresentMode::Immediate)
            .or_else(|| has(wgpu::PresentMode::Mailbox))
            .or_else(|| has(wgpu::PresentMode::Fifo))
    };
    preferred.or_else(|| available.first().copied())
}

/// Clamps the requested MSAA count to what the surface format supports.
fn select_sample_count(
    requested: u32,
    mut supported: Vec<u32>,
    can_resolve: bool,
    is_software: bool,
) -> u32 {
    if requested <= 1 {
        return 1;
    }
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();

    let mut sample_count = supported
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1);
    if sample_count != requested {
        tracing::warn!(
            requested,
            fallback = sample_count,
            ?supported,
            "requested MSAA sample count not supported; falling back"
        );
    }

    if sample_count > 1 && !can_resolve {
        tracing::warn!("surface format does not support MSAA resolve; disabling MSAA");
        sample_count = 1;
    }

    if is_software && sample_count > 1 {
        tracing::warn!(
            sample_count,
            "software rasterizer detected; disabling MSAA for performance"
        );
        sample_count = 1;
    }

    sample_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_prefers_fifo() {
        let modes = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(pick_present_mode(&modes, true), Some(wgpu::PresentMode::Fifo));
    }

    #[test]
    fn no_vsync_prefers_immediate_then_mailbox() {
        let modes = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];
        assert_eq!(
            pick_present_mode(&modes, false),
            Some(wgpu::PresentMode::Immediate)
        );
        let modes = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox];
        assert_eq!(
            pick_present_mode(&modes, false),
            Some(wgpu::PresentMode::Mailbox)
        );
    }

    #[test]
    fn present_mode_falls_back_to_first_available() {
        let modes = [wgpu::PresentMode::FifoRelaxed];
        assert_eq!(
            pick_present_mode(&modes, true),
            Some(wgpu::PresentMode::FifoRelaxed)
        );
        assert_eq!(pick_present_mode(&[], true), None);
    }

    #[test]
    fn zero_area_sizes_are_not_drawable() {
        assert!(is_drawable_size(PhysicalSize::new(640, 480)));
        assert!(!is_drawable_size(PhysicalSize::new(0, 480)));
        assert!(!is_drawable_size(PhysicalSize::new(640, 0)));
        assert!(!is_drawable_size(PhysicalSize::new(0, 0)));
    }

    #[test]
    fn sample_count_uses_request_when_supported() {
        assert_eq!(select_sample_count(4, vec![1, 2, 4, 8], true, false), 4);
    }

    #[test]
    fn sample_count_falls_back_below_request() {
        assert_eq!(select_sample_count(4, vec![1, 2], true, false), 2);
        assert_eq!(select_sample_count(4, vec![8], true, false), 1);
    }

    #[test]
    fn sample_count_disabled_without_resolve_or_on_software() {
        assert_eq!(select_sample_count(4, vec![1, 4], false, false), 1);
        assert_eq!(select_sample_count(4, vec![1, 4], true, true), 1);
        assert_eq!(select_sample_count(1, vec![1, 4], true, false), 1);
    }
}
