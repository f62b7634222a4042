#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthStencilFormat {
    Depth24,
    Depth24Stencil8,
}

impl DepthStencilFormat {
    pub fn has_stencil(self) -> bool {
        matches!(self, DepthStencilFormat::Depth24Stencil8)
    }

    pub fn bytes_per_texel(self) -> u32 {
        // 24 bit depth is padded to 32 bits, the stencil takes the padding
        4
    }
}

pub const DEPTH_TEXTURE_FORMAT: DepthStencilFormat = DepthStencilFormat::Depth24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthTexture {
    size: (u32, u32),
    format: DepthStencilFormat,
}

impl DepthTexture {
    pub fn new(size: (u32, u32), format: DepthStencilFormat) -> Self {
        Self { size, format }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn format(&self) -> DepthStencilFormat {
        self.format
    }

    pub fn byte_size(&self) -> u64 {
        self.size.0 as u64 * self.size.1 as u64 * self.format.bytes_per_texel() as u64
    }
}
