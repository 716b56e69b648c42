//! Image resources decoded to RGBA8.

use crate::resources::{LoadCompletion, ResourceData, ResourceLoader, Spawner, load_binary};

#[derive(Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResource")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl ImageResource {
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let rgba = ::image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            data: rgba.into_raw(),
        })
    }
}

#[derive(Default)]
pub struct ImageResourceLoader;

impl ResourceLoader for ImageResourceLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["png", "gif", "jpg", "jpeg", "webp", "bmp"]
    }

    fn load(&self, completion: LoadCompletion, spawner: &Spawner) {
        let name = completion.name().to_string();
        spawner.spawn(async move {
            let image = load_binary(&name)
                .await
                .and_then(|bytes| ImageResource::from_bytes(&bytes));
            completion.complete(image.map(ResourceData::Image));
        });
    }
}
