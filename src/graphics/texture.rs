//! Image-backed textures and their reference-counted manager.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use crate::{
    gpu::{Gpu, SamplerParams, TextureFilter, TextureId, TextureWrap},
    message::{Handler, Message, MessageBus, MessageHandler},
    resources::{ImageResource, ResourceManager, resource_loaded_code},
};

const PLACEHOLDER: [u8; 4] = [255, 255, 255, 255];

/// A GPU texture named after the image resource it shows.
///
/// Until the image arrives the texture is a single white pixel, so it can be
/// drawn with from the start.
pub struct Texture {
    name: String,
    gpu: Gpu,
    bus: MessageBus,
    handle: TextureId,
    width: Cell<u32>,
    height: Cell<u32>,
    loaded: Cell<bool>,
    destroyed: Cell<bool>,
}

impl Texture {
    pub fn new(name: &str, gpu: &Gpu, bus: &MessageBus, resources: &ResourceManager) -> Rc<Self> {
        let texture = Rc::new(Self {
            name: name.to_string(),
            gpu: gpu.clone(),
            bus: bus.clone(),
            handle: gpu.create_texture(),
            width: Cell::new(1),
            height: Cell::new(1),
            loaded: Cell::new(false),
            destroyed: Cell::new(false),
        });
        if let Err(e) = gpu.tex_image_2d(texture.handle, 1, 1, &PLACEHOLDER) {
            log::error!("Unable to create texture {name}: {e}");
        }

        let handler: Handler = texture.clone();
        bus.subscribe(&resource_loaded_code(name), handler);
        if let Some(image) = resources.get_resource(name).as_ref().and_then(|r| r.as_image()) {
            texture.load_from_resource(image);
        }
        texture
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> TextureId {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn activate_and_bind(&self, unit: u32) {
        self.gpu.bind_texture(unit, Some(self.handle));
    }

    /// Stops listening for the image and frees the GPU texture.
    ///
    /// A loaded message that was already queued is ignored once it arrives.
    pub fn destroy(self: &Rc<Self>) {
        if self.destroyed.replace(true) {
            return;
        }
        let handler: Handler = self.clone();
        self.bus.unsubscribe(&resource_loaded_code(&self.name), &handler);
        self.gpu.delete_texture(self.handle);
    }

    fn load_from_resource(&self, image: &ImageResource) {
        self.width.set(image.width);
        self.height.set(image.height);
        if let Err(e) = self
            .gpu
            .tex_image_2d(self.handle, image.width, image.height, &image.data)
        {
            log::error!("Unable to upload texture {}: {e}", self.name);
            return;
        }

        let params = if self.is_power_of_two() {
            SamplerParams::default()
        } else {
            SamplerParams {
                wrap: TextureWrap::ClampToEdge,
                min_filter: TextureFilter::Nearest,
            }
        };
        self.gpu.tex_parameters(self.handle, params);
        self.loaded.set(true);
    }

    fn is_power_of_two(&self) -> bool {
        self.width().is_power_of_two() && self.height().is_power_of_two()
    }
}

impl MessageHandler for Texture {
    fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        if self.is_destroyed() || message.code != resource_loaded_code(&self.name) {
            return Ok(());
        }
        match message
            .context_as::<crate::resources::Resource>()
            .and_then(|r| r.as_image())
        {
            Some(image) => self.load_from_resource(image),
            None => log::warn!("Resource {} isn't an image", self.name),
        }
        Ok(())
    }
}

struct TextureReference {
    texture: Rc<Texture>,
    count: usize,
}

/// Hands out shared textures by name and frees them when the last user releases.
#[derive(Clone)]
pub struct TextureManager {
    gpu: Gpu,
    bus: MessageBus,
    resources: ResourceManager,
    textures: Rc<RefCell<HashMap<String, TextureReference>>>,
}

impl TextureManager {
    pub fn new(gpu: Gpu, bus: MessageBus, resources: ResourceManager) -> Self {
        Self {
            gpu,
            bus,
            resources,
            textures: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn get_texture(&self, name: &str) -> Rc<Texture> {
        if let Some(reference) = self.textures.borrow_mut().get_mut(name) {
            reference.count += 1;
            return reference.texture.clone();
        }
        let texture = Texture::new(name, &self.gpu, &self.bus, &self.resources);
        self.textures.borrow_mut().insert(
            name.to_string(),
            TextureReference {
                texture: texture.clone(),
                count: 1,
            },
        );
        texture
    }

    pub fn release_texture(&self, name: &str) {
        let mut textures = self.textures.borrow_mut();
        let Some(reference) = textures.get_mut(name) else {
            log::warn!("A texture named {name} does not exist and therefore cannot be released.");
            return;
        };
        reference.count -= 1;
        if reference.count == 0 {
            if let Some(reference) = textures.remove(name) {
                reference.texture.destroy();
            }
        }
    }

    pub fn reference_count(&self, name: &str) -> usize {
        self.textures.borrow().get(name).map_or(0, |r| r.count)
    }
}
