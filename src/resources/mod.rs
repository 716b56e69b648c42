//! Name-keyed resource loading.
//!
//! A resource is identified by its path below `assets/`. [`ResourceManager`] picks
//! a [`ResourceLoader`] by the path's extension, lets it fetch and decode the data
//! off the frame thread, and caches the result once [`ResourceManager::poll`] sees
//! the completion. Every successful load is announced on the message bus under
//! [`resource_loaded_code`], so anything that asked too early can subscribe and wait.
//!
//! # Key types
//!
//! - [`ResourceManager`] holds the loaders, the cache and what is in flight
//! - [`ResourceLoader`] is implemented per file family ([`image::ImageResourceLoader`], [`json::JsonResourceLoader`])
//! - [`LoadCompletion`] is the one-shot callback a loader completes
//! - [`Spawner`] runs loader futures on tokio (native) or the browser's executor (wasm)

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    future::Future,
    rc::Rc,
};

use crate::message::MessageBus;

pub mod image;
pub mod json;

pub use self::image::{ImageResource, ImageResourceLoader};
pub use self::json::JsonResourceLoader;

pub const RESOURCE_LOADED_PREFIX: &str = "MESSAGE_RESOURCE_LOADER_RESOURCE_LOADED::";

/// The message code posted once `name` has been loaded.
pub fn resource_loaded_code(name: &str) -> String {
    format!("{RESOURCE_LOADED_PREFIX}{name}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    Image(ImageResource),
    Json(serde_json::Value),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub data: ResourceData,
}

impl Resource {
    pub fn as_image(&self) -> Option<&ImageResource> {
        match &self.data {
            ResourceData::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match &self.data {
            ResourceData::Json(json) => Some(json),
            _ => None,
        }
    }
}

struct LoadOutcome {
    name: String,
    data: anyhow::Result<ResourceData>,
}

/// Reports the result of exactly one load back to the manager.
///
/// Completing consumes the value; dropping it without completing counts as a
/// failed load.
pub struct LoadCompletion {
    name: String,
    sender: Option<flume::Sender<LoadOutcome>>,
}

impl LoadCompletion {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn complete(mut self, data: anyhow::Result<ResourceData>) {
        if let Some(sender) = self.sender.take() {
            let name = std::mem::take(&mut self.name);
            if sender.send(LoadOutcome { name, data }).is_err() {
                log::warn!("A resource finished loading after its manager was dropped");
            }
        }
    }
}

impl Drop for LoadCompletion {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let name = std::mem::take(&mut self.name);
            let data = Err(anyhow::anyhow!("loader dropped {name} without completing it"));
            sender.send(LoadOutcome { name, data }).ok();
        }
    }
}

pub trait ResourceLoader {
    /// Lowercase extensions without the dot.
    fn supported_extensions(&self) -> &[&'static str];
    /// Starts loading `completion.name()`. Must not block.
    fn load(&self, completion: LoadCompletion, spawner: &Spawner);
}

/// Runs loader futures without blocking the frame thread.
#[derive(Clone, Debug)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

#[cfg(not(target_arch = "wasm32"))]
impl Spawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the tokio runtime the caller runs in.
    pub fn current() -> anyhow::Result<Self> {
        Ok(Self::new(tokio::runtime::Handle::try_current()?))
    }

    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(target_arch = "wasm32")]
impl Spawner {
    pub fn new() -> Self {
        Self {}
    }

    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(future);
    }
}

#[derive(Default)]
struct ResourceState {
    loaders: Vec<Rc<dyn ResourceLoader>>,
    cache: HashMap<String, Rc<Resource>>,
    pending: HashSet<String>,
}

/// Cheaply clonable handle to one resource cache.
#[derive(Clone)]
pub struct ResourceManager {
    state: Rc<RefCell<ResourceState>>,
    bus: MessageBus,
    spawner: Spawner,
    sender: flume::Sender<LoadOutcome>,
    receiver: flume::Receiver<LoadOutcome>,
}

/// The lowercase text after the last `.`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, extension) = name.rsplit_once('.')?;
    (!extension.is_empty()).then(|| extension.to_lowercase())
}

impl ResourceManager {
    pub fn new(bus: MessageBus, spawner: Spawner) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            state: Rc::new(RefCell::new(ResourceState::default())),
            bus,
            spawner,
            sender,
            receiver,
        }
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn register_loader(&self, loader: Rc<dyn ResourceLoader>) {
        self.state.borrow_mut().loaders.push(loader);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.borrow().cache.contains_key(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.state.borrow().pending.contains(name)
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Starts loading `name` unless it is cached or already in flight.
    pub fn load_resource(&self, name: &str) {
        let Some(extension) = extension_of(name) else {
            log::error!("Unable to determine the extension of resource {name}");
            return;
        };
        let loader = {
            let state = self.state.borrow();
            if state.cache.contains_key(name) || state.pending.contains(name) {
                return;
            }
            state
                .loaders
                .iter()
                .find(|l| l.supported_extensions().contains(&extension.as_str()))
                .cloned()
        };
        let Some(loader) = loader else {
            log::warn!("No loader found for resource {name} with extension {extension}");
            return;
        };

        self.state.borrow_mut().pending.insert(name.to_string());
        loader.load(
            LoadCompletion {
                name: name.to_string(),
                sender: Some(self.sender.clone()),
            },
            &self.spawner,
        );
    }

    /// The cached resource, or `None` after kicking off its load.
    pub fn get_resource(&self, name: &str) -> Option<Rc<Resource>> {
        let cached = self.state.borrow().cache.get(name).cloned();
        if cached.is_none() {
            self.load_resource(name);
        }
        cached
    }

    /// Caches `data` under `name` and announces it.
    pub fn on_resource_loaded(&self, name: &str, data: ResourceData) -> anyhow::Result<()> {
        let resource = Rc::new(Resource {
            name: name.to_string(),
            data,
        });
        {
            let mut state = self.state.borrow_mut();
            state.pending.remove(name);
            if state.cache.contains_key(name) {
                log::warn!("Resource {name} was loaded twice, keeping the first copy");
                return Ok(());
            }
            state.cache.insert(name.to_string(), resource.clone());
        }
        log::info!("Resource {name} loaded");
        self.bus
            .send(resource_loaded_code(name), "ResourceManager", Some(resource))
    }

    fn finish(&self, outcome: LoadOutcome) -> anyhow::Result<()> {
        match outcome.data {
            Ok(data) => self.on_resource_loaded(&outcome.name, data),
            Err(e) => {
                self.state.borrow_mut().pending.remove(&outcome.name);
                log::error!("Failed to load resource {}: {e:#}", outcome.name);
                Ok(())
            }
        }
    }

    /// Applies every load that completed since the last call. Returns how many.
    pub fn poll(&self) -> anyhow::Result<usize> {
        let mut applied = 0;
        while let Ok(outcome) = self.receiver.try_recv() {
            self.finish(outcome)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Waits until nothing is in flight any more.
    pub async fn settle(&self) -> anyhow::Result<()> {
        self.poll()?;
        while self.pending_count() > 0 {
            let outcome = self.receiver.recv_async().await?;
            self.finish(outcome)?;
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("no origin"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let data = load_binary(file_name).await?;
    Ok(String::from_utf8(data)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}
