use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use cgmath::Matrix4;
use serde_json::Value;
use zone_ngin::{
    components::{Builder, Component},
    config::EngineConfig,
    context::Context,
    data_structures::scene_graph::NodeId,
    gpu::{Gpu, headless::HeadlessDevice, shader::Shader},
    resources::{LoadCompletion, ResourceData, ResourceLoader, Spawner},
};

pub type EventLog = Rc<RefCell<Vec<String>>>;

/// A context on a [`HeadlessDevice`] with its own tokio runtime for loaders.
pub struct Harness {
    pub runtime: tokio::runtime::Runtime,
    pub device: Rc<HeadlessDevice>,
    pub ctx: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build a tokio runtime");
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Gpu = device.clone();
        let ctx = Context::new(gpu, Spawner::new(runtime.handle().clone()), config);
        Self {
            runtime,
            device,
            ctx,
        }
    }

    pub fn gpu(&self) -> Gpu {
        self.ctx.gpu.clone()
    }

    /// Applies finished loads, then drains the bus completely.
    pub fn pump(&self) {
        self.ctx.resources.poll().expect("poll failed");
        while self.ctx.bus.pending() > 0 {
            self.ctx.bus.update().expect("bus update failed");
        }
    }

    pub fn settle(&self) {
        self.runtime
            .block_on(self.ctx.resources.settle())
            .expect("settle failed");
    }
}

pub fn headless() -> (Rc<HeadlessDevice>, Gpu) {
    let device = Rc::new(HeadlessDevice::new());
    let gpu: Gpu = device.clone();
    (device, gpu)
}

pub fn spawner(runtime: &tokio::runtime::Runtime) -> Spawner {
    Spawner::new(runtime.handle().clone())
}

/// Serves resources from memory and completes every load synchronously.
pub struct MemoryLoader {
    extensions: Vec<&'static str>,
    files: RefCell<HashMap<String, ResourceData>>,
    calls: Cell<usize>,
}

impl MemoryLoader {
    pub fn new(extensions: &[&'static str]) -> Rc<Self> {
        Rc::new(Self {
            extensions: extensions.to_vec(),
            files: RefCell::new(HashMap::new()),
            calls: Cell::new(0),
        })
    }

    pub fn with_file(self: Rc<Self>, name: &str, data: ResourceData) -> Rc<Self> {
        self.files.borrow_mut().insert(name.to_string(), data);
        self
    }

    pub fn insert(&self, name: &str, data: ResourceData) {
        self.files.borrow_mut().insert(name.to_string(), data);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ResourceLoader for MemoryLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    fn load(&self, completion: LoadCompletion, _spawner: &Spawner) {
        self.calls.set(self.calls.get() + 1);
        let data = self.files.borrow().get(completion.name()).cloned();
        match data {
            Some(data) => completion.complete(Ok(data)),
            None => {
                let name = completion.name().to_string();
                completion.complete(Err(anyhow::anyhow!("{name} not found")))
            }
        }
    }
}

/// A component that writes its lifecycle calls into a shared log.
pub struct Recorder {
    label: String,
    owner: Option<NodeId>,
    log: EventLog,
    fail_on_load: bool,
}

impl Recorder {
    pub fn new(label: &str, log: &EventLog) -> Self {
        Self {
            label: label.to_string(),
            owner: None,
            log: log.clone(),
            fail_on_load: false,
        }
    }

    /// Logs its load like any other recorder, then fails it.
    pub fn failing(label: &str, log: &EventLog) -> Self {
        Self {
            fail_on_load: true,
            ..Self::new(label, log)
        }
    }

    fn push(&self, event: &str) {
        self.log.borrow_mut().push(format!("{event}:{}", self.label));
    }
}

impl Component for Recorder {
    fn name(&self) -> Option<&str> {
        Some(&self.label)
    }

    fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }

    fn load(&mut self) -> anyhow::Result<()> {
        self.push("load");
        if self.fail_on_load {
            anyhow::bail!("{} failed to load", self.label);
        }
        Ok(())
    }

    fn update(&mut self, _time: f32) {
        self.push("update");
    }

    fn draw(&self, _shader: &Shader, _world: &Matrix4<f32>) -> anyhow::Result<()> {
        self.push("draw");
        Ok(())
    }

    fn unload(&mut self) {
        self.push("unload");
    }
}

/// Builds [`Recorder`]s from `{type: "recorder", label, fail?}`.
pub struct RecorderBuilder {
    pub log: EventLog,
}

impl Builder<dyn Component> for RecorderBuilder {
    fn type_tag(&self) -> &str {
        "recorder"
    }

    fn build_from_json(&self, json: &Value) -> anyhow::Result<Box<dyn Component>> {
        let label = json
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Recorder is missing label property"))?;
        if json.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(Box::new(Recorder::failing(label, &self.log)));
        }
        Ok(Box::new(Recorder::new(label, &self.log)))
    }
}

pub fn assert_matrix_eq(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let actual: [[f32; 4]; 4] = actual.into();
    let expected: [[f32; 4]; 4] = expected.into();
    for (column, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        for row in 0..4 {
            assert!(
                (a[row] - e[row]).abs() < 1e-4,
                "matrices differ at column {column}, row {row}: {actual:?} != {expected:?}"
            );
        }
    }
}
